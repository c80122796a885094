//! Configuration for the search miner.

mod settings;

pub use settings::Settings;
