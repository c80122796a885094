//! Writers for exported documents.

mod csv;
mod json;

pub use self::csv::{cell_text, csv_columns, write_csv, write_csv_file};
pub use self::json::write_json_file;
