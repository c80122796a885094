//! Connection settings read from the environment.

use std::env;

use tracing::debug;

use crate::MinerError;
use search_miner_repository::ConnectionConfig;

/// Default search engine host.
const DEFAULT_HOST: &str = "localhost";

/// Default search engine port.
const DEFAULT_PORT: u16 = 9200;

/// Default index operated on when `--index` is not given.
const DEFAULT_INDEX: &str = "my_index";

/// Default URL scheme.
const DEFAULT_SCHEME: &str = "https";

/// Settings for one invocation of the tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub index: String,
    pub scheme: String,
    pub verify_certs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            index: DEFAULT_INDEX.to_string(),
            scheme: DEFAULT_SCHEME.to_string(),
            verify_certs: false,
        }
    }
}

impl Settings {
    /// Load settings from the process environment, after reading `.env` if
    /// one is present.
    ///
    /// # Environment Variables
    ///
    /// - `ES_HOST`: engine host (default: localhost)
    /// - `ES_PORT`: engine port (default: 9200)
    /// - `ES_USERNAME` / `ES_PASSWORD`: basic auth credentials (default: none)
    /// - `ES_INDEX`: default index (default: my_index)
    /// - `ES_SCHEME`: `http` or `https` (default: https)
    /// - `ES_VERIFY_CERTS`: verify TLS certificates (default: false)
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - Settings with defaults filled in
    /// * `Err(MinerError::ConfigError)` - If a variable holds an unusable value
    pub fn from_env() -> Result<Self, MinerError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MinerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("ES_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| MinerError::config(format!("Invalid ES_PORT '{}': {}", raw, e)))?,
            None => defaults.port,
        };

        let scheme = lookup("ES_SCHEME").unwrap_or(defaults.scheme);
        if scheme != "http" && scheme != "https" {
            return Err(MinerError::config(format!(
                "Invalid ES_SCHEME '{}': expected http or https",
                scheme
            )));
        }

        let verify_certs = match lookup("ES_VERIFY_CERTS") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                MinerError::config(format!("Invalid ES_VERIFY_CERTS '{}'", raw))
            })?,
            None => defaults.verify_certs,
        };

        let settings = Self {
            host: lookup("ES_HOST").unwrap_or(defaults.host),
            port,
            username: lookup("ES_USERNAME").unwrap_or_default(),
            password: lookup("ES_PASSWORD").unwrap_or_default(),
            index: lookup("ES_INDEX").unwrap_or(defaults.index),
            scheme,
            verify_certs,
        };

        debug!(
            host = %settings.host,
            port = settings.port,
            scheme = %settings.scheme,
            index = %settings.index,
            "Loaded settings"
        );

        Ok(settings)
    }

    /// Connection parameters for the repository layer.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            verify_certs: self.verify_certs,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.connection_config().url(), "https://localhost:9200");
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("ES_HOST", "search.internal"),
            ("ES_PORT", "9201"),
            ("ES_USERNAME", "admin"),
            ("ES_PASSWORD", "secret"),
            ("ES_INDEX", "products"),
            ("ES_SCHEME", "http"),
            ("ES_VERIFY_CERTS", "true"),
        ]))
        .unwrap();

        assert_eq!(settings.index, "products");
        assert!(settings.verify_certs);

        let config = settings.connection_config();
        assert_eq!(config.url(), "http://search.internal:9201");
        assert_eq!(config.credentials(), Some(("admin", "secret")));
    }

    #[test]
    fn test_bad_port_is_a_config_error() {
        let err = Settings::from_lookup(lookup(&[("ES_PORT", "ninety")])).unwrap_err();
        assert!(matches!(err, MinerError::ConfigError(_)));
    }

    #[test]
    fn test_bad_scheme_and_flag() {
        assert!(Settings::from_lookup(lookup(&[("ES_SCHEME", "ftp")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("ES_VERIFY_CERTS", "maybe")])).is_err());
    }
}
