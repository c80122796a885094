//! Connection configuration for the search engine.

/// Parameters for reaching a single engine node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// URL scheme, `https` unless the cluster runs plain HTTP.
    pub scheme: String,
    /// Host name or address of the node.
    pub host: String,
    /// REST port of the node.
    pub port: u16,
    /// Basic-auth user. Auth is only sent when both user and password are set.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
    /// Verify the server certificate. Off by default for self-signed local clusters.
    pub verify_certs: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: "localhost".to_string(),
            port: 9200,
            username: String::new(),
            password: String::new(),
            verify_certs: false,
        }
    }
}

impl ConnectionConfig {
    /// Create a config for the given host and port with default settings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Set basic-auth credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Base URL of the node, e.g. `https://localhost:9200`.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Credentials to send, if both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() || self.password.is_empty() {
            None
        } else {
            Some((&self.username, &self.password))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        assert_eq!(ConnectionConfig::default().url(), "https://localhost:9200");
    }

    #[test]
    fn test_credentials_require_both_halves() {
        let config = ConnectionConfig::new("es.local", 9201);
        assert!(config.credentials().is_none());

        let config = config.with_credentials("elastic", "");
        assert!(config.credentials().is_none());

        let config = config.with_credentials("elastic", "changeme");
        assert_eq!(config.credentials(), Some(("elastic", "changeme")));
        assert_eq!(config.url(), "https://es.local:9201");
    }
}
