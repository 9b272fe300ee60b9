//! Client configuration.

use std::env;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8090";

/// Where the server lives and which token to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
        }
    }

    /// Read `POCKETBASE_URL` and `POCKETBASE_TOKEN`. Unset or empty values
    /// fall back to the local default and no token.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            base_url: non_empty("POCKETBASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            auth_token: non_empty("POCKETBASE_TOKEN"),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_defaults_when_unset() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn lookup_reads_url_and_token() {
        let config = ClientConfig::from_lookup(|key| match key {
            "POCKETBASE_URL" => Some("https://pb.example.com".to_string()),
            "POCKETBASE_TOKEN" => Some("tok".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "https://pb.example.com");
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
    }

    #[test]
    fn empty_token_is_ignored() {
        let config = ClientConfig::from_lookup(|key| (key == "POCKETBASE_TOKEN").then(|| " ".to_string()));
        assert!(config.auth_token.is_none());
    }
}
