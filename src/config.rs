use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_SESSION_MAX_ENTRIES: usize = 1_024;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub bind_addr: String,
    pub bind_port: u16,
    pub user_directory_path: Option<PathBuf>,
    pub session_ttl: Duration,
    pub session_max_entries: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BACKEND_URL must be an http:// or https:// URL")]
    InvalidBackendUrl,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("SESSION_TTL_SECS must be a positive integer")]
    InvalidSessionTtl,
    #[error("SESSION_MAX_ENTRIES must be a positive integer")]
    InvalidSessionMaxEntries,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let backend_url = non_empty("BACKEND_URL")
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBackendUrl);
        }

        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
        let bind_port = non_empty("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8001);
        let user_directory_path = non_empty("USER_DIRECTORY_PATH").map(PathBuf::from);

        let session_ttl_secs = non_empty("SESSION_TTL_SECS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ConfigError::InvalidSessionTtl)
            })
            .transpose()?
            .unwrap_or(DEFAULT_SESSION_TTL_SECS);
        let session_max_entries = non_empty("SESSION_MAX_ENTRIES")
            .map(|value| {
                value
                    .parse::<usize>()
                    .ok()
                    .filter(|entries| *entries > 0)
                    .ok_or(ConfigError::InvalidSessionMaxEntries)
            })
            .transpose()?
            .unwrap_or(DEFAULT_SESSION_MAX_ENTRIES);

        let config = Self {
            backend_url,
            bind_addr,
            bind_port,
            user_directory_path,
            session_ttl: Duration::from_secs(session_ttl_secs),
            session_max_entries,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| values.get(key).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = config_from(&[]).expect("config should parse");
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.bind_port, 8001);
        assert_eq!(config.user_directory_path, None);
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.session_max_entries, 1_024);
    }

    #[test]
    fn strips_trailing_slash_from_backend_url() {
        let config = config_from(&[("BACKEND_URL", "https://incidents.example.com/ ")])
            .expect("config should parse");
        assert_eq!(config.backend_url, "https://incidents.example.com");
    }

    #[test]
    fn rejects_backend_url_without_scheme() {
        let err = config_from(&[("BACKEND_URL", "incidents.example.com")])
            .expect_err("expected invalid backend url");
        assert!(matches!(err, ConfigError::InvalidBackendUrl));
    }

    #[test]
    fn invalid_port_fails() {
        let err = config_from(&[("BIND_PORT", "99999")]).expect_err("expected invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn zero_session_ttl_fails() {
        let err = config_from(&[("SESSION_TTL_SECS", "0")]).expect_err("expected invalid ttl");
        assert!(matches!(err, ConfigError::InvalidSessionTtl));
    }

    #[test]
    fn non_numeric_session_capacity_fails() {
        let err = config_from(&[("SESSION_MAX_ENTRIES", "lots")])
            .expect_err("expected invalid capacity");
        assert!(matches!(err, ConfigError::InvalidSessionMaxEntries));
    }

    #[test]
    fn invalid_bind_addr_fails() {
        let err = config_from(&[("BIND_ADDR", "not an address")])
            .expect_err("expected invalid socket");
        assert!(matches!(err, ConfigError::InvalidSocket));
    }

    #[test]
    fn directory_path_is_optional() {
        let config = config_from(&[("USER_DIRECTORY_PATH", "/srv/users.json")])
            .expect("config should parse");
        assert_eq!(
            config.user_directory_path,
            Some(PathBuf::from("/srv/users.json"))
        );
    }
}
