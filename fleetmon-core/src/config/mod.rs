//! Configuration loading and validation for the fleet monitor
//!
//! The configuration file is JSON with the shape:
//!
//! ```json
//! {
//!   "servers": [{"name": "web-1", "host": "10.0.0.5", "user": "deploy"}],
//!   "ssh_key_path": "~/.ssh/id_ed25519",
//!   "refresh_interval": 30,
//!   "port": 8080
//! }
//! ```
//!
//! Every constraint violation maps to its own [`ConfigError`] variant so
//! startup failures name the exact offending field. Validation happens
//! before any collector is constructed; an invalid configuration never
//! reaches the polling layer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// The configuration file could not be read
    #[error("Error reading configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON (or is missing a field)
    #[error("Invalid JSON in configuration file: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The server list is empty
    #[error("'servers' must be a non-empty list")]
    NoServers,

    /// A server entry has an empty required field
    #[error("Server at index {index} missing required field: {field}")]
    EmptyServerField {
        /// Position of the offending entry in the `servers` list
        index: usize,
        /// Name of the empty field (`name`, `host`, or `user`)
        field: &'static str,
    },

    /// The SSH private key file does not exist
    #[error("SSH key file not found: {0}")]
    KeyNotFound(PathBuf),

    /// The refresh interval is below the minimum of one second
    #[error("'refresh_interval' must be a positive integer")]
    InvalidRefreshInterval,

    /// The listen port is outside the valid range
    #[error("'port' must be an integer between 1 and 65535")]
    InvalidPort,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// One monitored server, supplied by configuration and immutable for the
/// collector's lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Display name for the server
    pub name: String,
    /// Hostname or IP address
    pub host: String,
    /// SSH username
    pub user: String,
}

impl ServerConfig {
    /// Fleet-map key for this server; identity is the `(name, host)` pair
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_{}", self.name, self.host)
    }
}

/// Validated monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Servers to poll each refresh cycle
    pub servers: Vec<ServerConfig>,
    /// Path to the SSH private key used for all servers (`~` allowed)
    pub ssh_key_path: String,
    /// Seconds between refresh cycles (minimum 1)
    pub refresh_interval: u64,
    /// Listen port for the presentation layer (validated here, bound elsewhere)
    pub port: u16,
}

impl MonitorConfig {
    /// Loads and validates the configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] variant naming the first violated
    /// constraint: missing/unreadable file, invalid JSON, empty server
    /// list, empty server field, missing key file, interval below one
    /// second, or a zero port.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates all field constraints without touching the filesystem
    /// except for the SSH key existence check.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] variant for the first violated
    /// constraint, in declaration order of the fields.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }
        for (index, server) in self.servers.iter().enumerate() {
            if server.name.trim().is_empty() {
                return Err(ConfigError::EmptyServerField {
                    index,
                    field: "name",
                });
            }
            if server.host.trim().is_empty() {
                return Err(ConfigError::EmptyServerField {
                    index,
                    field: "host",
                });
            }
            if server.user.trim().is_empty() {
                return Err(ConfigError::EmptyServerField {
                    index,
                    field: "user",
                });
            }
        }
        let key_path = self.key_path();
        if !key_path.exists() {
            return Err(ConfigError::KeyNotFound(key_path));
        }
        if self.refresh_interval == 0 {
            return Err(ConfigError::InvalidRefreshInterval);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }

    /// SSH key path with a leading `~` expanded to the home directory
    #[must_use]
    pub fn key_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.ssh_key_path).into_owned())
    }

    /// Refresh interval as a [`Duration`]
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_config(key_path: &str) -> MonitorConfig {
        MonitorConfig {
            servers: vec![ServerConfig {
                name: "web-1".to_string(),
                host: "10.0.0.5".to_string(),
                user: "deploy".to_string(),
            }],
            ssh_key_path: key_path.to_string(),
            refresh_interval: 30,
            port: 8080,
        }
    }

    fn temp_key() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a real key").unwrap();
        file
    }

    #[test]
    fn test_valid_config_passes() {
        let key = temp_key();
        let config = sample_config(key.path().to_str().unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = MonitorConfig::load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = MonitorConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson(_)));
    }

    #[test]
    fn test_load_missing_field_names_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"ssh_key_path": "/tmp/key", "refresh_interval": 5, "port": 80}"#,
        )
        .unwrap();
        let err = MonitorConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("servers"));
    }

    #[test]
    fn test_load_valid_file() {
        let key = temp_key();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let json = format!(
            r#"{{
                "servers": [{{"name": "db", "host": "db.internal", "user": "ops"}}],
                "ssh_key_path": "{}",
                "refresh_interval": 10,
                "port": 9000
            }}"#,
            key.path().display()
        );
        std::fs::write(&path, json).unwrap();
        let config = MonitorConfig::load(&path).unwrap();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].key(), "db_db.internal");
        assert_eq!(config.refresh_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_empty_server_list() {
        let key = temp_key();
        let mut config = sample_config(key.path().to_str().unwrap());
        config.servers.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoServers)));
    }

    #[test]
    fn test_empty_server_field() {
        let key = temp_key();
        let mut config = sample_config(key.path().to_str().unwrap());
        config.servers[0].user = String::new();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EmptyServerField {
                index: 0,
                field: "user"
            }
        ));
        assert!(err.to_string().contains("user"));
    }

    #[test]
    fn test_missing_key_file() {
        let config = sample_config("/nonexistent/id_ed25519");
        assert!(matches!(config.validate(), Err(ConfigError::KeyNotFound(_))));
    }

    #[test]
    fn test_zero_refresh_interval() {
        let key = temp_key();
        let mut config = sample_config(key.path().to_str().unwrap());
        config.refresh_interval = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRefreshInterval)
        ));
    }

    #[test]
    fn test_zero_port() {
        let key = temp_key();
        let mut config = sample_config(key.path().to_str().unwrap());
        config.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPort)));
    }

    #[test]
    fn test_tilde_expansion() {
        let config = sample_config("~/.ssh/id_ed25519");
        let expanded = config.key_path();
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = sample_config("/tmp/key");
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: MonitorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
