//! Server configuration
//!
//! Re-exports the shared `ServerConfig` from idlereap-types and adds
//! persistence through confy (`~/.config/idlereap/config.toml` or the
//! platform equivalent) plus validation.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::ConfigError;

pub use idlereap_types::{ServerConfig, MAX_IDLE_TIMEOUT_SECS, TIMESLOT_SECS};

const APP_NAME: &str = "idlereap";
const CONFIG_NAME: &str = "config";

/// Extension trait for ServerConfig persistence
pub trait ServerConfigExt: Sized {
    /// Load from the default location, writing defaults if no file exists
    fn load() -> Result<Self, ConfigError>;
    fn load_from(path: &Path) -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn save_to(&self, path: &Path) -> Result<(), ConfigError>;
    fn config_path() -> Result<PathBuf, ConfigError>;
    fn validate(&self) -> Result<(), ConfigError>;
}

impl ServerConfigExt for ServerConfig {
    fn load() -> Result<Self, ConfigError> {
        let config: Self = confy::load(APP_NAME, CONFIG_NAME)?;
        config.validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = confy::load_path(path)?;
        config.validate()?;
        debug!(path = %path.display(), ?config, "configuration loaded");
        Ok(config)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self.clone()).map_err(ConfigError::Save)
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        confy::store_path(path, self.clone()).map_err(ConfigError::Save)
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = self.bind_addr.parse::<SocketAddr>() {
            return Err(ConfigError::Invalid {
                field: "bind_addr",
                reason: e.to_string(),
            });
        }
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "idle_timeout_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.idle_timeout_secs > MAX_IDLE_TIMEOUT_SECS {
            return Err(ConfigError::Invalid {
                field: "idle_timeout_secs",
                reason: format!("must be at most {MAX_IDLE_TIMEOUT_SECS} seconds"),
            });
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "max_connections",
                reason: "must allow at least one connection".to_string(),
            });
        }
        if self.read_buffer_size == 0 {
            return Err(ConfigError::Invalid {
                field: "read_buffer_size",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idlereap.toml");

        let config = ServerConfig::load_from(&path).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_saved_overrides_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idlereap.toml");

        let config = ServerConfig {
            idle_timeout_secs: 60,
            max_connections: 128,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = ServerConfig::load_from(&path).unwrap();
        assert_eq!(loaded.idle_timeout_secs, 60);
        assert_eq!(loaded.max_connections, 128);
    }

    #[test]
    fn test_zero_idle_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idlereap.toml");
        std::fs::write(&path, "idle_timeout_secs = 0\n").unwrap();

        let err = ServerConfig::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "idle_timeout_secs",
                ..
            }
        ));
    }

    #[test]
    fn test_oversized_idle_timeout_rejected() {
        let config = ServerConfig {
            idle_timeout_secs: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "idle_timeout_secs",
                ..
            })
        ));

        let longest = ServerConfig {
            idle_timeout_secs: MAX_IDLE_TIMEOUT_SECS,
            ..Default::default()
        };
        assert!(longest.validate().is_ok());
    }

    #[test]
    fn test_zero_max_connections_rejected() {
        let config = ServerConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "max_connections",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_read_buffer_rejected() {
        let config = ServerConfig {
            read_buffer_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "read_buffer_size",
                ..
            })
        ));
    }

    #[test]
    fn test_malformed_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idlereap.toml");
        std::fs::write(&path, "idle_timeout_secs = \"soon\"\n").unwrap();

        assert!(matches!(
            ServerConfig::load_from(&path),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_bad_bind_addr_rejected() {
        let config = ServerConfig {
            bind_addr: "not an address".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "bind_addr",
                ..
            })
        ));
    }
}
