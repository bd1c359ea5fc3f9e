use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::registry::ReadPolicy;
use crate::storage::retry::RetryConfig;

pub const CONFIG_ENV: &str = "FILE_SHARE_CONFIG";
pub const DATA_DIR_ENV: &str = "FILE_SHARE_DATA_DIR";
pub const API_URL_ENV: &str = "FILE_SHARE_API_URL";
const LOCAL_CONFIG_FILE: &str = "file-share.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `shared-files.json`.
    pub data_dir: PathBuf,
    /// Where the server keeps uploaded file contents.
    pub uploads_dir: PathBuf,
    pub api_base_url: String,
    pub read_policy: ReadPolicy,
    pub log_filter: String,
    pub projection_cache_size: usize,
    pub request_timeout_secs: u64,
    pub retry: RetrySettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub address: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            uploads_dir: PathBuf::from("data/uploads"),
            api_base_url: "http://127.0.0.1:8000".to_string(),
            read_policy: ReadPolicy::Strict,
            log_filter: "info".to_string(),
            projection_cache_size: 32,
            request_timeout_secs: 30,
            retry: RetrySettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 250,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Config {
    /// Loads the first config file found, then applies environment overrides.
    ///
    /// Lookup order: `explicit`, `$FILE_SHARE_CONFIG`, `./file-share.toml`,
    /// `<config dir>/file-share/config.toml`. Without any file the defaults
    /// apply. An explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::locate(explicit)? {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("no config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = explicit {
            return if path.exists() {
                Ok(Some(path.to_owned()))
            } else {
                Err(ConfigError::Missing(path.to_owned()))
            };
        }

        if let Some(path) = env::var_os(CONFIG_ENV).map(PathBuf::from) {
            return if path.exists() {
                Ok(Some(path))
            } else {
                Err(ConfigError::Missing(path))
            };
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(Some(local));
        }

        Ok(dirs::config_dir()
            .map(|dir| dir.join("file-share").join("config.toml"))
            .filter(|path| path.exists()))
    }

    fn apply_env(&mut self) {
        if let Some(dir) = env::var_os(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(url) = env::var(API_URL_ENV) {
            self.api_base_url = url;
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_delay_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            data_dir = "/var/lib/file-share"
            read_policy = "lenient"

            [server]
            port = 9100
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/file-share"));
        assert_eq!(config.read_policy, ReadPolicy::Lenient);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.address, "127.0.0.1");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "data_dir = [").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse { .. })));
    }
}
