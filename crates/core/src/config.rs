//! Application configuration
//!
//! Loaded from `lamesa.toml` in the config directory. Every field has a
//! default, so a missing file or a partial file is fine.
//!
//! ```toml
//! [attendance]
//! full_shift_threshold_secs = 28800
//! history_limit = 20
//!
//! [storage]
//! database = "lamesa.db"
//! busy_timeout_ms = 5000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shift::{ShiftClassifier, DEFAULT_FULL_SHIFT_SECS};

pub const CONFIG_FILE_NAME: &str = "lamesa.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Could not determine {0} directory")]
    NoProjectDir(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    /// Elapsed seconds at or above which a shift counts as complete
    pub full_shift_threshold_secs: u64,
    /// Rows shown by the history view
    pub history_limit: u32,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            full_shift_threshold_secs: DEFAULT_FULL_SHIFT_SECS,
            history_limit: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Ledger file; relative paths resolve against the data directory
    pub database: PathBuf,
    /// How long a connection waits on a locked ledger before giving up
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("lamesa.db"),
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub attendance: AttendanceConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from a TOML file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attendance.full_shift_threshold_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "attendance.full_shift_threshold_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.attendance.history_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "attendance.history_limit",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.storage.database.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "storage.database",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn classifier(&self) -> ShiftClassifier {
        ShiftClassifier::new(self.attendance.full_shift_threshold_secs)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.busy_timeout_ms)
    }

    /// Ledger path, resolved against `data_dir` when relative
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        if self.storage.database.is_absolute() {
            self.storage.database.clone()
        } else {
            data_dir.join(&self.storage.database)
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("ph", "lamesa", "lamesa")
}

/// Platform data directory for the ledger
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoProjectDir("data"))
}

/// Platform config directory holding `lamesa.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    project_dirs()
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoProjectDir("config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.attendance.full_shift_threshold_secs, 8 * 3600);
        assert_eq!(config.attendance.history_limit, 20);
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
[attendance]
full_shift_threshold_secs = 10
"#,
        )
        .unwrap();
        assert_eq!(config.attendance.full_shift_threshold_secs, 10);
        assert_eq!(config.attendance.history_limit, 20);
        assert_eq!(config.storage, StorageConfig::default());
        assert!(config.classifier().is_complete(10));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let err = AppConfig::from_toml("[attendance]\nfull_shift_threshold_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_bad_toml_rejected() {
        let err = AppConfig::from_toml("[attendance\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::load_or_default(&temp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[storage]\ndatabase = \"ledger.sqlite\"\nbusy_timeout_ms = 250\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.database_path(temp.path()),
            temp.path().join("ledger.sqlite")
        );
    }
}
