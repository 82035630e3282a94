//! Configuration management for treasuremap.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::export::{ExportFormat, DEFAULT_TASK_LABEL};
use crate::handoff::{CommandTarget, LOGBOOK_ACTION, LOGBOOK_EXTRA_KEY};
use crate::marker::DEFAULT_TITLE;
use crate::repository::{CorruptionPolicy, RepositoryOptions, DEFAULT_SLOT_KEY};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "treasuremap";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "treasure_prefs.db";

/// Default receiver program for logbook hand-off.
const DEFAULT_RECEIVER_PROGRAM: &str = "logbook";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TREASUREMAP_`, sections split by `__`)
/// 2. TOML config file at `~/.config/treasuremap/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Marker defaults and load behavior.
    pub markers: MarkersConfig,
    /// Export payload configuration.
    pub export: ExportConfig,
    /// Logbook receiver configuration.
    pub receiver: ReceiverConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/treasuremap/treasure_prefs.db`
    pub database_path: Option<PathBuf>,
    /// Slot key the marker list is stored under.
    pub slot_key: String,
}

/// Marker-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkersConfig {
    /// Title given to new markers.
    pub default_title: String,
    /// What to do with unreadable stored markers.
    pub corruption_policy: CorruptionPolicy,
}

/// Export-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Payload format sent to the logbook.
    pub format: ExportFormat,
    /// Task label used in structured payloads.
    pub task_label: String,
}

/// Logbook receiver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Program launched to receive exports.
    pub program: String,
    /// Action name passed to the receiver.
    pub action: String,
    /// Payload key passed to the receiver.
    pub extra_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            slot_key: DEFAULT_SLOT_KEY.to_string(),
        }
    }
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_TITLE.to_string(),
            corruption_policy: CorruptionPolicy::Reset,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Plain,
            task_label: DEFAULT_TASK_LABEL.to_string(),
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_RECEIVER_PROGRAM.to_string(),
            action: LOGBOOK_ACTION.to_string(),
            extra_key: LOGBOOK_EXTRA_KEY.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("TREASUREMAP_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("storage.slot_key", &self.storage.slot_key),
            ("export.task_label", &self.export.task_label),
            ("receiver.program", &self.receiver.program),
            ("receiver.action", &self.receiver.action),
            ("receiver.extra_key", &self.receiver.extra_key),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("{name} cannot be empty"),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Options for opening the marker repository.
    #[must_use]
    pub fn repository_options(&self) -> RepositoryOptions {
        RepositoryOptions {
            slot_key: self.storage.slot_key.clone(),
            default_title: self.markers.default_title.clone(),
            corruption_policy: self.markers.corruption_policy,
        }
    }

    /// The configured logbook receiver.
    #[must_use]
    pub fn export_target(&self) -> CommandTarget {
        CommandTarget::with_action(
            self.receiver.program.as_str(),
            self.receiver.action.as_str(),
            self.receiver.extra_key.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.storage.slot_key, "markers");
        assert_eq!(config.markers.default_title, "Flag Post");
        assert_eq!(config.markers.corruption_policy, CorruptionPolicy::Reset);
        assert_eq!(config.export.format, ExportFormat::Plain);
        assert_eq!(config.export.task_label, "Schatzkarte");
        assert_eq!(config.receiver.action, "ch.apprun.intent.LOG");
        assert_eq!(config.receiver.extra_key, "ch.apprun.logmessage");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_slot_key() {
        let mut config = Config::default();
        config.storage.slot_key = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("storage.slot_key"));
    }

    #[test]
    fn test_validate_empty_receiver_program() {
        let mut config = Config::default();
        config.receiver.program = String::new();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("receiver.program"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("treasure_prefs.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_repository_options_follow_config() {
        let mut config = Config::default();
        config.storage.slot_key = "flags".to_string();
        config.markers.corruption_policy = CorruptionPolicy::Fail;

        let options = config.repository_options();
        assert_eq!(options.slot_key, "flags");
        assert_eq!(options.default_title, "Flag Post");
        assert_eq!(options.corruption_policy, CorruptionPolicy::Fail);
    }

    #[test]
    fn test_export_target_follows_config() {
        let mut config = Config::default();
        config.receiver.program = "/opt/logbook/bin/receive".to_string();

        let target = config.export_target();
        assert_eq!(target.program(), "/opt/logbook/bin/receive");
        assert_eq!(target.action(), LOGBOOK_ACTION);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("treasuremap"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "treasuremap_config_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
[markers]
default_title = "Treasure"
corruption_policy = "skip"

[export]
format = "structured"
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.markers.default_title, "Treasure");
        assert_eq!(config.markers.corruption_policy, CorruptionPolicy::Skip);
        assert_eq!(config.export.format, ExportFormat::Structured);
        assert_eq!(config.export.task_label, "Schatzkarte");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let path = std::env::temp_dir().join(format!(
            "treasuremap_config_invalid_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[export]\ntask_label = \"\"\n").unwrap();

        let result = Config::load_from(Some(path.clone()));
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_config_json_round_trip() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("corruption_policy"));

        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
