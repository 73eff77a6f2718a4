//! Database configuration
//!
//! Where definitions are read from and written to, persisted as JSON.

use crate::error::DbResult;
use crate::units::Units;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File extension of user template files
pub const TEMPLATE_FILE_EXTENSION: &str = "template";

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DbConfig {
    /// Load the definitions compiled into this crate
    pub load_builtin: bool,
    /// Extra read-only directories scanned for `*.xml` and `*.template` files
    pub system_dirs: Vec<PathBuf>,
    /// User-writable template directory; `None` disables persistence
    pub user_dir: Option<PathBuf>,
    /// Units used for summary text
    pub display_units: Units,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            load_builtin: true,
            system_dirs: Vec::new(),
            user_dir: None,
            display_units: Units::Inch,
        }
    }
}

impl DbConfig {
    /// Configuration with a user template directory
    pub fn with_user_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_dir = Some(dir.into());
        self
    }

    /// Add a read-only definition directory
    pub fn with_system_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.system_dirs.push(dir.into());
        self
    }

    /// Enable or disable the built-in definitions
    pub fn with_builtin(mut self, load_builtin: bool) -> Self {
        self.load_builtin = load_builtin;
        self
    }

    /// Set the display units
    pub fn with_units(mut self, units: Units) -> Self {
        self.display_units = units;
        self
    }
}

/// Loads and saves a [`DbConfig`] file
pub struct ConfigManager {
    /// Path to the configuration file
    config_path: PathBuf,
    /// Current configuration (cached)
    current: DbConfig,
}

impl ConfigManager {
    /// Create a manager for `labels.json` inside the given directory
    pub fn new(app_data_dir: impl AsRef<Path>) -> Self {
        Self {
            config_path: app_data_dir.as_ref().join("labels.json"),
            current: DbConfig::default(),
        }
    }

    /// Path to the configuration file
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration, falling back to defaults when the file is
    /// missing or cannot be parsed
    pub fn load(&mut self) -> DbResult<&DbConfig> {
        if self.config_path.exists() {
            let content = std::fs::read_to_string(&self.config_path)?;
            match serde_json::from_str::<DbConfig>(&content) {
                Ok(config) => {
                    self.current = config;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse {}, using defaults: {}",
                        self.config_path.display(),
                        e
                    );
                    self.current = DbConfig::default();
                }
            }
        } else {
            self.current = DbConfig::default();
        }
        Ok(&self.current)
    }

    /// Save the current configuration
    pub fn save(&self) -> DbResult<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.current)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Current configuration
    pub fn get(&self) -> &DbConfig {
        &self.current
    }

    /// Replace the configuration and save it
    pub fn update(&mut self, config: DbConfig) -> DbResult<()> {
        self.current = config;
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::new(dir.path());

        assert_eq!(manager.load().unwrap(), &DbConfig::default());
        assert!(manager.get().load_builtin);
        assert_eq!(manager.get().display_units, Units::Inch);
    }

    #[test]
    fn test_update_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("nested"));

        let config = DbConfig::default()
            .with_user_dir(dir.path().join("templates"))
            .with_units(Units::Mm);
        manager.update(config.clone()).unwrap();

        let mut reloaded = ConfigManager::new(dir.path().join("nested"));
        assert_eq!(reloaded.load().unwrap(), &config);
    }

    #[test]
    fn test_unparsable_file_falls_back() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("labels.json"), "{ not json").unwrap();

        let mut manager = ConfigManager::new(dir.path());
        assert_eq!(manager.load().unwrap(), &DbConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("labels.json"), r#"{"display_units": "cm"}"#).unwrap();

        let mut manager = ConfigManager::new(dir.path());
        let config = manager.load().unwrap();
        assert_eq!(config.display_units, Units::Cm);
        assert!(config.load_builtin);
    }
}
