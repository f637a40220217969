//! Configuration management for wardrobe.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults; every section tolerates partial files via `#[serde(default)]`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for wardrobe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Input discovery and batch settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Image preparation and LLM extraction settings
    pub extraction: ExtractionConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Classifier training settings
    pub training: TrainingConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.wardrobe.wardrobe/config.toml
    /// - Linux: ~/.config/wardrobe/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\wardrobe\config\config.toml
    ///
    /// Falls back to ~/.wardrobe/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "wardrobe", "wardrobe")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".wardrobe").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    ///
    /// Checkpoints and exported classifiers land here unless the CLI
    /// overrides the paths.
    pub fn model_dir(&self) -> PathBuf {
        let path_str = self.general.model_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.extraction.image_size, 256);
        assert_eq!(config.extraction.jpeg_quality, 85);
        assert_eq!(config.training.hidden_units, 4);
        assert_eq!(config.training.max_epochs, 1000);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[extraction]"));
        assert!(toml.contains("[training]"));
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[training]\nmax_epochs = 200\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.training.max_epochs, 200);
        // Untouched sections keep their defaults
        assert_eq!(config.training.hidden_units, 4);
        assert_eq!(config.extraction.image_size, 256);
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not valid toml [[").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_model_dir_expands_tilde() {
        let config = Config::default();
        let dir = config.model_dir();
        assert!(!dir.to_string_lossy().starts_with('~'));
    }
}
