//! Session configuration persisted as TOML in the app directory.
//!
//! Every field has a serde default, so partial or older files keep loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::app_dirs;
use crate::ml::{Algorithm, TrainOptions};

/// Default filename used to store the configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Everything a [`crate::session::Session`] needs to start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub vocabulary: VocabularySettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub export: ExportSettings,
}

/// Retrain behavior: algorithm choice, split and hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Fraction of each class held out for scoring.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed mixed into the split hash; changing it reshuffles every partition.
    #[serde(default = "default_split_seed")]
    pub split_seed: String,
    /// Labeled examples required before a retrain is attempted. Never below 2.
    #[serde(default = "default_min_examples")]
    pub min_examples: usize,
    /// Majority/minority ratio above which a class imbalance warning is logged.
    #[serde(default = "default_imbalance_ratio")]
    pub imbalance_ratio: f32,
    #[serde(default)]
    pub options: TrainOptions,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            test_fraction: default_test_fraction(),
            split_seed: default_split_seed(),
            min_examples: default_min_examples(),
            imbalance_ratio: default_imbalance_ratio(),
            options: TrainOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularySettings {
    /// `None` keeps every registered word.
    #[serde(default)]
    pub max_words: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySettings {
    /// `None` keeps every score snapshot.
    #[serde(default)]
    pub max_snapshots: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory receiving `search_dataset.csv`, `model.bin` and `score_history.json`.
    /// Relative paths resolve against the working directory.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Rewrite the dataset CSV after every labeling round.
    #[serde(default = "default_true")]
    pub auto_export: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            auto_export: default_true(),
        }
    }
}

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load the app-directory config, returning defaults if the file is missing.
pub fn load_or_default() -> Result<SessionConfig, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(SessionConfig::default());
    }
    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<SessionConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist configuration to the app directory.
pub fn save(config: &SessionConfig) -> Result<(), ConfigError> {
    save_to_path(config, &config_path()?)
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &SessionConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Saved config to {}", path.display());
    Ok(())
}

fn default_test_fraction() -> f64 {
    0.25
}

fn default_split_seed() -> String {
    "searchlab-split-v1".to_string()
}

fn default_min_examples() -> usize {
    2
}

fn default_imbalance_ratio() -> f32 {
    4.0
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("searchlab_exports")
}

fn default_true() -> bool {
    true
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
