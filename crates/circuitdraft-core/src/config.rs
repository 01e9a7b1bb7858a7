//! Editor configuration.

use crate::document::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::undo::HistoryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for an editing session. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undo steps kept (`None` = unlimited).
    pub history_limit: Option<usize>,
    /// Width of new documents.
    pub default_width: f64,
    /// Height of new documents.
    pub default_height: f64,
    /// Suffix shown after the document name in the title.
    pub application_name: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: None,
            default_width: DEFAULT_WIDTH,
            default_height: DEFAULT_HEIGHT,
            application_name: "Circuit Diagram".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Read a configuration file, falling back to defaults if it is missing or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            log::warn!("Using default editor configuration: {}", e);
            Self::default()
        })
    }

    /// Undo history limits derived from this configuration.
    pub fn history(&self) -> HistoryConfig {
        match self.history_limit {
            Some(limit) => HistoryConfig::with_max_depth(limit),
            None => HistoryConfig::default(),
        }
    }
}
