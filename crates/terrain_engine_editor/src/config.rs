// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor configuration stored as RON.

use crate::history::DEFAULT_MAX_HISTORY;
use serde::{Deserialize, Serialize};
use std::path::Path;
use terrain_engine_graph::kinds::generators::DEFAULT_RESOLUTION;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "terrain_engine.ron";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// Serialization failed
    #[error("RON serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo history bound
    pub max_history_size: usize,
    /// Resolution used for generators created from the CLI demo
    pub default_resolution: u32,
    /// Tracing filter directive, overriding the built-in default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    /// Execute the terminal node right after loading a graph
    pub execute_on_load: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY,
            default_resolution: DEFAULT_RESOLUTION,
            log_filter: None,
            execute_on_load: true,
        }
    }
}

impl EditorConfig {
    /// Load settings, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&content)?)
    }

    /// Save settings as pretty RON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.max_history_size, 100);
        assert_eq!(config.default_resolution, 512);
        assert!(config.execute_on_load);
        assert!(config.log_filter.is_none());
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let config: EditorConfig = ron::from_str("(max_history_size: 3)").unwrap();
        assert_eq!(config.max_history_size, 3);
        assert_eq!(config.default_resolution, 512);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("terrain_engine_config_{}.ron", std::process::id()));
        let config = EditorConfig {
            log_filter: Some("terrain_engine_graph=trace".to_string()),
            execute_on_load: false,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = EditorConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);

        let missing = dir.join("terrain_engine_config_missing.ron");
        assert_eq!(EditorConfig::load(&missing).unwrap(), EditorConfig::default());
    }
}
