//! Engine configuration persistence
//!
//! Stores tuning knobs in `~/.config/chordmap/config.yaml`

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Chord engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a leader chord waits for more keys before resolving
    pub leader_delay_ms: u64,
    /// Maximum nesting of macro expansions before the chain is cut
    pub max_recursion_depth: usize,
    /// Physical key that produces `<leader>`
    pub leader_key: char,
    /// Token that drops pending keys
    pub cancel_token: String,
    /// Token of the repeat-last-action binding
    pub repeat_token: String,
    /// Executed bindings kept for `history()`
    pub history_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            leader_delay_ms: 250,
            max_recursion_depth: 10,
            leader_key: ' ',
            cancel_token: "<esc>".to_string(),
            repeat_token: ".".to_string(),
            history_len: 16,
        }
    }
}

impl EngineConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = crate::config_paths::config_file().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save config to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_yaml::to_string(self).map_err(ConfigError::Serialize)?;

        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn leader_delay(&self) -> Duration {
        Duration::from_millis(self.leader_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.leader_delay(), Duration::from_millis(250));
        assert_eq!(config.max_recursion_depth, 10);
        assert_eq!(config.leader_key, ' ');
        assert_eq!(config.cancel_token, "<esc>");
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: EngineConfig = serde_yaml::from_str("leader_delay_ms: 40\n").unwrap();
        assert_eq!(config.leader_delay_ms, 40);
        assert_eq!(config.repeat_token, ".");
        assert_eq!(config.history_len, 16);
    }
}
