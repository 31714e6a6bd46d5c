//! Error types shared across the crate

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when registering bindings or parsing keymaps
#[derive(Debug, Error)]
pub enum KeymapError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Empty key sequence")]
    EmptySequence,
    #[error("Invalid binding for {keys:?}: {reason}")]
    InvalidBinding { keys: String, reason: String },
}

/// Errors from loading or saving the engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config directory available")]
    NoConfigDir,
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

/// Failures surfaced through a resolution handle
///
/// A failing handler only fails its own resolution; the engine keeps
/// accepting keys afterwards.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("handler for {token:?} failed: {source}")]
    Handler {
        token: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("handler for {token:?} panicked: {message}")]
    HandlerPanicked { token: String, message: String },
}

impl ResolveError {
    /// Token of the binding whose handler failed
    pub fn token(&self) -> &str {
        match self {
            ResolveError::Handler { token, .. } | ResolveError::HandlerPanicked { token, .. } => {
                token
            }
        }
    }
}
