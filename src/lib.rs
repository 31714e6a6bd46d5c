//! chordmap - modal key-chord resolution for Vim-like editors
//!
//! This crate turns a stream of key presses into handler calls: per-mode
//! binding tries, leader-key debouncing, bounded macro expansion and
//! reversible handler overrides for transient overlays.

pub mod config;
pub mod config_paths;
pub mod engine;
pub mod error;
pub mod events;
pub mod keymap;
pub mod tracing;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::{ChordEngine, ResolutionHandle};
pub use error::{ConfigError, KeymapError, ResolveError};
pub use events::{EngineEvent, EventHub, EventSender};
pub use keymap::{Handler, Keystroke, Mode, Resolution};
