//! Modal key-chord bindings
//!
//! This module provides the data side of the chord engine:
//! - Canonical tokens for keystrokes (`<c-w>`, `<leader>`, `gg`)
//! - One binding trie per editor mode
//! - Per-binding handler stacks that overlays can temporarily override
//! - Bounded macro expansion of handler output
//! - YAML keymap files layered over embedded defaults
//!
//! # Architecture
//!
//! ```text
//! Keystroke → TokenTable → "<leader>ff" → Keymaps[mode] (Trie) → HandlerStack → Handler
//!                                                   ↑                               │
//!                                                   └──── synthetic tokens ←────────┘
//! ```
//!
//! # Loading Keymaps
//!
//! ```ignore
//! let bindings = load_default_keymap();
//! engine.install_keymap(&bindings, &actions);
//! ```

mod actions;
mod chord;
mod config;
mod defaults;
mod handler;
mod mode;
mod overrides;
mod registry;
mod resolver;
mod token;
mod trie;
mod types;

pub use actions::ActionTable;
pub use chord::{ChordSnapshot, PendingSequence};
pub use config::{
    load_keymap_file, parse_keymap_yaml, parse_keymap_yaml_with, BindingConfig, BindingTarget,
    KeymapConfig, KeysConfig, MacroBinding,
};
pub use defaults::{get_default_keymap_yaml, load_default_keymap, load_keymap_with, merge_bindings};
pub use handler::{Handler, HandlerEntry, HandlerResult, HandlerStack};
pub use mode::Mode;
pub use overrides::{OverrideManager, OverrideScope};
pub use registry::Keymaps;
pub use resolver::{Resolution, Resolver};
pub use token::{split_tokens, TokenTable, LEADER};
pub use trie::{BindingInfo, Trie, TrieNode};
pub use types::{KeyCode, Keystroke, Modifiers};

pub use crate::error::KeymapError;

#[cfg(test)]
mod tests;
