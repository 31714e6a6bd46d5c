//! Editor modes, each with its own binding trie

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Modal context selecting which trie a key is resolved against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Normal mode: motions, operators, leader chords
    Command,
    Insert,
    Visual,
    /// Typing a `/` search pattern
    Search,
    /// The fuzzy finder overlay has focus
    FuzzyFind,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Command
    }
}

impl Mode {
    /// All modes, in declaration order
    pub const ALL: [Mode; 5] = [
        Mode::Command,
        Mode::Insert,
        Mode::Visual,
        Mode::Search,
        Mode::FuzzyFind,
    ];

    /// Name as written in keymap files
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Command => "command",
            Mode::Insert => "insert",
            Mode::Visual => "visual",
            Mode::Search => "search",
            Mode::FuzzyFind => "fuzzy_find",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "command" | "normal" => Ok(Mode::Command),
            "insert" => Ok(Mode::Insert),
            "visual" => Ok(Mode::Visual),
            "search" => Ok(Mode::Search),
            "fuzzy_find" | "fuzzy" => Ok(Mode::FuzzyFind),
            _ => Err(format!("unknown mode: {}", s)),
        }
    }
}
