//! YAML configuration parsing for keymaps
//!
//! Parses keymap.yaml files into [`MacroBinding`]s:
//!
//! ```yaml
//! bindings:
//!   - keys: "<leader>w"
//!     description: save
//!     expands_to: ":w<enter>"
//!   - keys: ["<leader>ff", "<c-p>"]
//!     modes: [command, visual]
//!     action: find_files
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::KeymapError;

use super::mode::Mode;
use super::token::TokenTable;

/// Root structure of a keymap YAML file
#[derive(Debug, Deserialize)]
pub struct KeymapConfig {
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
}

/// One key string or several alternatives
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KeysConfig {
    One(String),
    Many(Vec<String>),
}

impl KeysConfig {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeysConfig::One(keys) => vec![keys],
            KeysConfig::Many(keys) => keys,
        }
    }
}

/// A single binding entry from YAML
#[derive(Debug, Deserialize)]
pub struct BindingConfig {
    pub keys: KeysConfig,
    #[serde(default = "default_modes")]
    pub modes: Vec<Mode>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expands_to: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

fn default_modes() -> Vec<Mode> {
    vec![Mode::Command]
}

/// What a keymap entry does when its keys complete
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingTarget {
    /// Feed this token string back in as if typed
    Expand(String),
    /// Run the named host action
    Action(String),
    /// Remove a binding defined by an earlier layer
    Unbound,
}

/// A keymap entry for one mode and one key string
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MacroBinding {
    pub mode: Mode,
    pub keys: String,
    pub description: String,
    pub target: BindingTarget,
    pub hidden: bool,
}

/// Load bindings from a YAML file
pub fn load_keymap_file(path: &Path) -> Result<Vec<MacroBinding>, KeymapError> {
    let content = std::fs::read_to_string(path).map_err(|source| KeymapError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_keymap_yaml(&content)
}

/// Parse bindings from a YAML string, validating keys against the default token table
pub fn parse_keymap_yaml(yaml: &str) -> Result<Vec<MacroBinding>, KeymapError> {
    parse_keymap_yaml_with(yaml, &TokenTable::new())
}

/// Parse bindings from a YAML string, validating keys against `tokens`
pub fn parse_keymap_yaml_with(
    yaml: &str,
    tokens: &TokenTable,
) -> Result<Vec<MacroBinding>, KeymapError> {
    let config: KeymapConfig = serde_yaml::from_str(yaml)?;

    let mut bindings = Vec::new();
    for entry in config.bindings {
        let target = parse_target(&entry)?;
        let modes = if entry.modes.is_empty() {
            default_modes()
        } else {
            entry.modes
        };

        for keys in entry.keys.into_vec() {
            tokens.parse_keys(&keys)?;
            let description = entry.description.clone().unwrap_or_else(|| match &target {
                BindingTarget::Expand(expansion) => expansion.clone(),
                BindingTarget::Action(name) => name.clone(),
                BindingTarget::Unbound => String::new(),
            });
            for &mode in &modes {
                bindings.push(MacroBinding {
                    mode,
                    keys: keys.clone(),
                    description: description.clone(),
                    target: target.clone(),
                    hidden: entry.hidden,
                });
            }
        }
    }

    Ok(bindings)
}

fn parse_target(entry: &BindingConfig) -> Result<BindingTarget, KeymapError> {
    let keys = match &entry.keys {
        KeysConfig::One(keys) => keys.clone(),
        KeysConfig::Many(keys) => keys.join(", "),
    };
    match (&entry.expands_to, &entry.action) {
        (Some(_), Some(_)) => Err(KeymapError::InvalidBinding {
            keys,
            reason: "expands_to and action are mutually exclusive".to_string(),
        }),
        (None, None) => Err(KeymapError::InvalidBinding {
            keys,
            reason: "one of expands_to or action is required".to_string(),
        }),
        (Some(expansion), None) if expansion.is_empty() => Err(KeymapError::InvalidBinding {
            keys,
            reason: "expands_to is empty".to_string(),
        }),
        (Some(expansion), None) => Ok(BindingTarget::Expand(expansion.clone())),
        (None, Some(action)) if action.eq_ignore_ascii_case("unbound") => {
            Ok(BindingTarget::Unbound)
        }
        (None, Some(action)) => Ok(BindingTarget::Action(action.clone())),
    }
}
