//! Default keymap and layered loading
//!
//! The embedded keymap.yaml ships with the crate. It can be extended or
//! overridden by a project-local keymap.yaml and by the user's keymap.

use std::path::Path;

use crate::error::KeymapError;

use super::config::{load_keymap_file, parse_keymap_yaml, BindingTarget, MacroBinding};

/// Default keymap YAML embedded at compile time
const DEFAULT_KEYMAP_YAML: &str = include_str!("../../keymap.yaml");

/// Get the embedded default keymap YAML
pub fn get_default_keymap_yaml() -> &'static str {
    DEFAULT_KEYMAP_YAML
}

/// Load and merge keymaps: defaults + project + user
///
/// Loading order (each layer overrides the previous):
/// 1. Embedded default keymap (compiled into binary)
/// 2. keymap.yaml in current directory (project-local overrides)
/// 3. User config at ~/.config/chordmap/keymap.yaml
///
/// Entries with `action: unbound` remove the matching binding of an earlier layer.
pub fn load_default_keymap() -> Vec<MacroBinding> {
    let mut bindings = match parse_keymap_yaml(DEFAULT_KEYMAP_YAML) {
        Ok(b) => {
            tracing::info!("Loaded embedded default keymap ({} bindings)", b.len());
            b
        }
        Err(e) => {
            tracing::warn!("Failed to parse embedded keymap: {}", e);
            Vec::new()
        }
    };

    let local = Path::new("keymap.yaml");
    if local.exists() {
        match load_keymap_file(local) {
            Ok(local_bindings) => {
                tracing::info!(
                    "Merging project keymap.yaml ({} bindings)",
                    local_bindings.len()
                );
                bindings = merge_bindings(bindings, local_bindings);
            }
            Err(e) => {
                tracing::warn!("Failed to load project keymap.yaml: {}", e);
            }
        }
    }

    if let Some(user_path) = crate::config_paths::keymap_file() {
        if user_path.exists() {
            match load_keymap_file(&user_path) {
                Ok(user_bindings) => {
                    tracing::info!(
                        "Merging user keymap from {} ({} bindings)",
                        user_path.display(),
                        user_bindings.len()
                    );
                    bindings = merge_bindings(bindings, user_bindings);
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to load user keymap from {}: {}",
                        user_path.display(),
                        e
                    );
                }
            }
        }
    }

    bindings
}

/// Default layers plus an explicitly requested file, which must load
pub fn load_keymap_with(extra: &Path) -> Result<Vec<MacroBinding>, KeymapError> {
    let extra_bindings = load_keymap_file(extra)?;
    tracing::info!(
        "Merging keymap from {} ({} bindings)",
        extra.display(),
        extra_bindings.len()
    );
    Ok(merge_bindings(load_default_keymap(), extra_bindings))
}

/// Merge user bindings into base bindings
///
/// Bindings are identified by (mode, keys):
/// - Same mode and keys → user binding replaces base
/// - User target `Unbound` → matching base binding is removed
/// - Otherwise → user binding is added
pub fn merge_bindings(base: Vec<MacroBinding>, user: Vec<MacroBinding>) -> Vec<MacroBinding> {
    let mut result = base;

    for user_binding in user {
        if user_binding.target == BindingTarget::Unbound {
            result.retain(|b| !(b.mode == user_binding.mode && b.keys == user_binding.keys));
            continue;
        }

        let existing_idx = result
            .iter()
            .position(|b| b.mode == user_binding.mode && b.keys == user_binding.keys);

        if let Some(idx) = existing_idx {
            result[idx] = user_binding;
        } else {
            result.push(user_binding);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::Mode;

    fn binding(mode: Mode, keys: &str, target: BindingTarget) -> MacroBinding {
        MacroBinding {
            mode,
            keys: keys.to_string(),
            description: keys.to_string(),
            target,
            hidden: false,
        }
    }

    #[test]
    fn test_embedded_keymap_parses() {
        let bindings = parse_keymap_yaml(get_default_keymap_yaml()).unwrap();
        assert!(!bindings.is_empty());
    }

    #[test]
    fn test_merge_replaces_same_mode_and_keys() {
        let base = vec![
            binding(Mode::Command, "Y", BindingTarget::Expand("yy".into())),
            binding(Mode::Visual, "Y", BindingTarget::Expand("y".into())),
        ];
        let user = vec![binding(Mode::Command, "Y", BindingTarget::Expand("y$".into()))];
        let merged = merge_bindings(base, user);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].target, BindingTarget::Expand("y$".into()));
        assert_eq!(merged[1].target, BindingTarget::Expand("y".into()));
    }

    #[test]
    fn test_merge_unbound_removes() {
        let base = vec![binding(Mode::Command, "ZZ", BindingTarget::Action("quit".into()))];
        let user = vec![binding(Mode::Command, "ZZ", BindingTarget::Unbound)];
        assert!(merge_bindings(base, user).is_empty());
    }

    #[test]
    fn test_merge_adds_new() {
        let base = vec![binding(Mode::Command, "gg", BindingTarget::Action("top".into()))];
        let user = vec![binding(Mode::Insert, "jk", BindingTarget::Expand("<esc>".into()))];
        assert_eq!(merge_bindings(base, user).len(), 2);
    }
}
