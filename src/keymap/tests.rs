//! Integration tests for the keymap system

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::config::EngineConfig;

/// Embedded default keymap YAML for testing
const DEFAULT_KEYMAP_YAML: &str = include_str!("../../keymap.yaml");

#[test]
fn test_embedded_yaml_parses() {
    let bindings = parse_keymap_yaml(DEFAULT_KEYMAP_YAML)
        .expect("Embedded keymap.yaml should parse successfully");

    assert!(!bindings.is_empty(), "Should have bindings");

    let has = |keys: &str, mode: Mode| bindings.iter().any(|b| b.keys == keys && b.mode == mode);
    assert!(has("<leader>ff", Mode::Command), "Should have find files");
    assert!(has("gg", Mode::Command), "Should have gg");
    assert!(has("jj", Mode::Insert), "Should have jj escape");
    assert!(has("<enter>", Mode::FuzzyFind), "Should have finder open");
}

#[test]
fn test_embedded_expansions_are_valid_tokens() {
    let table = TokenTable::new();
    for binding in parse_keymap_yaml(DEFAULT_KEYMAP_YAML).unwrap() {
        if let BindingTarget::Expand(expansion) = &binding.target {
            assert!(
                table.parse_keys(expansion).is_ok(),
                "expansion {:?} of {} has unknown tokens",
                expansion,
                binding.keys
            );
        }
    }
}

#[test]
fn test_load_default_keymap() {
    let bindings = load_default_keymap();
    assert!(!bindings.is_empty(), "Default keymap should not be empty");
}

#[test]
fn test_no_duplicate_mode_keys_in_defaults() {
    let bindings = parse_keymap_yaml(DEFAULT_KEYMAP_YAML).unwrap();
    let merged = merge_bindings(Vec::new(), bindings.clone());
    assert_eq!(merged.len(), bindings.len(), "Default keymap has duplicate keys");
}

#[test]
fn test_keystrokes_resolve_through_trie() {
    let table = TokenTable::new();
    let keymaps = Keymaps::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let handler = Handler::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    });
    keymaps
        .register(&[Mode::Command], "<c-w>k", "window up", &handler, false)
        .unwrap();

    let resolver = Resolver::new(Arc::new(keymaps), &EngineConfig::default(), None);
    let mut pending = PendingSequence::new();
    let strokes = [
        Keystroke::char_with_mods('w', Modifiers::CTRL),
        Keystroke::char('k'),
    ];

    let mut last = None;
    for stroke in strokes {
        pending.push(Mode::Command, table.token(&stroke).unwrap());
        last = Some(resolver.resolve(Mode::Command, pending.joined()).unwrap());
    }

    assert!(last.unwrap().is_matched());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shifted_letter_matches_uppercase_binding() {
    let table = TokenTable::new();
    let keymaps = Keymaps::new();
    keymaps
        .register(&[Mode::Command], "G", "bottom", &Handler::noop(), false)
        .unwrap();

    let shifted = Keystroke::char_with_mods('g', Modifiers::SHIFT);
    let token = table.token(&shifted).unwrap();
    assert!(keymaps
        .find(Mode::Command, token)
        .is_some_and(|n| n.is_complete_binding()));
}

#[test]
fn test_override_then_expand_uses_override() {
    let keymaps = Arc::new(Keymaps::new());
    let base_hits = Arc::new(AtomicUsize::new(0));
    let over_hits = Arc::new(AtomicUsize::new(0));

    let base_counter = Arc::clone(&base_hits);
    keymaps
        .register(
            &[Mode::Insert],
            "<enter>",
            "newline",
            &Handler::new(move |_| {
                base_counter.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }),
            false,
        )
        .unwrap();
    keymaps
        .register(&[Mode::Insert], "<c-m>", "enter alias", &Handler::expand("<enter>"), false)
        .unwrap();

    let overrides = OverrideManager::new();
    let over_counter = Arc::clone(&over_hits);
    overrides.push(
        &keymaps,
        &[Mode::Insert],
        "<enter>",
        "accept completion",
        &Handler::new(move |_| {
            over_counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }),
    );

    let resolver = Resolver::new(Arc::clone(&keymaps), &EngineConfig::default(), None);
    resolver.resolve(Mode::Insert, "<c-m>").unwrap();
    assert_eq!(over_hits.load(Ordering::SeqCst), 1);
    assert_eq!(base_hits.load(Ordering::SeqCst), 0);

    overrides.revert_all();
    resolver.resolve(Mode::Insert, "<c-m>").unwrap();
    assert_eq!(base_hits.load(Ordering::SeqCst), 1);
}
