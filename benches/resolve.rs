//! Benchmarks for the resolution hot path
//!
//! Run with: cargo bench resolve

use chordmap::keymap::{load_default_keymap, ActionTable, KeyCode, Modifiers};
use chordmap::{ChordEngine, EngineConfig, Handler, Keystroke, Mode};

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

fn main() {
    divan::main();
}

/// Engine with the default keymap and every action bound to a no-op
fn make_engine() -> ChordEngine {
    let engine = ChordEngine::new(EngineConfig::default());
    let bindings = load_default_keymap();
    let mut actions = ActionTable::new();
    for binding in &bindings {
        if let chordmap::keymap::BindingTarget::Action(name) = &binding.target {
            actions.insert(name.clone(), Handler::noop());
        }
    }
    engine.install_keymap(&bindings, &actions);
    engine
}

// ============================================================================
// Immediate chords
// ============================================================================

#[divan::bench]
fn single_key_binding(bencher: divan::Bencher) {
    let engine = make_engine();
    bencher.bench(|| divan::black_box(engine.resolve_token(Mode::Command, "G")));
}

#[divan::bench]
fn two_key_chord(bencher: divan::Bencher) {
    let engine = make_engine();
    bencher.bench(|| {
        engine.resolve_token(Mode::Command, "g");
        divan::black_box(engine.resolve_token(Mode::Command, "g"))
    });
}

#[divan::bench]
fn keystroke_to_binding(bencher: divan::Bencher) {
    let engine = make_engine();
    let shift_g = Keystroke::char_with_mods('g', Modifiers::SHIFT);
    bencher.bench(|| divan::black_box(engine.resolve(Mode::Command, shift_g)));
}

#[divan::bench]
fn no_match_reset(bencher: divan::Bencher) {
    let engine = make_engine();
    bencher.bench(|| divan::black_box(engine.resolve(Mode::Command, Keystroke::key(KeyCode::F(9)))));
}

// ============================================================================
// Macro expansion
// ============================================================================

#[divan::bench]
fn expand_half_page_macro(bencher: divan::Bencher) {
    let engine = make_engine();
    bencher.bench(|| divan::black_box(engine.resolve_token(Mode::Command, "<c-d>")));
}

#[divan::bench(args = [1, 5, 10])]
fn self_expansion_to_limit(bencher: divan::Bencher, depth: usize) {
    let engine = ChordEngine::new(EngineConfig {
        max_recursion_depth: depth,
        ..EngineConfig::default()
    });
    let _ = engine.register_binding(&[Mode::Insert], "x", "loop", Handler::expand("x"), false);
    bencher.bench(|| divan::black_box(engine.resolve_token(Mode::Insert, "x")));
}

// ============================================================================
// Overrides
// ============================================================================

#[divan::bench(args = [1, 10, 50])]
fn push_and_revert(bencher: divan::Bencher, layers: usize) {
    let engine = make_engine();
    bencher.bench(|| {
        for _ in 0..layers {
            engine.push_override(&[Mode::FuzzyFind], "<up>", "layer", Handler::noop());
        }
        divan::black_box(engine.revert_all())
    });
}
