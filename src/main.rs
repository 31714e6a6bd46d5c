use std::collections::BTreeSet;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use chordmap::config_paths;
use chordmap::keymap::{
    load_default_keymap, load_keymap_with, split_tokens, ActionTable, BindingTarget, MacroBinding,
};
use chordmap::{ChordEngine, EngineConfig, EngineEvent, EventHub, Handler, Mode, Resolution};

mod cli;

use cli::{CliArgs, CliCommand};

fn main() -> Result<()> {
    chordmap::tracing::init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::load(),
    };

    match args.command() {
        CliCommand::List { mode, all } => {
            let engine = build_engine(&args, config, None)?;
            list(&engine, mode, all);
        }
        CliCommand::Replay {
            mode,
            delay_ms,
            gap_ms,
            keys,
        } => {
            let mut config = config;
            if let Some(delay_ms) = delay_ms {
                config.leader_delay_ms = delay_ms;
            }
            let hub = EventHub::new();
            hub.subscribe(print_event);
            let engine = build_engine(&args, config, Some(&hub))?;
            replay(&engine, mode, &keys, Duration::from_millis(gap_ms));
            drop(engine);
            hub.shutdown();
        }
        CliCommand::Tokens => {
            let engine = ChordEngine::new(config);
            for (token, keystroke) in engine.token_table().entries() {
                println!("{:<16} {}", token, keystroke);
            }
        }
        CliCommand::InitConfig { force } => {
            let path = match args.config.clone() {
                Some(path) => path,
                None => config_paths::config_file().context("no config directory available")?,
            };
            init_config(path, force)?;
        }
    }

    Ok(())
}

fn build_engine(args: &CliArgs, config: EngineConfig, hub: Option<&EventHub>) -> Result<ChordEngine> {
    let bindings = match &args.keymap {
        Some(path) => load_keymap_with(path)
            .with_context(|| format!("loading keymap {}", path.display()))?,
        None => load_default_keymap(),
    };

    let engine = match hub {
        Some(hub) => ChordEngine::with_events(config, hub.sender()),
        None => ChordEngine::new(config),
    };
    engine.install_keymap(&bindings, &printing_actions(&bindings));
    Ok(engine)
}

/// Every action named in `bindings`, bound to a handler that prints its name
fn printing_actions(bindings: &[MacroBinding]) -> ActionTable {
    let names: BTreeSet<&str> = bindings
        .iter()
        .filter_map(|b| match &b.target {
            BindingTarget::Action(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();

    names.into_iter().fold(ActionTable::new(), |table, name| {
        let label = name.to_string();
        table.with(
            name,
            Handler::new(move |input| {
                println!("  action {} ({})", label, input);
                Ok(None)
            }),
        )
    })
}

fn list(engine: &ChordEngine, mode: Mode, all: bool) {
    let bindings = if all {
        engine.all_bindings(mode)
    } else {
        engine.bindings(mode)
    };
    if bindings.is_empty() {
        println!("No bindings in {} mode", mode);
        return;
    }
    for binding in bindings {
        let hidden = if binding.hidden { " (hidden)" } else { "" };
        println!("{:<20} {}{}", binding.token, binding.description, hidden);
    }
}

fn replay(engine: &ChordEngine, mode: Mode, keys: &[String], gap: Duration) {
    let mut handles = Vec::new();
    for key_string in keys {
        for token in split_tokens(key_string) {
            handles.push((token.clone(), engine.resolve_token(mode, &token)));
            if !gap.is_zero() {
                thread::sleep(gap);
            }
        }
    }

    for (token, handle) in handles {
        match handle.wait() {
            Ok(Resolution::Matched(node)) => {
                let matched = node.canonical_token().unwrap_or_default();
                println!("{:<12} matched {}", token, matched);
            }
            Ok(Resolution::Superseded) => println!("{:<12} superseded by a later key", token),
            Ok(other) => println!("{:<12} {:?}", token, other),
            Err(e) => println!("{:<12} error: {}", token, e),
        }
    }
}

fn print_event(event: &EngineEvent) {
    match event {
        EngineEvent::KeysPending { keys, .. } => println!("  pending {}", keys),
        EngineEvent::NoMatch { keys, .. } => println!("  no binding for {}", keys),
        EngineEvent::RecursionLimit { token, depth, .. } => {
            println!("  {} stopped at expansion depth {}", token, depth)
        }
        _ => tracing::debug!(?event, "engine event"),
    }
}

fn init_config(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    EngineConfig::default().save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
