//! Command-line argument parsing for the chordmap tool
//!
//! Supports:
//! - Listing the bindings of a mode
//! - Replaying a key sequence through the engine
//! - Dumping the token table
//! - Writing a default config file

use std::path::PathBuf;

use chordmap::Mode;
use clap::{Parser, Subcommand};

/// Inspect and exercise modal key-chord bindings
#[derive(Parser, Debug)]
#[command(name = "chordmap", version, about = "Inspect and exercise modal key-chord bindings")]
pub struct CliArgs {
    /// Extra keymap file merged over the default layers
    #[arg(long, global = true, value_name = "PATH")]
    pub keymap: Option<PathBuf>,

    /// Engine config file (default: ~/.config/chordmap/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// List the bindings of a mode
    List {
        #[arg(long, default_value = "command")]
        mode: Mode,
        /// Include hidden bindings
        #[arg(long)]
        all: bool,
    },
    /// Feed key strings through the engine and print what runs
    Replay {
        #[arg(long, default_value = "command")]
        mode: Mode,
        /// Override the leader timeout
        #[arg(long, value_name = "MS")]
        delay_ms: Option<u64>,
        /// Pause between keys
        #[arg(long, value_name = "MS", default_value_t = 0)]
        gap_ms: u64,
        /// Key strings such as `<leader>ff` or `gg`
        #[arg(value_name = "KEYS", required = true)]
        keys: Vec<String>,
    },
    /// Print every token and the key that produces it
    Tokens,
    /// Write the default engine config
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Default for CliCommand {
    fn default() -> Self {
        CliCommand::List {
            mode: Mode::Command,
            all: false,
        }
    }
}

impl CliArgs {
    /// The subcommand to run, `list` when none was given
    pub fn command(&self) -> CliCommand {
        self.command.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_lists_command_mode() {
        let args = CliArgs::try_parse_from(["chordmap"]).unwrap();
        assert_eq!(args.command(), CliCommand::default());
    }

    #[test]
    fn test_list_mode() {
        let args = CliArgs::try_parse_from(["chordmap", "list", "--mode", "insert", "--all"]).unwrap();
        assert_eq!(
            args.command(),
            CliCommand::List {
                mode: Mode::Insert,
                all: true
            }
        );
    }

    #[test]
    fn test_replay_args() {
        let args = CliArgs::try_parse_from([
            "chordmap",
            "--keymap",
            "my.yaml",
            "replay",
            "--delay-ms",
            "100",
            "<leader>ff",
            "gg",
        ])
        .unwrap();
        assert_eq!(args.keymap, Some(PathBuf::from("my.yaml")));
        match args.command() {
            CliCommand::Replay {
                mode,
                delay_ms,
                gap_ms,
                keys,
            } => {
                assert_eq!(mode, Mode::Command);
                assert_eq!(delay_ms, Some(100));
                assert_eq!(gap_ms, 0);
                assert_eq!(keys, vec!["<leader>ff", "gg"]);
            }
            other => panic!("Expected replay, got {:?}", other),
        }
    }

    #[test]
    fn test_replay_requires_keys() {
        assert!(CliArgs::try_parse_from(["chordmap", "replay"]).is_err());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(CliArgs::try_parse_from(["chordmap", "list", "--mode", "replace"]).is_err());
    }
}
