//! # Command-Line Interface Module
//!
//! Clap definitions for the `segue` harness. The engine itself is a library;
//! the binary exists to run requests against a catalog file and inspect what
//! the engine makes of it.
//!
//! ## Commands
//!
//! - `find`: Run one pathfinding request and print the JSON response
//! - `inspect`: Summarize a catalog after connectivity repair
//! - `config`: Print the effective engine configuration
//! - `completion`: Generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! segue find catalog.db3 --start a1 --end c9 --target-ms 3600000 --tolerance-ms 120000
//! segue find catalog.json --start a1 --via b4 --via b7 --harmonic --timeout-ms 500
//! segue inspect catalog.json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "segue")]
#[command(about = "Segue: duration-aware track transition pathfinding")]
#[command(version)]
pub struct Args {
    /// Engine configuration file (JSON)
    ///
    /// Defaults to `engine.json` in the platform config directory when that
    /// file exists, else built-in defaults.
    #[arg(long, global = true, env = "SEGUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find a path through a catalog
    ///
    /// Prints the response as JSON. The exit status is non-zero only when the
    /// catalog or configuration cannot be loaded; search failures are part of
    /// the response.
    Find {
        /// Catalog file (`.json`, anything else is read as SQLite)
        catalog: PathBuf,

        /// Track to start from
        #[arg(long)]
        start: String,

        /// Track the path must end on
        #[arg(long)]
        end: Option<String>,

        /// Waypoint track (repeatable)
        #[arg(long = "via")]
        waypoints: Vec<String>,

        /// Visit waypoints in the order given
        #[arg(long)]
        ordered: bool,

        /// Target total duration in milliseconds
        #[arg(long)]
        target_ms: u64,

        /// Allowed deviation from the target in milliseconds
        #[arg(long, default_value_t = 0)]
        tolerance_ms: u64,

        /// Prefer harmonically compatible keys
        #[arg(long)]
        harmonic: bool,

        /// Largest tempo jump allowed between consecutive tracks
        #[arg(long)]
        max_tempo_diff: Option<f64>,

        /// Stop searching after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Add the reverse of every catalog transition
        #[arg(long)]
        symmetric: bool,

        /// Pretty-print the response
        #[arg(long, short)]
        pretty: bool,
    },

    /// Summarize a catalog as the engine sees it
    Inspect {
        /// Catalog file (`.json`, anything else is read as SQLite)
        catalog: PathBuf,

        /// Add the reverse of every catalog transition
        #[arg(long)]
        symmetric: bool,
    },

    /// Print the effective engine configuration as JSON
    Config,

    /// Generate shell completion scripts
    ///
    /// ```bash
    /// segue completion bash > ~/.local/share/bash-completion/completions/segue
    /// segue completion zsh > ~/.config/zsh/completions/_segue
    /// segue completion fish > ~/.config/fish/completions/segue.fish
    /// ```
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_find_arguments() {
        let args = Args::parse_from([
            "segue", "find", "cat.json", "--start", "a", "--via", "b", "--via", "c", "--target-ms", "600000",
            "--timeout-ms", "250",
        ]);
        match args.command {
            Command::Find {
                start,
                waypoints,
                target_ms,
                tolerance_ms,
                timeout_ms,
                ..
            } => {
                assert_eq!(start, "a");
                assert_eq!(waypoints, vec!["b", "c"]);
                assert_eq!(target_ms, 600_000);
                assert_eq!(tolerance_ms, 0);
                assert_eq!(timeout_ms, Some(250));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
