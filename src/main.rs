//! # Segue - Track Transition Pathfinding
//!
//! Command-line harness around the `segue` library: loads a catalog, prepares
//! a snapshot and answers one request, printing the response as JSON.
//!
//! ## Usage
//!
//! ```bash
//! # Find a one-hour path from a1 to c9 through b4
//! segue find catalog.db3 --start a1 --end c9 --via b4 --target-ms 3600000 --tolerance-ms 120000
//!
//! # What does the engine make of this catalog?
//! segue inspect catalog.json
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use segue::catalog::Catalog;
use segue::cli::{self, Command};
use segue::completion;
use segue::config::EngineConfig;
use segue::engine::Engine;
use segue::request::SearchRequest;
use segue::search::SearchControl;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Main entry point.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=segue=debug segue find ...` - Attempt-by-attempt progress
/// - `RUST_LOG=segue::search=trace segue find ...` - Every scored transition
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        Command::Find {
            catalog,
            start,
            end,
            waypoints,
            ordered,
            target_ms,
            tolerance_ms,
            harmonic,
            max_tempo_diff,
            timeout_ms,
            symmetric,
            pretty,
        } => {
            let config = EngineConfig::resolve(args.config.as_deref())?;
            let engine = load_engine(config, &catalog, symmetric)?;

            let mut request = SearchRequest::new(start, target_ms, tolerance_ms)
                .via(waypoints)
                .ordered(ordered)
                .harmonic(harmonic);
            request.end_track_id = end;
            request.max_tempo_diff = max_tempo_diff;

            let control = match timeout_ms {
                Some(ms) => SearchControl::default().with_timeout(Duration::from_millis(ms)),
                None => SearchControl::default(),
            };
            info!("Searching from `{}' for {} ms", request.start_track_id, request.target_duration_ms);
            let response = engine.respond(&request, &control);
            print_json(&response, pretty)?;
        }
        Command::Inspect { catalog, symmetric } => {
            let config = EngineConfig::resolve(args.config.as_deref())?;
            let engine = load_engine(config, &catalog, symmetric)?;
            let snapshot = engine.snapshot();
            let stats = snapshot.graph.stats();
            let components = snapshot.graph.components();

            let summary = serde_json::json!({
                "version": snapshot.version,
                "tracks": snapshot.graph.len(),
                "real_transitions": stats.real_edges,
                "synthetic_transitions": stats.synthetic_edges,
                "dropped_tracks": snapshot.build.dropped_nodes,
                "dropped_transitions": snapshot.build.dropped_edges,
                "merged_transitions": snapshot.build.merged_edges,
                "repaired_tracks": snapshot.repair.eligible,
                "neighbor_strategy": snapshot.repair.strategy,
                "shortest_duration_ms": stats.shortest_duration_ms,
                "total_duration_ms": stats.total_duration_ms,
                "connected_components": components.count,
                "largest_component_size": components.largest,
            });
            print_json(&summary, true)?;
        }
        Command::Config => {
            let config = EngineConfig::resolve(args.config.as_deref())?;
            print_json(&config, true)?;
        }
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        }
    }

    Ok(())
}

fn load_engine(config: EngineConfig, path: &Path, symmetric: bool) -> Result<Engine> {
    let mut catalog = Catalog::load(path).with_context(|| format!("Failed to load catalog {}", path.display()))?;
    if symmetric {
        catalog = catalog.symmetrized();
    }
    debug!("Preparing snapshot for {} tracks", catalog.tracks.len());
    Ok(Engine::new(config, catalog.tracks, &catalog.transitions))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}
