//! # Integration Tests for Segue
//!
//! End-to-end behaviour of the engine: validation before search, the
//! relaxation ladder, repair on realistic catalogs, and the CLI harness.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use segue::config::{EngineConfig, RepairConfig, SearchConfig};
use segue::engine::Engine;
use segue::error::{ErrorKind, PathfinderError, ValidationIssue};
use segue::graph::TrackGraph;
use segue::request::SearchRequest;
use segue::search::{AttemptPhase, CancelToken, Pathfinder, SearchControl};
use segue::track::{Edge, KeyMode, Provenance, TrackNode};
use std::collections::{HashMap, VecDeque};

/// A catalog with varied durations, tempos and keys and a few real
/// transitions per track.
fn sample_catalog(len: usize, seed: u64) -> (Vec<TrackNode>, Vec<Edge>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let nodes = (0..len)
        .map(|i| {
            let mode = if rng.gen_bool(0.5) { KeyMode::Major } else { KeyMode::Minor };
            TrackNode::new(format!("t{i}"), 180_000 + 30_000 * rng.gen_range(0..9))
                .with_tempo(rng.gen_range(110.0..140.0))
                .with_key(rng.gen_range(1..=12), mode)
        })
        .collect();
    let edges = (0..len)
        .flat_map(|i| {
            [1, 3, 7]
                .into_iter()
                .map(move |step| (i, (i + step) % len))
        })
        .map(|(from, to)| Edge::real(format!("t{from}"), format!("t{to}"), rng.gen_range(1.0..20.0)))
        .collect();
    (nodes, edges)
}

fn chain(len: usize, duration_ms: u64) -> (Vec<TrackNode>, Vec<Edge>) {
    let nodes = (1..=len).map(|i| TrackNode::new(format!("n{i}"), duration_ms)).collect();
    let edges = (1..len)
        .map(|i| Edge::real(format!("n{i}"), format!("n{}", i + 1), 1.0))
        .collect();
    (nodes, edges)
}

/// Engine config with connectivity repair switched off.
fn unrepaired() -> EngineConfig {
    EngineConfig {
        repair: RepairConfig {
            min_real_degree: 0,
            ..RepairConfig::default()
        },
        search: SearchConfig::default(),
    }
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_single_track_request() {
        let engine = Engine::new(unrepaired(), vec![TrackNode::new("solo", 300_000)], &[]);

        let fits = engine
            .find(&SearchRequest::new("solo", 290_000, 15_000).ending_at("solo"))
            .expect("one-track path");
        assert_eq!(fits.track_ids, vec!["solo"]);
        assert_eq!(fits.total_duration_ms, 300_000);

        let err = engine
            .find(&SearchRequest::new("solo", 600_000, 15_000).ending_at("solo"))
            .unwrap_err();
        assert!(err.has_issue(&ValidationIssue::InfeasibleDuration));
    }

    #[test]
    fn test_successful_paths_are_consistent() {
        let (nodes, edges) = sample_catalog(40, 7);
        let durations: HashMap<String, u64> = nodes.iter().map(|n| (n.id.clone(), n.duration_ms)).collect();
        let engine = Engine::new(EngineConfig::default(), nodes, &edges);

        let mut successes = 0;
        for target in [900_000, 1_200_000, 1_800_000, 2_400_000, 3_000_000, 3_600_000] {
            for waypoints in [vec![], vec!["t5"], vec!["t12", "t20"]] {
                let request = SearchRequest::new("t0", target, 60_000).via(waypoints.clone());
                let Ok(result) = engine.find(&request) else { continue };
                if !result.is_verified() {
                    continue;
                }
                successes += 1;

                let sum: u64 = result.track_ids.iter().map(|id| durations[id]).sum();
                assert_eq!(result.total_duration_ms, sum);
                assert!(result.total_duration_ms.abs_diff(target) <= result.tolerance_ms);

                for waypoint in &waypoints {
                    let visited = result.track_ids.iter().any(|id| id == waypoint);
                    let skipped = result.waypoints_skipped.iter().any(|id| id == waypoint);
                    assert!(visited || skipped, "waypoint {waypoint} neither visited nor skipped");
                    if skipped {
                        assert_eq!(result.phase, AttemptPhase::WaypointFree);
                    }
                }

                let mut seen = std::collections::HashSet::new();
                assert!(result.track_ids.iter().all(|id| seen.insert(id)), "repeated track");
            }
        }
        assert!(successes > 0);
    }

    #[test]
    fn test_identical_requests_agree() {
        let (nodes, edges) = sample_catalog(40, 11);
        let engine = Engine::new(EngineConfig::default(), nodes, &edges);
        let request = SearchRequest::new("t3", 1_500_000, 45_000).via(["t9"]).harmonic(true);

        let first = engine.find(&request);
        let second = engine.find(&request);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                assert_eq!(a.total_duration_ms, b.total_duration_ms);
                assert_eq!(a.waypoints_visited, b.waypoints_visited);
                assert_eq!(a.completion, b.completion);
            }
            (Err(a), Err(b)) => assert_eq!(a.kind(), b.kind()),
            (a, b) => panic!("outcomes differ: {a:?} vs {b:?}"),
        }
    }

    #[test]
    fn test_disjoint_components_rejected_without_search() {
        let nodes = ["a1", "a2", "b1", "b2"]
            .into_iter()
            .map(|id| TrackNode::new(id, 200_000))
            .collect();
        let edges = vec![Edge::real("a1", "a2", 1.0), Edge::real("b1", "b2", 1.0)];
        let engine = Engine::new(unrepaired(), nodes, &edges);

        let err = engine
            .find(&SearchRequest::new("a1", 400_000, 0).ending_at("b2"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreachableEnd);
        let diagnostics = err.diagnostics().unwrap();
        assert_eq!(diagnostics.iterations_used, 0);
        assert!(diagnostics.attempts.is_empty());
        assert_eq!(diagnostics.connected_components, 2);
        assert_eq!(diagnostics.largest_component_size, 2);
        assert!(!diagnostics.end_reachable);
    }

    #[test]
    fn test_chain_waypoint_beyond_hop_budget() {
        let (nodes, edges) = chain(50, 300_000);
        let (graph, _) = TrackGraph::build(nodes, &edges);
        let config = SearchConfig::default();
        let request = SearchRequest::new("n1", 1_500_000, 300_000).via(["n25"]);

        let err = Pathfinder::new(&graph, &config).find(&request).unwrap_err();
        assert!(err.has_issue(&ValidationIssue::UnreachableWaypoint("n25".to_string())));

        // Independent breadth-first search over the raw edge list
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &edges {
            adjacency.entry(&edge.from_id).or_default().push(&edge.to_id);
        }
        let mut distance: HashMap<&str, u32> = HashMap::from([("n1", 0)]);
        let mut queue = VecDeque::from(["n1"]);
        while let Some(current) = queue.pop_front() {
            let next = distance[current] + 1;
            for &neighbor in adjacency.get(current).into_iter().flatten() {
                if !distance.contains_key(neighbor) {
                    distance.insert(neighbor, next);
                    queue.push_back(neighbor);
                }
            }
        }

        let diagnostics = err.diagnostics().unwrap();
        let reported = &diagnostics.waypoints_reachable[0];
        assert_eq!(reported.id, "n25");
        assert_eq!(reported.hops, Some(distance["n25"]));
        assert_eq!(distance["n25"], 24);
        assert_eq!(reported.reachable, distance["n25"] <= diagnostics.max_hops);
        assert!(!reported.reachable);
        assert_eq!(diagnostics.iterations_used, 0);
    }

    #[test]
    fn test_ladder_falls_back_to_waypoint_free() {
        let nodes = vec![
            TrackNode::new("s", 100_000),
            TrackNode::new("w", 300_000),
            TrackNode::new("x", 200_000),
        ];
        let edges = vec![Edge::real("s", "w", 1.0), Edge::real("s", "x", 1.0)];
        let engine = Engine::new(unrepaired(), nodes, &edges);
        let request = SearchRequest::new("s", 300_000, 20_000).via(["w"]);

        let response = engine.respond(&request, &SearchControl::default());
        assert!(response.success);
        assert_eq!(response.waypoints_skipped, vec!["w"]);
        assert_eq!(response.tolerance_ms, Some(60_000));

        let attempts = &response.diagnostics.as_ref().unwrap().attempts;
        let phases: Vec<AttemptPhase> = attempts.iter().map(|a| a.phase).collect();
        assert_eq!(phases.first(), Some(&AttemptPhase::Strict));
        assert_eq!(phases.last(), Some(&AttemptPhase::WaypointFree));
        assert!(attempts.iter().all(|a| a.best_duration_distance_ms.is_some()));
    }

    #[test]
    fn test_cancelled_request_is_approximate() {
        let (nodes, edges) = sample_catalog(30, 3);
        let engine = Engine::new(EngineConfig::default(), nodes, &edges);
        let token = CancelToken::new();
        token.cancel();

        let response = engine.respond(
            &SearchRequest::new("t0", 2_000_000, 30_000),
            &SearchControl::default().with_cancel(token),
        );
        assert!(!response.success);
        assert!(response.approximate);
        assert_eq!(response.error, Some(ErrorKind::Cancelled));
        assert_eq!(response.path.len(), 1);
        assert!(response.diagnostics.unwrap().closest_partial.is_some());
    }

    #[test]
    fn test_response_serializes_with_wire_names() -> Result<()> {
        let (nodes, edges) = chain(5, 200_000);
        let engine = Engine::new(unrepaired(), nodes, &edges);
        let response = engine.respond(&SearchRequest::new("n1", 600_000, 0), &SearchControl::default());

        let json: serde_json::Value = serde_json::to_value(&response)?;
        assert_eq!(json["success"], true);
        assert_eq!(json["total_duration_ms"], 600_000);
        assert_eq!(json["path"][0]["track_id"], "n1");
        assert!(json["path"][0]["transition_weight"].is_null());
        assert_eq!(json["path"][1]["transition_weight"], 1.0);
        assert!(json["diagnostics"]["waypoints_reachable"].is_array());
        Ok(())
    }

    #[test]
    fn test_rejected_response_lists_every_issue() {
        let (nodes, edges) = chain(5, 200_000);
        let engine = Engine::new(unrepaired(), nodes, &edges);
        let request = SearchRequest::new("n5", 600_000, 0).ending_at("n1").via(["ghost"]);

        let issues = match engine.find(&request).unwrap_err() {
            PathfinderError::Rejected { issues, .. } => issues,
            other => panic!("expected rejection, got {other:?}"),
        };
        assert!(issues.contains(&ValidationIssue::IsolatedStart));
        assert!(issues.contains(&ValidationIssue::UnreachableEnd));
        assert!(issues.contains(&ValidationIssue::UnknownTrack("ghost".to_string())));
    }
}

#[cfg(test)]
mod repair_tests {
    use super::*;

    #[test]
    fn test_repair_never_duplicates_real_edges() {
        let (nodes, edges) = sample_catalog(120, 5);
        let engine = Engine::new(EngineConfig::default(), nodes, &edges);
        let snapshot = engine.snapshot();

        let real: std::collections::HashSet<(String, String)> =
            edges.iter().map(|e| (e.from_id.clone(), e.to_id.clone())).collect();
        let synthetic: Vec<Edge> = snapshot
            .graph
            .edges()
            .into_iter()
            .filter(|e| e.provenance == Provenance::Synthetic)
            .collect();

        assert!(!synthetic.is_empty());
        assert!(synthetic.len() <= 120 * RepairConfig::default().neighbor_count);
        for edge in synthetic {
            assert!(!real.contains(&(edge.from_id.clone(), edge.to_id.clone())));
            assert_ne!(edge.from_id, edge.to_id);
        }
    }

    #[test]
    fn test_repair_is_reproducible_across_engines() {
        let mut config = EngineConfig::default();
        config.repair.exact_scan_limit = 0;
        config.repair.ann_seed = 42;

        let (nodes, edges) = sample_catalog(150, 9);
        let a = Engine::new(config.clone(), nodes.clone(), &edges).snapshot().graph.edges();
        let b = Engine::new(config, nodes, &edges).snapshot().graph.edges();
        assert_eq!(a, b);
    }

    #[test]
    fn test_repair_reconnects_isolated_start() {
        let nodes = vec![
            TrackNode::new("island", 200_000).with_tempo(124.0),
            TrackNode::new("a", 200_000).with_tempo(125.0),
            TrackNode::new("b", 200_000).with_tempo(126.0),
        ];
        let edges = vec![Edge::real("a", "b", 1.0)];

        let bare = Engine::new(unrepaired(), nodes.clone(), &edges);
        let err = bare.find(&SearchRequest::new("island", 600_000, 0)).unwrap_err();
        assert!(err.has_issue(&ValidationIssue::IsolatedStart));

        let repaired = Engine::new(EngineConfig::default(), nodes, &edges);
        let result = repaired
            .find(&SearchRequest::new("island", 600_000, 0))
            .expect("synthetic edges connect the island");
        assert_eq!(result.track_ids.len(), 3);
        assert_eq!(result.transitions[0].provenance, Provenance::Synthetic);
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    fn segue() -> Command {
        Command::new(env!("CARGO_BIN_EXE_segue"))
    }

    fn write_catalog(dir: &TempDir) -> Result<std::path::PathBuf> {
        let (tracks, transitions) = chain(6, 200_000);
        let path = dir.path().join("catalog.json");
        let catalog = segue::catalog::Catalog { tracks, transitions };
        fs::write(&path, serde_json::to_string(&catalog)?)?;
        Ok(path)
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = segue().arg("--help").output().expect("Failed to run help command");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("segue"));
        assert!(stdout.contains("find"));
        assert!(stdout.contains("inspect"));
    }

    #[test]
    fn test_find_prints_json_response() -> Result<()> {
        let dir = TempDir::new()?;
        let catalog = write_catalog(&dir)?;
        let output = segue()
            .args(["find", catalog.to_str().unwrap(), "--start", "n1", "--end", "n3", "--target-ms", "600000"])
            .output()?;

        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        let response: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(response["success"], true);
        assert_eq!(response["path"].as_array().unwrap().len(), 3);
        Ok(())
    }

    #[test]
    fn test_inspect_and_config() -> Result<()> {
        let dir = TempDir::new()?;
        let catalog = write_catalog(&dir)?;
        let config_path = dir.path().join("engine.json");
        fs::write(&config_path, r#"{ "repair": { "min_real_degree": 0 } }"#)?;

        let output = segue()
            .args(["--config", config_path.to_str().unwrap(), "inspect", catalog.to_str().unwrap()])
            .output()?;
        assert!(output.status.success());
        let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(summary["tracks"], 6);
        assert_eq!(summary["synthetic_transitions"], 0);

        let output = segue().args(["--config", config_path.to_str().unwrap(), "config"]).output()?;
        let config: EngineConfig = serde_json::from_slice(&output.stdout)?;
        assert_eq!(config.repair.min_real_degree, 0);
        Ok(())
    }

    #[test]
    fn test_missing_catalog_fails() {
        let output = segue()
            .args(["find", "/nonexistent/catalog.json", "--start", "a", "--target-ms", "1000"])
            .output()
            .expect("Failed to run find");
        assert!(!output.status.success());
    }

    #[test]
    fn test_completion_generation() {
        let output = segue().args(["completion", "bash"]).output().expect("Failed to run completion");
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("_segue"));
        assert!(stdout.contains("complete"));
    }
}
