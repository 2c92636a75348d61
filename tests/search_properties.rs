use proptest::prelude::*;
use segue::config::SearchConfig;
use segue::graph::{GraphStats, TrackGraph};
use segue::request::SearchRequest;
use segue::scoring::{key_bonus, tempo_penalty, WeightBand, WeightScale, SAME_KEY_BONUS};
use segue::search::Pathfinder;
use segue::track::{Edge, KeyMode, Provenance, TrackNode};

fn mode() -> impl Strategy<Value = KeyMode> {
    prop_oneof![Just(KeyMode::Major), Just(KeyMode::Minor)]
}

/// A chain with skip edges `i -> i + 2`, one duration per track.
fn ladder_graph(durations: &[u64]) -> TrackGraph {
    let nodes = durations
        .iter()
        .enumerate()
        .map(|(i, &ms)| TrackNode::new(format!("t{i}"), ms))
        .collect();
    let edges: Vec<Edge> = (0..durations.len())
        .flat_map(|i| [i + 1, i + 2].into_iter().map(move |j| (i, j)))
        .filter(|&(_, j)| j < durations.len())
        .map(|(i, j)| Edge::real(format!("t{i}"), format!("t{j}"), 1.0 + (i * j % 5) as f64))
        .collect();
    TrackGraph::build(nodes, &edges).0
}

proptest! {
    #[test]
    fn key_bonus_identity(key in 1u8..=12, m in mode()) {
        prop_assert_eq!(key_bonus(Some(key), Some(m), Some(key), Some(m)), SAME_KEY_BONUS);
    }

    #[test]
    fn key_bonus_is_symmetric_and_bounded(a in 0u8..=14, b in 0u8..=14, ma in mode(), mb in mode()) {
        let forward = key_bonus(Some(a), Some(ma), Some(b), Some(mb));
        let backward = key_bonus(Some(b), Some(mb), Some(a), Some(ma));
        prop_assert_eq!(forward, backward);
        prop_assert!((0.0..=SAME_KEY_BONUS).contains(&forward));
    }

    #[test]
    fn tempo_penalty_is_capped(a in proptest::option::of(60.0f64..200.0), b in proptest::option::of(60.0f64..200.0), cap in 0.1f64..2.0) {
        let penalty = tempo_penalty(a, b, cap);
        prop_assert!(penalty >= 0.0 && penalty <= cap);
        if a.is_none() || b.is_none() {
            prop_assert_eq!(penalty, 0.0);
        }
    }

    #[test]
    fn real_weights_stay_in_band(lo in 0.0f64..10.0, span in 0.0f64..100.0, t in 0.0f64..=1.0) {
        let stats = GraphStats {
            shortest_duration_ms: 1,
            total_duration_ms: 1,
            average_duration_ms: 1.0,
            real_weight_range: Some((lo, lo + span)),
            real_edges: 2,
            synthetic_edges: 0,
        };
        let band = WeightBand::default();
        let scale = WeightScale::new(&stats, band);
        let normalized = scale.normalize(lo + t * span, Provenance::Real);
        prop_assert!(normalized >= band.low - 1e-12 && normalized <= band.high + 1e-12);
        prop_assert!(scale.normalize(lo + span, Provenance::Synthetic) >= band.high);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn verified_paths_honour_duration_window(
        minutes in proptest::collection::vec(2u64..8, 2..12),
        target_tracks in 1usize..6,
        tolerance_ms in 0u64..120_000,
    ) {
        let durations: Vec<u64> = minutes.iter().map(|m| m * 60_000).collect();
        let graph = ladder_graph(&durations);
        let config = SearchConfig::default();
        let target = durations.iter().take(target_tracks).sum::<u64>();
        let request = SearchRequest::new("t0", target, tolerance_ms);

        if let Ok(result) = Pathfinder::new(&graph, &config).find(&request) {
            if result.is_verified() {
                let sum: u64 = result
                    .track_ids
                    .iter()
                    .map(|id| graph.node(graph.idx(id).unwrap()).duration_ms)
                    .sum();
                prop_assert_eq!(sum, result.total_duration_ms);
                prop_assert!(result.total_duration_ms.abs_diff(target) <= result.tolerance_ms);
                prop_assert_eq!(result.transitions.len() + 1, result.track_ids.len());
                for step in &result.transitions {
                    let from = graph.idx(&step.from_id).unwrap();
                    prop_assert!(graph.neighbors_of(from).iter().any(|n| graph.node(n.node).id == step.to_id));
                }
            }
        }
    }

    #[test]
    fn prefix_targets_are_always_found(
        minutes in proptest::collection::vec(2u64..8, 2..10),
        target_tracks in 1usize..5,
    ) {
        // The chain prefix t0..t(k-1) is an exact solution, so a verified
        // path must come back.
        let durations: Vec<u64> = minutes.iter().map(|m| m * 60_000).collect();
        prop_assume!(target_tracks <= durations.len());
        let graph = ladder_graph(&durations);
        let config = SearchConfig::default();
        let target = durations.iter().take(target_tracks).sum::<u64>();

        let result = Pathfinder::new(&graph, &config).find(&SearchRequest::new("t0", target, 0));
        prop_assert!(result.is_ok(), "{:?}", result.err());
        prop_assert!(result.unwrap().is_verified());
    }
}
