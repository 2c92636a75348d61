//! # Graph Snapshots
//!
//! A [`PreparedGraph`] is the real catalog graph merged with the synthetic
//! edges of one repair pass. It is built once, never mutated, and shared by
//! `Arc` between any number of concurrent searches.
//!
//! [`GraphStore`] holds the current snapshot. A catalog change builds a fresh
//! snapshot off to the side and swaps it in; searches already running keep the
//! `Arc` they started with.

use crate::config::{NeighborStrategy, RepairConfig};
use crate::graph::{BuildReport, TrackGraph};
use crate::repair;
use crate::track::{Edge, TrackNode};
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Summary of the repair pass baked into a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairStats {
    /// Tracks below the real-degree threshold.
    pub eligible: usize,
    pub synthetic_edges: usize,
    pub strategy: NeighborStrategy,
}

/// Immutable, versioned graph ready for searching.
#[derive(Debug)]
pub struct PreparedGraph {
    pub version: u64,
    pub graph: TrackGraph,
    pub build: BuildReport,
    pub repair: RepairStats,
}

impl PreparedGraph {
    /// Build the real graph, run connectivity repair, and merge the result.
    #[must_use]
    pub fn prepare(version: u64, nodes: Vec<TrackNode>, edges: &[Edge], config: &RepairConfig) -> Self {
        let (real, build) = TrackGraph::build(nodes, edges);

        let outcome = repair::synthesize(&real, config);
        let repair = RepairStats {
            eligible: outcome.eligible,
            synthetic_edges: outcome.edges.len(),
            strategy: outcome.strategy,
        };
        let (graph, _) = real.augment(&outcome.edges);

        let stats = graph.stats();
        info!(
            "Snapshot v{version} ready: {} tracks, {} real and {} synthetic transitions",
            graph.len(),
            stats.real_edges,
            stats.synthetic_edges
        );

        Self {
            version,
            graph,
            build,
            repair,
        }
    }
}

/// Holder of the current snapshot.
#[derive(Debug)]
pub struct GraphStore {
    current: RwLock<Arc<PreparedGraph>>,
    next_version: AtomicU64,
}

impl GraphStore {
    /// Prepare the first snapshot (version 1).
    #[must_use]
    pub fn new(nodes: Vec<TrackNode>, edges: &[Edge], config: &RepairConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(PreparedGraph::prepare(1, nodes, edges, config))),
            next_version: AtomicU64::new(2),
        }
    }

    /// The snapshot current at the time of the call.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PreparedGraph> {
        // Writers only swap an Arc, so a poisoned lock still holds a whole snapshot
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Build a new snapshot from a changed catalog and make it current.
    ///
    /// Returns the new version number.
    pub fn replace(&self, nodes: Vec<TrackNode>, edges: &[Edge], config: &RepairConfig) -> u64 {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        let prepared = Arc::new(PreparedGraph::prepare(version, nodes, edges, config));
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.version < version {
            *current = prepared;
        }
        current.version
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.snapshot().version
    }
}
