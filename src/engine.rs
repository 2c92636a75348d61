//! # Engine
//!
//! Ties configuration, the current snapshot and the search together. One
//! `Engine` can serve any number of threads: every call grabs the snapshot
//! current at that moment and searches it without holding a lock.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::request::{PathfinderResponse, SearchRequest};
use crate::search::{PathResult, Pathfinder, SearchControl};
use crate::snapshot::{GraphStore, PreparedGraph};
use crate::track::{Edge, TrackNode};
use std::sync::Arc;

/// Pathfinding service over a swappable catalog snapshot.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: GraphStore,
}

impl Engine {
    /// Prepare the first snapshot from a catalog.
    #[must_use]
    pub fn new(config: EngineConfig, nodes: Vec<TrackNode>, edges: &[Edge]) -> Self {
        let store = GraphStore::new(nodes, edges, &config.repair);
        Self { config, store }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<PreparedGraph> {
        self.store.snapshot()
    }

    /// Rebuild the snapshot for a changed catalog. Returns the new version.
    pub fn reload(&self, nodes: Vec<TrackNode>, edges: &[Edge]) -> u64 {
        self.store.replace(nodes, edges, &self.config.repair)
    }

    /// # Errors
    ///
    /// See [`Pathfinder::find_with`].
    pub fn find(&self, request: &SearchRequest) -> Result<PathResult> {
        self.find_with(request, &SearchControl::default())
    }

    /// # Errors
    ///
    /// See [`Pathfinder::find_with`].
    pub fn find_with(&self, request: &SearchRequest, control: &SearchControl) -> Result<PathResult> {
        let snapshot = self.store.snapshot();
        Pathfinder::new(&snapshot.graph, &self.config.search).find_with(request, control)
    }

    /// Answer a request in wire form. Never fails: errors become a
    /// `success: false` response carrying diagnostics.
    #[must_use]
    pub fn respond(&self, request: &SearchRequest, control: &SearchControl) -> PathfinderResponse {
        PathfinderResponse::from_outcome(self.find_with(request, control))
    }
}
