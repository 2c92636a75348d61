//! # Graph Model & Adjacency Index
//!
//! An immutable snapshot of tracks and directed weighted transitions. Tracks
//! are addressed internally by a dense [`NodeIdx`] so neighbor lookup is a
//! slice index; string ids are only resolved at the boundary.
//!
//! Construction is forgiving: edges pointing at unknown tracks, parallel edges
//! and nonsensical weights are dropped or merged with a log line instead of
//! failing the whole build.

use crate::track::{Edge, Provenance, TrackNode};
use log::{debug, warn};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

/// Dense index of a track inside one snapshot.
pub type NodeIdx = usize;

/// One outgoing transition in the adjacency index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub node: NodeIdx,
    pub weight: f64,
    pub provenance: Provenance,
}

/// Which way a traversal follows edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// What the build had to clean up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub dropped_nodes: usize,
    pub dropped_edges: usize,
    pub merged_edges: usize,
}

/// Weakly connected component summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentStats {
    pub count: usize,
    pub largest: usize,
}

/// Duration and weight figures derived once per snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphStats {
    pub shortest_duration_ms: u64,
    pub total_duration_ms: u64,
    pub average_duration_ms: f64,
    /// (min, max) over real edge weights; `None` without real edges.
    pub real_weight_range: Option<(f64, f64)>,
    pub real_edges: usize,
    pub synthetic_edges: usize,
}

/// Read-only track graph with forward and reverse adjacency.
#[derive(Debug, Clone)]
pub struct TrackGraph {
    nodes: Vec<TrackNode>,
    index: HashMap<String, NodeIdx>,
    outgoing: Vec<Vec<Neighbor>>,
    incoming: Vec<Vec<NodeIdx>>,
    real_degree: Vec<usize>,
    stats: GraphStats,
    components: OnceLock<ComponentStats>,
}

impl TrackGraph {
    /// Build a snapshot from raw node and edge lists.
    ///
    /// Parallel edges keep the minimum weight. Edges with an unknown endpoint
    /// or a negative/non-finite weight are dropped. Duplicate track ids keep
    /// their first occurrence and zero-length tracks are dropped.
    pub fn build(nodes: Vec<TrackNode>, edges: &[Edge]) -> (Self, BuildReport) {
        let mut report = BuildReport::default();
        let mut kept = Vec::with_capacity(nodes.len());
        let mut index = HashMap::with_capacity(nodes.len());

        for node in nodes {
            if node.duration_ms == 0 {
                debug!("Dropping track `{}' with zero duration", node.id);
                report.dropped_nodes += 1;
                continue;
            }
            match index.entry(node.id.clone()) {
                Entry::Occupied(_) => {
                    debug!("Dropping duplicate track id `{}'", node.id);
                    report.dropped_nodes += 1;
                }
                Entry::Vacant(slot) => {
                    slot.insert(kept.len());
                    kept.push(node);
                }
            }
        }

        let mut outgoing: Vec<Vec<Neighbor>> = vec![Vec::new(); kept.len()];
        let mut slots: HashMap<(NodeIdx, NodeIdx), usize> = HashMap::with_capacity(edges.len());

        for edge in edges {
            let (Some(&from), Some(&to)) = (index.get(&edge.from_id), index.get(&edge.to_id)) else {
                debug!(
                    "Dropping edge `{}' -> `{}': unknown track",
                    edge.from_id, edge.to_id
                );
                report.dropped_edges += 1;
                continue;
            };
            if !edge.weight.is_finite() || edge.weight < 0.0 {
                debug!(
                    "Dropping edge `{}' -> `{}': invalid weight {}",
                    edge.from_id, edge.to_id, edge.weight
                );
                report.dropped_edges += 1;
                continue;
            }

            match slots.entry((from, to)) {
                Entry::Occupied(slot) => {
                    report.merged_edges += 1;
                    let existing = &mut outgoing[from][*slot.get()];
                    if edge.weight < existing.weight {
                        existing.weight = edge.weight;
                        existing.provenance = edge.provenance;
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(outgoing[from].len());
                    outgoing[from].push(Neighbor {
                        node: to,
                        weight: edge.weight,
                        provenance: edge.provenance,
                    });
                }
            }
        }

        if report.dropped_nodes > 0 || report.dropped_edges > 0 {
            warn!(
                "Graph build dropped {} tracks and {} edges ({} parallel edges merged)",
                report.dropped_nodes, report.dropped_edges, report.merged_edges
            );
        }

        let mut incoming: Vec<Vec<NodeIdx>> = vec![Vec::new(); kept.len()];
        let mut real_degree = vec![0; kept.len()];
        for (from, neighbors) in outgoing.iter().enumerate() {
            for neighbor in neighbors {
                incoming[neighbor.node].push(from);
                if neighbor.provenance == Provenance::Real {
                    real_degree[from] += 1;
                }
            }
        }

        let stats = compute_stats(&kept, &outgoing);
        let graph = Self {
            nodes: kept,
            index,
            outgoing,
            incoming,
            real_degree,
            stats,
            components: OnceLock::new(),
        };
        (graph, report)
    }

    /// A new snapshot holding this graph's edges plus `extra`.
    pub fn augment(&self, extra: &[Edge]) -> (Self, BuildReport) {
        let mut edges = self.edges();
        edges.extend_from_slice(extra);
        Self::build(self.nodes.clone(), &edges)
    }

    /// Every edge in the snapshot, in adjacency order.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.outgoing
            .iter()
            .enumerate()
            .flat_map(|(from, neighbors)| {
                neighbors.iter().map(move |n| Edge {
                    from_id: self.nodes[from].id.clone(),
                    to_id: self.nodes[n.node].id.clone(),
                    weight: n.weight,
                    provenance: n.provenance,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn idx(&self, id: &str) -> Option<NodeIdx> {
        self.index.get(id).copied()
    }

    #[must_use]
    pub fn node(&self, idx: NodeIdx) -> &TrackNode {
        &self.nodes[idx]
    }

    #[must_use]
    pub fn nodes(&self) -> &[TrackNode] {
        &self.nodes
    }

    /// Outgoing transitions of a track, or `None` for an unknown id.
    #[must_use]
    pub fn neighbors(&self, id: &str) -> Option<&[Neighbor]> {
        self.idx(id).map(|idx| self.outgoing[idx].as_slice())
    }

    #[must_use]
    pub fn neighbors_of(&self, idx: NodeIdx) -> &[Neighbor] {
        &self.outgoing[idx]
    }

    #[must_use]
    pub fn predecessors_of(&self, idx: NodeIdx) -> &[NodeIdx] {
        &self.incoming[idx]
    }

    /// Out-degree over real and synthetic edges; 0 for unknown ids.
    #[must_use]
    pub fn degree(&self, id: &str) -> usize {
        self.idx(id).map_or(0, |idx| self.outgoing[idx].len())
    }

    /// Out-degree counting only observed (real) transitions.
    #[must_use]
    pub fn real_degree_of(&self, idx: NodeIdx) -> usize {
        self.real_degree[idx]
    }

    #[must_use]
    pub fn has_real_edge(&self, from: NodeIdx, to: NodeIdx) -> bool {
        self.outgoing[from]
            .iter()
            .any(|n| n.node == to && n.provenance == Provenance::Real)
    }

    #[must_use]
    pub const fn stats(&self) -> &GraphStats {
        &self.stats
    }

    /// Weakly connected components, computed on first use.
    pub fn components(&self) -> ComponentStats {
        *self.components.get_or_init(|| {
            let mut sets = DisjointSets::new(self.nodes.len());
            for (from, neighbors) in self.outgoing.iter().enumerate() {
                for neighbor in neighbors {
                    sets.union(from, neighbor.node);
                }
            }
            sets.summary()
        })
    }

    /// Breadth-first hop distances from `origin`.
    ///
    /// Entry `i` is the number of transitions on the shortest path between
    /// `origin` and track `i` (following edges forwards or backwards), or
    /// `None` if there is no such path.
    #[must_use]
    pub fn hop_distances(&self, origin: NodeIdx, direction: Direction) -> Vec<Option<u32>> {
        let mut distances = vec![None; self.nodes.len()];
        let mut frontier = VecDeque::new();
        distances[origin] = Some(0);
        frontier.push_back(origin);

        while let Some(current) = frontier.pop_front() {
            let next_hop = distances[current].map_or(0, |d| d + 1);
            let mut visit = |node: NodeIdx| {
                if distances[node].is_none() {
                    distances[node] = Some(next_hop);
                    frontier.push_back(node);
                }
            };
            match direction {
                Direction::Forward => self.outgoing[current].iter().for_each(|n| visit(n.node)),
                Direction::Reverse => self.incoming[current].iter().for_each(|&p| visit(p)),
            }
        }

        distances
    }
}

fn compute_stats(nodes: &[TrackNode], outgoing: &[Vec<Neighbor>]) -> GraphStats {
    let shortest_duration_ms = nodes.iter().map(|n| n.duration_ms).min().unwrap_or(0);
    let total_duration_ms = nodes.iter().fold(0u64, |total, n| total.saturating_add(n.duration_ms));
    #[allow(clippy::cast_precision_loss)]
    let average_duration_ms = if nodes.is_empty() {
        0.0
    } else {
        total_duration_ms as f64 / nodes.len() as f64
    };

    let mut real_weight_range: Option<(f64, f64)> = None;
    let mut real_edges = 0;
    let mut synthetic_edges = 0;
    for neighbor in outgoing.iter().flatten() {
        match neighbor.provenance {
            Provenance::Real => {
                real_edges += 1;
                real_weight_range = Some(match real_weight_range {
                    None => (neighbor.weight, neighbor.weight),
                    Some((lo, hi)) => (lo.min(neighbor.weight), hi.max(neighbor.weight)),
                });
            }
            Provenance::Synthetic => synthetic_edges += 1,
        }
    }

    GraphStats {
        shortest_duration_ms,
        total_duration_ms,
        average_duration_ms,
        real_weight_range,
        real_edges,
        synthetic_edges,
    }
}

/// Union-find with path halving and union by size.
struct DisjointSets {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }

    fn summary(&mut self) -> ComponentStats {
        let mut count = 0;
        let mut largest = 0;
        for x in 0..self.parent.len() {
            if self.find(x) == x {
                count += 1;
                largest = largest.max(self.size[x]);
            }
        }
        ComponentStats { count, largest }
    }
}
