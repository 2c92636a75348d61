//! # Connectivity Repair
//!
//! Real co-occurrence data is sparse: plenty of tracks were only ever played
//! next to one or two others, and some islands of the catalog never touch the
//! rest. Repair links every under-connected track to its nearest neighbours in
//! a small feature space so the search has somewhere to go.
//!
//! ## Feature space
//!
//! ```text
//! tempo  -> min-max scaled to [-1, 1]          (missing: 0)
//! key    -> (cos θ, sin θ), θ = 2π (key-1)/12  (missing: origin)
//! genre  -> optional distance penalty when genres differ
//! ```
//!
//! Synthetic edges are weighted at a multiple of the largest real weight so
//! the search only takes them when nothing real fits.
//!
//! Two neighbour indexes are available: an exact scan and a seeded
//! random-projection index. The projection index scans exactly for small
//! graphs and whenever its buckets cannot supply `k` candidates, so both agree
//! below [`RepairConfig::exact_scan_limit`].

use crate::config::{NeighborStrategy, RepairConfig};
use crate::graph::{NodeIdx, TrackGraph};
use crate::track::Edge;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;

/// Dimensions of the encoded feature vector.
const DIMS: usize = 3;

type Point = [f64; DIMS];

/// Result of one repair pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub edges: Vec<Edge>,
    /// Tracks whose real out-degree was below the threshold.
    pub eligible: usize,
    /// Strategy actually used after the small-graph override.
    pub strategy: NeighborStrategy,
}

/// Encoded tracks plus the pairwise distance used for ranking.
pub struct FeatureSpace<'g> {
    points: Vec<Point>,
    genres: Vec<Option<&'g str>>,
    genre_penalty: Option<f64>,
}

impl<'g> FeatureSpace<'g> {
    /// Encode every track of `graph`.
    #[must_use]
    pub fn encode(graph: &'g TrackGraph, config: &RepairConfig) -> Self {
        let tempos = graph.nodes().iter().filter_map(|n| n.usable_tempo());
        let (lo, hi) = tempos.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));
        let span = hi - lo;

        let points = graph
            .nodes()
            .iter()
            .map(|node| {
                let tempo = match node.usable_tempo() {
                    Some(t) if span > f64::EPSILON => 2.0 * (t - lo) / span - 1.0,
                    _ => 0.0,
                };
                let (cos, sin) = node.usable_key().map_or((0.0, 0.0), |key| {
                    let angle = TAU * f64::from(key - 1) / 12.0;
                    (angle.cos(), angle.sin())
                });
                [tempo, cos, sin]
            })
            .collect();

        Self {
            points,
            genres: graph.nodes().iter().map(|n| n.genre.as_deref()).collect(),
            genre_penalty: config.use_genre.then_some(config.genre_penalty),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn point(&self, idx: NodeIdx) -> &[f64; DIMS] {
        &self.points[idx]
    }

    /// Euclidean distance plus the genre penalty if enabled.
    #[must_use]
    pub fn distance(&self, a: NodeIdx, b: NodeIdx) -> f64 {
        let euclid = self.points[a]
            .iter()
            .zip(&self.points[b])
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt();
        let genre = match (self.genre_penalty, self.genres[a], self.genres[b]) {
            (None, _, _) => 0.0,
            (Some(_), Some(ga), Some(gb)) if ga.eq_ignore_ascii_case(gb) => 0.0,
            (Some(penalty), _, _) => penalty,
        };
        euclid + genre
    }
}

/// Nearest-neighbour lookup over a [`FeatureSpace`].
pub trait NeighborIndex: Sync {
    /// The `k` closest tracks to `query` accepted by `allow`, closest first,
    /// ties broken by index.
    fn nearest(&self, query: NodeIdx, k: usize, allow: &dyn Fn(NodeIdx) -> bool) -> Vec<(NodeIdx, f64)>;
}

/// Brute-force scan over every track.
pub struct ExactIndex<'a, 'g> {
    space: &'a FeatureSpace<'g>,
}

impl<'a, 'g> ExactIndex<'a, 'g> {
    #[must_use]
    pub const fn new(space: &'a FeatureSpace<'g>) -> Self {
        Self { space }
    }
}

impl NeighborIndex for ExactIndex<'_, '_> {
    fn nearest(&self, query: NodeIdx, k: usize, allow: &dyn Fn(NodeIdx) -> bool) -> Vec<(NodeIdx, f64)> {
        top_k(self.space, query, k, (0..self.space.len()).filter(|&c| allow(c)))
    }
}

/// Random-hyperplane hashing: tracks whose features fall on the same side of
/// every plane in a table share a bucket. Candidates from all tables are
/// re-ranked by exact distance.
pub struct ProjectionIndex<'a, 'g> {
    space: &'a FeatureSpace<'g>,
    tables: Vec<ProjectionTable>,
}

struct ProjectionTable {
    planes: Vec<Point>,
    buckets: HashMap<u32, Vec<NodeIdx>>,
}

impl ProjectionTable {
    fn signature(&self, point: &Point) -> u32 {
        self.planes.iter().enumerate().fold(0, |sig, (bit, plane)| {
            let dot: f64 = plane.iter().zip(point).map(|(p, x)| p * x).sum();
            if dot >= 0.0 {
                sig | (1 << bit)
            } else {
                sig
            }
        })
    }
}

impl<'a, 'g> ProjectionIndex<'a, 'g> {
    /// Build `tables` tables of `bits` hyperplanes each, drawn from `seed`.
    #[must_use]
    pub fn build(space: &'a FeatureSpace<'g>, tables: usize, bits: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let tables = (0..tables)
            .map(|_| {
                let planes: Vec<Point> = (0..bits)
                    .map(|_| [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)])
                    .collect();
                let mut table = ProjectionTable {
                    planes,
                    buckets: HashMap::new(),
                };
                for idx in 0..space.len() {
                    let sig = table.signature(space.point(idx));
                    table.buckets.entry(sig).or_default().push(idx);
                }
                table
            })
            .collect();
        Self { space, tables }
    }
}

impl ProjectionIndex<'_, '_> {
    /// Allowed tracks sharing a bucket with `query` in any table.
    fn candidates(&self, query: NodeIdx, allow: &dyn Fn(NodeIdx) -> bool) -> Vec<NodeIdx> {
        let point = self.space.point(query);
        let mut candidates: Vec<NodeIdx> = self
            .tables
            .iter()
            .filter_map(|table| table.buckets.get(&table.signature(point)))
            .flatten()
            .copied()
            .filter(|&c| allow(c))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }
}

impl NeighborIndex for ProjectionIndex<'_, '_> {
    fn nearest(&self, query: NodeIdx, k: usize, allow: &dyn Fn(NodeIdx) -> bool) -> Vec<(NodeIdx, f64)> {
        let candidates = self.candidates(query, allow);
        if candidates.len() < k {
            return ExactIndex::new(self.space).nearest(query, k, allow);
        }
        top_k(self.space, query, k, candidates.into_iter())
    }
}

fn top_k(
    space: &FeatureSpace<'_>,
    query: NodeIdx,
    k: usize,
    candidates: impl Iterator<Item = NodeIdx>,
) -> Vec<(NodeIdx, f64)> {
    let mut ranked: Vec<(NodeIdx, f64)> = candidates.map(|c| (c, space.distance(query, c))).collect();
    ranked.sort_by(|(ia, da), (ib, db)| da.total_cmp(db).then(ia.cmp(ib)));
    ranked.truncate(k);
    ranked
}

/// Compute synthetic edges for every under-connected track of `graph`.
///
/// Never links a track to itself or to a track it already has an edge to.
/// Produces at most `len * neighbor_count` edges.
#[must_use]
pub fn synthesize(graph: &TrackGraph, config: &RepairConfig) -> RepairOutcome {
    let eligible: Vec<NodeIdx> = (0..graph.len())
        .filter(|&idx| graph.real_degree_of(idx) < config.min_real_degree)
        .collect();

    let strategy = match config.strategy {
        NeighborStrategy::Projection if graph.len() > config.exact_scan_limit => NeighborStrategy::Projection,
        _ => NeighborStrategy::Exact,
    };

    if eligible.is_empty() || config.neighbor_count == 0 {
        return RepairOutcome {
            edges: Vec::new(),
            eligible: eligible.len(),
            strategy,
        };
    }

    let space = FeatureSpace::encode(graph, config);
    let index: Box<dyn NeighborIndex + '_> = match strategy {
        NeighborStrategy::Exact => Box::new(ExactIndex::new(&space)),
        NeighborStrategy::Projection => Box::new(ProjectionIndex::build(
            &space,
            config.projection_tables,
            config.projection_bits,
            config.ann_seed,
        )),
    };

    let reference = graph
        .stats()
        .real_weight_range
        .map(|(_, max)| max)
        .filter(|max| *max > f64::EPSILON)
        .unwrap_or(1.0);
    let base_weight = config.synthetic_weight_multiplier * reference;

    let per_node: Vec<Vec<Edge>> = eligible
        .par_iter()
        .map(|&from| {
            let existing: HashSet<NodeIdx> = graph.neighbors_of(from).iter().map(|n| n.node).collect();
            let allow = |c: NodeIdx| c != from && !existing.contains(&c);
            index
                .nearest(from, config.neighbor_count, &allow)
                .into_iter()
                .map(|(to, distance)| {
                    Edge::synthetic(
                        graph.node(from).id.clone(),
                        graph.node(to).id.clone(),
                        base_weight * (1.0 + distance),
                    )
                })
                .collect()
        })
        .collect();

    let edges: Vec<Edge> = per_node.into_iter().flatten().collect();
    debug!("Repair linked {} tracks with {} synthetic edges", eligible.len(), edges.len());
    info!(
        "Connectivity repair: {} of {} tracks below degree {}, {} synthetic edges ({:?})",
        eligible.len(),
        graph.len(),
        config.min_real_degree,
        edges.len(),
        strategy
    );

    RepairOutcome {
        edges,
        eligible: eligible.len(),
        strategy,
    }
}
