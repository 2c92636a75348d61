//! # Core Search Engine
//!
//! A duration-aware A* over one graph snapshot.
//!
//! A search state is a partial path: the track it ends on, the accumulated
//! duration, and which waypoints it has covered. States are ordered by
//! `f = g + h` where
//!
//! ```text
//! g = Σ (normalized_weight - key_bonus + tempo_penalty) - incentive × waypoints_covered
//! h = max(duration_remaining, hops_to_uncovered_targets × avg_duration) / avg_duration
//! ```
//!
//! Edge costs live on a narrow band (0.01 to 0.15 per real transition) while
//! `h` counts tracks still needed, so the duration target steers the search
//! and edge quality only breaks ties between comparable paths.
//!
//! ## Attempt ladder
//!
//! ```text
//! Strict (1.0x) -> Relaxed (1.5x) -> Relaxed (2.0x) -> Relaxed (3.0x) -> WaypointFree
//! ```
//!
//! Requests without waypoints get a single strict attempt. Each attempt walks
//! `NotStarted -> Searching -> {Succeeded, Exhausted}` and leaves an
//! [`AttemptRecord`] in the diagnostics whatever its outcome.

use crate::config::SearchConfig;
use crate::error::{PathfinderError, Result};
use crate::graph::{Direction, Neighbor, NodeIdx, TrackGraph};
use crate::reachability;
use crate::request::{Diagnostics, PartialPath, SearchRequest};
use crate::scoring::{TransitionScore, WeightScale};
use crate::track::Provenance;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Largest number of distinct waypoints one request may carry.
pub const MAX_WAYPOINTS: usize = 64;

/// Shared flag used to stop a running search from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }
}

/// Out-of-band limits for one search call.
#[derive(Debug, Clone, Default)]
pub struct SearchControl {
    pub cancel: Option<CancelToken>,
    pub deadline: Option<Instant>,
}

impl SearchControl {
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Named rung of the relaxation ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    /// Base tolerance, all waypoints required.
    Strict,
    /// Widened tolerance, all waypoints still required.
    Relaxed,
    /// Widest tolerance with the waypoint requirement dropped.
    WaypointFree,
}

/// Lifecycle of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    NotStarted,
    Searching,
    Succeeded,
    Exhausted,
}

/// How an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    /// The open queue ran dry.
    Exhausted,
    IterationCap,
    Cancelled,
}

/// Diagnostic trace of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub phase: AttemptPhase,
    pub factor: f64,
    pub tolerance_ms: u64,
    pub iterations: usize,
    /// Smallest |duration - target| over every state the attempt expanded.
    pub best_duration_distance_ms: Option<u64>,
    pub outcome: AttemptOutcome,
}

/// One planned rung of the ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptPlan {
    pub phase: AttemptPhase,
    pub factor: f64,
    pub tolerance_ms: u64,
    pub require_waypoints: bool,
}

/// Lay out the attempts a request is entitled to, in order.
#[must_use]
pub fn plan_attempts(request: &SearchRequest, config: &SearchConfig) -> Vec<AttemptPlan> {
    let plan = |phase, factor, require_waypoints| AttemptPlan {
        phase,
        factor,
        tolerance_ms: request.tolerance_at(factor),
        require_waypoints,
    };

    if request.waypoint_track_ids.is_empty() {
        return vec![plan(AttemptPhase::Strict, config.base_factor(), false)];
    }

    let mut plans: Vec<AttemptPlan> = config
        .tolerance_ladder
        .iter()
        .enumerate()
        .map(|(rung, &factor)| {
            let phase = if rung == 0 { AttemptPhase::Strict } else { AttemptPhase::Relaxed };
            plan(phase, factor, true)
        })
        .collect();
    if config.drop_waypoints_on_exhaustion {
        plans.push(plan(AttemptPhase::WaypointFree, config.widest_factor(), false));
    }
    plans
}

/// Whether the returned path is a verified solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Verified,
    /// Best partial path after an attempt hit the iteration cap.
    IterationCapReached,
    /// Best partial path at the time the search was stopped.
    Cancelled,
}

/// One move of a result path.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from_id: String,
    pub to_id: String,
    /// Raw edge weight.
    pub weight: f64,
    pub normalized_weight: f64,
    pub provenance: Provenance,
    pub key_bonus: f64,
    pub tempo_penalty: f64,
    pub tempo_diff: Option<f64>,
}

/// A path produced by [`Pathfinder::find`].
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    pub track_ids: Vec<String>,
    /// `transitions[i]` joins `track_ids[i]` and `track_ids[i + 1]`.
    pub transitions: Vec<Transition>,
    pub total_duration_ms: u64,
    pub waypoints_visited: Vec<String>,
    pub waypoints_skipped: Vec<String>,
    /// Tolerance of the attempt the path came from.
    pub tolerance_ms: u64,
    pub phase: AttemptPhase,
    pub completion: Completion,
    pub diagnostics: Option<Diagnostics>,
}

impl PathResult {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.completion == Completion::Verified
    }
}

/// Entry of the open queue: a min-heap on `f`, earlier pushes first on ties.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    f: f64,
    seq: u64,
    slot: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the smallest f. NaN sinks to the bottom.
        match (self.f.is_nan(), other.f.is_nan()) {
            (true, true) => other.seq.cmp(&self.seq),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => other
                .f
                .partial_cmp(&self.f)
                .unwrap_or(Ordering::Equal)
                .then_with(|| other.seq.cmp(&self.seq)),
        }
    }
}

/// A partial path, stored in an arena and linked to its parent.
#[derive(Debug, Clone, Copy)]
struct SearchNode {
    track: NodeIdx,
    parent: Option<usize>,
    via: Option<(Neighbor, TransitionScore)>,
    duration_ms: u64,
    covered: u64,
    g: f64,
    len: u32,
}

/// De-duplication key of the closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StateKey {
    track: NodeIdx,
    covered: u64,
    bucket: u64,
}

/// A materialized path with enough detail to answer with.
#[derive(Debug, Clone)]
struct Trail {
    tracks: Vec<NodeIdx>,
    steps: Vec<(Neighbor, TransitionScore)>,
    duration_ms: u64,
    covered: u64,
}

impl Trail {
    /// Closer to target first, then more waypoints, then shorter.
    fn rank(&self, target_ms: u64) -> (u64, Reverse<u32>, usize) {
        (self.duration_ms.abs_diff(target_ms), Reverse(self.covered.count_ones()), self.tracks.len())
    }
}

/// Required tracks of one request, resolved against the snapshot.
struct Targets {
    start: NodeIdx,
    end: Option<NodeIdx>,
    waypoints: Vec<NodeIdx>,
    ordered: bool,
    /// Reverse BFS distances: `to_waypoint[i][t]` is hops from `t` to waypoint `i`.
    to_waypoint: Vec<Vec<Option<u32>>>,
    to_end: Option<Vec<Option<u32>>>,
}

impl Targets {
    fn resolve(graph: &TrackGraph, request: &SearchRequest, start: NodeIdx) -> Self {
        let waypoints: Vec<NodeIdx> = request
            .distinct_waypoints()
            .into_iter()
            .filter_map(|id| graph.idx(id))
            .collect();
        let end = request.end_track_id.as_deref().and_then(|id| graph.idx(id));
        Self {
            start,
            end,
            to_waypoint: waypoints
                .iter()
                .map(|&w| graph.hop_distances(w, Direction::Reverse))
                .collect(),
            to_end: end.map(|e| graph.hop_distances(e, Direction::Reverse)),
            waypoints,
            ordered: request.ordered_waypoints,
        }
    }

    fn full_mask(&self) -> u64 {
        match self.waypoints.len() {
            0 => 0,
            MAX_WAYPOINTS => u64::MAX,
            n => (1 << n) - 1,
        }
    }

    /// Coverage after entering `track`.
    fn cover(&self, covered: u64, track: NodeIdx) -> u64 {
        self.waypoints.iter().enumerate().fold(covered, |mask, (i, &waypoint)| {
            let bit = 1 << i;
            if waypoint != track || mask & bit != 0 {
                return mask;
            }
            if self.ordered && mask.count_ones() as usize != i {
                return mask;
            }
            mask | bit
        })
    }

    /// Fewest transitions still needed from `track` to reach every
    /// outstanding target, or `None` if one of them is out of reach.
    fn remaining_hops(&self, track: NodeIdx, covered: u64, require_waypoints: bool) -> Option<u32> {
        let mut hops = 0;
        if require_waypoints {
            for (i, distances) in self.to_waypoint.iter().enumerate() {
                if covered & (1 << i) == 0 {
                    hops = hops.max(distances[track]?);
                }
            }
        }
        if let Some(to_end) = &self.to_end {
            hops = hops.max(to_end[track]?);
        }
        Some(hops)
    }
}

/// Everything one attempt leaves behind.
struct AttemptRun {
    record: AttemptRecord,
    solution: Option<Trail>,
    closest: Trail,
}

/// One rung of the ladder moving through its lifecycle.
struct Attempt {
    plan: AttemptPlan,
    state: AttemptState,
}

impl Attempt {
    const fn new(plan: AttemptPlan) -> Self {
        Self {
            plan,
            state: AttemptState::NotStarted,
        }
    }

    fn begin(&mut self) {
        debug_assert_eq!(self.state, AttemptState::NotStarted);
        debug!(
            "Attempt {:?} x{} started (tolerance {} ms)",
            self.plan.phase, self.plan.factor, self.plan.tolerance_ms
        );
        self.state = AttemptState::Searching;
    }

    fn finish(&mut self, outcome: AttemptOutcome, iterations: usize, best_distance: Option<u64>) -> AttemptRecord {
        debug_assert_eq!(self.state, AttemptState::Searching);
        self.state = match outcome {
            AttemptOutcome::Succeeded => AttemptState::Succeeded,
            _ => AttemptState::Exhausted,
        };
        debug!(
            "Attempt {:?} x{} {:?} after {} iterations (closest {:?} ms off)",
            self.plan.phase, self.plan.factor, outcome, iterations, best_distance
        );
        AttemptRecord {
            phase: self.plan.phase,
            factor: self.plan.factor,
            tolerance_ms: self.plan.tolerance_ms,
            iterations,
            best_duration_distance_ms: best_distance,
            outcome,
        }
    }
}

/// A* search over one snapshot.
pub struct Pathfinder<'g> {
    graph: &'g TrackGraph,
    config: &'g SearchConfig,
    scale: WeightScale,
}

impl<'g> Pathfinder<'g> {
    #[must_use]
    pub fn new(graph: &'g TrackGraph, config: &'g SearchConfig) -> Self {
        Self {
            graph,
            config,
            scale: WeightScale::new(graph.stats(), config.weight_band),
        }
    }

    /// Find a path with no cancellation or deadline.
    ///
    /// # Errors
    ///
    /// See [`Pathfinder::find_with`].
    pub fn find(&self, request: &SearchRequest) -> Result<PathResult> {
        self.find_with(request, &SearchControl::default())
    }

    /// Validate the request, then climb the attempt ladder until one attempt
    /// succeeds.
    ///
    /// An iteration cap or cancellation is not an error: the closest partial
    /// path is returned with a non-verified [`Completion`].
    ///
    /// # Errors
    ///
    /// - [`PathfinderError::InvalidRequest`] for malformed requests
    /// - [`PathfinderError::Rejected`] when pre-flight validation fails
    /// - [`PathfinderError::SearchExhausted`] when every attempt ran dry
    pub fn find_with(&self, request: &SearchRequest, control: &SearchControl) -> Result<PathResult> {
        check_request(request)?;

        let report = reachability::validate(self.graph, request, self.config);
        if !report.is_clear() {
            return Err(PathfinderError::Rejected {
                issues: report.issues.clone(),
                diagnostics: Box::new(report.diagnostics()),
            });
        }
        let Some(start) = report.start else {
            return Err(PathfinderError::InvalidRequest(format!(
                "unknown start track `{}'",
                request.start_track_id
            )));
        };

        let targets = Targets::resolve(self.graph, request, start);
        let mut diagnostics = report.diagnostics();
        let mut closest: Option<(Trail, AttemptPlan)> = None;
        let mut capped = false;

        for plan in plan_attempts(request, self.config) {
            let run = self.run_attempt(request, &targets, plan, control);
            diagnostics.iterations_used += run.iterations();
            diagnostics.attempts.push(run.record.clone());

            if let Some(trail) = run.solution {
                return Ok(self.conclude(request, &targets, trail, plan, Completion::Verified, diagnostics));
            }
            let target = request.target_duration_ms;
            if closest.as_ref().map_or(true, |(best, _)| run.closest.rank(target) < best.rank(target)) {
                closest = Some((run.closest, plan));
            }

            match run.record.outcome {
                AttemptOutcome::Cancelled => {
                    return match closest {
                        Some((trail, plan)) => {
                            Ok(self.conclude(request, &targets, trail, plan, Completion::Cancelled, diagnostics))
                        }
                        None => Err(PathfinderError::SearchExhausted {
                            diagnostics: Box::new(diagnostics),
                        }),
                    };
                }
                AttemptOutcome::IterationCap => capped = true,
                AttemptOutcome::Succeeded | AttemptOutcome::Exhausted => {}
            }
        }

        match closest {
            Some((trail, plan)) if capped => Ok(self.conclude(
                request,
                &targets,
                trail,
                plan,
                Completion::IterationCapReached,
                diagnostics,
            )),
            closest => {
                diagnostics.closest_partial = closest.map(|(trail, _)| self.partial(&trail, &targets));
                debug!(
                    "Search from `{}' exhausted after {} iterations",
                    request.start_track_id, diagnostics.iterations_used
                );
                Err(PathfinderError::SearchExhausted {
                    diagnostics: Box::new(diagnostics),
                })
            }
        }
    }

    fn run_attempt(
        &self,
        request: &SearchRequest,
        targets: &Targets,
        plan: AttemptPlan,
        control: &SearchControl,
    ) -> AttemptRun {
        let mut attempt = Attempt::new(plan);
        attempt.begin();

        let target = request.target_duration_ms;
        let upper = target.saturating_add(plan.tolerance_ms);
        let shortest = self.graph.stats().shortest_duration_ms;
        let required = if plan.require_waypoints { targets.full_mask() } else { 0 };
        // A bucket wider than the window would merge distinct solutions.
        let bucket_ms = self.config.duration_bucket_ms.min(plan.tolerance_ms).max(1);
        let interval = self.config.cancel_check_interval.max(1);

        let mut arena: Vec<SearchNode> = Vec::new();
        let mut open = BinaryHeap::new();
        let mut closed: HashSet<StateKey> = HashSet::new();
        let mut seq: u64 = 0;

        let start_covered = targets.cover(0, targets.start);
        let start_duration = self.graph.node(targets.start).duration_ms;
        arena.push(SearchNode {
            track: targets.start,
            parent: None,
            via: None,
            duration_ms: start_duration,
            covered: start_covered,
            g: -self.config.waypoint_incentive * f64::from((start_covered & required).count_ones()),
            len: 1,
        });
        if let Some(hops) = targets.remaining_hops(targets.start, start_covered & required, plan.require_waypoints) {
            open.push(QueueEntry {
                f: arena[0].g + self.heuristic(target, start_duration, hops),
                seq,
                slot: 0,
            });
            seq += 1;
        }

        let mut best = 0;
        let mut iterations = 0;
        let mut solution = None;

        let outcome = loop {
            if iterations % interval == 0 && control.should_stop() {
                break AttemptOutcome::Cancelled;
            }
            let Some(entry) = open.pop() else {
                break AttemptOutcome::Exhausted;
            };
            let node = arena[entry.slot];
            let key = StateKey {
                track: node.track,
                covered: node.covered & required,
                bucket: node.duration_ms.saturating_add(bucket_ms / 2) / bucket_ms,
            };
            if !closed.insert(key) {
                continue;
            }
            iterations += 1;

            if closer(&node, &arena[best], target) {
                best = entry.slot;
            }
            let accepted = request.within(node.duration_ms, plan.tolerance_ms)
                && node.covered & required == required
                && targets.end.map_or(true, |end| end == node.track);
            if accepted {
                solution = Some(entry.slot);
                break AttemptOutcome::Succeeded;
            }
            if iterations >= self.config.iteration_cap {
                break AttemptOutcome::IterationCap;
            }

            let from = self.graph.node(node.track);
            for neighbor in self.graph.neighbors_of(node.track) {
                let to = self.graph.node(neighbor.node);
                let duration_ms = node.duration_ms.saturating_add(to.duration_ms);
                if duration_ms > upper {
                    continue;
                }
                let normalized = self.scale.normalize(neighbor.weight, neighbor.provenance);
                let score = TransitionScore::between(from, to, normalized, self.config.tempo_penalty_cap);
                if let (Some(limit), Some(diff)) = (request.max_tempo_diff, score.tempo_diff) {
                    if diff > limit {
                        continue;
                    }
                }
                if !self.config.allow_repeats && on_path(&arena, entry.slot, neighbor.node) {
                    continue;
                }
                let covered = targets.cover(node.covered, neighbor.node);
                let Some(hops) = targets.remaining_hops(neighbor.node, covered & required, plan.require_waypoints)
                else {
                    continue;
                };
                if duration_ms.saturating_add(u64::from(hops).saturating_mul(shortest)) > upper {
                    continue;
                }

                let newly_covered = (covered & !node.covered & required).count_ones();
                let g = node.g + score.cost(request.prefer_harmonic_key)
                    - self.config.waypoint_incentive * f64::from(newly_covered);
                trace!(
                    "{} -> {}: g={:.3} duration={} ms",
                    from.id,
                    to.id,
                    g,
                    duration_ms
                );

                arena.push(SearchNode {
                    track: neighbor.node,
                    parent: Some(entry.slot),
                    via: Some((*neighbor, score)),
                    duration_ms,
                    covered,
                    g,
                    len: node.len + 1,
                });
                open.push(QueueEntry {
                    f: g + self.heuristic(target, duration_ms, hops),
                    seq,
                    slot: arena.len() - 1,
                });
                seq += 1;
            }
        };

        let closest = trail(&arena, best);
        let best_distance = closest.duration_ms.abs_diff(target);
        AttemptRun {
            record: attempt.finish(outcome, iterations, Some(best_distance)),
            solution: solution.map(|slot| trail(&arena, slot)),
            closest,
        }
    }

    /// Estimated tracks still needed.
    #[allow(clippy::cast_precision_loss)]
    fn heuristic(&self, target_ms: u64, duration_ms: u64, hops: u32) -> f64 {
        let average = self.graph.stats().average_duration_ms;
        if average <= 0.0 {
            return 0.0;
        }
        let remaining = target_ms.saturating_sub(duration_ms) as f64;
        remaining.max(f64::from(hops) * average) / average
    }

    fn conclude(
        &self,
        request: &SearchRequest,
        targets: &Targets,
        trail: Trail,
        plan: AttemptPlan,
        completion: Completion,
        mut diagnostics: Diagnostics,
    ) -> PathResult {
        let (waypoints_visited, waypoints_skipped) = self.split_waypoints(&trail, targets);
        if completion != Completion::Verified {
            diagnostics.closest_partial = Some(self.partial(&trail, targets));
        }

        let track_ids: Vec<String> = trail.tracks.iter().map(|&t| self.graph.node(t).id.clone()).collect();
        let transitions = trail
            .tracks
            .windows(2)
            .zip(&trail.steps)
            .map(|(pair, (neighbor, score))| Transition {
                from_id: self.graph.node(pair[0]).id.clone(),
                to_id: self.graph.node(pair[1]).id.clone(),
                weight: neighbor.weight,
                normalized_weight: score.normalized_weight,
                provenance: neighbor.provenance,
                key_bonus: score.key_bonus,
                tempo_penalty: score.tempo_penalty,
                tempo_diff: score.tempo_diff,
            })
            .collect();

        debug!(
            "Path from `{}': {} tracks, {} ms ({:?}, {:?})",
            request.start_track_id,
            track_ids.len(),
            trail.duration_ms,
            plan.phase,
            completion
        );

        PathResult {
            track_ids,
            transitions,
            total_duration_ms: trail.duration_ms,
            waypoints_visited,
            waypoints_skipped,
            tolerance_ms: plan.tolerance_ms,
            phase: plan.phase,
            completion,
            diagnostics: Some(diagnostics),
        }
    }

    /// Waypoints appearing on the path, and the rest.
    fn split_waypoints(&self, trail: &Trail, targets: &Targets) -> (Vec<String>, Vec<String>) {
        let (visited, skipped): (Vec<NodeIdx>, Vec<NodeIdx>) =
            targets.waypoints.iter().partition(|w| trail.tracks.contains(*w));
        let ids = |tracks: Vec<NodeIdx>| -> Vec<String> {
            tracks.into_iter().map(|t| self.graph.node(t).id.clone()).collect()
        };
        (ids(visited), ids(skipped))
    }

    fn partial(&self, trail: &Trail, targets: &Targets) -> PartialPath {
        PartialPath {
            track_ids: trail.tracks.iter().map(|&t| self.graph.node(t).id.clone()).collect(),
            total_duration_ms: trail.duration_ms,
            waypoints_covered: self.split_waypoints(trail, targets).0,
        }
    }
}

impl AttemptRun {
    const fn iterations(&self) -> usize {
        self.record.iterations
    }
}

fn check_request(request: &SearchRequest) -> Result<()> {
    if request.target_duration_ms == 0 {
        return Err(PathfinderError::InvalidRequest(
            "target_duration_ms must be greater than zero".to_string(),
        ));
    }
    let waypoints = request.distinct_waypoints().len();
    if waypoints > MAX_WAYPOINTS {
        return Err(PathfinderError::InvalidRequest(format!(
            "at most {MAX_WAYPOINTS} waypoints are supported, got {waypoints}"
        )));
    }
    if let Some(limit) = request.max_tempo_diff {
        if !(limit.is_finite() && limit >= 0.0) {
            return Err(PathfinderError::InvalidRequest(format!(
                "max_tempo_diff must be a non-negative number, got {limit}"
            )));
        }
    }
    Ok(())
}

fn closer(candidate: &SearchNode, best: &SearchNode, target_ms: u64) -> bool {
    let rank = |n: &SearchNode| (n.duration_ms.abs_diff(target_ms), Reverse(n.covered.count_ones()), n.len);
    rank(candidate) < rank(best)
}

fn on_path(arena: &[SearchNode], mut slot: usize, track: NodeIdx) -> bool {
    loop {
        let node = &arena[slot];
        if node.track == track {
            return true;
        }
        match node.parent {
            Some(parent) => slot = parent,
            None => return false,
        }
    }
}

fn trail(arena: &[SearchNode], slot: usize) -> Trail {
    let last = arena[slot];
    let mut tracks = Vec::with_capacity(last.len as usize);
    let mut steps = Vec::with_capacity(tracks.capacity());
    let mut cursor = Some(slot);
    while let Some(current) = cursor {
        let node = &arena[current];
        tracks.push(node.track);
        if let Some(via) = node.via {
            steps.push(via);
        }
        cursor = node.parent;
    }
    tracks.reverse();
    steps.reverse();
    Trail {
        tracks,
        steps,
        duration_ms: last.duration_ms,
        covered: last.covered,
    }
}
