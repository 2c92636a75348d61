//! # Reachability Validator
//!
//! A cheap pre-flight pass that rejects impossible requests before the
//! search spends its iteration budget on them. One forward BFS from the start
//! yields hop distances; everything else is arithmetic over snapshot stats.
//!
//! All problems are collected in a single pass so callers can fix every issue
//! at once.

use crate::config::SearchConfig;
use crate::error::ValidationIssue;
use crate::graph::{ComponentStats, Direction, NodeIdx, TrackGraph};
use crate::request::{Diagnostics, SearchRequest, WaypointReachability};
use log::{debug, warn};

/// Outcome of validating one request against one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachabilityReport {
    pub start: Option<NodeIdx>,
    pub start_connectivity: usize,
    pub end_reachable: bool,
    pub waypoints: Vec<WaypointReachability>,
    /// Transitions a path can hold within the widest tolerance window.
    pub max_hops: u32,
    /// Widest tolerance the request can be granted.
    pub tolerance_ceiling_ms: u64,
    pub components: ComponentStats,
    pub issues: Vec<ValidationIssue>,
}

impl ReachabilityReport {
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.issues.is_empty()
    }

    /// Seed the diagnostics payload with this report's findings.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            start_connectivity: self.start_connectivity,
            end_reachable: self.end_reachable,
            waypoints_reachable: self.waypoints.clone(),
            connected_components: self.components.count,
            largest_component_size: self.components.largest,
            max_hops: self.max_hops,
            issues: self.issues.clone(),
            ..Diagnostics::default()
        }
    }
}

/// Widest tolerance a request may be granted.
///
/// Waypoint requests may climb the whole relaxation ladder; requests without
/// waypoints only get the base tolerance.
#[must_use]
pub fn tolerance_ceiling(request: &SearchRequest, config: &SearchConfig) -> u64 {
    if request.waypoint_track_ids.is_empty() {
        request.tolerance_at(config.base_factor())
    } else {
        request.tolerance_at(config.widest_factor())
    }
}

/// Validate `request` against `graph`.
#[must_use]
pub fn validate(graph: &TrackGraph, request: &SearchRequest, config: &SearchConfig) -> ReachabilityReport {
    let components = graph.components();
    let tolerance_ceiling_ms = tolerance_ceiling(request, config);

    let Some(start) = graph.idx(&request.start_track_id) else {
        warn!("Rejecting request: unknown start track `{}'", request.start_track_id);
        return ReachabilityReport {
            start: None,
            start_connectivity: 0,
            end_reachable: false,
            waypoints: Vec::new(),
            max_hops: 0,
            tolerance_ceiling_ms,
            components,
            issues: vec![ValidationIssue::UnknownTrack(request.start_track_id.clone())],
        };
    };

    let mut issues = Vec::new();
    let stats = graph.stats();
    let target = request.target_duration_ms;
    let max_hops = hop_budget(target, tolerance_ceiling_ms, stats.shortest_duration_ms);
    let distances = graph.hop_distances(start, Direction::Forward);
    let within_budget = |idx: NodeIdx| distances[idx].filter(|&d| d <= max_hops);

    let start_connectivity = graph.neighbors_of(start).len();
    if start_connectivity == 0 && !start_alone_suffices(graph, start, request, tolerance_ceiling_ms) {
        issues.push(ValidationIssue::IsolatedStart);
    }

    let end_reachable = match request.end_track_id.as_deref() {
        None => true,
        Some(end_id) => match graph.idx(end_id) {
            None => {
                issues.push(ValidationIssue::UnknownTrack(end_id.to_string()));
                false
            }
            Some(end) => {
                let reachable = within_budget(end).is_some();
                if !reachable {
                    issues.push(ValidationIssue::UnreachableEnd);
                }
                reachable
            }
        },
    };

    let waypoints = request
        .distinct_waypoints()
        .into_iter()
        .map(|id| {
            let Some(idx) = graph.idx(id) else {
                issues.push(ValidationIssue::UnknownTrack(id.to_string()));
                return WaypointReachability {
                    id: id.to_string(),
                    reachable: false,
                    hops: None,
                };
            };
            let reachable = within_budget(idx).is_some();
            if !reachable {
                issues.push(ValidationIssue::UnreachableWaypoint(id.to_string()));
            }
            WaypointReachability {
                id: id.to_string(),
                reachable,
                hops: distances[idx],
            }
        })
        .collect();

    let too_short = target.saturating_add(tolerance_ceiling_ms) < stats.shortest_duration_ms;
    let too_long = target.saturating_sub(tolerance_ceiling_ms) > stats.total_duration_ms;
    // Without repeats a loop back to the start can only be the start alone.
    let loop_misses = !config.allow_repeats
        && returns_to_start(request)
        && !request.within(graph.node(start).duration_ms, tolerance_ceiling_ms);
    if too_short || too_long || loop_misses {
        issues.push(ValidationIssue::InfeasibleDuration);
    }

    if issues.is_empty() {
        debug!(
            "Request from `{}' passed validation (max {} hops, tolerance ceiling {} ms)",
            request.start_track_id, max_hops, tolerance_ceiling_ms
        );
    } else {
        warn!("Rejecting request from `{}': {:?}", request.start_track_id, issues);
    }

    ReachabilityReport {
        start: Some(start),
        start_connectivity,
        end_reachable,
        waypoints,
        max_hops,
        tolerance_ceiling_ms,
        components,
        issues,
    }
}

/// Largest number of transitions that fit in `target + tolerance` when every
/// track is as short as the shortest one in the catalog.
#[must_use]
pub fn hop_budget(target_ms: u64, tolerance_ms: u64, shortest_ms: u64) -> u32 {
    if shortest_ms == 0 {
        return 0;
    }
    let max_tracks = target_ms.saturating_add(tolerance_ms) / shortest_ms;
    u32::try_from(max_tracks.saturating_sub(1)).unwrap_or(u32::MAX)
}

/// A one-track path made of the start alone would satisfy the request.
fn start_alone_suffices(graph: &TrackGraph, start: NodeIdx, request: &SearchRequest, tolerance_ms: u64) -> bool {
    let start_id = request.start_track_id.as_str();
    let end_ok = request.end_track_id.as_deref().map_or(true, |end| end == start_id);
    end_ok && only_start_waypoints(request) && request.within(graph.node(start).duration_ms, tolerance_ms)
}

/// The request ends where it starts and names no other waypoint.
fn returns_to_start(request: &SearchRequest) -> bool {
    request.end_track_id.as_deref() == Some(request.start_track_id.as_str()) && only_start_waypoints(request)
}

fn only_start_waypoints(request: &SearchRequest) -> bool {
    request.waypoint_track_ids.iter().all(|w| *w == request.start_track_id)
}
