//! # Request and Response Types
//!
//! The serde shapes exchanged with whatever layer exposes the engine (an RPC
//! handler, the bundled CLI, tests). Field names are the wire names.

use crate::error::{ErrorKind, PathfinderError, ValidationIssue};
use crate::search::{AttemptRecord, Completion, PathResult};
use crate::track::Provenance;
use serde::{Deserialize, Serialize};

/// A pathfinding request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub start_track_id: String,
    #[serde(default)]
    pub end_track_id: Option<String>,
    /// Tracks the path must visit. Unordered unless `ordered_waypoints`.
    #[serde(default)]
    pub waypoint_track_ids: Vec<String>,
    pub target_duration_ms: u64,
    #[serde(default)]
    pub tolerance_ms: u64,
    #[serde(default)]
    pub prefer_harmonic_key: bool,
    #[serde(default)]
    pub max_tempo_diff: Option<f64>,
    /// Waypoints must be visited in the listed order.
    #[serde(default)]
    pub ordered_waypoints: bool,
}

impl SearchRequest {
    pub fn new(start: impl Into<String>, target_duration_ms: u64, tolerance_ms: u64) -> Self {
        Self {
            start_track_id: start.into(),
            end_track_id: None,
            waypoint_track_ids: Vec::new(),
            target_duration_ms,
            tolerance_ms,
            prefer_harmonic_key: false,
            max_tempo_diff: None,
            ordered_waypoints: false,
        }
    }

    #[must_use]
    pub fn ending_at(mut self, end: impl Into<String>) -> Self {
        self.end_track_id = Some(end.into());
        self
    }

    #[must_use]
    pub fn via<I, S>(mut self, waypoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.waypoint_track_ids = waypoints.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn harmonic(mut self, prefer: bool) -> Self {
        self.prefer_harmonic_key = prefer;
        self
    }

    #[must_use]
    pub const fn max_tempo_diff(mut self, diff: f64) -> Self {
        self.max_tempo_diff = Some(diff);
        self
    }

    #[must_use]
    pub const fn ordered(mut self, ordered: bool) -> Self {
        self.ordered_waypoints = ordered;
        self
    }

    /// Waypoint ids with duplicates removed, first occurrence kept.
    #[must_use]
    pub fn distinct_waypoints(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.waypoint_track_ids
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Base tolerance scaled by a ladder factor.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn tolerance_at(&self, factor: f64) -> u64 {
        (self.tolerance_ms as f64 * factor).round() as u64
    }

    /// True if the duration lies inside `target ± tolerance`.
    #[must_use]
    pub const fn within(&self, duration_ms: u64, tolerance_ms: u64) -> bool {
        duration_ms.abs_diff(self.target_duration_ms) <= tolerance_ms
    }
}

/// Reachability of one requested waypoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaypointReachability {
    pub id: String,
    pub reachable: bool,
    /// Shortest hop count from the start, if connected at all.
    pub hops: Option<u32>,
}

/// A path prefix kept for diagnostics when nothing verified was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialPath {
    pub track_ids: Vec<String>,
    pub total_duration_ms: u64,
    pub waypoints_covered: Vec<String>,
}

/// Why a request failed, or how close it came.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub start_connectivity: usize,
    pub end_reachable: bool,
    pub waypoints_reachable: Vec<WaypointReachability>,
    pub connected_components: usize,
    pub largest_component_size: usize,
    pub iterations_used: usize,
    /// Transitions a path can hold within the widest tolerance window.
    pub max_hops: u32,
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
    #[serde(default)]
    pub closest_partial: Option<PartialPath>,
}

/// One entry of the response path. Transition fields describe the move
/// *into* this track and are `None` for the first track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub track_id: String,
    pub transition_weight: Option<f64>,
    pub key_compatibility: Option<f64>,
    pub tempo_diff: Option<f64>,
    #[serde(default)]
    pub provenance: Option<Provenance>,
}

/// The engine's answer as sent back to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathfinderResponse {
    pub success: bool,
    /// A best-effort partial path rather than a verified one.
    pub approximate: bool,
    pub error: Option<ErrorKind>,
    pub message: Option<String>,
    pub path: Vec<PathStep>,
    pub total_duration_ms: u64,
    /// Tolerance window of the attempt that produced the path.
    pub tolerance_ms: Option<u64>,
    pub waypoints_visited: Vec<String>,
    pub waypoints_skipped: Vec<String>,
    pub diagnostics: Option<Diagnostics>,
}

impl PathfinderResponse {
    /// Flatten an engine outcome into the wire shape.
    #[must_use]
    pub fn from_outcome(outcome: Result<PathResult, PathfinderError>) -> Self {
        match outcome {
            Ok(result) => Self::from_result(result),
            Err(error) => Self {
                success: false,
                error: Some(error.kind()),
                message: Some(error.to_string()),
                diagnostics: error.diagnostics().cloned(),
                ..Self::default()
            },
        }
    }

    fn from_result(result: PathResult) -> Self {
        let path = result
            .track_ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let incoming = i.checked_sub(1).and_then(|t| result.transitions.get(t));
                PathStep {
                    track_id: id.clone(),
                    transition_weight: incoming.map(|t| t.weight),
                    key_compatibility: incoming.map(|t| t.key_bonus),
                    tempo_diff: incoming.and_then(|t| t.tempo_diff),
                    provenance: incoming.map(|t| t.provenance),
                }
            })
            .collect();

        let (error, message) = match result.completion {
            Completion::Verified => (None, None),
            Completion::IterationCapReached => (
                Some(ErrorKind::IterationCapReached),
                Some("Iteration cap reached; returning the closest partial path".to_string()),
            ),
            Completion::Cancelled => (
                Some(ErrorKind::Cancelled),
                Some("Search cancelled; returning the closest partial path".to_string()),
            ),
        };

        Self {
            success: result.completion == Completion::Verified,
            approximate: result.completion != Completion::Verified,
            error,
            message,
            path,
            total_duration_ms: result.total_duration_ms,
            tolerance_ms: Some(result.tolerance_ms),
            waypoints_visited: result.waypoints_visited,
            waypoints_skipped: result.waypoints_skipped,
            diagnostics: result.diagnostics,
        }
    }
}
