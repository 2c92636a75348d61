//! Error types for pathfinding and configuration.

use crate::request::Diagnostics;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for pathfinding operations.
pub type Result<T> = std::result::Result<T, PathfinderError>;

/// A problem found by the reachability validator before any search runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "track_id", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// The start track has no usable outgoing transition.
    IsolatedStart,
    /// The end track cannot be reached within the hop budget.
    UnreachableEnd,
    /// A waypoint cannot be reached within the hop budget.
    UnreachableWaypoint(String),
    /// The target duration cannot be assembled from this catalog.
    InfeasibleDuration,
    /// A requested track id is not in the snapshot.
    UnknownTrack(String),
}

impl ValidationIssue {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::IsolatedStart => ErrorKind::IsolatedStart,
            Self::UnreachableEnd => ErrorKind::UnreachableEnd,
            Self::UnreachableWaypoint(_) => ErrorKind::UnreachableWaypoint,
            Self::InfeasibleDuration => ErrorKind::InfeasibleDuration,
            Self::UnknownTrack(_) => ErrorKind::UnknownTrack,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsolatedStart => write!(f, "start track has no outgoing transitions"),
            Self::UnreachableEnd => write!(f, "end track is not reachable from the start"),
            Self::UnreachableWaypoint(id) => write!(f, "waypoint `{id}' is not reachable from the start"),
            Self::InfeasibleDuration => write!(f, "target duration is outside the achievable range"),
            Self::UnknownTrack(id) => write!(f, "unknown track `{id}'"),
        }
    }
}

/// Flat classification used in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    IsolatedStart,
    UnreachableEnd,
    UnreachableWaypoint,
    InfeasibleDuration,
    UnknownTrack,
    InvalidRequest,
    SearchExhausted,
    IterationCapReached,
    Cancelled,
}

/// Why no verified path could be produced.
#[derive(Error, Debug)]
pub enum PathfinderError {
    /// The request itself is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Pre-flight validation found problems; no search was run.
    #[error("Request rejected: {}", join_issues(.issues))]
    Rejected {
        issues: Vec<ValidationIssue>,
        diagnostics: Box<Diagnostics>,
    },

    /// Every attempt, including the waypoint-free fallback, failed.
    #[error("Search exhausted after {} iterations", .diagnostics.iterations_used)]
    SearchExhausted { diagnostics: Box<Diagnostics> },
}

impl PathfinderError {
    /// Primary classification: the first issue for rejected requests.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Rejected { issues, .. } => issues.first().map_or(ErrorKind::InvalidRequest, ValidationIssue::kind),
            Self::SearchExhausted { .. } => ErrorKind::SearchExhausted,
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::InvalidRequest(_) => None,
            Self::Rejected { diagnostics, .. } | Self::SearchExhausted { diagnostics } => Some(diagnostics),
        }
    }

    /// True if `issue` was among the pre-flight problems.
    #[must_use]
    pub fn has_issue(&self, issue: &ValidationIssue) -> bool {
        matches!(self, Self::Rejected { issues, .. } if issues.contains(issue))
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Rejected engine configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("tolerance ladder must not be empty")]
    EmptyLadder,

    #[error("tolerance ladder must be positive and strictly increasing, got {0:?}")]
    UnorderedLadder(Vec<f64>),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("weight band must satisfy 0 <= low < high, got [{low}, {high}]")]
    InvalidBand { low: f64, high: f64 },

    #[error("synthetic weight multiplier must be at least 1.0, got {0}")]
    Multiplier(f64),

    #[error("projection index needs 1+ tables and 1..=32 bits, got {tables} tables of {bits} bits")]
    Projection { tables: usize, bits: usize },
}
