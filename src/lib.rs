//! Duration-aware track transition pathfinding.
//!
//! Given a catalog of tracks and the transitions DJs have actually played
//! between them, Segue finds an ordered path from a start track that fills a
//! target duration, optionally ends on a given track, and passes through a set
//! of waypoint tracks, preferring harmonic and tempo-smooth transitions.
//!
//! Core modules:
//! - [`graph`] - Immutable adjacency snapshot
//! - [`scoring`] - Key, tempo and weight scoring of one transition
//! - [`repair`] - Synthetic edges for under-connected tracks
//! - [`reachability`] - Pre-flight request validation
//! - [`search`] - A* with a relaxation ladder
//! - [`engine`] - Snapshot-swapping facade over the above
//!
//! ### Supporting Modules
//!
//! - [`config`] - Engine configuration
//! - [`catalog`] - JSON and SQLite catalog loading
//! - [`request`] - Wire request/response types
//! - [`cli`] / [`completion`] - Command-line harness
//!
//! ## Quick Start Example
//!
//! ```
//! use segue::config::EngineConfig;
//! use segue::engine::Engine;
//! use segue::request::SearchRequest;
//! use segue::track::{Edge, TrackNode};
//!
//! let tracks = vec![
//!     TrackNode::new("opener", 300_000),
//!     TrackNode::new("builder", 300_000),
//!     TrackNode::new("peak", 300_000),
//! ];
//! let transitions = vec![Edge::real("opener", "builder", 4.0), Edge::real("builder", "peak", 2.0)];
//! let engine = Engine::new(EngineConfig::default(), tracks, &transitions);
//!
//! let request = SearchRequest::new("opener", 900_000, 30_000).ending_at("peak");
//! let path = engine.find(&request)?;
//! assert_eq!(path.track_ids, vec!["opener", "builder", "peak"]);
//! # Ok::<(), segue::error::PathfinderError>(())
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`error::PathfinderError`]: pre-flight problems
//! (isolated start, unreachable end or waypoints, infeasible duration, unknown
//! tracks) are reported together before any search runs. Hitting the
//! iteration cap or being cancelled is not an error: the closest partial path
//! comes back flagged as approximate. Loading catalogs and configuration uses
//! `anyhow::Result`.

pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod reachability;
pub mod repair;
pub mod request;
pub mod scoring;
pub mod search;
pub mod snapshot;
pub mod track;
