//! # Configuration Module
//!
//! Engine tuning is injected as an [`EngineConfig`] value rather than read
//! from ambient state. It can be built in code, or loaded from a JSON file
//! (by default `engine.json` in the platform config directory):
//!
//! - Linux: `~/.config/segue/engine.json`
//! - macOS: `~/Library/Application Support/segue/engine.json`
//! - Windows: `%APPDATA%\segue\engine.json`
//!
//! Every field has a default, so a config file only needs the knobs it
//! changes.

use crate::error::ConfigError;
use crate::scoring::{WeightBand, DEFAULT_TEMPO_PENALTY_CAP};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How connectivity repair finds nearest neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborStrategy {
    /// Brute-force scan over every track.
    Exact,
    /// Seeded random-hyperplane hashing with exact refinement.
    Projection,
}

/// Connectivity repair knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Neighbours linked per under-connected track (k).
    pub neighbor_count: usize,
    /// Tracks with fewer real outgoing edges than this get synthetic ones.
    pub min_real_degree: usize,
    /// Synthetic weight as a multiple of the largest real weight.
    pub synthetic_weight_multiplier: f64,
    /// Penalise neighbours of a different genre.
    pub use_genre: bool,
    /// Distance added when genres differ (or one is missing).
    pub genre_penalty: f64,
    pub strategy: NeighborStrategy,
    /// Seed for the projection index hyperplanes.
    pub ann_seed: u64,
    /// Graphs up to this size are always scanned exactly.
    pub exact_scan_limit: usize,
    pub projection_tables: usize,
    pub projection_bits: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            neighbor_count: 5,
            min_real_degree: 10,
            synthetic_weight_multiplier: 5.0,
            use_genre: false,
            genre_penalty: 0.5,
            strategy: NeighborStrategy::Projection,
            ann_seed: 0x5E6E_0001,
            exact_scan_limit: 2048,
            projection_tables: 4,
            projection_bits: 6,
        }
    }
}

/// Search engine knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Tolerance multipliers tried in order while waypoints are required.
    pub tolerance_ladder: Vec<f64>,
    /// Node expansions allowed per attempt.
    pub iteration_cap: usize,
    /// Duration quantization of the visited-state key.
    pub duration_bucket_ms: u64,
    /// Cost reduction granted the first time a waypoint is covered.
    pub waypoint_incentive: f64,
    /// Iterations between cancellation and deadline checks.
    pub cancel_check_interval: usize,
    /// Whether one path may contain the same track twice.
    pub allow_repeats: bool,
    /// Run a last waypoint-free attempt after the ladder is exhausted.
    pub drop_waypoints_on_exhaustion: bool,
    pub weight_band: WeightBand,
    pub tempo_penalty_cap: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tolerance_ladder: vec![1.0, 1.5, 2.0, 3.0],
            iteration_cap: 10_000,
            duration_bucket_ms: 30_000,
            waypoint_incentive: 1.0,
            cancel_check_interval: 100,
            allow_repeats: false,
            drop_waypoints_on_exhaustion: true,
            weight_band: WeightBand::default(),
            tempo_penalty_cap: DEFAULT_TEMPO_PENALTY_CAP,
        }
    }
}

impl SearchConfig {
    /// Widest tolerance multiplier on the ladder.
    #[must_use]
    pub fn widest_factor(&self) -> f64 {
        self.tolerance_ladder.last().copied().unwrap_or(1.0)
    }

    /// Narrowest tolerance multiplier on the ladder.
    #[must_use]
    pub fn base_factor(&self) -> f64 {
        self.tolerance_ladder.first().copied().unwrap_or(1.0)
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub repair: RepairConfig,
    pub search: SearchConfig,
}

impl EngineConfig {
    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid JSON, or holds values
    /// rejected by [`EngineConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config at {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid engine config JSON in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from the default location if a file
    /// exists there, else fall back to built-in defaults.
    ///
    /// # Errors
    ///
    /// Propagates [`EngineConfig::load`] failures for a file that exists.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => {
                log::debug!("Using engine config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Check that the values make sense together.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let search = &self.search;
        if search.tolerance_ladder.is_empty() {
            return Err(ConfigError::EmptyLadder);
        }
        let ordered = search.tolerance_ladder.windows(2).all(|pair| pair[0] < pair[1]);
        let sane = search.tolerance_ladder.iter().all(|f| f.is_finite() && *f > 0.0);
        if !ordered || !sane {
            return Err(ConfigError::UnorderedLadder(search.tolerance_ladder.clone()));
        }
        if search.iteration_cap == 0 {
            return Err(ConfigError::Zero("search.iteration_cap"));
        }
        if search.duration_bucket_ms == 0 {
            return Err(ConfigError::Zero("search.duration_bucket_ms"));
        }
        if search.cancel_check_interval == 0 {
            return Err(ConfigError::Zero("search.cancel_check_interval"));
        }
        if !(search.weight_band.low >= 0.0 && search.weight_band.low < search.weight_band.high) {
            return Err(ConfigError::InvalidBand {
                low: search.weight_band.low,
                high: search.weight_band.high,
            });
        }

        let repair = &self.repair;
        if repair.neighbor_count == 0 {
            return Err(ConfigError::Zero("repair.neighbor_count"));
        }
        if !(repair.synthetic_weight_multiplier.is_finite() && repair.synthetic_weight_multiplier >= 1.0) {
            return Err(ConfigError::Multiplier(repair.synthetic_weight_multiplier));
        }
        if repair.strategy == NeighborStrategy::Projection
            && (repair.projection_tables == 0 || repair.projection_bits == 0 || repair.projection_bits > 32)
        {
            return Err(ConfigError::Projection {
                tables: repair.projection_tables,
                bits: repair.projection_bits,
            });
        }
        Ok(())
    }
}

/// Platform-appropriate location of the engine config file.
///
/// Returns `None` when the platform has no config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("segue").join("engine.json"))
}
