//! # Compatibility Scoring
//!
//! Pure functions judging how well one track flows into the next.
//!
//! - [`key_bonus`] rewards harmonic neighbours on the key wheel
//! - [`tempo_penalty`] punishes tempo jumps quadratically
//! - [`WeightScale`] squeezes raw co-occurrence weights onto a narrow band so
//!   they never outweigh the duration heuristic
//!
//! Missing metadata on either side scores as neutral: no bonus, no penalty.
//! Incompletely tagged tracks are common and must not be starved by the search.

use crate::graph::GraphStats;
use crate::track::{KeyMode, Provenance, TrackNode, KEY_WHEEL_SIZE};
use serde::{Deserialize, Serialize};

/// Bonus for an identical key and mode.
pub const SAME_KEY_BONUS: f64 = 0.3;

/// Bonus for an adjacent wheel position or the relative major/minor.
pub const NEIGHBOR_KEY_BONUS: f64 = 0.2;

/// Default ceiling for [`tempo_penalty`].
pub const DEFAULT_TEMPO_PENALTY_CAP: f64 = 1.0;

/// Harmonic compatibility bonus in `[0, 0.3]`.
///
/// ```
/// use segue::scoring::key_bonus;
/// use segue::track::KeyMode;
///
/// assert_eq!(key_bonus(Some(8), Some(KeyMode::Minor), Some(8), Some(KeyMode::Minor)), 0.3);
/// assert_eq!(key_bonus(Some(8), Some(KeyMode::Minor), Some(9), Some(KeyMode::Minor)), 0.2);
/// assert_eq!(key_bonus(Some(8), Some(KeyMode::Minor), Some(8), Some(KeyMode::Major)), 0.2);
/// assert_eq!(key_bonus(Some(8), Some(KeyMode::Minor), None, Some(KeyMode::Major)), 0.0);
/// ```
#[must_use]
pub fn key_bonus(
    key_a: Option<u8>,
    mode_a: Option<KeyMode>,
    key_b: Option<u8>,
    mode_b: Option<KeyMode>,
) -> f64 {
    let (Some(key_a), Some(mode_a), Some(key_b), Some(mode_b)) = (key_a, mode_a, key_b, mode_b)
    else {
        return 0.0;
    };
    if !on_wheel(key_a) || !on_wheel(key_b) {
        return 0.0;
    }

    match (wheel_distance(key_a, key_b), mode_a == mode_b) {
        (0, true) => SAME_KEY_BONUS,
        (1, true) | (0, false) => NEIGHBOR_KEY_BONUS,
        _ => 0.0,
    }
}

/// Quadratic tempo penalty `((a - b) / 100)^2`, clamped to `cap`.
///
/// Returns 0 when either tempo is unknown.
#[must_use]
pub fn tempo_penalty(tempo_a: Option<f64>, tempo_b: Option<f64>, cap: f64) -> f64 {
    tempo_diff(tempo_a, tempo_b).map_or(0.0, |diff| ((diff / 100.0).powi(2)).min(cap))
}

/// Absolute tempo difference when both tempos are known.
#[must_use]
pub fn tempo_diff(tempo_a: Option<f64>, tempo_b: Option<f64>) -> Option<f64> {
    match (usable(tempo_a), usable(tempo_b)) {
        (Some(a), Some(b)) => Some((a - b).abs()),
        _ => None,
    }
}

#[inline]
fn usable(tempo: Option<f64>) -> Option<f64> {
    tempo.filter(|t| t.is_finite() && *t > 0.0)
}

#[inline]
const fn on_wheel(key: u8) -> bool {
    key >= 1 && key <= KEY_WHEEL_SIZE
}

/// Circular distance between two wheel positions, 0 through 6.
#[inline]
const fn wheel_distance(a: u8, b: u8) -> u8 {
    let forward = (a + KEY_WHEEL_SIZE - b) % KEY_WHEEL_SIZE;
    let backward = KEY_WHEEL_SIZE - forward;
    if forward < backward {
        forward
    } else {
        backward % KEY_WHEEL_SIZE
    }
}

/// Target band for normalized real edge weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBand {
    pub low: f64,
    pub high: f64,
}

impl Default for WeightBand {
    fn default() -> Self {
        Self { low: 0.01, high: 0.15 }
    }
}

/// Maps raw edge weights of one snapshot onto the [`WeightBand`].
///
/// Real weights are min-max scaled into the band. Synthetic weights are
/// generated above the real maximum, so they are scaled linearly past the
/// band's top and always cost more than any real transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightScale {
    band: WeightBand,
    real_min: f64,
    real_max: f64,
}

impl WeightScale {
    #[must_use]
    pub fn new(stats: &GraphStats, band: WeightBand) -> Self {
        let (real_min, real_max) = stats.real_weight_range.unwrap_or((0.0, 1.0));
        Self { band, real_min, real_max }
    }

    #[must_use]
    pub fn normalize(&self, weight: f64, provenance: Provenance) -> f64 {
        match provenance {
            Provenance::Real => {
                let span = self.real_max - self.real_min;
                if span <= f64::EPSILON {
                    return self.band.low;
                }
                let ratio = ((weight - self.real_min) / span).clamp(0.0, 1.0);
                self.band.low + ratio * (self.band.high - self.band.low)
            }
            Provenance::Synthetic => {
                let reference = if self.real_max > f64::EPSILON { self.real_max } else { 1.0 };
                (self.band.high * weight / reference).max(self.band.high)
            }
        }
    }
}

/// Everything the search needs to know about one candidate transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionScore {
    pub normalized_weight: f64,
    pub key_bonus: f64,
    pub tempo_penalty: f64,
    pub tempo_diff: Option<f64>,
}

impl TransitionScore {
    /// Score the move `from -> to` over an edge of the given normalized weight.
    #[must_use]
    pub fn between(from: &TrackNode, to: &TrackNode, normalized_weight: f64, tempo_cap: f64) -> Self {
        Self {
            normalized_weight,
            key_bonus: key_bonus(from.key_code, from.key_mode, to.key_code, to.key_mode),
            tempo_penalty: tempo_penalty(from.tempo, to.tempo, tempo_cap),
            tempo_diff: tempo_diff(from.tempo, to.tempo),
        }
    }

    /// Edge cost contribution to `g`. The key bonus only counts when the
    /// caller asked for harmonic mixing.
    #[must_use]
    pub fn cost(&self, prefer_harmonic: bool) -> f64 {
        let bonus = if prefer_harmonic { self.key_bonus } else { 0.0 };
        self.normalized_weight - bonus + self.tempo_penalty
    }
}
