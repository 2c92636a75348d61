//! # Track and Edge Model
//!
//! Plain data carried by a graph snapshot. Metadata that catalogs frequently
//! lack (tempo, key, genre) is modelled as `Option`; the scorer treats absence
//! as "no bonus, no penalty".

use serde::{Deserialize, Serialize};

/// Number of positions on the key wheel.
pub const KEY_WHEEL_SIZE: u8 = 12;

/// Major or minor mode of a key-wheel position.
///
/// Camelot notation writes these as `B` and `A` respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    Major,
    Minor,
}

impl KeyMode {
    /// Parse loose catalog spellings (`major`, `maj`, `B`, `minor`, `min`, `A`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "major" | "maj" | "b" => Some(Self::Major),
            "minor" | "min" | "a" | "m" => Some(Self::Minor),
            _ => None,
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Major => Self::Minor,
            Self::Minor => Self::Major,
        }
    }
}

/// A track in the co-occurrence graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackNode {
    pub id: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub tempo: Option<f64>,
    /// Key-wheel position, 1 through 12.
    #[serde(default)]
    pub key_code: Option<u8>,
    #[serde(default)]
    pub key_mode: Option<KeyMode>,
    #[serde(default)]
    pub genre: Option<String>,
}

impl TrackNode {
    /// Create a track with no optional metadata.
    pub fn new(id: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            duration_ms,
            tempo: None,
            key_code: None,
            key_mode: None,
            genre: None,
        }
    }

    #[must_use]
    pub fn with_tempo(mut self, tempo: f64) -> Self {
        self.tempo = Some(tempo);
        self
    }

    #[must_use]
    pub fn with_key(mut self, key_code: u8, mode: KeyMode) -> Self {
        self.key_code = Some(key_code);
        self.key_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// Tempo if present, finite and positive.
    #[must_use]
    pub fn usable_tempo(&self) -> Option<f64> {
        self.tempo.filter(|t| t.is_finite() && *t > 0.0)
    }

    /// Key-wheel position if present and on the wheel.
    #[must_use]
    pub fn usable_key(&self) -> Option<u8> {
        self.key_code.filter(|k| (1..=KEY_WHEEL_SIZE).contains(k))
    }
}

/// Where an edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Observed adjacency in a real set or playlist.
    #[default]
    Real,
    /// Added by connectivity repair.
    Synthetic,
}

/// A directed, weighted transition between two tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,
    pub weight: f64,
    #[serde(default)]
    pub provenance: Provenance,
}

impl Edge {
    pub fn real(from: impl Into<String>, to: impl Into<String>, weight: f64) -> Self {
        Self {
            from_id: from.into(),
            to_id: to.into(),
            weight,
            provenance: Provenance::Real,
        }
    }

    pub fn synthetic(from: impl Into<String>, to: impl Into<String>, weight: f64) -> Self {
        Self {
            from_id: from.into(),
            to_id: to.into(),
            weight,
            provenance: Provenance::Synthetic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mode_parsing() {
        assert_eq!(KeyMode::parse("Major"), Some(KeyMode::Major));
        assert_eq!(KeyMode::parse(" B "), Some(KeyMode::Major));
        assert_eq!(KeyMode::parse("min"), Some(KeyMode::Minor));
        assert_eq!(KeyMode::parse("A"), Some(KeyMode::Minor));
        assert_eq!(KeyMode::parse("dorian"), None);
    }

    #[test]
    fn test_usable_metadata_filters_garbage() {
        let track = TrackNode {
            tempo: Some(f64::NAN),
            key_code: Some(13),
            ..TrackNode::new("t", 1000)
        };
        assert_eq!(track.usable_tempo(), None);
        assert_eq!(track.usable_key(), None);

        let track = TrackNode::new("t", 1000).with_tempo(124.0).with_key(8, KeyMode::Minor);
        assert_eq!(track.usable_tempo(), Some(124.0));
        assert_eq!(track.usable_key(), Some(8));
    }

    #[test]
    fn test_edge_deserializes_with_default_provenance() {
        let edge: Edge = serde_json::from_str(r#"{"from_id":"a","to_id":"b","weight":0.5}"#)
            .expect("edge should parse");
        assert_eq!(edge.provenance, Provenance::Real);
    }
}
