//! # Catalog Loading
//!
//! Reads tracks and observed transitions from disk. Two formats are
//! understood:
//!
//! - JSON: `{ "tracks": [...], "transitions": [...] }`
//! - SQLite: tables `tracks` and `transitions`
//!
//! ```sql
//! CREATE TABLE tracks (
//!     id          TEXT PRIMARY KEY,
//!     duration_ms INTEGER NOT NULL,
//!     tempo       REAL,
//!     key_code    INTEGER,
//!     key_mode    TEXT,     -- 'major' / 'minor'
//!     genre       TEXT
//! );
//! CREATE TABLE transitions (
//!     from_id TEXT NOT NULL,
//!     to_id   TEXT NOT NULL,
//!     weight  REAL NOT NULL
//! );
//! ```
//!
//! Transitions read from disk are always real. Synthetic edges only ever come
//! from connectivity repair.

use crate::track::{Edge, KeyMode, Provenance, TrackNode};
use anyhow::{bail, Context, Result};
use log::{debug, trace};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Tracks plus the transitions observed between them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub tracks: Vec<TrackNode>,
    #[serde(default)]
    pub transitions: Vec<Edge>,
}

impl Catalog {
    /// Load a catalog, picking the format from the file extension
    /// (`.json`, otherwise SQLite).
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
            _ => load_sqlite(path),
        }
    }

    /// Add the reverse of every transition that has none, with the same
    /// weight. For sources that record co-occurrence without direction.
    #[must_use]
    pub fn symmetrized(mut self) -> Self {
        let present: HashSet<(String, String)> = self
            .transitions
            .iter()
            .map(|e| (e.from_id.clone(), e.to_id.clone()))
            .collect();
        let reversed: Vec<Edge> = self
            .transitions
            .iter()
            .filter(|e| !present.contains(&(e.to_id.clone(), e.from_id.clone())))
            .map(|e| Edge {
                from_id: e.to_id.clone(),
                to_id: e.from_id.clone(),
                weight: e.weight,
                provenance: e.provenance,
            })
            .collect();
        debug!("Symmetrizing catalog added {} transitions", reversed.len());
        self.transitions.extend(reversed);
        self
    }
}

/// Read a JSON catalog.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a valid catalog document.
pub fn load_json(path: &Path) -> Result<Catalog> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read catalog at {}", path.display()))?;
    let mut catalog: Catalog =
        serde_json::from_str(&raw).with_context(|| format!("Invalid catalog JSON in {}", path.display()))?;
    for edge in &mut catalog.transitions {
        edge.provenance = Provenance::Real;
    }
    debug!(
        "Loaded {} tracks and {} transitions from {}",
        catalog.tracks.len(),
        catalog.transitions.len(),
        path.display()
    );
    Ok(catalog)
}

/// Read a SQLite catalog, opened read-only.
///
/// # Errors
///
/// Fails if the database cannot be opened, lacks the expected tables, or
/// holds rows of the wrong shape (e.g. an unknown `key_mode`).
pub fn load_sqlite(path: &Path) -> Result<Catalog> {
    if !path.exists() {
        bail!("Catalog database not found at {}", path.display());
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open catalog database at {}", path.display()))?;

    let tracks = read_tracks(&conn).with_context(|| format!("Cannot read tracks from {}", path.display()))?;
    let transitions =
        read_transitions(&conn).with_context(|| format!("Cannot read transitions from {}", path.display()))?;

    debug!(
        "Loaded {} tracks and {} transitions from {}",
        tracks.len(),
        transitions.len(),
        path.display()
    );
    Ok(Catalog { tracks, transitions })
}

fn read_tracks(conn: &Connection) -> Result<Vec<TrackNode>> {
    let mut stmt = conn
        .prepare("SELECT id, duration_ms, tempo, key_code, key_mode, genre FROM tracks ORDER BY rowid")
        .context("Invalid SQL statement when SELECTing tracks")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })
        .context("Cannot query tracks")?;

    let mut tracks = Vec::new();
    for row in rows {
        let (id, duration_ms, tempo, key_code, key_mode, genre) = row.context("Queried track row is malformed")?;
        let key_mode = match key_mode.as_deref() {
            None => None,
            Some(raw) => Some(KeyMode::parse(raw).with_context(|| format!("Track `{id}' has unknown key mode `{raw}'"))?),
        };
        trace!("Track {id}: {duration_ms} ms");
        tracks.push(TrackNode {
            duration_ms: u64::try_from(duration_ms).unwrap_or(0),
            tempo,
            key_code: key_code.and_then(|k| u8::try_from(k).ok()),
            key_mode,
            genre,
            id,
        });
    }
    Ok(tracks)
}

fn read_transitions(conn: &Connection) -> Result<Vec<Edge>> {
    let mut stmt = conn
        .prepare("SELECT from_id, to_id, weight FROM transitions ORDER BY rowid")
        .context("Invalid SQL statement when SELECTing transitions")?;

    let rows = stmt
        .query_map([], |row| Ok(Edge::real(row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get(2)?)))
        .context("Cannot query transitions")?;

    let mut transitions = Vec::new();
    for edge in rows {
        transitions.push(edge.context("Queried transition row is malformed")?);
    }
    Ok(transitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_sqlite(path: &Path) -> Result<()> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE tracks (
                id TEXT PRIMARY KEY, duration_ms INTEGER NOT NULL,
                tempo REAL, key_code INTEGER, key_mode TEXT, genre TEXT
            );
            CREATE TABLE transitions (from_id TEXT NOT NULL, to_id TEXT NOT NULL, weight REAL NOT NULL);
            INSERT INTO tracks VALUES ('a', 240000, 124.0, 8, 'minor', 'techno');
            INSERT INTO tracks VALUES ('b', 300000, NULL, NULL, NULL, NULL);
            INSERT INTO transitions VALUES ('a', 'b', 3.0);",
        )?;
        Ok(())
    }

    #[test]
    fn test_load_sqlite() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("catalog.db3");
        write_sqlite(&path)?;

        let catalog = Catalog::load(&path)?;
        assert_eq!(catalog.tracks.len(), 2);
        assert_eq!(catalog.tracks[0].key_mode, Some(KeyMode::Minor));
        assert_eq!(catalog.tracks[0].genre.as_deref(), Some("techno"));
        assert_eq!(catalog.tracks[1].tempo, None);
        assert_eq!(catalog.transitions, vec![Edge::real("a", "b", 3.0)]);
        Ok(())
    }

    #[test]
    fn test_load_json_forces_real_provenance() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{
                "tracks": [
                    { "id": "a", "duration_ms": 200000, "tempo": 128.0 },
                    { "id": "b", "duration_ms": 180000, "key_code": 3, "key_mode": "major" }
                ],
                "transitions": [
                    { "from_id": "a", "to_id": "b", "weight": 2.0, "provenance": "synthetic" }
                ]
            }"#,
        )?;

        let catalog = Catalog::load(&path)?;
        assert_eq!(catalog.tracks[1].key_mode, Some(KeyMode::Major));
        assert_eq!(catalog.transitions[0].provenance, Provenance::Real);
        Ok(())
    }

    #[test]
    fn test_missing_files_are_errors() {
        let dir = TempDir::new().unwrap();
        assert!(Catalog::load(&dir.path().join("nope.json")).is_err());
        assert!(Catalog::load(&dir.path().join("nope.db3")).is_err());
    }

    #[test]
    fn test_symmetrized_adds_only_missing_reverses() {
        let catalog = Catalog {
            tracks: Vec::new(),
            transitions: vec![Edge::real("a", "b", 1.0), Edge::real("b", "a", 4.0), Edge::real("b", "c", 2.0)],
        }
        .symmetrized();

        assert_eq!(catalog.transitions.len(), 4);
        assert!(catalog.transitions.contains(&Edge::real("c", "b", 2.0)));
        assert!(catalog.transitions.contains(&Edge::real("b", "a", 4.0)));
    }
}
