//! High-level database interface.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use tracing::info;

use crate::error::{Result, StorageError};
use crate::models::{CachedDecision, NewSafetyEvent, SafetyEvent};
use crate::pool::ConnectionPool;
use crate::repository::{CacheRepo, EventsRepo};

/// High-level database interface for Warden.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        let path = Self::default_db_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "warden", "warden")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("warden.db"))
    }

    // === Decision cache ===

    /// Persist a fingerprint decision.
    pub fn cache_decision(&self, fingerprint: &str, blocked: bool) -> Result<()> {
        let conn = self.pool.get()?;
        CacheRepo::upsert(&conn, fingerprint, blocked)
    }

    /// Load every persisted decision, oldest first.
    pub fn load_cached_decisions(&self) -> Result<Vec<CachedDecision>> {
        let conn = self.pool.get()?;
        CacheRepo::load_all(&conn)
    }

    /// Prune a batch of fingerprints matching an in-memory eviction.
    pub fn prune_cached_decisions(&self, fingerprints: &[String]) -> Result<usize> {
        let conn = self.pool.get()?;
        CacheRepo::remove_batch(&conn, fingerprints)
    }

    /// Count persisted decisions.
    pub fn cached_decision_count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        CacheRepo::count(&conn)
    }

    /// Remove every persisted decision.
    pub fn clear_cached_decisions(&self) -> Result<()> {
        let conn = self.pool.get()?;
        CacheRepo::clear(&conn)
    }

    // === Events ===

    /// Append a structured event record.
    pub fn log_event(&self, event_type: &str, payload: serde_json::Value) -> Result<i64> {
        let conn = self.pool.get()?;
        EventsRepo::insert(&conn, NewSafetyEvent::new(event_type, payload))
    }

    /// Get recent events.
    pub fn recent_events(&self, limit: i64, offset: i64) -> Result<Vec<SafetyEvent>> {
        let conn = self.pool.get()?;
        EventsRepo::get_recent(&conn, limit, offset)
    }

    /// Count all events.
    pub fn event_count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        EventsRepo::count(&conn)
    }

    /// Count events of one type.
    pub fn event_count_by_type(&self, event_type: &str) -> Result<i64> {
        let conn = self.pool.get()?;
        EventsRepo::count_by_type(&conn, event_type)
    }

    /// Delete events older than a given date. Returns how many went.
    pub fn delete_events_older_than(&self, before: DateTime<Utc>) -> Result<i64> {
        let conn = self.pool.get()?;
        EventsRepo::delete_older_than(&conn, before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decision_round_trip_through_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.db");

        {
            let db = Database::with_path(&path).unwrap();
            db.cache_decision("00ff00ff00ff00ff", true).unwrap();
            db.cache_decision("1111222233334444", false).unwrap();
        }

        // Re-open: warm start sees both decisions.
        let db = Database::with_path(&path).unwrap();
        let decisions = db.load_cached_decisions().unwrap();
        assert_eq!(decisions.len(), 2);
        assert!(decisions
            .iter()
            .any(|d| d.fingerprint == "00ff00ff00ff00ff" && d.blocked));
    }

    #[test]
    fn prune_matches_eviction_batches() {
        let db = Database::in_memory().unwrap();
        for i in 0..10 {
            db.cache_decision(&format!("fp{}", i), false).unwrap();
        }

        let batch: Vec<String> = (0..2).map(|i| format!("fp{}", i)).collect();
        assert_eq!(db.prune_cached_decisions(&batch).unwrap(), 2);
        assert_eq!(db.cached_decision_count().unwrap(), 8);
    }

    #[test]
    fn events_append_and_read_back() {
        let db = Database::in_memory().unwrap();
        db.log_event("decision", json!({"decision": "block"})).unwrap();
        db.log_event("fetch_failure", json!({"url": "https://x"})).unwrap();

        assert_eq!(db.event_count().unwrap(), 2);
        assert_eq!(db.event_count_by_type("decision").unwrap(), 1);

        let recent = db.recent_events(10, 0).unwrap();
        assert_eq!(recent.len(), 2);
    }
}
