//! Decision-cache repository.
//!
//! Key-value rows backing the in-memory perceptual cache: fingerprint
//! string to blocked flag, loaded once at startup and pruned in batches
//! matching in-memory eviction.

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::{parse_datetime, CachedDecision};

/// Repository for persisted fingerprint decisions.
pub struct CacheRepo;

impl CacheRepo {
    /// Inserts or updates a decision for a fingerprint.
    pub fn upsert(conn: &Connection, fingerprint: &str, blocked: bool) -> Result<()> {
        conn.execute(
            "INSERT INTO decision_cache (fingerprint, blocked) VALUES (?1, ?2)
             ON CONFLICT(fingerprint) DO UPDATE SET blocked = excluded.blocked",
            params![fingerprint, blocked as i64],
        )?;
        Ok(())
    }

    /// Loads every persisted decision, oldest first.
    pub fn load_all(conn: &Connection) -> Result<Vec<CachedDecision>> {
        let mut stmt = conn.prepare(
            "SELECT fingerprint, blocked, created_at
             FROM decision_cache ORDER BY created_at ASC, rowid ASC",
        )?;

        let decisions = stmt
            .query_map([], |row| {
                Ok(CachedDecision {
                    fingerprint: row.get(0)?,
                    blocked: row.get::<_, i64>(1)? != 0,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(decisions)
    }

    /// Removes a batch of fingerprints (matching an in-memory eviction).
    pub fn remove_batch(conn: &Connection, fingerprints: &[String]) -> Result<usize> {
        let mut removed = 0;
        for fingerprint in fingerprints {
            removed += conn.execute(
                "DELETE FROM decision_cache WHERE fingerprint = ?1",
                params![fingerprint],
            )?;
        }
        Ok(removed)
    }

    /// Counts persisted decisions.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM decision_cache", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Removes every persisted decision.
    pub fn clear(conn: &Connection) -> Result<()> {
        conn.execute("DELETE FROM decision_cache", [])?;
        Ok(())
    }
}
