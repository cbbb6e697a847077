//! Events repository.
//!
//! Append-only structured records consumed by the reporting surface.
//! Writes here are fire-and-forget from the decision path's perspective;
//! a failed insert is logged locally and never propagated upstream.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::{parse_datetime, NewSafetyEvent, SafetyEvent};

/// Repository for event operations.
pub struct EventsRepo;

impl EventsRepo {
    /// Insert a new event.
    pub fn insert(conn: &Connection, event: NewSafetyEvent) -> Result<i64> {
        conn.execute(
            "INSERT INTO events (event_type, payload) VALUES (?1, ?2)",
            params![event.event_type, event.payload.to_string()],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get recent events with pagination.
    pub fn get_recent(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<SafetyEvent>> {
        let mut stmt = conn.prepare(
            "SELECT id, event_type, payload, created_at
             FROM events ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        )?;

        let events = stmt
            .query_map([limit, offset], |row| {
                let payload: String = row.get(2)?;
                Ok(SafetyEvent {
                    id: row.get(0)?,
                    event_type: row.get(1)?,
                    payload: serde_json::from_str(&payload)
                        .unwrap_or(serde_json::Value::Null),
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(events)
    }

    /// Count total events.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count events of one type.
    pub fn count_by_type(conn: &Connection, event_type: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE event_type = ?1",
            [event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete events older than a given date.
    pub fn delete_older_than(conn: &Connection, before: DateTime<Utc>) -> Result<i64> {
        let deleted = conn.execute(
            "DELETE FROM events WHERE created_at < ?1",
            [before.to_rfc3339()],
        )?;
        Ok(deleted as i64)
    }
}

/// Hash a request identifier for privacy-preserving event payloads.
pub fn hash_request_id(request_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request_id.as_bytes());
    let result = hasher.finalize();
    hex_encode(result)
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
    let bytes = bytes.as_ref();
    let mut hex = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
        hex.push(HEX_CHARS[(byte & 0xf) as usize] as char);
    }
    hex
}
