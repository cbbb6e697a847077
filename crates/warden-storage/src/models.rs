//! Storage data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted fingerprint decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDecision {
    /// Fingerprint key (fixed-width hex).
    pub fingerprint: String,
    /// Whether the content was blocked.
    pub blocked: bool,
    /// When the decision was first cached.
    pub created_at: DateTime<Utc>,
}

/// A persisted safety event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyEvent {
    /// Row id.
    pub id: i64,
    /// Event type tag (e.g. "decision", "classifier_failure").
    pub event_type: String,
    /// Structured payload.
    pub payload: serde_json::Value,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

/// A safety event about to be inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSafetyEvent {
    /// Event type tag.
    pub event_type: String,
    /// Structured payload.
    pub payload: serde_json::Value,
}

impl NewSafetyEvent {
    /// Convenience constructor.
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}

/// Parse a datetime from SQLite format.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}
