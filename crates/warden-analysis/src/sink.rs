//! Event sink and decision publication interfaces.
//!
//! Both are fire-and-forget from the pipeline's perspective: a sink or
//! publisher failure is logged locally and never blocks or fails the
//! decision path.

use warden_core::DecisionResult;
use warden_storage::Database;

/// Append-only structured event consumer.
pub trait EventSink: Send + Sync {
    /// Records one event. Implementations swallow their own failures.
    fn record(&self, event_type: &str, payload: serde_json::Value);
}

impl EventSink for Database {
    fn record(&self, event_type: &str, payload: serde_json::Value) {
        if let Err(e) = self.log_event(event_type, payload) {
            tracing::warn!("Event sink write failed (ignored): {}", e);
        }
    }
}

/// Consumer of terminal decisions: the browsing surface that blurs,
/// blocks, or releases content.
pub trait DecisionPublisher: Send + Sync {
    /// Publishes the outcome for a request. `decision` is `None` when the
    /// outcome came from a cache hit or a short-circuit.
    fn publish(&self, request_id: &str, blocked: bool, decision: Option<&DecisionResult>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn database_sink_records_events() {
        let db = Database::in_memory().unwrap();
        db.record("decision", json!({"decision": "block"}));
        assert_eq!(db.event_count().unwrap(), 1);
    }
}
