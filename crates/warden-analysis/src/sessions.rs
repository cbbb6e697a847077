//! Per-session risk state registry.
//!
//! The fusion engine's smoothing state is scoped to one browsing
//! session/tab. Sharing it across concurrently analyzed unrelated
//! resources would corrupt their scores, so every session gets its own
//! engine, created on first use and dropped when the session ends.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use warden_core::RiskFusionEngine;

/// Registry of per-session fusion engines.
#[derive(Default)]
pub struct SessionRegistry {
    engines: Mutex<HashMap<String, Arc<tokio::sync::Mutex<RiskFusionEngine>>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the engine for a session, creating it on first use.
    pub fn engine(&self, session_id: &str) -> Arc<tokio::sync::Mutex<RiskFusionEngine>> {
        self.engines
            .lock()
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(RiskFusionEngine::new())))
            .clone()
    }

    /// Clears a session's smoothing state. Must be called on page
    /// navigation so risk does not bleed across unrelated content.
    pub async fn reset(&self, session_id: &str) {
        let engine = {
            let engines = self.engines.lock();
            engines.get(session_id).cloned()
        };
        if let Some(engine) = engine {
            engine.lock().await.reset();
        }
    }

    /// Drops a session entirely (tab closed).
    pub fn remove(&self, session_id: &str) {
        self.engines.lock().remove(session_id);
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.engines.lock().len()
    }

    /// True if no sessions are tracked.
    pub fn is_empty(&self) -> bool {
        self.engines.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_get_distinct_engines() {
        let registry = SessionRegistry::new();

        let a = registry.engine("tab-1");
        let b = registry.engine("tab-2");

        // Smoothing in one session must not leak into the other.
        a.lock().await.smooth(100.0, false);
        let fresh = b.lock().await.smooth(10.0, false);
        assert_eq!(fresh, 10.0);

        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn same_session_reuses_the_engine() {
        let registry = SessionRegistry::new();

        registry.engine("tab-1").lock().await.smooth(100.0, false);
        // Second call returns the same engine with seeded state.
        let second = registry.engine("tab-1").lock().await.smooth(0.0, false);
        assert!(second > 0.0);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn reset_clears_smoothing() {
        let registry = SessionRegistry::new();
        registry.engine("tab-1").lock().await.smooth(100.0, false);

        registry.reset("tab-1").await;

        let after = registry.engine("tab-1").lock().await.smooth(5.0, false);
        assert_eq!(after, 5.0);
    }

    #[tokio::test]
    async fn remove_drops_the_session() {
        let registry = SessionRegistry::new();
        registry.engine("tab-1");
        registry.remove("tab-1");
        assert!(registry.is_empty());
    }
}
