//! Perceptual decision cache.
//!
//! Maps image fingerprints to the most recent block decision so visually
//! identical content is recognized without re-running the classifier.
//! Bounded in memory with oldest-first eviction; an optional persisted
//! store gives warm starts across restarts and is pruned in batches
//! matching in-memory eviction.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use warden_core::cache::BoundedCache;
use warden_core::fingerprint::fingerprint_key;
use warden_storage::{CachedDecision, Database};

/// Default entry cap for the perceptual cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// A cached fingerprint decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    /// Whether the content was blocked.
    pub blocked: bool,
    /// When the decision was cached.
    pub cached_at: DateTime<Utc>,
}

/// Persistence backend for the perceptual cache.
///
/// Implementations must tolerate being called from multiple workers; all
/// failures are logged by the cache and degrade it to memory-only.
pub trait DecisionStore: Send + Sync {
    /// Persists one decision.
    fn persist(&self, key: &str, blocked: bool) -> warden_storage::Result<()>;

    /// Removes a batch of keys matching an in-memory eviction.
    fn prune(&self, keys: &[String]) -> warden_storage::Result<usize>;

    /// Loads every persisted decision, oldest first.
    fn load(&self) -> warden_storage::Result<Vec<CachedDecision>>;
}

impl DecisionStore for Database {
    fn persist(&self, key: &str, blocked: bool) -> warden_storage::Result<()> {
        self.cache_decision(key, blocked)
    }

    fn prune(&self, keys: &[String]) -> warden_storage::Result<usize> {
        self.prune_cached_decisions(keys)
    }

    fn load(&self) -> warden_storage::Result<Vec<CachedDecision>> {
        self.load_cached_decisions()
    }
}

/// Bounded fingerprint-to-decision cache with optional persistence.
pub struct PerceptualCache {
    entries: Mutex<BoundedCache<u64, CacheEntry>>,
    store: Option<Arc<dyn DecisionStore>>,
}

impl PerceptualCache {
    /// Creates a memory-only cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a memory-only cache with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(BoundedCache::new(capacity)),
            store: None,
        }
    }

    /// Creates a cache backed by a persisted store.
    pub fn with_store(capacity: usize, store: Arc<dyn DecisionStore>) -> Self {
        Self {
            entries: Mutex::new(BoundedCache::new(capacity)),
            store: Some(store),
        }
    }

    /// Looks up the cached decision for a fingerprint.
    pub fn lookup(&self, fingerprint: u64) -> Option<CacheEntry> {
        self.entries.lock().get(&fingerprint).copied()
    }

    /// Caches a decision, persisting it and pruning the backing store in
    /// the same batches as in-memory eviction. Store failures degrade to
    /// memory-only operation and are never surfaced.
    pub fn store(&self, fingerprint: u64, blocked: bool) {
        let entry = CacheEntry {
            blocked,
            cached_at: Utc::now(),
        };

        let evicted = self.entries.lock().insert(fingerprint, entry);

        let Some(store) = &self.store else {
            return;
        };

        if let Err(e) = store.persist(&fingerprint_key(fingerprint), blocked) {
            tracing::warn!("Failed to persist cache entry, continuing in memory: {}", e);
        }

        if !evicted.is_empty() {
            let keys: Vec<String> = evicted.iter().map(|(fp, _)| fingerprint_key(*fp)).collect();
            match store.prune(&keys) {
                Ok(removed) => tracing::debug!("Pruned {} persisted cache entries", removed),
                Err(e) => tracing::warn!("Failed to prune persisted cache: {}", e),
            }
        }
    }

    /// Populates the memory map from the persisted store. Failures are
    /// logged and treated as an empty cache. Returns how many entries
    /// were loaded.
    pub fn load_from_disk(&self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };

        let decisions = match store.load() {
            Ok(decisions) => decisions,
            Err(e) => {
                tracing::warn!("Failed to load persisted cache, starting empty: {}", e);
                return 0;
            }
        };

        let mut entries = self.entries.lock();
        let mut loaded = 0;
        for decision in decisions {
            let Some(fp) = warden_core::parse_fingerprint_key(&decision.fingerprint) else {
                continue;
            };
            entries.insert(
                fp,
                CacheEntry {
                    blocked: decision.blocked,
                    cached_at: decision.created_at,
                },
            );
            loaded += 1;
        }

        tracing::info!("Loaded {} cached decisions from disk", loaded);
        loaded
    }

    /// Number of in-memory entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drops all in-memory entries (the persisted store is untouched).
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for PerceptualCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_lookup_is_idempotent() {
        let cache = PerceptualCache::with_capacity(16);
        cache.store(42, true);

        let entry = cache.lookup(42).unwrap();
        assert!(entry.blocked);
        // A second lookup sees the same decision without any re-work.
        assert!(cache.lookup(42).unwrap().blocked);
    }

    #[test]
    fn missing_fingerprint_is_none() {
        let cache = PerceptualCache::with_capacity(16);
        assert!(cache.lookup(7).is_none());
    }

    #[test]
    fn eviction_bounds_the_cache() {
        let cache = PerceptualCache::with_capacity(10);
        for fp in 0..11 {
            cache.store(fp, false);
        }
        // 11 inserts into cap 10: a 20% batch of the oldest went.
        assert_eq!(cache.len(), 9);
        assert!(cache.lookup(0).is_none());
        assert!(cache.lookup(10).is_some());
    }

    #[test]
    fn persisted_decisions_survive_reload() {
        let db = Arc::new(Database::in_memory().unwrap());

        let cache = PerceptualCache::with_store(100, db.clone());
        cache.store(0xabcd, true);
        cache.store(0x1234, false);

        // A fresh cache over the same store warm-starts from disk.
        let warm = PerceptualCache::with_store(100, db);
        assert_eq!(warm.load_from_disk(), 2);
        assert!(warm.lookup(0xabcd).unwrap().blocked);
        assert!(!warm.lookup(0x1234).unwrap().blocked);
    }

    #[test]
    fn eviction_prunes_the_store_in_matching_batches() {
        let db = Arc::new(Database::in_memory().unwrap());
        let cache = PerceptualCache::with_store(10, db.clone());

        for fp in 0..11u64 {
            cache.store(fp, false);
        }

        // Memory kept 9; the store must match.
        assert_eq!(cache.len(), 9);
        assert_eq!(db.cached_decision_count().unwrap(), 9);
    }

    #[test]
    fn memory_only_cache_loads_nothing() {
        let cache = PerceptualCache::with_capacity(8);
        assert_eq!(cache.load_from_disk(), 0);
    }
}
