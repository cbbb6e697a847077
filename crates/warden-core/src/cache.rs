//! Generic bounded cache with oldest-first batch eviction.
//!
//! One cache abstraction for every bounded map in the pipeline: the
//! perceptual decision cache, the fusion engine's raw-score cache, and the
//! queue's processed-request cache all instantiate this with their own
//! capacity. When the capacity is exceeded, roughly 20% of entries are
//! evicted, oldest first; the evicted pairs are returned so a persistence
//! backend can prune matching batches.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Bounded map with insertion-order eviction.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    map: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V> BoundedCache<K, V> {
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the current entry count.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Looks up a value.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Inserts or updates an entry. Updating an existing key keeps its
    /// original age. Returns the entries evicted to stay within capacity,
    /// oldest first.
    pub fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        if self.map.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }

        if self.map.len() <= self.capacity {
            return Vec::new();
        }

        // Over cap: drop ~20% of capacity, oldest entries first.
        let batch = (self.capacity / 5).max(1);
        let mut evicted = Vec::with_capacity(batch);
        while evicted.len() < batch {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(value) = self.map.remove(&oldest) {
                evicted.push((oldest, value));
            }
        }

        tracing::debug!("Evicted {} oldest cache entries", evicted.len());
        evicted
    }

    /// Removes an entry.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.map.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    /// Clears all entries.
    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    /// Iterates over entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.map.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut cache = BoundedCache::new(10);
        assert!(cache.insert("a", 1).is_empty());
        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn update_keeps_len_stable() {
        let mut cache = BoundedCache::new(10);
        cache.insert("a", 1);
        cache.insert("a", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"a"), Some(&2));
    }

    #[test]
    fn eviction_drops_twenty_percent_oldest_first() {
        let mut cache = BoundedCache::new(10);
        for i in 0..10 {
            assert!(cache.insert(i, i).is_empty());
        }

        // Entry 11 pushes the cache over cap: 2 oldest entries go.
        let evicted = cache.insert(10, 10);
        assert_eq!(evicted, vec![(0, 0), (1, 1)]);
        assert_eq!(cache.len(), 9);
        assert!(cache.get(&0).is_none());
        assert!(cache.get(&2).is_some());
        assert!(cache.get(&10).is_some());
    }

    #[test]
    fn tiny_cache_evicts_at_least_one() {
        let mut cache = BoundedCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        let evicted = cache.insert(3, "c");
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, 1);
    }

    #[test]
    fn remove_forgets_the_key() {
        let mut cache = BoundedCache::new(3);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.remove(&"a"), Some(1));
        assert!(cache.get(&"a").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_empties_everything() {
        let mut cache = BoundedCache::new(3);
        cache.insert("a", 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
