//! Fixed-capacity least-recently-used map.
//!
//! Recency is a logical clock stamped per entry. `get` takes `&self` and
//! bumps the stamp atomically, so lookups can run concurrently under a shared
//! lock; only `insert` and `clear` need exclusive access.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

struct Slot<V> {
    value: V,
    last_used: AtomicU64,
}

/// Bounded map evicting the least recently used entry.
pub struct LruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, Slot<V>>,
    clock: AtomicU64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Look up `key`, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<&V> {
        let slot = self.entries.get(key)?;
        slot.last_used.store(self.tick(), Ordering::Relaxed);
        Some(&slot.value)
    }

    /// Look up without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace `key`.
    ///
    /// Returns the entry evicted to make room, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let stamp = self.tick();
        if let Some(slot) = self.entries.get_mut(&key) {
            slot.value = value;
            *slot.last_used.get_mut() = stamp;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        self.entries.insert(
            key,
            Slot {
                value,
                last_used: AtomicU64::new(stamp),
            },
        );
        evicted
    }

    fn evict_oldest(&mut self) -> Option<(K, V)> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, slot)| slot.last_used.load(Ordering::Relaxed))
            .map(|(key, _)| key.clone())?;
        self.entries.remove_entry(&oldest).map(|(key, slot)| (key, slot.value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = LruCache::new(2);
        assert!(cache.insert("a", 1).is_none());
        assert!(cache.insert("b", 2).is_none());

        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.insert("c", 3), Some(("b", 2)));

        assert!(cache.contains_key(&"a"));
        assert!(cache.contains_key(&"c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_exactly_one_eviction_past_capacity() {
        let mut cache = LruCache::new(3);
        let evictions = (0..4).filter_map(|i| cache.insert(i, i)).count();
        assert_eq!(evictions, 1);
        assert!(!cache.contains_key(&0));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_peek_keeps_recency() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.peek(&"a"), Some(&1));
        assert_eq!(cache.insert("c", 3), Some(("a", 1)));
    }

    #[test]
    fn test_replace_does_not_evict() {
        let mut cache = LruCache::new(1);
        cache.insert("a", 1);
        assert!(cache.insert("a", 2).is_none());
        assert_eq!(cache.get(&"a"), Some(&2));
    }

    #[test]
    fn test_clear() {
        let mut cache = LruCache::new(4);
        cache.insert(1, "x");
        cache.insert(2, "y");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 4);
    }
}
