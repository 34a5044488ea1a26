//! Query result cache - fixed-capacity LRU
//!
//! Lookups take the entry map's shared lock, inserts take it exclusively.
//! Recency lives beside the map behind its own mutex so a hit can promote
//! its entry while other readers proceed.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

struct Slot<V> {
    value: V,
    /// Recency stamp; only changed while holding the recency lock
    stamp: AtomicU64,
}

/// Recency order: stamp -> key, oldest first
struct Recency<K> {
    order: BTreeMap<u64, K>,
    clock: u64,
}

impl<K> Recency<K> {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Re-stamp `slot` as most recently used
    fn promote<V>(&mut self, slot: &Slot<V>, key: &K)
    where
        K: Clone,
    {
        let stamp = self.tick();
        let previous = slot.stamp.swap(stamp, Ordering::Relaxed);
        self.order.remove(&previous);
        self.order.insert(stamp, key.clone());
    }
}

/// Cache statistics
#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe LRU cache
pub struct LruCache<K, V> {
    capacity: usize,
    entries: RwLock<HashMap<K, Slot<V>>>,
    recency: Mutex<Recency<K>>,
    counters: Counters,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(HashMap::with_capacity(capacity)),
            recency: Mutex::new(Recency {
                order: BTreeMap::new(),
                clock: 0,
            }),
            counters: Counters::default(),
        }
    }

    /// Look up `key`, promoting it to most recently used on a hit
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(slot) => {
                self.recency.lock().promote(slot, key);
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(slot.value.clone())
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite `key` as most recently used, evicting the least
    /// recently used entry if the cache grows past capacity.
    pub fn set(&self, key: K, value: V) {
        let mut entries = self.entries.write();
        let mut recency = self.recency.lock();
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);

        if let Some(slot) = entries.get_mut(&key) {
            slot.value = value;
            recency.promote(slot, &key);
            return;
        }

        let stamp = recency.tick();
        recency.order.insert(stamp, key.clone());
        entries.insert(
            key,
            Slot {
                value,
                stamp: AtomicU64::new(stamp),
            },
        );

        if entries.len() > self.capacity {
            if let Some((_, oldest)) = recency.order.pop_first() {
                entries.remove(&oldest);
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Check residency without touching recency
    pub fn contains(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Clone for LruCache<K, V> {
    /// Copy entries, recency and counters as one consistent snapshot
    fn clone(&self) -> Self {
        let entries = self.entries.read();
        let recency = self.recency.lock();

        let copied = entries
            .iter()
            .map(|(key, slot)| {
                let slot = Slot {
                    value: slot.value.clone(),
                    stamp: AtomicU64::new(slot.stamp.load(Ordering::Relaxed)),
                };
                (key.clone(), slot)
            })
            .collect();
        let stats = self.stats();

        Self {
            capacity: self.capacity,
            entries: RwLock::new(copied),
            recency: Mutex::new(Recency {
                order: recency.order.clone(),
                clock: recency.clock,
            }),
            counters: Counters {
                hits: AtomicU64::new(stats.hits),
                misses: AtomicU64::new(stats.misses),
                inserts: AtomicU64::new(stats.inserts),
                evictions: AtomicU64::new(stats.evictions),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[test]
    fn test_lru_eviction() {
        let cache = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);

        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_get_promotes() {
        let cache = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);

        // Touch "a" so "b" becomes the eviction victim
        assert_eq!(cache.get(&"a"), Some(1));
        cache.set("c", 3);

        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn test_overwrite_promotes_without_growth() {
        let cache = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);
        assert_eq!(cache.len(), 2);

        cache.set("c", 3);
        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn test_get_never_evicts() {
        let cache = LruCache::new(3);
        for k in 0..3 {
            cache.set(k, k);
        }
        for _ in 0..10 {
            for k in 0..3 {
                assert_eq!(cache.get(&k), Some(k));
            }
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = LruCache::new(0);
        cache.set(1, "one");
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.get(&1), Some("one"));
    }

    #[test]
    fn test_stats() {
        let cache = LruCache::new(4);
        cache.set("k", 1);
        cache.get(&"k");
        cache.get(&"missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let cache = Arc::new(LruCache::new(16));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..1_000u64 {
                        let key = (t * 7 + i) % 32;
                        if i % 3 == 0 {
                            cache.set(key, key * 2);
                        } else if let Some(v) = cache.get(&key) {
                            assert_eq!(v, key * 2);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 16);
        assert_eq!(cache.recency.lock().order.len(), cache.len());
    }

    #[test]
    fn test_clone_keeps_recency() {
        let cache = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.get(&"a");

        let copy = cache.clone();
        assert_eq!(copy.stats(), cache.stats());

        // "b" is least recent in both; they evolve independently afterwards
        copy.set("c", 3);
        assert!(copy.contains(&"a") && !copy.contains(&"b"));
        assert!(cache.contains(&"b") && !cache.contains(&"c"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Get(u8),
        Set(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![(0u8..12).prop_map(Op::Get), (0u8..12).prop_map(Op::Set)]
    }

    proptest! {
        #[test]
        fn prop_resident_set_is_most_recent(
            capacity in 1usize..6,
            ops in proptest::collection::vec(op(), 0..200),
        ) {
            let cache = LruCache::new(capacity);
            // Reference model: most recent at the back
            let mut model: VecDeque<u8> = VecDeque::new();

            for op in ops {
                match op {
                    Op::Get(k) => {
                        let hit = cache.get(&k).is_some();
                        prop_assert_eq!(hit, model.contains(&k));
                        if hit {
                            model.retain(|&m| m != k);
                            model.push_back(k);
                        }
                    }
                    Op::Set(k) => {
                        cache.set(k, k);
                        model.retain(|&m| m != k);
                        model.push_back(k);
                        if model.len() > capacity {
                            model.pop_front();
                        }
                    }
                }
                prop_assert_eq!(cache.len(), model.len());
            }

            for k in 0u8..12 {
                prop_assert_eq!(cache.contains(&k), model.contains(&k));
            }
        }
    }
}
