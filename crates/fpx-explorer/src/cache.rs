use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

/// Point-in-time counters for one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    /// `None` when unbounded.
    pub capacity: Option<usize>,
    pub hits: u64,
    pub misses: u64,
}

/// Add-if-absent key/value store with optional LRU eviction.
///
/// A capacity of `Some(0)` stores nothing. Values are cloned out, so they are
/// expected to be cheap handles (`Arc<..>`).
#[derive(Debug)]
pub(crate) struct BoundedCache<K: Hash + Eq, V> {
    name: &'static str,
    capacity: Option<usize>,
    lru: Mutex<LruCache<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    pub(crate) fn new(name: &'static str, capacity: Option<usize>) -> Self {
        Self {
            name,
            capacity,
            lru: Mutex::new(LruCache::unbounded()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<V> {
        let value = self.lru.lock().get(key).cloned();
        let counter = if value.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Insert `value` unless `key` is already present, returning whichever
    /// value the cache holds afterwards.
    pub(crate) fn get_or_insert(&self, key: K, value: V) -> V {
        if self.capacity == Some(0) {
            return value;
        }

        let mut lru = self.lru.lock();
        if let Some(existing) = lru.get(&key) {
            return existing.clone();
        }
        lru.put(key, value.clone());

        if let Some(capacity) = self.capacity {
            while lru.len() > capacity {
                if lru.pop_lru().is_none() {
                    break;
                }
                tracing::trace!(target: "fpx.explorer", cache = self.name, "evicted entry");
            }
        }
        value
    }

    pub(crate) fn len(&self) -> usize {
        self.lru.lock().len()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
