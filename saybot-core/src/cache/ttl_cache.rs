// File: saybot-core/src/cache/ttl_cache.rs

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Concurrent map whose entries go stale `ttl` after they were stored.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            return Some(entry.value.clone());
        }
        drop(entry);
        self.entries.remove_if(key, |_, e| e.stored_at.elapsed() >= self.ttl);
        None
    }

    pub fn set(&self, key: K, value: V) {
        self.entries.insert(key, CacheEntry {
            value,
            stored_at: Instant::now(),
        });
    }

    /// Drops every stale entry.
    pub fn purge_expired(&self) {
        self.entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
