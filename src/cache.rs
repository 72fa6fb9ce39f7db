//! Short-lived, per-key memoization
//!
//! Entries carry an absolute expiry. A lookup at or past the expiry misses,
//! and the caller is expected to recompute and `put` again; there is no
//! background eviction, stale entries are simply overwritten.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;

/// Source of wall-clock time, injectable so expiry can be tested without sleeping.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ExpiringCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K, V> Default for ExpiringCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> ExpiringCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `key`, provided `now` is still before its expiry.
    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| &entry.value)
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn put(&mut self, key: K, value: V, expires_at: DateTime<Utc>) {
        self.entries.insert(key, CacheEntry { value, expires_at });
    }
}
