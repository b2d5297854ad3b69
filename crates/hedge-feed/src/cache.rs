//! Generic TTL cache.
//!
//! Entries are never dropped on read. An entry older than the TTL is
//! returned flagged stale so callers can fall back to it when a refresh
//! fails; `evict_older_than` removes entries explicitly.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

/// A cached value with its age.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<V> {
    pub value: V,
    pub inserted_at: DateTime<Utc>,
    pub stale: bool,
}

/// Key -> (value, insertion time) map with a fixed TTL.
///
/// Single writer per tick, many readers.
#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn insert(&self, key: K, value: V, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    /// Cached value, stale or not. `None` only when absent.
    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<CacheHit<V>> {
        self.entries.get(key).map(|entry| CacheHit {
            value: entry.value.clone(),
            inserted_at: entry.inserted_at,
            stale: now - entry.inserted_at > self.ttl,
        })
    }

    /// Value only when younger than the TTL.
    pub fn get_fresh(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        self.get(key, now).filter(|hit| !hit.stale).map(|hit| hit.value)
    }

    /// True when the key is absent or older than the TTL.
    pub fn is_stale(&self, key: &K, now: DateTime<Utc>) -> bool {
        self.get(key, now).map_or(true, |hit| hit.stale)
    }

    /// Remove entries older than `max_age`. Returns the number removed.
    pub fn evict_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.inserted_at <= max_age);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
