// Caller-owned memo for slow-changing query results.
//
// Values are shared `Arc` snapshots: a refresh inserts a new snapshot and
// readers holding the old one keep a consistent view.
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

pub const DEFAULT_TTL_SECS: i64 = 3600;

struct Entry<V> {
    value: Arc<V>,
    stored_at: DateTime<Utc>,
}

pub struct QueryCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash, V> Default for QueryCache<K, V> {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS))
    }
}

impl<K: Eq + Hash, V> QueryCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        QueryCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &Entry<V>, now: DateTime<Utc>) -> bool {
        now - entry.stored_at < self.ttl
    }

    /// The cached value for `key` if it has not expired at `now`.
    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<Arc<V>> {
        self.entries
            .get(key)
            .filter(|e| self.is_fresh(e, now))
            .map(|e| Arc::clone(&e.value))
    }

    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) -> Arc<V> {
        let value = Arc::new(value);
        self.entries.insert(
            key,
            Entry {
                value: Arc::clone(&value),
                stored_at: now,
            },
        );
        value
    }

    /// Return the fresh cached value or compute, store and return a new one.
    /// A failed computation leaves the cache untouched.
    pub fn get_or_try_insert_with<E, F>(&mut self, key: K, now: DateTime<Utc>, f: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.get(&key, now) {
            return Ok(hit);
        }
        let value = f()?;
        Ok(self.insert(key, value, now))
    }

    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every entry that has expired at `now`.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, e| now - e.stored_at < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut cache: QueryCache<&str, u32> = QueryCache::default();
        cache.insert("tables", 1, t0());
        assert_eq!(cache.get(&"tables", t0() + Duration::minutes(59)).as_deref(), Some(&1));
        assert!(cache.get(&"tables", t0() + Duration::hours(1)).is_none());
        assert_eq!(cache.evict_expired(t0() + Duration::hours(2)), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn computes_once_while_fresh() {
        let mut cache: QueryCache<(i32, u8), String> = QueryCache::new(Duration::seconds(10));
        let mut calls = 0;
        for _ in 0..3 {
            let v = cache
                .get_or_try_insert_with((2023, 1), t0(), || {
                    calls += 1;
                    Ok::<_, String>("report".to_string())
                })
                .unwrap();
            assert_eq!(v.as_str(), "report");
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn failures_are_not_cached_and_invalidate_forces_reload() {
        let mut cache: QueryCache<u8, u8> = QueryCache::default();
        let err = cache.get_or_try_insert_with(1, t0(), || Err::<u8, _>("db down"));
        assert_eq!(err.unwrap_err(), "db down");
        assert!(cache.is_empty());

        let first = cache.insert(1, 7, t0());
        assert!(cache.invalidate(&1));
        assert!(!cache.invalidate(&1));
        let second = cache.get_or_try_insert_with(1, t0(), || Ok::<_, ()>(8)).unwrap();
        // The earlier snapshot is unaffected by the reload.
        assert_eq!((*first, *second), (7, 8));
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
