//! Bounded FIFO cache of read-query results.
//!
//! Keys are the SHA-256 of the trimmed SQL text. Only `SELECT` statements are
//! recorded. When full, inserting a new key evicts exactly one entry: the
//! oldest by first insertion. Re-recording a key replaces its snapshot but
//! keeps its place in line.
//!
//! Entries are never served back to callers; the cache exists for the size
//! metric and for inspecting recent reads.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

/// Default maximum number of cached results.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Whether `sql` is a read query worth caching.
pub fn is_cacheable(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    trimmed
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("select"))
}

/// Stable cache key for a statement.
pub fn cache_key(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.trim().as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub cached_at: DateTime<Utc>,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    order: VecDeque<String>,
}

pub struct QueryCache<V> {
    state: Mutex<CacheState<V>>,
    max_entries: usize,
}

impl<V> QueryCache<V>
where
    V: Clone + Send,
{
    /// Create a cache holding at most `max_entries` results (at least one).
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_entries: max_entries.max(1),
        }
    }

    /// Record the result of `sql` if it is a read query.
    ///
    /// Returns whether the result was recorded.
    pub async fn record(&self, sql: &str, value: V) -> bool {
        if !is_cacheable(sql) {
            return false;
        }
        self.insert(cache_key(sql), value).await;
        true
    }

    /// Insert under an explicit key, evicting the oldest entry when full.
    pub async fn insert(&self, key: String, value: V) {
        let entry = CacheEntry {
            value,
            cached_at: Utc::now(),
        };

        let mut state = self.state.lock().await;
        if let Some(existing) = state.entries.get_mut(&key) {
            *existing = entry;
            return;
        }

        if state.entries.len() >= self.max_entries {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
                tracing::debug!(evicted = %oldest, "Query cache full, evicted oldest entry");
            }
        }

        state.order.push_back(key.clone());
        state.entries.insert(key, entry);
    }

    /// Snapshot stored for `sql`, if any.
    pub async fn get(&self, sql: &str) -> Option<CacheEntry<V>> {
        let key = cache_key(sql);
        self.state.lock().await.entries.get(&key).cloned()
    }

    pub async fn contains(&self, sql: &str) -> bool {
        let key = cache_key(sql);
        self.state.lock().await.entries.contains_key(&key)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(n: usize) -> String {
        format!("SELECT * FROM ExchangeTable WHERE id = {}", n)
    }

    #[test]
    fn only_select_statements_are_cacheable() {
        assert!(is_cacheable("SELECT 1"));
        assert!(is_cacheable("   select id from t"));
        assert!(is_cacheable("\nSeLeCt 1"));
        assert!(!is_cacheable("INSERT INTO t VALUES (1)"));
        assert!(!is_cacheable("SEL"));
        assert!(!is_cacheable(""));
    }

    #[test]
    fn key_ignores_surrounding_whitespace() {
        assert_eq!(cache_key("SELECT 1"), cache_key("  SELECT 1\n"));
        assert_ne!(cache_key("SELECT 1"), cache_key("SELECT 2"));
        assert_eq!(cache_key("SELECT 1").len(), 64);
    }

    #[tokio::test]
    async fn writes_are_not_recorded() {
        let cache: QueryCache<i32> = QueryCache::new(10);
        assert!(!cache.record("DELETE FROM t", 1).await);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn record_and_get() {
        let cache: QueryCache<i32> = QueryCache::new(10);
        assert!(cache.record("SELECT 1", 42).await);

        assert_eq!(cache.get(" SELECT 1 ").await.map(|e| e.value), Some(42));
        assert!(cache.contains("SELECT 1").await);
    }

    #[tokio::test]
    async fn overflow_evicts_first_inserted_key() {
        let cache: QueryCache<usize> = QueryCache::new(3);
        for n in 0..4 {
            cache.record(&select(n), n).await;
        }

        assert_eq!(cache.len().await, 3);
        assert!(!cache.contains(&select(0)).await);
        for n in 1..4 {
            assert!(cache.contains(&select(n)).await);
        }
    }

    #[tokio::test]
    async fn rerecording_keeps_original_position() {
        let cache: QueryCache<usize> = QueryCache::new(2);
        cache.record(&select(1), 1).await;
        cache.record(&select(2), 2).await;
        // Refresh the oldest key; it must still be the first to go.
        cache.record(&select(1), 10).await;
        assert_eq!(cache.get(&select(1)).await.map(|e| e.value), Some(10));

        cache.record(&select(3), 3).await;

        assert_eq!(cache.len().await, 2);
        assert!(!cache.contains(&select(1)).await);
        assert!(cache.contains(&select(2)).await);
        assert!(cache.contains(&select(3)).await);
    }

    #[tokio::test]
    async fn default_capacity_holds_one_hundred() {
        let cache: QueryCache<usize> = QueryCache::new(DEFAULT_MAX_ENTRIES);
        for n in 0..=DEFAULT_MAX_ENTRIES {
            cache.record(&select(n), n).await;
        }

        assert_eq!(cache.len().await, DEFAULT_MAX_ENTRIES);
        assert!(!cache.contains(&select(0)).await);
        assert!(cache.contains(&select(DEFAULT_MAX_ENTRIES)).await);
    }
}
