//! Query cache
//!
//! Results of read operations keyed by [`QueryKey`]. A read within its
//! `stale_time` is served from the cache; anything older is refetched.
//! Entries unused for longer than `gc_time` are dropped. Mutations
//! invalidate keys by prefix, so invalidating `["historial"]` also drops
//! `["historial", "ana@b.com"]`.
//!
//! Failures are never cached.

use crate::error::ApiError;
use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cache key: an operation name followed by its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(operation: &str) -> Self {
        Self(vec![operation.to_string()])
    }

    pub fn with(mut self, segment: impl ToString) -> Self {
        self.0.push(segment.to_string());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Freshness and retry policy of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long a result is served without refetching
    pub stale_time: Duration,
    /// How long a result is kept at all
    pub gc_time: Duration,
    /// Extra attempts after a retryable failure
    pub retry: u32,
}

impl QueryOptions {
    pub const fn new(stale_time: Duration, gc_time: Duration, retry: u32) -> Self {
        Self {
            stale_time,
            gc_time,
            retry,
        }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(300), 1)
    }
}

struct CacheEntry {
    value: Box<dyn Any + Send + Sync>,
    fetched_at: Instant,
    gc_time: Duration,
}

pub struct QueryCache {
    entries: DashMap<QueryKey, CacheEntry>,
    retry_delay: Duration,
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Return the cached value for `key` if still fresh, otherwise run
    /// `fetcher` (retrying per `options`) and cache its result.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.collect_garbage();

        if let Some(value) = self.fresh::<T>(&key, options.stale_time) {
            debug!(key = %key, "Query served from cache");
            return Ok(value);
        }

        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(value) => {
                    self.set(key, value.clone(), options.gc_time);
                    return Ok(value);
                }
                Err(e) if attempt < options.retry && e.is_retryable() => {
                    attempt += 1;
                    warn!(
                        key = %key,
                        attempt,
                        status = e.status,
                        error = %e,
                        "Query failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Cached value regardless of age. `None` if absent or of another type.
    pub fn get<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        self.entries
            .get(key)
            .and_then(|entry| entry.value.as_ref().downcast_ref::<T>().cloned())
    }

    /// Seed or overwrite an entry, as if it had just been fetched.
    pub fn set<T: Send + Sync + 'static>(&self, key: QueryKey, value: T, gc_time: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                value: Box::new(value),
                fetched_at: Instant::now(),
                gc_time,
            },
        );
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many
    /// entries were dropped.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before.saturating_sub(self.entries.len());
        debug!(key = %prefix, removed, "Invalidated queries");
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop entries older than their gc window.
    pub fn collect_garbage(&self) {
        self.entries
            .retain(|_, entry| entry.fetched_at.elapsed() <= entry.gc_time);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fresh<T: Clone + 'static>(&self, key: &QueryKey, stale_time: Duration) -> Option<T> {
        let entry = self.entries.get(key)?;
        if entry.fetched_at.elapsed() >= stale_time {
            return None;
        }
        entry.value.as_ref().downcast_ref::<T>().cloned()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries.len())
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const FIVE_MIN: Duration = Duration::from_secs(300);

    fn options(retry: u32) -> QueryOptions {
        QueryOptions::new(Duration::from_secs(60), FIVE_MIN, retry)
    }

    #[tokio::test]
    async fn test_fresh_entry_is_not_refetched() {
        let cache = QueryCache::new();
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ApiError>(vec![1, 2, 3])
        };

        let first = cache.fetch(QueryKey::new("resenias"), options(0), fetch).await.unwrap();
        let second = cache.fetch(QueryKey::new("resenias"), options(0), fetch).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let cache = QueryCache::new();
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let stale_immediately = QueryOptions::new(Duration::ZERO, FIVE_MIN, 0);
        let fetch = move || async move { Ok::<_, ApiError>(calls.fetch_add(1, Ordering::SeqCst)) };

        cache.fetch(QueryKey::new("pagos"), stale_immediately, fetch).await.unwrap();
        let second = cache.fetch(QueryKey::new("pagos"), stale_immediately, fetch).await.unwrap();

        assert_eq!(second, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_by_prefix() {
        let cache = QueryCache::new();
        cache.set(QueryKey::new("historial").with("a@b.com"), 1u8, FIVE_MIN);
        cache.set(QueryKey::new("historial").with("c@d.com"), 2u8, FIVE_MIN);
        cache.set(QueryKey::new("historiales"), 3u8, FIVE_MIN);

        let removed = cache.invalidate(&QueryKey::new("historial"));

        assert_eq!(removed, 2);
        assert!(cache.contains(&QueryKey::new("historiales")));
        assert!(!cache.contains(&QueryKey::new("historial").with("a@b.com")));
    }

    #[tokio::test]
    async fn test_server_errors_retry_once() {
        let cache = QueryCache::new().with_retry_delay(Duration::ZERO);
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let fetch = move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ApiError::new(503, "caído"))
            } else {
                Ok("ok".to_string())
            }
        };

        let value = cache.fetch(QueryKey::new("home"), options(1), fetch).await.unwrap();
        assert_eq!(value, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried_or_cached() {
        let cache = QueryCache::new().with_retry_delay(Duration::ZERO);
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<String, _>(ApiError::new(401, "no"))
        };

        let err = cache.fetch(QueryKey::new("usuario"), options(1), fetch).await.unwrap_err();
        assert_eq!(err.status, 401);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_garbage_collection() {
        let cache = QueryCache::new();
        cache.set(QueryKey::new("old"), 1u8, Duration::ZERO);
        cache.set(QueryKey::new("new"), 2u8, FIVE_MIN);
        tokio::time::sleep(Duration::from_millis(5)).await;

        cache.collect_garbage();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<u8>(&QueryKey::new("new")), Some(2));
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let cache = QueryCache::new();
        cache.set(QueryKey::new("home"), 7u32, FIVE_MIN);
        assert_eq!(cache.get::<String>(&QueryKey::new("home")), None);
        assert_eq!(cache.get::<u32>(&QueryKey::new("home")), Some(7));
    }

    #[test]
    fn test_key_display() {
        let key = QueryKey::new("resenia").with(12);
        assert_eq!(key.to_string(), "[resenia, 12]");
        assert_eq!(key.segments().len(), 2);
    }
}
