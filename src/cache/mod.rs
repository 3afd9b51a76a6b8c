//! Keyed, once-only value materialization shared across render workers.
//!
//! [`SyncCache`] is the concurrency primitive behind chart resolution. Every
//! chart identity (or, for local charts, every chart name) is resolved at most
//! once per process, no matter how many render jobs ask for it at the same
//! time.
//!
//! # Locking Strategy
//!
//! The key → entry map is a [`DashMap`]; inserting a fresh entry only holds a
//! shard lock for the duration of the insert. Each entry then carries its own
//! `tokio::sync::RwLock`:
//!
//! ```text
//! Job A: get("terra-helm/leonardo/1.0.0") ──┐
//!                                            ├── B waits on A's entry lock
//! Job B: get("terra-helm/leonardo/1.0.0") ──┘
//!
//! Job C: get("terra-helm/sam/2.0.0") ──────── CONCURRENT: different entry
//! ```
//!
//! The resolver runs while holding the entry's write lock, so waiters for the
//! same key observe the stored outcome instead of resolving again. Both
//! successes and errors are stored; a failed resolution is never retried.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::core::TerraError;

/// Maps a request to its cache key.
pub type KeyMapper<R> = Box<dyn Fn(&R) -> String + Send + Sync>;

/// Produces the value for a request that missed the cache.
pub type ResolveFn<R, V> = Box<dyn Fn(R) -> BoxFuture<'static, Result<V, TerraError>> + Send + Sync>;

#[derive(Debug)]
struct CacheEntry<V> {
    outcome: RwLock<Option<Result<V, TerraError>>>,
}

impl<V> Default for CacheEntry<V> {
    fn default() -> Self {
        Self {
            outcome: RwLock::new(None),
        }
    }
}

/// Concurrency-safe memoizing cache over an async resolver.
///
/// `R` is the request type, `V` the resolved value. Keys are computed with a
/// pluggable mapper so that different resolvers can choose how coarse their
/// deduplication is.
///
/// # Examples
///
/// ```rust
/// use terra_cli::cache::SyncCache;
///
/// # async fn example() {
/// let cache: SyncCache<u32, String> = SyncCache::new(
///     "squares",
///     |n: &u32| n.to_string(),
///     |n: u32| Box::pin(async move { Ok((n * n).to_string()) }),
/// );
/// assert_eq!(cache.get(4).await.unwrap(), "16");
/// # }
/// ```
pub struct SyncCache<R, V> {
    name: &'static str,
    entries: DashMap<String, Arc<CacheEntry<V>>>,
    key_mapper: KeyMapper<R>,
    resolver: ResolveFn<R, V>,
}

impl<R, V> SyncCache<R, V>
where
    R: Send,
    V: Clone + Send + Sync,
{
    /// Creates an empty cache. `name` only appears in log messages.
    pub fn new<K, F>(name: &'static str, key_mapper: K, resolver: F) -> Self
    where
        K: Fn(&R) -> String + Send + Sync + 'static,
        F: Fn(R) -> BoxFuture<'static, Result<V, TerraError>> + Send + Sync + 'static,
    {
        Self {
            name,
            entries: DashMap::new(),
            key_mapper: Box::new(key_mapper),
            resolver: Box::new(resolver),
        }
    }

    /// Returns the cached outcome for `request`, resolving it on first use.
    ///
    /// Concurrent callers for the same key wait for the first caller's
    /// resolution and receive a clone of its outcome.
    pub async fn get(&self, request: R) -> Result<V, TerraError> {
        let key = (self.key_mapper)(&request);
        let entry = self.entry(&key);

        {
            let outcome = entry.outcome.read().await;
            if let Some(result) = outcome.as_ref() {
                tracing::trace!(target: "cache", "[{}] hit: {}", self.name, key);
                return result.clone();
            }
        }

        let mut outcome = entry.outcome.write().await;
        // Another caller may have resolved while we waited for the write lock
        if let Some(result) = outcome.as_ref() {
            tracing::trace!(target: "cache", "[{}] hit after wait: {}", self.name, key);
            return result.clone();
        }

        tracing::debug!(target: "cache", "[{}] resolving: {}", self.name, key);
        let result = (self.resolver)(request).await;
        if let Err(e) = &result {
            tracing::debug!(target: "cache", "[{}] caching failure for {}: {}", self.name, key, e);
        }
        *outcome = Some(result.clone());
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entry(&self, key: &str) -> Arc<CacheEntry<V>> {
        if let Some(existing) = self.entries.get(key) {
            return Arc::clone(existing.value());
        }
        Arc::clone(self.entries.entry(key.to_string()).or_insert_with(|| Arc::new(CacheEntry::default())).value())
    }
}
