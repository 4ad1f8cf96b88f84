//! Process-lifetime report cache
//!
//! Entries are keyed by the exact `(ticker, period)` request and never
//! expire or get evicted. Two concurrent misses on the same key may both
//! compute; the second insert overwrites the first with an equivalent value.

use cached::{Cached, UnboundCache};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::report::AggregatedReport;

/// Cache key for one aggregation request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Ticker exactly as requested
    pub ticker: String,
    pub period: String,
}

impl CacheKey {
    pub fn new(ticker: impl Into<String>, period: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            period: period.into(),
        }
    }
}

/// Thread-safe unbounded cache. Clones share the same storage.
pub struct ReportCache<V = AggregatedReport> {
    cache: Arc<RwLock<UnboundCache<CacheKey, V>>>,
}

impl<V: Clone> ReportCache<V> {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(RwLock::new(UnboundCache::new())),
        }
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value into the cache
    pub async fn insert(&self, key: CacheKey, value: V) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// The lock is not held while `compute` runs.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(&key).await {
            debug!(ticker = %key.ticker, period = %key.period, "Cache hit");
            return value;
        }

        debug!(ticker = %key.ticker, period = %key.period, "Cache miss");
        let value = compute().await;
        self.insert(key, value.clone()).await;
        value
    }
}

impl<V: Clone> Default for ReportCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for ReportCache<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}
