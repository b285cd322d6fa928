//! Cache-aside reads and invalidation over a [`CacheStore`].
//!
//! The store is an optimisation, never a dependency: every store call is
//! bounded by the operation timeout, and any failure degrades to calling the
//! compute function directly.

use crate::coalesce::MissCoalescer;
use crate::CacheStore;
use plume_config::CacheConfig;
use plume_resilience::with_timeout;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default bound on a single store call.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(250);

/// Returns true if `key` is a glob pattern rather than a literal key.
#[must_use]
pub fn is_pattern(key: &str) -> bool {
    key.contains(['*', '?', '['])
}

/// Cache-aside helper.
///
/// ```ignore
/// let cache = CacheAside::new(store);
/// let usage = cache
///     .get_or_compute(&cache_keys::usage(user_id), Duration::from_secs(60), || {
///         repo.load_usage(user_id)
///     })
///     .await?;
/// ```
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    operation_timeout: Duration,
    coalescer: Option<MissCoalescer>,
}

impl CacheAside {
    /// Create a cache-aside helper with the default timeout and no coalescing.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            coalescer: None,
        }
    }

    /// Create from cache configuration.
    #[must_use]
    pub fn from_config(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self::new(store)
            .with_operation_timeout(config.operation_timeout())
            .with_coalescing(config.coalesce_misses)
    }

    /// Set the bound on each store call.
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Serialise concurrent misses on the same key so `compute` runs once.
    #[must_use]
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalescer = enabled.then(MissCoalescer::new);
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Return the cached value for `key`, or compute, cache and return it.
    ///
    /// Errors from `compute` are returned unchanged and nothing is cached.
    /// Store failures never surface here.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_compute_with(key, ttl, false, compute).await
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but skips the lookup
    /// when `force_refresh` is set.
    pub async fn get_or_compute_with<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        force_refresh: bool,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !force_refresh {
            if let Some(value) = self.read(key).await {
                return Ok(value);
            }
        }

        let _guard = match &self.coalescer {
            Some(coalescer) => {
                let guard = coalescer.acquire(key).await;
                // Another caller may have filled the key while we waited
                if !force_refresh {
                    if let Some(value) = self.read(key).await {
                        return Ok(value);
                    }
                }
                Some(guard)
            }
            None => None,
        };

        let value = compute().await?;
        self.write(key, &value, ttl).await;
        Ok(value)
    }

    /// Remove a key, or every key matching a glob pattern.
    ///
    /// Patterns are deleted in a single batch. Store failures are logged and
    /// otherwise ignored; invalidating a missing key is a no-op.
    pub async fn invalidate(&self, key_or_pattern: &str) {
        if is_pattern(key_or_pattern) {
            self.invalidate_pattern(key_or_pattern).await;
            return;
        }

        let result = with_timeout("cache delete", self.operation_timeout, || {
            self.store.delete(key_or_pattern)
        })
        .await;

        match result {
            Ok(existed) => debug!("Invalidated key '{}' (existed: {})", key_or_pattern, existed),
            Err(e) => warn!("Failed to invalidate key '{}': {}", key_or_pattern, e),
        }
    }

    async fn invalidate_pattern(&self, pattern: &str) {
        let keys = match with_timeout("cache scan", self.operation_timeout, || {
            self.store.keys_matching(pattern)
        })
        .await
        {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Failed to list keys matching '{}': {}", pattern, e);
                return;
            }
        };

        if keys.is_empty() {
            debug!("No keys match pattern '{}'", pattern);
            return;
        }

        let result = with_timeout("cache pipeline delete", self.operation_timeout, || {
            self.store.pipeline_delete(&keys)
        })
        .await;

        match result {
            Ok(deleted) => debug!("Invalidated {} keys matching '{}'", deleted, pattern),
            Err(e) => warn!(
                "Failed to invalidate {} keys matching '{}': {}",
                keys.len(),
                pattern,
                e
            ),
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match with_timeout("cache get", self.operation_timeout, || self.store.get(key)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cache read failed for key '{}', computing instead: {}", key, e);
                return None;
            }
        };

        let Some(json) = raw else {
            debug!("Cache miss for key '{}'", key);
            return None;
        };

        match serde_json::from_str(&json) {
            Ok(value) => {
                debug!("Cache hit for key '{}'", key);
                Some(value)
            }
            Err(e) => {
                warn!("Discarding unreadable cache entry '{}': {}", key, e);
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("Not caching key '{}', value failed to serialize: {}", key, e);
                return;
            }
        };

        if json == "null" {
            debug!("Not caching undefined value for key '{}'", key);
            return;
        }

        if let Err(e) = with_timeout("cache set", self.operation_timeout, || {
            self.store.set(key, &json, ttl)
        })
        .await
        {
            warn!("Cache write failed for key '{}': {}", key, e);
        }
    }
}

impl fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAside")
            .field("operation_timeout", &self.operation_timeout)
            .field("coalescing", &self.coalescer.is_some())
            .finish_non_exhaustive()
    }
}
