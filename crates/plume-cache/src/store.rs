//! Cache store trait for the external key-value backend.

use async_trait::async_trait;
use plume_core::{Interface, PlumeResult};
use std::time::Duration;

/// A TTL key-value store reachable over the network.
///
/// Values are opaque strings (JSON in practice). Implementations report
/// failures as [`PlumeError::CacheUnavailable`](plume_core::PlumeError::CacheUnavailable);
/// their durability and consistency guarantees are their own.
#[async_trait]
pub trait CacheStore: Interface + Send + Sync {
    /// Get a raw value.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> PlumeResult<Option<String>>;

    /// Set a raw value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> PlumeResult<()>;

    /// Delete a single key.
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, key: &str) -> PlumeResult<bool>;

    /// List keys matching a glob pattern (`*`, `?`, `[...]`).
    async fn keys_matching(&self, pattern: &str) -> PlumeResult<Vec<String>>;

    /// Delete many keys in one round trip.
    ///
    /// Returns the number of keys deleted.
    async fn pipeline_delete(&self, keys: &[String]) -> PlumeResult<u64>;
}
