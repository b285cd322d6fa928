//! Redis-based cache store.

use super::CacheStore;
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Pool, Runtime};
use plume_config::CacheConfig;
use plume_core::{PlumeError, PlumeResult};
use shaku::Component;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 500;

/// Create the Redis connection pool, or `None` when caching is disabled.
///
/// An unreachable server is logged but not fatal: the cache layer fails open.
pub async fn create_pool(config: &CacheConfig) -> PlumeResult<Option<Arc<Pool>>> {
    if !config.enabled {
        info!("Redis cache disabled by configuration");
        return Ok(None);
    }

    info!("Creating Redis connection pool for cache...");

    let pool = Config::from_url(&config.url)
        .builder()
        .map_err(|e| PlumeError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .wait_timeout(Some(config.operation_timeout()))
        .create_timeout(Some(config.operation_timeout()))
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| PlumeError::Configuration(format!("Failed to create Redis pool: {}", e)))?;

    match pool.get().await {
        Ok(mut conn) => {
            let ping: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
            match ping {
                Ok(_) => info!("Redis connection pool created successfully"),
                Err(e) => warn!("Redis PING failed, cache will fail open until it recovers: {}", e),
            }
        }
        Err(e) => warn!("Redis unreachable at startup, cache will fail open: {}", e),
    }

    Ok(Some(Arc::new(pool)))
}

/// Redis-based cache store.
#[derive(Component)]
#[shaku(interface = CacheStore)]
pub struct RedisCacheStore {
    /// Redis connection pool, `None` when disabled.
    pool: Option<Arc<Pool>>,
}

impl RedisCacheStore {
    /// Create a new Redis cache store.
    #[must_use]
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool: Some(pool) }
    }

    /// Create a no-op store (for when Redis is disabled). Every lookup misses.
    #[must_use]
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    /// Create a store from configuration.
    pub async fn from_config(config: &CacheConfig) -> PlumeResult<Self> {
        Ok(Self {
            pool: create_pool(config).await?,
        })
    }

    /// Check if caching is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    async fn get_conn(&self) -> PlumeResult<Option<deadpool_redis::Connection>> {
        match &self.pool {
            Some(pool) => pool.get().await.map(Some).map_err(|e| {
                PlumeError::CacheUnavailable(format!("Failed to get Redis connection: {}", e))
            }),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> PlumeResult<Option<String>> {
        let Some(mut conn) = self.get_conn().await? else {
            return Ok(None);
        };

        let value: Option<String> = conn.get(key).await.map_err(|e| {
            PlumeError::CacheUnavailable(format!("Failed to get key '{}': {}", key, e))
        })?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> PlumeResult<()> {
        let Some(mut conn) = self.get_conn().await? else {
            return Ok(());
        };

        // SET EX rejects 0; sub-second TTLs round up to one second
        let ttl_secs = ttl.as_secs().max(1);

        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await.map_err(|e| {
            PlumeError::CacheUnavailable(format!("Failed to set key '{}': {}", key, e))
        })?;

        debug!("Cached key '{}' with TTL {}s", key, ttl_secs);
        Ok(())
    }

    async fn delete(&self, key: &str) -> PlumeResult<bool> {
        let Some(mut conn) = self.get_conn().await? else {
            return Ok(false);
        };

        let deleted: i64 = conn.del(key).await.map_err(|e| {
            PlumeError::CacheUnavailable(format!("Failed to delete key '{}': {}", key, e))
        })?;

        debug!("Deleted key '{}': {}", key, deleted > 0);
        Ok(deleted > 0)
    }

    async fn keys_matching(&self, pattern: &str) -> PlumeResult<Vec<String>> {
        let Some(mut conn) = self.get_conn().await? else {
            return Ok(Vec::new());
        };

        // SCAN instead of KEYS so large keyspaces don't block the server
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| PlumeError::CacheUnavailable(format!("Failed to scan keys: {}", e)))?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    async fn pipeline_delete(&self, keys: &[String]) -> PlumeResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let Some(mut conn) = self.get_conn().await? else {
            return Ok(0);
        };

        let mut pipe = redis::pipe();
        for key in keys {
            pipe.del(key);
        }

        let counts: Vec<u64> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| PlumeError::CacheUnavailable(format!("Failed to delete keys: {}", e)))?;

        let deleted = counts.iter().sum();
        debug!("Deleted {} of {} keys in one pipeline", deleted, keys.len());
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shaku::{module, HasComponent};

    module! {
        CacheModule {
            components = [RedisCacheStore],
            providers = [],
        }
    }

    #[test]
    fn test_disabled_store() {
        let store = RedisCacheStore::disabled();
        assert!(!store.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_store_always_misses() {
        let store = RedisCacheStore::disabled();

        store.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.delete("k").await.unwrap());
        assert!(store.keys_matching("*").await.unwrap().is_empty());
        assert_eq!(store.pipeline_delete(&["k".to_string()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_pool_disabled() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        assert!(create_pool(&config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolves_through_shaku_module() {
        let module = CacheModule::builder()
            .with_component_parameters::<RedisCacheStore>(RedisCacheStoreParameters { pool: None })
            .build();

        let store: Arc<dyn CacheStore> = module.resolve();
        assert_eq!(store.get("anything").await.unwrap(), None);
    }
}
