//! # Plume Cache
//!
//! Read-through caching for expensive or rate-limited lookups.
//!
//! [`CacheAside`] wraps any async computation with a TTL cache held in a
//! [`CacheStore`]. Store failures never fail the caller: the layer logs them
//! and returns the freshly computed value instead.

mod cache_aside;
pub mod cache_keys;
mod coalesce;
mod memory_store;
mod redis_store;
mod store;

pub use cache_aside::{is_pattern, CacheAside, DEFAULT_OPERATION_TIMEOUT};
pub use memory_store::MemoryCacheStore;
pub use redis_store::{create_pool, RedisCacheStore, RedisCacheStoreParameters};
pub use store::CacheStore;
