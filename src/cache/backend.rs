//! Cache backend contract.
//!
//! Backends store opaque bytes under string keys with a TTL. Single-key
//! operations are atomic; nothing spans keys. Entries may disappear at any
//! time (eviction), so callers treat every read as possibly absent.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure talking to a cache backend.
///
/// The coordinator degrades every one of these to a cache miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// The key holds a different shape (value vs hash).
    #[error("key '{0}' holds a value of the wrong type")]
    WrongType(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.code() == Some("WRONGTYPE") {
            CacheError::WrongType(err.to_string())
        } else {
            CacheError::Unavailable(err.to_string())
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value store with TTL support.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Delete every listed key. Missing keys are ignored.
    async fn delete_all(&self, keys: &[String]) -> CacheResult<()>;

    /// All live keys starting with `prefix`.
    async fn keys(&self, prefix: &str) -> CacheResult<Vec<String>>;

    async fn hash_get(&self, key: &str, field: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Set one field and refresh the expiry of the whole hash.
    async fn hash_set(
        &self,
        key: &str,
        field: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> CacheResult<()>;

    async fn hash_delete(&self, key: &str, field: &str) -> CacheResult<()>;
}
