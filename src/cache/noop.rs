//! Backend used when caching is switched off.

use std::time::Duration;

use async_trait::async_trait;

use super::backend::{CacheBackend, CacheResult};

/// Drops every write and misses every read.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackend;

#[async_trait]
impl CacheBackend for NoopBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn delete_all(&self, _keys: &[String]) -> CacheResult<()> {
        Ok(())
    }

    async fn keys(&self, _prefix: &str) -> CacheResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn hash_get(&self, _key: &str, _field: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn hash_set(
        &self,
        _key: &str,
        _field: &str,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> CacheResult<()> {
        Ok(())
    }

    async fn hash_delete(&self, _key: &str, _field: &str) -> CacheResult<()> {
        Ok(())
    }
}
