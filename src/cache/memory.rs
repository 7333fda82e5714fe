//! In-process cache backend built on Moka.
//!
//! Mirrors the Redis keyspace closely enough for the coordinator: a key holds
//! either a plain value or a hash of fields, each key has its own TTL, and
//! touching a key with the wrong shape is an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::sync::Cache;
use moka::Expiry;

use super::backend::{CacheBackend, CacheError, CacheResult};

#[derive(Clone)]
enum SlotData {
    Value(Arc<[u8]>),
    Hash(Arc<DashMap<String, Arc<[u8]>>>),
}

/// A cached key together with the TTL it was written with.
#[derive(Clone)]
struct Slot {
    data: SlotData,
    ttl: Duration,
}

/// Per-entry expiry: every write restarts the clock with the slot's TTL.
struct SlotExpiry;

impl Expiry<String, Slot> for SlotExpiry {
    fn expire_after_create(&self, _key: &String, value: &Slot, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Slot,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-backed cache backend.
///
/// Cloning is cheap and shares the same underlying cache.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Cache<String, Slot>,
}

impl MemoryBackend {
    /// Create a backend holding at most `max_capacity` keys.
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(SlotExpiry)
            .build();

        Self { inner }
    }

    fn hash(&self, key: &str) -> CacheResult<Option<Arc<DashMap<String, Arc<[u8]>>>>> {
        match self.inner.get(key) {
            None => Ok(None),
            Some(Slot { data: SlotData::Hash(map), .. }) => Ok(Some(map)),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        match self.inner.get(key) {
            None => Ok(None),
            Some(Slot { data: SlotData::Value(bytes), .. }) => Ok(Some(bytes.to_vec())),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let slot = Slot {
            data: SlotData::Value(value.into()),
            ttl,
        };
        self.inner.insert(key.to_string(), slot);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.inner.invalidate(key);
        Ok(())
    }

    async fn delete_all(&self, keys: &[String]) -> CacheResult<()> {
        for key in keys {
            self.inner.invalidate(key);
        }
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> CacheResult<Vec<String>> {
        Ok(self
            .inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.to_string())
            .collect())
    }

    async fn hash_get(&self, key: &str, field: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self
            .hash(key)?
            .and_then(|map| map.get(field).map(|bytes| bytes.to_vec())))
    }

    async fn hash_set(
        &self,
        key: &str,
        field: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> CacheResult<()> {
        let slot = self
            .inner
            .entry(key.to_string())
            .or_insert_with(|| Slot {
                data: SlotData::Hash(Arc::new(DashMap::new())),
                ttl,
            })
            .into_value();

        let SlotData::Hash(map) = slot.data else {
            return Err(CacheError::WrongType(key.to_string()));
        };

        map.insert(field.to_string(), value.into());

        // Re-insert to restart the key's expiry, like EXPIRE after HSET.
        self.inner.insert(
            key.to_string(),
            Slot {
                data: SlotData::Hash(map),
                ttl,
            },
        );
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> CacheResult<()> {
        if let Some(map) = self.hash(key)? {
            map.remove(field);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}
