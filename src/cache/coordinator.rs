//! Cache coordinator - read-through and write-invalidation policy.
//!
//! The coordinator is the only component that touches cache state. It owns
//! the key scheme, the TTL and every staleness decision:
//!
//! - reads fill the cache on a miss (`<ns>:all` for the collection, a per-id
//!   entry for single products)
//! - writes drop the per-id entry and `<ns>:all` once the store has committed
//! - name lookups are never cached
//!
//! Every backend failure degrades to a miss. The cache is an optimization,
//! so nothing here can fail a request that the store can answer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::backend::{CacheBackend, CacheError};
use super::codec;
use super::config::{CacheConfig, CacheLayout};
use super::keys::KeySpace;
use crate::database::{Product, ProductStore, StoreResult};

/// Running counters for cache activity.
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    derived_hits: AtomicU64,
    misses: AtomicU64,
    fills: AtomicU64,
    degraded: AtomicU64,
    failed_invalidations: AtomicU64,
}

/// Point-in-time copy of the coordinator's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub backend: &'static str,
    /// Reads answered from their own key.
    pub hits: u64,
    /// By-id reads answered from the collection entry.
    pub derived_hits: u64,
    pub misses: u64,
    pub fills: u64,
    /// Backend calls that failed and were treated as misses.
    pub degraded: u64,
    /// Invalidations that failed after a committed write.
    pub failed_invalidations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits + self.derived_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Applies the cache-aside policy for products.
pub struct CacheCoordinator {
    backend: Arc<dyn CacheBackend>,
    keys: KeySpace,
    config: CacheConfig,
    counters: Counters,
}

impl CacheCoordinator {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self {
            keys: KeySpace::new(&config.namespace),
            backend,
            config,
            counters: Counters::default(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            backend: self.backend.name(),
            hits: c.hits.load(Ordering::Relaxed),
            derived_hits: c.derived_hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            fills: c.fills.load(Ordering::Relaxed),
            degraded: c.degraded.load(Ordering::Relaxed),
            failed_invalidations: c.failed_invalidations.load(Ordering::Relaxed),
        }
    }

    /// All products, from `<ns>:all` when present, else from the store.
    ///
    /// Concurrent misses may each fill the entry; the last write wins.
    pub async fn read_collection(&self, store: &dyn ProductStore) -> StoreResult<Vec<Product>> {
        if let Some(products) = self.cached_collection().await {
            bump(&self.counters.hits);
            debug!("Collection served from cache ({} products)", products.len());
            return Ok(products);
        }

        bump(&self.counters.misses);
        let products = store.find_all().await?;
        self.fill_collection(&products).await;
        Ok(products)
    }

    /// One product by id.
    ///
    /// Checks the per-id entry, then the collection entry, then the store.
    /// Only a store hit fills the per-id entry, unless `eager_id_fill` is on.
    /// A missing product writes nothing.
    pub async fn read_by_id(
        &self,
        id: i64,
        store: &dyn ProductStore,
    ) -> StoreResult<Option<Product>> {
        if let Some(product) = self.cached_product(id).await {
            bump(&self.counters.hits);
            debug!("Product {} served from cache", id);
            return Ok(Some(product));
        }

        if let Some(products) = self.cached_collection().await
            && let Some(product) = products.into_iter().find(|p| p.id == id)
        {
            bump(&self.counters.derived_hits);
            debug!("Product {} served from collection entry", id);
            if self.config.eager_id_fill {
                self.fill_product(&product).await;
            }
            return Ok(Some(product));
        }

        bump(&self.counters.misses);
        let product = store.find_by_id(id).await?;
        if let Some(p) = &product {
            self.fill_product(p).await;
        }
        Ok(product)
    }

    /// Name lookups always go to the store.
    pub async fn read_by_name(
        &self,
        name: &str,
        store: &dyn ProductStore,
    ) -> StoreResult<Option<Product>> {
        store.find_by_name(name).await
    }

    /// Drop the entries made stale by a committed write to `id`.
    ///
    /// Must only be called after the store write succeeded.
    pub async fn invalidate_on_write(&self, id: i64) {
        self.evict_product(id).await;
        self.evict_collection().await;
    }

    /// Post-update hook: write-through when enabled, otherwise invalidate.
    ///
    /// The collection entry is dropped either way.
    pub async fn refresh_on_update(&self, product: &Product) {
        if !self.config.write_through_updates {
            self.invalidate_on_write(product.id).await;
            return;
        }

        // Evict first so a failed write cannot leave the old copy behind.
        self.evict_product(product.id).await;
        self.fill_product(product).await;
        self.evict_collection().await;
    }

    /// Drop the collection entry and every per-id entry in the namespace.
    pub async fn invalidate_all(&self) {
        let keys = match self.backend.keys(self.keys.prefix()).await {
            Ok(keys) => keys,
            Err(e) => {
                self.invalidation_failed("namespace scan", &e);
                // Still clear the fixed keys; per-id value keys age out.
                vec![self.keys.all(), self.keys.id_hash()]
            }
        };

        if keys.is_empty() {
            return;
        }

        match self.backend.delete_all(&keys).await {
            Ok(()) => debug!("Invalidated {} cache keys", keys.len()),
            Err(e) => self.invalidation_failed(self.keys.prefix(), &e),
        }
    }

    async fn cached_collection(&self) -> Option<Vec<Product>> {
        self.read_value(&self.keys.all()).await
    }

    /// Fetch and decode a plain value; anything but a clean hit is a miss.
    async fn read_value<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.backend.get(key).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                self.degraded("get", key, &e);
                return None;
            }
        };

        match codec::decode(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                bump(&self.counters.degraded);
                if let Err(e) = self.backend.delete(key).await {
                    self.invalidation_failed(key, &e);
                }
                None
            }
        }
    }

    async fn cached_product(&self, id: i64) -> Option<Product> {
        match self.config.layout {
            CacheLayout::Value => self.read_value(&self.keys.by_id(id)).await,
            CacheLayout::Hash => {
                let key = self.keys.id_hash();
                let field = KeySpace::id_field(id);
                let bytes = match self.backend.hash_get(&key, &field).await {
                    Ok(bytes) => bytes?,
                    Err(e) => {
                        self.degraded("hget", &key, &e);
                        return None;
                    }
                };

                match codec::decode_field(&bytes, Utc::now()) {
                    Ok(product) => product,
                    Err(e) => {
                        warn!(key = %key, field = %field, error = %e, "Discarding undecodable cache field");
                        bump(&self.counters.degraded);
                        if let Err(e) = self.backend.hash_delete(&key, &field).await {
                            self.invalidation_failed(&key, &e);
                        }
                        None
                    }
                }
            }
        }
    }

    async fn fill_collection(&self, products: &[Product]) {
        let key = self.keys.all();
        let bytes = match codec::encode(&products) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode products for cache");
                return;
            }
        };

        match self.backend.set(&key, bytes, self.config.ttl).await {
            Ok(()) => {
                bump(&self.counters.fills);
                debug!("Filled {} with {} products", key, products.len());
            }
            Err(e) => self.degraded("set", &key, &e),
        }
    }

    async fn fill_product(&self, product: &Product) {
        let ttl = self.config.ttl;
        let (key, result) = match self.config.layout {
            CacheLayout::Value => {
                let key = self.keys.by_id(product.id);
                let result = match codec::encode(product) {
                    Ok(bytes) => self.backend.set(&key, bytes, ttl).await,
                    Err(e) => {
                        warn!(key = %key, error = %e, "Failed to encode product for cache");
                        return;
                    }
                };
                (key, result)
            }
            CacheLayout::Hash => {
                let key = self.keys.id_hash();
                let field = KeySpace::id_field(product.id);
                let result = match codec::encode_field(product, ttl, Utc::now()) {
                    Ok(bytes) => self.backend.hash_set(&key, &field, bytes, ttl).await,
                    Err(e) => {
                        warn!(key = %key, error = %e, "Failed to encode product for cache");
                        return;
                    }
                };
                (key, result)
            }
        };

        match result {
            Ok(()) => {
                bump(&self.counters.fills);
                debug!("Filled {} for product {}", key, product.id);
            }
            Err(e) => self.degraded("set", &key, &e),
        }
    }

    async fn evict_product(&self, id: i64) {
        let (key, result) = match self.config.layout {
            CacheLayout::Value => {
                let key = self.keys.by_id(id);
                let result = self.backend.delete(&key).await;
                (key, result)
            }
            CacheLayout::Hash => {
                let key = self.keys.id_hash();
                let result = self
                    .backend
                    .hash_delete(&key, &KeySpace::id_field(id))
                    .await;
                (key, result)
            }
        };

        if let Err(e) = result {
            self.invalidation_failed(&key, &e);
        }
    }

    async fn evict_collection(&self) {
        let key = self.keys.all();
        if let Err(e) = self.backend.delete(&key).await {
            self.invalidation_failed(&key, &e);
        }
    }

    fn degraded(&self, op: &str, key: &str, error: &CacheError) {
        bump(&self.counters.degraded);
        warn!(
            backend = self.backend.name(),
            op,
            key,
            error = %error,
            "Cache call failed, treating as miss"
        );
    }

    fn invalidation_failed(&self, key: &str, error: &CacheError) {
        bump(&self.counters.failed_invalidations);
        warn!(
            backend = self.backend.name(),
            key,
            error = %error,
            ttl_secs = self.config.ttl.as_secs(),
            "Cache invalidation failed; entry may stay stale until its TTL expires"
        );
    }
}

impl std::fmt::Debug for CacheCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCoordinator")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}
