//! Product service - CRUD over the store with cache-aside reads.
//!
//! Every write goes to the store first. Cache entries are only touched after
//! the store has committed, so a failed write leaves the cache as it was.

use std::sync::Arc;

use tracing::{debug, info};

use super::error::{ServiceError, ServiceResult};
use crate::cache::{CacheCoordinator, CacheStats};
use crate::database::{NewProduct, Product, ProductStore};

/// Product operations exposed to callers.
///
/// Cloning is cheap and shares the store and coordinator.
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ProductStore>,
    cache: Arc<CacheCoordinator>,
}

impl ProductService {
    pub fn new(store: Arc<dyn ProductStore>, cache: Arc<CacheCoordinator>) -> Self {
        Self { store, cache }
    }

    /// Insert one product. The cache is not populated.
    pub async fn create(&self, product: NewProduct) -> ServiceResult<Product> {
        let created = self.store.insert(product).await?;
        debug!("Created product {}", created.id);
        Ok(created)
    }

    /// Insert several products and drop the whole namespace from the cache.
    pub async fn create_batch(&self, products: Vec<NewProduct>) -> ServiceResult<Vec<Product>> {
        let created = self.store.insert_batch(products).await?;
        self.cache.invalidate_all().await;
        info!("Created {} products", created.len());
        Ok(created)
    }

    pub async fn list(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.cache.read_collection(self.store.as_ref()).await?)
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Product> {
        self.cache
            .read_by_id(id, self.store.as_ref())
            .await?
            .ok_or_else(|| ServiceError::product_id(id))
    }

    /// Uncached lookup by exact name.
    pub async fn get_by_name(&self, name: &str) -> ServiceResult<Product> {
        self.cache
            .read_by_name(name, self.store.as_ref())
            .await?
            .ok_or_else(|| ServiceError::product_name(name))
    }

    /// Copy name, price and quantity from `product` onto the stored record.
    ///
    /// The existing record is read from the store, never from the cache, and
    /// its id is kept.
    pub async fn update(&self, product: Product) -> ServiceResult<Product> {
        let mut existing = self
            .store
            .find_by_id(product.id)
            .await?
            .ok_or_else(|| ServiceError::product_id(product.id))?;

        existing.apply_changes(&product);
        let saved = self.store.save(&existing).await?;

        self.cache.refresh_on_update(&saved).await;
        debug!("Updated product {}", saved.id);
        Ok(saved)
    }

    /// Delete by id, returning a confirmation message.
    ///
    /// Deleting an absent id is not an error; the cache is invalidated anyway.
    pub async fn delete(&self, id: i64) -> ServiceResult<String> {
        let removed = self.store.delete_by_id(id).await?;
        self.cache.invalidate_on_write(id).await;

        if removed {
            info!("Deleted product {}", id);
        } else {
            debug!("Delete of product {} matched nothing", id);
        }
        Ok(format!("product removed id: {id}"))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::{CacheBackend, CacheConfig, CacheLayout, MemoryBackend};
    use crate::database::StoreError;
    use crate::testing::{CountingStore, FailingBackend};

    struct Harness {
        service: ProductService,
        store: Arc<CountingStore>,
        backend: Arc<MemoryBackend>,
    }

    async fn harness(seed: usize, config: CacheConfig) -> Harness {
        let store = Arc::new(CountingStore::seeded(seed).await);
        let backend = Arc::new(MemoryBackend::new(1_000));
        let cache = Arc::new(CacheCoordinator::new(backend.clone(), config));
        Harness {
            service: ProductService::new(store.clone(), cache),
            store,
            backend,
        }
    }

    fn calls(counter: &std::sync::atomic::AtomicUsize) -> usize {
        CountingStore::count(counter)
    }

    #[tokio::test]
    async fn test_list_fills_once_after_invalidate_all() {
        let h = harness(3, CacheConfig::default()).await;
        h.service.list().await.unwrap();

        h.service.cache.invalidate_all().await;
        let before = calls(&h.store.calls.find_all);

        h.service.list().await.unwrap();
        assert_eq!(calls(&h.store.calls.find_all), before + 1);
        assert!(h.backend.get("product:all").await.unwrap().is_some());

        h.service.list().await.unwrap();
        assert_eq!(calls(&h.store.calls.find_all), before + 1);
    }

    #[tokio::test]
    async fn test_create_does_not_populate_cache() {
        let h = harness(0, CacheConfig::default()).await;

        let created = h.service.create(NewProduct::new("vase", 20.0, 1)).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(calls(&h.store.calls.insert), 1);
        assert!(h.backend.keys("product:").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_batch_invalidates_namespace() {
        let h = harness(2, CacheConfig::default()).await;
        h.service.list().await.unwrap();
        h.service.get_by_id(1).await.unwrap();

        let created = h
            .service
            .create_batch(vec![NewProduct::new("x", 1.0, 1), NewProduct::new("y", 2.0, 2)])
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(calls(&h.store.calls.insert_batch), 1);
        assert!(h.backend.keys("product:").await.unwrap().is_empty());
        assert_eq!(h.service.list().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_update_is_visible_immediately() {
        for write_through in [false, true] {
            let h = harness(5, CacheConfig::default().write_through_updates(write_through)).await;
            // Warm both views so a stale copy would be served if not invalidated.
            h.service.get_by_id(5).await.unwrap();
            h.service.list().await.unwrap();

            let mut incoming = h.service.get_by_id(5).await.unwrap();
            incoming.name = "renamed".into();
            incoming.price = 1.25;
            h.service.update(incoming).await.unwrap();

            let fetched = h.service.get_by_id(5).await.unwrap();
            assert_eq!(fetched.name, "renamed");
            assert_eq!(fetched.price, 1.25);

            let listed = h.service.list().await.unwrap();
            assert_eq!(listed.iter().find(|p| p.id == 5).unwrap().name, "renamed");
        }
    }

    #[tokio::test]
    async fn test_update_without_prior_cache_entry() {
        let h = harness(5, CacheConfig::default()).await;
        let incoming = NewProduct::new("fresh", 9.0, 9).with_id(5);

        h.service.update(incoming).await.unwrap();

        assert_eq!(h.service.get_by_id(5).await.unwrap().name, "fresh");
    }

    #[tokio::test]
    async fn test_update_reads_existing_from_store_and_keeps_id() {
        let h = harness(2, CacheConfig::default()).await;
        h.service.get_by_id(2).await.unwrap();
        let reads_before = calls(&h.store.calls.find_by_id);

        let updated = h
            .service
            .update(NewProduct::new("new", 3.0, 3).with_id(2))
            .await
            .unwrap();

        assert_eq!(updated.id, 2);
        assert_eq!(calls(&h.store.calls.find_by_id), reads_before + 1);
    }

    #[tokio::test]
    async fn test_update_missing_product_is_not_found() {
        let h = harness(1, CacheConfig::default()).await;

        let result = h.service.update(NewProduct::new("ghost", 1.0, 1).with_id(42)).await;

        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert_eq!(calls(&h.store.calls.save), 0);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let h = harness(8, CacheConfig::default()).await;
        h.service.get_by_id(7).await.unwrap();
        h.service.list().await.unwrap();

        let message = h.service.delete(7).await.unwrap();
        assert!(message.contains('7'));

        assert!(matches!(h.service.get_by_id(7).await, Err(ServiceError::NotFound(_))));
        assert!(h.service.list().await.unwrap().iter().all(|p| p.id != 7));
    }

    #[tokio::test]
    async fn test_delete_missing_product() {
        let h = harness(1, CacheConfig::default()).await;
        h.backend
            .set("product:99", b"stale".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let message = h.service.delete(99).await.unwrap();

        assert_eq!(message, "product removed id: 99");
        assert_eq!(calls(&h.store.calls.delete_by_id), 1);
        assert!(h.backend.get("product:99").await.unwrap().is_none());
        assert_eq!(h.service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_store_write_leaves_cache_untouched() {
        let h = harness(3, CacheConfig::default()).await;
        h.service.get_by_id(2).await.unwrap();
        h.service.list().await.unwrap();
        h.store.fail_writes(true);

        let update = h.service.update(NewProduct::new("nope", 0.0, 0).with_id(2)).await;
        assert!(matches!(update, Err(ServiceError::Store(StoreError::Unavailable(_)))));
        assert_eq!(calls(&h.store.calls.save), 1);
        assert_eq!(calls(&h.store.calls.delete_by_id), 0);

        let delete = h.service.delete(2).await;
        assert_eq!(calls(&h.store.calls.delete_by_id), 1);
        assert!(matches!(delete, Err(ServiceError::Store(_))));
        assert!(h.backend.get("product:2").await.unwrap().is_some());
        assert!(h.backend.get("product:all").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_name_lookup_reaches_store_every_time() {
        let h = harness(3, CacheConfig::default()).await;

        for _ in 0..4 {
            assert_eq!(h.service.get_by_name("item-2").await.unwrap().id, 2);
        }
        assert!(matches!(
            h.service.get_by_name("missing").await,
            Err(ServiceError::NotFound(_))
        ));

        assert_eq!(calls(&h.store.calls.find_by_name), 5);
    }

    #[tokio::test]
    async fn test_failing_cache_matches_cached_output() {
        let cached = harness(4, CacheConfig::default()).await;
        let store = Arc::new(CountingStore::seeded(4).await);
        let cache = Arc::new(CacheCoordinator::new(
            Arc::new(FailingBackend::default()),
            CacheConfig::default(),
        ));
        let degraded = ProductService::new(store, cache);

        assert_eq!(cached.service.list().await.unwrap(), degraded.list().await.unwrap());
        assert_eq!(
            cached.service.get_by_id(3).await.unwrap(),
            degraded.get_by_id(3).await.unwrap()
        );
        assert_eq!(
            cached.service.get_by_name("item-1").await.unwrap(),
            degraded.get_by_name("item-1").await.unwrap()
        );

        let incoming = NewProduct::new("edited", 2.0, 2).with_id(3);
        assert_eq!(
            cached.service.update(incoming.clone()).await.unwrap(),
            degraded.update(incoming).await.unwrap()
        );
        assert_eq!(
            cached.service.create(NewProduct::new("n", 1.0, 1)).await.unwrap(),
            degraded.create(NewProduct::new("n", 1.0, 1)).await.unwrap()
        );
        assert_eq!(
            cached.service.create_batch(vec![NewProduct::new("b", 1.0, 1)]).await.unwrap(),
            degraded.create_batch(vec![NewProduct::new("b", 1.0, 1)]).await.unwrap()
        );
        assert_eq!(
            cached.service.delete(1).await.unwrap(),
            degraded.delete(1).await.unwrap()
        );
        assert_eq!(cached.service.list().await.unwrap(), degraded.list().await.unwrap());
        assert!(degraded.cache_stats().degraded > 0);
    }

    #[tokio::test]
    async fn test_ttl_expiry_triggers_fresh_read() {
        let h = harness(2, CacheConfig::default().ttl(Duration::from_secs(1))).await;

        h.service.get_by_id(1).await.unwrap();
        h.service.get_by_id(1).await.unwrap();
        assert_eq!(calls(&h.store.calls.find_by_id), 1);

        tokio::time::sleep(Duration::from_millis(1_200)).await;

        h.service.get_by_id(1).await.unwrap();
        assert_eq!(calls(&h.store.calls.find_by_id), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cold_fills_converge() {
        let h = harness(50, CacheConfig::default()).await;
        let truth = h.store.find_all().await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = h.service.clone();
                tokio::spawn(async move { service.list().await.unwrap() })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), truth);
        }

        let bytes = h.backend.get("product:all").await.unwrap().unwrap();
        let cached: Vec<Product> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(cached, truth);
        assert!(calls(&h.store.calls.find_all) >= 1);
    }

    #[tokio::test]
    async fn test_hash_layout_end_to_end() {
        let h = harness(3, CacheConfig::default().layout(CacheLayout::Hash)).await;

        h.service.get_by_id(2).await.unwrap();
        h.service.update(NewProduct::new("hashed", 4.0, 4).with_id(2)).await.unwrap();

        assert_eq!(h.service.get_by_id(2).await.unwrap().name, "hashed");
        h.service.delete(2).await.unwrap();
        assert!(matches!(h.service.get_by_id(2).await, Err(ServiceError::NotFound(_))));
    }
}
