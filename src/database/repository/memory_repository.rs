//! In-process product store.
//!
//! Used for local runs without MongoDB and as the backing store in tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::database::models::{NewProduct, Product};
use crate::database::store::{ProductStore, StoreError, StoreResult};

/// Product store kept in memory, ordered by id.
#[derive(Debug, Default)]
pub struct InMemoryProductRepo {
    products: RwLock<BTreeMap<i64, Product>>,
    next_id: AtomicI64,
}

impl InMemoryProductRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&self, count: i64) -> i64 {
        self.next_id.fetch_add(count, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl ProductStore for InMemoryProductRepo {
    async fn insert(&self, product: NewProduct) -> StoreResult<Product> {
        let product = product.with_id(self.allocate(1));
        self.products.write().insert(product.id, product.clone());
        Ok(product)
    }

    async fn insert_batch(&self, products: Vec<NewProduct>) -> StoreResult<Vec<Product>> {
        let first = self.allocate(products.len() as i64);
        let products: Vec<Product> = products
            .into_iter()
            .zip(first..)
            .map(|(p, id)| p.with_id(id))
            .collect();

        let mut guard = self.products.write();
        for product in &products {
            guard.insert(product.id, product.clone());
        }
        Ok(products)
    }

    async fn find_all(&self) -> StoreResult<Vec<Product>> {
        Ok(self.products.read().values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Product>> {
        Ok(self.products.read().get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        Ok(self
            .products
            .read()
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<bool> {
        Ok(self.products.write().remove(&id).is_some())
    }

    async fn save(&self, product: &Product) -> StoreResult<Product> {
        let mut guard = self.products.write();
        let Some(slot) = guard.get_mut(&product.id) else {
            return Err(StoreError::Rejected(format!(
                "product {} no longer exists",
                product.id
            )));
        };
        slot.clone_from(product);
        Ok(product.clone())
    }
}
