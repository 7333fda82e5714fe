//! Test doubles shared by unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheBackend, CacheError, CacheResult, MemoryBackend};
use crate::database::{
    InMemoryProductRepo, NewProduct, Product, ProductStore, StoreError, StoreResult,
};

/// Per-method call counts of a [`CountingStore`].
#[derive(Debug, Default)]
pub struct StoreCalls {
    pub insert: AtomicUsize,
    pub insert_batch: AtomicUsize,
    pub find_all: AtomicUsize,
    pub find_by_id: AtomicUsize,
    pub find_by_name: AtomicUsize,
    pub delete_by_id: AtomicUsize,
    pub save: AtomicUsize,
}

/// In-memory store that counts calls and can be told to fail writes.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: InMemoryProductRepo,
    pub calls: StoreCalls,
    fail_writes: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `count` products named `item-<n>`.
    pub async fn seeded(count: usize) -> Self {
        let store = Self::new();
        let products = (1..=count)
            .map(|n| NewProduct::new(format!("item-{n}"), n as f64 * 1.5, n as i32))
            .collect();
        store.inner.insert_batch(products).await.unwrap();
        store
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[async_trait]
impl ProductStore for CountingStore {
    async fn insert(&self, product: NewProduct) -> StoreResult<Product> {
        bump(&self.calls.insert);
        self.check_write()?;
        self.inner.insert(product).await
    }

    async fn insert_batch(&self, products: Vec<NewProduct>) -> StoreResult<Vec<Product>> {
        bump(&self.calls.insert_batch);
        self.check_write()?;
        self.inner.insert_batch(products).await
    }

    async fn find_all(&self) -> StoreResult<Vec<Product>> {
        bump(&self.calls.find_all);
        self.inner.find_all().await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Product>> {
        bump(&self.calls.find_by_id);
        self.inner.find_by_id(id).await
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        bump(&self.calls.find_by_name);
        self.inner.find_by_name(name).await
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<bool> {
        bump(&self.calls.delete_by_id);
        self.check_write()?;
        self.inner.delete_by_id(id).await
    }

    async fn save(&self, product: &Product) -> StoreResult<Product> {
        bump(&self.calls.save);
        self.check_write()?;
        self.inner.save(product).await
    }
}

/// Cache backend that fails every call.
#[derive(Debug, Default)]
pub struct FailingBackend {
    pub calls: AtomicUsize,
}

impl FailingBackend {
    fn fail<T>(&self) -> CacheResult<T> {
        bump(&self.calls);
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

#[async_trait]
impl CacheBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.fail()
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> CacheResult<()> {
        self.fail()
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        self.fail()
    }

    async fn delete_all(&self, _keys: &[String]) -> CacheResult<()> {
        self.fail()
    }

    async fn keys(&self, _prefix: &str) -> CacheResult<Vec<String>> {
        self.fail()
    }

    async fn hash_get(&self, _key: &str, _field: &str) -> CacheResult<Option<Vec<u8>>> {
        self.fail()
    }

    async fn hash_set(
        &self,
        _key: &str,
        _field: &str,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> CacheResult<()> {
        self.fail()
    }

    async fn hash_delete(&self, _key: &str, _field: &str) -> CacheResult<()> {
        self.fail()
    }
}

/// Memory backend whose deletes always fail; reads and writes go through.
#[derive(Debug)]
pub struct UndeletableBackend {
    pub inner: MemoryBackend,
}

impl UndeletableBackend {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackend::new(100),
        }
    }
}

#[async_trait]
impl CacheBackend for UndeletableBackend {
    fn name(&self) -> &'static str {
        "undeletable"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        Err(CacheError::Unavailable(format!("cannot delete {key}")))
    }

    async fn delete_all(&self, _keys: &[String]) -> CacheResult<()> {
        Err(CacheError::Unavailable("cannot delete".into()))
    }

    async fn keys(&self, prefix: &str) -> CacheResult<Vec<String>> {
        self.inner.keys(prefix).await
    }

    async fn hash_get(&self, key: &str, field: &str) -> CacheResult<Option<Vec<u8>>> {
        self.inner.hash_get(key, field).await
    }

    async fn hash_set(
        &self,
        key: &str,
        field: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> CacheResult<()> {
        self.inner.hash_set(key, field, value, ttl).await
    }

    async fn hash_delete(&self, key: &str, _field: &str) -> CacheResult<()> {
        Err(CacheError::Unavailable(format!("cannot delete field of {key}")))
    }
}
