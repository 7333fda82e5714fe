//! System-of-record contract for products.
//!
//! The store is authoritative. Every implementation must be safe for
//! concurrent use by multiple in-flight requests.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{NewProduct, Product};

/// Failure reported by the system of record.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write (e.g. a constraint violation).
    #[error("store rejected operation: {0}")]
    Rejected(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        // 11000: duplicate key
        let rejected = matches!(
            err.kind.as_ref(),
            ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == 11000
        );

        if rejected {
            StoreError::Rejected(err.to_string())
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable product storage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a product; the store assigns the id.
    async fn insert(&self, product: NewProduct) -> StoreResult<Product>;

    /// Insert several products, returned in input order with their ids.
    async fn insert_batch(&self, products: Vec<NewProduct>) -> StoreResult<Vec<Product>>;

    /// All products ordered by id.
    async fn find_all(&self) -> StoreResult<Vec<Product>>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Product>>;

    /// First product with exactly this name.
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Product>>;

    /// Returns `true` if a product was removed.
    async fn delete_by_id(&self, id: i64) -> StoreResult<bool>;

    /// Persist an existing product (update path).
    async fn save(&self, product: &Product) -> StoreResult<Product>;
}
