//! MongoDB-backed product store.
//!
//! Products live in the `products` collection keyed by an integer `_id`.
//! Ids are allocated from a sequence document in the `counters` collection.

use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::models::{NewProduct, Product};
use crate::database::store::{ProductStore, StoreError, StoreResult};
use crate::database::Database;

/// Counter document name for product ids.
const PRODUCT_SEQUENCE: &str = "products";

/// On-disk shape of a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProductDocument {
    #[serde(rename = "_id")]
    id: i64,
    name: String,
    price: f64,
    quantity: i32,
}

impl From<&Product> for ProductDocument {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            price: p.price,
            quantity: p.quantity,
        }
    }
}

impl From<ProductDocument> for Product {
    fn from(d: ProductDocument) -> Self {
        Self {
            id: d.id,
            name: d.name,
            price: d.price,
            quantity: d.quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Counter {
    seq: i64,
}

/// Repository for products stored in MongoDB.
pub struct MongoProductRepo {
    collection: Collection<ProductDocument>,
    counters: Collection<Counter>,
}

impl MongoProductRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("products"),
            counters: db.collection("counters"),
        }
    }

    /// Create the `name` index used by name lookups. Idempotent.
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let index = IndexModel::builder().keys(doc! { "name": 1 }).build();
        self.collection.create_index(index).await?;
        debug!("Ensured products.name index");
        Ok(())
    }

    /// Reserve `count` consecutive ids, returning the first one.
    async fn reserve_ids(&self, count: i64) -> StoreResult<i64> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": PRODUCT_SEQUENCE },
                doc! { "$inc": { "seq": count } },
            )
            .with_options(options)
            .await?
            .ok_or_else(|| StoreError::Unavailable("id sequence missing after upsert".into()))?;

        Ok(counter.seq - count + 1)
    }

    async fn collect(&self, filter: mongodb::bson::Document) -> StoreResult<Vec<Product>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let mut cursor = self.collection.find(filter).with_options(options).await?;

        let mut products = Vec::new();
        while let Some(result) = cursor.next().await {
            products.push(result?.into());
        }
        Ok(products)
    }
}

#[async_trait]
impl ProductStore for MongoProductRepo {
    async fn insert(&self, product: NewProduct) -> StoreResult<Product> {
        let id = self.reserve_ids(1).await?;
        let product = product.with_id(id);

        self.collection
            .insert_one(ProductDocument::from(&product))
            .await?;

        debug!("Inserted product {}", id);
        Ok(product)
    }

    async fn insert_batch(&self, products: Vec<NewProduct>) -> StoreResult<Vec<Product>> {
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let first = self.reserve_ids(products.len() as i64).await?;
        let products: Vec<Product> = products
            .into_iter()
            .zip(first..)
            .map(|(p, id)| p.with_id(id))
            .collect();

        self.collection
            .insert_many(products.iter().map(ProductDocument::from))
            .await?;

        debug!("Inserted {} products starting at {}", products.len(), first);
        Ok(products)
    }

    async fn find_all(&self) -> StoreResult<Vec<Product>> {
        self.collect(doc! {}).await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Product>> {
        let result = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(result.map(Into::into))
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        let result = self.collection.find_one(doc! { "name": name }).await?;
        Ok(result.map(Into::into))
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        debug!("Deleted product {}: {}", id, result.deleted_count > 0);
        Ok(result.deleted_count > 0)
    }

    async fn save(&self, product: &Product) -> StoreResult<Product> {
        let result = self
            .collection
            .replace_one(doc! { "_id": product.id }, ProductDocument::from(product))
            .await?;

        // No upsert: a product deleted concurrently must not come back.
        if result.matched_count == 0 {
            return Err(StoreError::Rejected(format!(
                "product {} no longer exists",
                product.id
            )));
        }

        debug!("Saved product {}", product.id);
        Ok(product.clone())
    }
}
