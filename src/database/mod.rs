//! Database module exports.

mod models;
mod mongo;
mod repository;
mod store;

pub use models::{NewProduct, Product};
pub use mongo::Database;
pub use repository::{InMemoryProductRepo, MongoProductRepo};
pub use store::{ProductStore, StoreError, StoreResult};
