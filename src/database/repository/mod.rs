//! Repository module - product store implementations.

mod memory_repository;
mod product_repository;

pub use memory_repository::InMemoryProductRepo;
pub use product_repository::MongoProductRepo;
