//! Service module - the public face of the product cache.

mod error;
mod product_service;

pub use error::ServiceError;
pub use product_service::ProductService;
