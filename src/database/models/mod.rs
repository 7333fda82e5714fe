//! Database models.

mod product;

pub use product::{NewProduct, Product};
