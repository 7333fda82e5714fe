//! Product model.
//!
//! The record type cached by the service and returned to callers.

use serde::{Deserialize, Serialize};

/// A persisted product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned identity, immutable once persisted.
    pub id: i64,

    /// Display name, also used for name lookups.
    pub name: String,

    pub price: f64,

    pub quantity: i32,
}

impl Product {
    /// Copy the mutable fields of `incoming` onto this product.
    ///
    /// The identity is never touched.
    pub fn apply_changes(&mut self, incoming: &Product) {
        self.name.clone_from(&incoming.name);
        self.price = incoming.price;
        self.quantity = incoming.quantity;
    }
}

/// Payload for creating a product; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub quantity: i32,
}

impl NewProduct {
    #[allow(dead_code)]
    pub fn new(name: impl Into<String>, price: f64, quantity: i32) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
        }
    }

    /// Attach a store-assigned identity.
    pub fn with_id(self, id: i64) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
            quantity: self.quantity,
        }
    }
}
