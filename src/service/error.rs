//! Service-level errors.

use thiserror::Error;

use crate::database::StoreError;

/// Outcome of a failed service operation.
///
/// Cache failures never appear here; they degrade to store reads.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn product_id(id: i64) -> Self {
        ServiceError::NotFound(format!("product with id {id}"))
    }

    pub fn product_name(name: &str) -> Self {
        ServiceError::NotFound(format!("product named '{name}'"))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
