use thiserror::Error;

use crate::actor_framework::FrameworkError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: String, requested: u32, available: u32 },
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),
    #[error("Invalid price: {0}")]
    InvalidPrice(i64),
    #[error("Product validation error: {0}")]
    ValidationError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError<ProductError>> for ProductError {
    fn from(err: FrameworkError<ProductError>) -> Self {
        match err {
            FrameworkError::NotFound { id, .. } => ProductError::NotFound(id),
            FrameworkError::Rejected(e) => e,
            other => ProductError::ActorCommunicationError(other.to_string()),
        }
    }
}
