use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::OrderStatus;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition { order_id: String, from: OrderStatus, to: OrderStatus },
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError<OrderError>> for OrderError {
    fn from(err: FrameworkError<OrderError>) -> Self {
        match err {
            FrameworkError::NotFound { id, .. } => OrderError::NotFound(id),
            FrameworkError::Rejected(e) => e,
            other => OrderError::ActorCommunicationError(other.to_string()),
        }
    }
}
