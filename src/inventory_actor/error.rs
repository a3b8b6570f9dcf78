use thiserror::Error;

use crate::actor_framework::FrameworkError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InventoryError {
    #[error("Inventory events are append-only")]
    AppendOnly,
    #[error("Inventory event validation error: {0}")]
    ValidationError(String),
    #[error("Inventory event not found: {0}")]
    NotFound(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError<InventoryError>> for InventoryError {
    fn from(err: FrameworkError<InventoryError>) -> Self {
        match err {
            FrameworkError::NotFound { id, .. } => InventoryError::NotFound(id),
            FrameworkError::Rejected(e) => e,
            other => InventoryError::ActorCommunicationError(other.to_string()),
        }
    }
}
