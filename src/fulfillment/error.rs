use thiserror::Error;

use crate::domain::OrderStatus;
use crate::inventory_actor::InventoryError;
use crate::order_actor::OrderError;
use crate::product_actor::ProductError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FulfillmentError {
    #[error("No order matches {0}")]
    OrderNotFound(String),
    #[error("Order {order_id} references unknown product {product_id}")]
    ProductNotFound { order_id: String, product_id: String },
    #[error("Order {order_id} needs {requested} of {product_id} but only {available} in stock")]
    InsufficientStock { order_id: String, product_id: String, requested: u32, available: u32 },
    #[error("Order {order_id} is {status} and cannot be {action}")]
    InvalidTransition { order_id: String, status: OrderStatus, action: &'static str },
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Product(#[from] ProductError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

impl FulfillmentError {
    /// True when the backing stores failed and the same request may succeed
    /// on redelivery. Missing orders and stock shortfalls are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FulfillmentError::Order(OrderError::ActorCommunicationError(_))
                | FulfillmentError::Product(ProductError::ActorCommunicationError(_))
                | FulfillmentError::Inventory(InventoryError::ActorCommunicationError(_))
        )
    }
}
