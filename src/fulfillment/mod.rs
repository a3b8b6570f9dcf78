//! Payment reconciliation: turning confirmed, refunded and disputed payments
//! into order status changes and matching stock movements.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
