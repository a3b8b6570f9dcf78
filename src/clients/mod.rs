//! Typed handles over the generic stores.

#[macro_use]
mod macros;
mod inventory_client;
mod order_client;
mod product_client;

pub use inventory_client::InventoryClient;
pub use order_client::OrderClient;
pub use product_client::ProductClient;
