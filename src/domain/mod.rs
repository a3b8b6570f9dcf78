pub mod product;
pub mod order;
pub mod inventory;

pub use product::*;
pub use order::*;
pub use inventory::*;
