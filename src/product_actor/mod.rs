//! Catalog records, including stock movements and price decay.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
