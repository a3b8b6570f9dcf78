//! Append-only stock movement log.

pub mod entity;
pub mod error;

pub use error::*;
