//! System orchestration, configuration, startup and shutdown.

pub mod config;
pub mod error;
pub mod store_system;
pub mod tracing;

pub use self::config::*;
pub use self::error::*;
pub use self::store_system::*;
pub use self::tracing::*;
