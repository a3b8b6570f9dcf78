//! Inbound provider callbacks: authentication, parsing and dispatch.

pub mod events;
pub mod receiver;
pub mod signature;

pub use receiver::{WebhookError, WebhookOutcome, WebhookReceiver, WebhookSettings};
pub use signature::{SignatureError, DEFAULT_TOLERANCE_SECS};
