//! Outbound calls to the hosted payment, POS and email providers.
//!
//! Each provider sits behind a trait so the fulfillment flow can run against
//! the real HTTP client, a logging stand-in when credentials are absent, or a
//! recording fake in tests.

pub mod email;
pub mod error;
pub mod payment;
pub mod pos;

pub use email::{EmailMessage, LoggingMailer, Mailer, ResendMailer};
pub use error::IntegrationError;
pub use payment::{CheckoutSession, CheckoutSessionRequest, LoggingGateway, PaymentGateway, StripeGateway};
pub use pos::{LoggingPos, PosCount, PosInventory, SquareInventory};

/// Reads a non-2xx response into an `IntegrationError::Api`.
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IntegrationError::Api { service, status: status.as_u16(), body })
}
