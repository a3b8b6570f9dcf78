use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} API returned {status}: {body}")]
    Api { service: &'static str, status: u16, body: String },
    #[error("Unexpected response from {service}: {message}")]
    InvalidResponse { service: &'static str, message: String },
}

impl IntegrationError {
    /// Rate limits and provider-side failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            IntegrationError::Http(e) => e.is_timeout() || e.is_connect(),
            IntegrationError::Api { status, .. } => *status == 429 || *status >= 500,
            IntegrationError::InvalidResponse { .. } => false,
        }
    }
}
