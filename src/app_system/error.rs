use thiserror::Error;

use crate::product_actor::ProductError;
use super::config::ConfigError;

/// Startup and shutdown failures of the running system.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Failed to read catalog seed {path}: {source}")]
    SeedRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Catalog seed {path} is not a JSON product list: {source}")]
    SeedFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to seed product: {0}")]
    Seed(#[from] ProductError),
    #[error("Store task failed: {0}")]
    StoreTask(String),
}
