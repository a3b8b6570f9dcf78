//! Layered configuration: defaults, an optional YAML file, then
//! `STOREFRONT__*` environment variables.
//!
//! Secrets are normally supplied through the environment, for example
//! `STOREFRONT__PAYMENTS__WEBHOOK_SECRET` or `STOREFRONT__POS__ACCESS_TOKEN`.

use serde::Deserialize;
use thiserror::Error;

use crate::price_decay::DecayRule;
use crate::webhooks::DEFAULT_TOLERANCE_SECS;

pub const DEFAULT_CONFIG_FILE: &str = "storefront";
pub const CONFIG_ENV_VAR: &str = "STOREFRONT_CONFIG";
pub const CONFIG_ENV_PREFIX: &str = "STOREFRONT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Capacity of each store's request channel.
    pub store_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8080".to_string(), store_buffer: 64 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    pub api_base: String,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub webhook_tolerance_secs: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub shipping_countries: Vec<String>,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.stripe.com".to_string(),
            secret_key: None,
            webhook_secret: None,
            webhook_tolerance_secs: DEFAULT_TOLERANCE_SECS,
            currency: "usd".to_string(),
            success_url: "http://localhost:3000/checkout/success".to_string(),
            cancel_url: "http://localhost:3000/cart".to_string(),
            shipping_countries: vec!["US".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PosConfig {
    pub api_base: String,
    pub access_token: Option<String>,
    pub location_id: Option<String>,
    pub signature_key: Option<String>,
    pub notification_url: String,
}

impl Default for PosConfig {
    fn default() -> Self {
        Self {
            api_base: "https://connect.squareup.com".to_string(),
            access_token: None,
            location_id: None,
            signature_key: None,
            notification_url: "http://localhost:8080/webhooks/pos".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.resend.com".to_string(),
            api_key: None,
            from: "orders@localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub decay_enabled: bool,
    pub decay_interval_secs: u64,
    pub decay: DecayRule,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { decay_enabled: true, decay_interval_secs: 3_600, decay: DecayRule::default() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FulfillmentConfig {
    pub tax_rate_bps: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub payments: PaymentsConfig,
    pub pos: PosConfig,
    pub email: EmailConfig,
    pub pricing: PricingConfig,
    pub fulfillment: FulfillmentConfig,
    /// JSON file of products loaded into the catalog at startup.
    pub catalog_seed: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        use ::config::{Config, Environment, File, FileFormat};

        let mut builder = Config::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&path, FileFormat::Yaml).required(true));
        }

        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("payments.shipping_countries")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.store_buffer == 0 {
            return Err(ConfigError::Invalid("server.store_buffer must be positive".to_string()));
        }
        if self.fulfillment.tax_rate_bps > 10_000 {
            return Err(ConfigError::Invalid("fulfillment.tax_rate_bps must be at most 10000".to_string()));
        }
        if self.payments.webhook_tolerance_secs <= 0 {
            return Err(ConfigError::Invalid("payments.webhook_tolerance_secs must be positive".to_string()));
        }
        if self.pricing.decay_enabled && self.pricing.decay_interval_secs == 0 {
            return Err(ConfigError::Invalid("pricing.decay_interval_secs must be positive".to_string()));
        }
        if self.pos.access_token.is_some() && self.pos.location_id.is_none() {
            return Err(ConfigError::Invalid("pos.location_id is required with pos.access_token".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.payments.webhook_tolerance_secs, 300);
        assert_eq!(config.pricing.decay, DecayRule::default());
    }

    #[test]
    fn yaml_overrides_nested_sections() {
        let yaml = r#"
server:
  bind_addr: "127.0.0.1:9000"
fulfillment:
  tax_rate_bps: 825
pricing:
  decay:
    grace_days: 10
    step_days: 5
    rate_bps: 500
"#;
        let config: AppConfig = ::config::Config::builder()
            .add_source(::config::File::from_str(yaml, ::config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.server.store_buffer, 64);
        assert_eq!(config.fulfillment.tax_rate_bps, 825);
        assert_eq!(config.pricing.decay.grace_days, 10);
        assert!(config.pricing.decay_enabled);
    }

    #[test]
    fn pos_token_requires_location() {
        let mut config = AppConfig::default();
        config.pos.access_token = Some("token".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
