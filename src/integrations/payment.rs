use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::OrderItem;
use super::{check_status, IntegrationError};

const SERVICE: &str = "payments";

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub order_id: String,
    pub order_number: String,
    pub customer_email: String,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page; absent for sessions created without a provider.
    pub url: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession, IntegrationError>;
}

/// Hosted-checkout client speaking the form-encoded Stripe API.
pub struct StripeGateway {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    currency: String,
    success_url: String,
    cancel_url: String,
    shipping_countries: Vec<String>,
}

impl StripeGateway {
    pub fn new(
        http: reqwest::Client,
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        currency: impl Into<String>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
        shipping_countries: Vec<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            secret_key: secret_key.into(),
            currency: currency.into(),
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            shipping_countries,
        }
    }

    fn form(&self, request: &CheckoutSessionRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            ("customer_email".to_string(), request.customer_email.clone()),
            ("client_reference_id".to_string(), request.order_id.clone()),
            ("metadata[order_id]".to_string(), request.order_id.clone()),
            ("metadata[order_number]".to_string(), request.order_number.clone()),
            ("payment_intent_data[metadata][order_id]".to_string(), request.order_id.clone()),
            ("phone_number_collection[enabled]".to_string(), "true".to_string()),
        ];
        for (i, country) in self.shipping_countries.iter().enumerate() {
            form.push((format!("shipping_address_collection[allowed_countries][{}]", i), country.clone()));
        }
        for (i, item) in request.items.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            form.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
            form.push((format!("{}[price_data][currency]", prefix), self.currency.clone()));
            form.push((format!("{}[price_data][unit_amount]", prefix), item.unit_price_cents.to_string()));
            form.push((format!("{}[price_data][product_data][name]", prefix), item.name.clone()));
            form.push((
                format!("{}[price_data][product_data][metadata][product_id]", prefix),
                item.product_id.clone(),
            ));
        }
        form
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession, IntegrationError> {
        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", format!("checkout-{}", request.order_id))
            .form(&self.form(request))
            .send()
            .await?;
        let session: CheckoutSession = check_status(SERVICE, response).await?.json().await?;
        if session.id.is_empty() {
            return Err(IntegrationError::InvalidResponse { service: SERVICE, message: "session without id".to_string() });
        }
        info!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }
}

/// Stand-in used when no payment credentials are configured. Sessions it
/// creates can only be completed by a locally signed webhook.
pub struct LoggingGateway;

#[async_trait]
impl PaymentGateway for LoggingGateway {
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession, IntegrationError> {
        let id = format!("cs_local_{}", Uuid::new_v4().simple());
        info!(order_id = %request.order_id, session_id = %id, "Payment gateway not configured, issued local session");
        Ok(CheckoutSession { id, url: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_encodes_line_items_and_order_reference() {
        let gateway = StripeGateway::new(
            reqwest::Client::new(),
            "https://api.example.test",
            "sk_test",
            "usd",
            "https://shop.test/thanks",
            "https://shop.test/cart",
            vec!["US".into(), "CA".into()],
        );
        let request = CheckoutSessionRequest {
            order_id: "ord-1".into(),
            order_number: "RS-00000001".into(),
            customer_email: "buyer@example.com".into(),
            items: vec![OrderItem {
                product_id: "product_7".into(),
                name: "Mid-century lamp".into(),
                quantity: 2,
                unit_price_cents: 6_500,
            }],
        };
        let form = gateway.form(&request);
        let get = |key: &str| form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

        assert_eq!(get("metadata[order_id]"), Some("ord-1"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("6500"));
        assert_eq!(get("line_items[0][price_data][product_data][metadata][product_id]"), Some("product_7"));
        assert_eq!(get("shipping_address_collection[allowed_countries][1]"), Some("CA"));
    }
}
