use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::Order;
use super::{check_status, IntegrationError};

const SERVICE: &str = "email";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), IntegrationError>;
}

/// Transactional email through the Resend JSON API.
pub struct ResendMailer {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(http: reqwest::Client, api_base: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self { http, api_base: api_base.into(), api_key: api_key.into(), from: from.into() }
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

#[async_trait]
impl Mailer for ResendMailer {
    #[instrument(skip(self, message), fields(subject = %message.subject))]
    async fn send(&self, message: &EmailMessage) -> Result<(), IntegrationError> {
        let request = SendRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };
        let response = self
            .http
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        check_status(SERVICE, response).await?;
        info!("Email sent");
        Ok(())
    }
}

pub struct LoggingMailer;

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), IntegrationError> {
        info!(subject = %message.subject, "Email not configured, message dropped");
        Ok(())
    }
}

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}${}.{:02}", sign, cents / 100, cents % 100)
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

pub fn order_confirmation(order: &Order) -> EmailMessage {
    let greeting = order.customer.name.as_deref().unwrap_or("there");
    let mut text = format!("Hi {},\n\nThanks for your order {}.\n\n", greeting, order.order_number);
    let mut rows = String::new();
    for item in &order.items {
        text.push_str(&format!(
            "  {} x {} @ {}\n",
            item.quantity,
            item.name,
            format_cents(item.unit_price_cents)
        ));
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            html_escape(&item.name),
            item.quantity,
            format_cents(item.line_total_cents())
        ));
    }
    let t = &order.totals;
    text.push_str(&format!(
        "\nSubtotal: {}\nTax: {}\nShipping: {}\nDiscount: {}\nTotal: {}\n",
        format_cents(t.subtotal_cents),
        format_cents(t.tax_cents),
        format_cents(t.shipping_cents),
        format_cents(-t.discount_cents),
        format_cents(t.total_cents)
    ));
    let html = format!(
        "<p>Hi {},</p><p>Thanks for your order <strong>{}</strong>.</p>\
         <table>{}</table><p>Total: <strong>{}</strong></p>",
        html_escape(greeting),
        html_escape(&order.order_number),
        rows,
        format_cents(t.total_cents)
    );
    EmailMessage {
        to: order.customer.email.clone(),
        subject: format!("Order {} confirmed", order.order_number),
        text,
        html,
    }
}

pub fn refund_notice(order: &Order) -> EmailMessage {
    let amount = format_cents(order.totals.total_cents);
    EmailMessage {
        to: order.customer.email.clone(),
        subject: format!("Order {} refunded", order.order_number),
        text: format!(
            "Your order {} has been refunded. {} will be returned to your original payment method.\n",
            order.order_number, amount
        ),
        html: format!(
            "<p>Your order <strong>{}</strong> has been refunded. {} will be returned to your original payment method.</p>",
            html_escape(&order.order_number),
            amount
        ),
    }
}
