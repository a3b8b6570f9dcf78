//! Turns a cart into a pending order and a hosted checkout session.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::clients::{OrderClient, ProductClient};
use crate::domain::{order_number_for, CustomerContact, OrderCreate, OrderItem};
use crate::integrations::{CheckoutSessionRequest, IntegrationError, PaymentGateway};
use crate::order_actor::OrderError;
use crate::product_actor::ProductError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutStarted {
    pub order_id: String,
    pub order_number: String,
    pub session_id: String,
    pub checkout_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Invalid checkout request: {0}")]
    Invalid(String),
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Product is no longer available: {0}")]
    Unavailable(String),
    #[error("Only {available} of {product_id} left, requested {requested}")]
    InsufficientStock { product_id: String, requested: u32, available: u32 },
    #[error("Payment provider rejected checkout for order {order_id}: {source}")]
    Gateway {
        order_id: String,
        #[source]
        source: IntegrationError,
    },
    #[error(transparent)]
    Product(#[from] ProductError),
    #[error(transparent)]
    Order(#[from] OrderError),
}

impl CheckoutError {
    /// Errors the shopper can fix by changing the cart.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CheckoutError::EmptyCart
                | CheckoutError::Invalid(_)
                | CheckoutError::ProductNotFound(_)
                | CheckoutError::Unavailable(_)
                | CheckoutError::InsufficientStock { .. }
        )
    }
}

/// Sums quantities for repeated products, keeping first-seen order.
fn merge_lines(lines: &[CartLine]) -> Vec<CartLine> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(line.clone()),
        }
    }
    merged
}

#[derive(Clone)]
pub struct CheckoutService {
    products: ProductClient,
    orders: OrderClient,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(products: ProductClient, orders: OrderClient, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { products, orders, gateway }
    }

    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn start_checkout(&self, request: CheckoutRequest) -> Result<CheckoutStarted, CheckoutError> {
        if request.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let email = request.email.trim().to_string();
        if !email.contains('@') {
            return Err(CheckoutError::Invalid(format!("invalid email: {:?}", request.email)));
        }
        if request.items.iter().any(|line| line.quantity == 0) {
            return Err(CheckoutError::Invalid("quantity must be positive".to_string()));
        }

        let mut items = Vec::with_capacity(request.items.len());
        for line in merge_lines(&request.items) {
            let product = self
                .products
                .get_product(line.product_id.clone())
                .await?
                .ok_or_else(|| CheckoutError::ProductNotFound(line.product_id.clone()))?;
            if !product.is_active {
                return Err(CheckoutError::Unavailable(product.id));
            }
            if product.quantity < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    requested: line.quantity,
                    available: product.quantity,
                });
            }
            items.push(OrderItem {
                product_id: product.id,
                name: product.name,
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
            });
        }

        let customer = CustomerContact { email: email.clone(), name: request.name, phone: request.phone };
        let order_id = self
            .orders
            .create_order(OrderCreate { items: items.clone(), customer, created_at: Utc::now() })
            .await?;
        let order_number = order_number_for(&order_id);

        let session_request = CheckoutSessionRequest {
            order_id: order_id.clone(),
            order_number: order_number.clone(),
            customer_email: email,
            items,
        };
        let session = match self.gateway.create_checkout_session(&session_request).await {
            Ok(session) => session,
            Err(source) => {
                // The order stays pending with no session and is never fulfilled.
                warn!(order_id = %order_id, error = %source, "Checkout session creation failed");
                return Err(CheckoutError::Gateway { order_id, source });
            }
        };
        self.orders.attach_session(order_id.clone(), session.id.clone()).await?;
        info!(order_id = %order_id, session_id = %session.id, "Checkout started");

        Ok(CheckoutStarted {
            order_id,
            order_number,
            session_id: session.id,
            checkout_url: session.url,
        })
    }
}
