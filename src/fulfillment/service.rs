use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn, Instrument};

use crate::clients::{InventoryClient, OrderClient, ProductClient};
use crate::domain::{
    CustomerContact, InventoryReason, NewInventoryEvent, Order, OrderItem, OrderStatus, OrderTotals,
    PaymentRecord, ShippingAddress,
};
use crate::integrations::email::{order_confirmation, refund_notice};
use crate::integrations::{EmailMessage, Mailer, PosCount, PosInventory};
use crate::order_actor::OrderError;
use super::error::FulfillmentError;

#[derive(Debug, Clone, Default)]
pub struct FulfillmentSettings {
    /// Applied to the subtotal when the payment provider reports no tax.
    pub tax_rate_bps: u32,
}

/// What the payment provider reported for a paid checkout session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletedCheckout {
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub customer: Option<CustomerContact>,
    pub shipping_address: Option<ShippingAddress>,
    pub amount_tax_cents: Option<i64>,
    pub amount_shipping_cents: Option<i64>,
    pub amount_discount_cents: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    Fulfilled {
        order_id: String,
        order_number: String,
        /// Products whose decrement or sale audit row failed after the order
        /// was marked paid. These need a manual stock check.
        stock_failures: Vec<String>,
    },
    Refunded { order_id: String, restocked_units: u32 },
    Disputed { order_id: String },
    /// Duplicate delivery; nothing was changed.
    AlreadyProcessed { order_id: String, status: OrderStatus },
}

fn transition_error(err: OrderError, action: &'static str) -> FulfillmentError {
    match err {
        OrderError::InvalidTransition { order_id, from, .. } => {
            FulfillmentError::InvalidTransition { order_id, status: from, action }
        }
        OrderError::NotFound(id) => FulfillmentError::OrderNotFound(id),
        other => other.into(),
    }
}

/// Coordinates the order, product and inventory stores when a payment
/// changes state. The order status is the only idempotency guard: every
/// entry point checks it before touching stock, and the order store rejects
/// a transition that another delivery already made.
#[derive(Clone)]
pub struct FulfillmentService {
    orders: OrderClient,
    products: ProductClient,
    inventory: InventoryClient,
    pos: Arc<dyn PosInventory>,
    mailer: Arc<dyn Mailer>,
    settings: FulfillmentSettings,
}

impl FulfillmentService {
    pub fn new(
        orders: OrderClient,
        products: ProductClient,
        inventory: InventoryClient,
        pos: Arc<dyn PosInventory>,
        mailer: Arc<dyn Mailer>,
        settings: FulfillmentSettings,
    ) -> Self {
        Self { orders, products, inventory, pos, mailer, settings }
    }

    fn totals_for(&self, items: &[OrderItem], checkout: &CompletedCheckout) -> OrderTotals {
        let subtotal: i64 = items.iter().map(OrderItem::line_total_cents).sum();
        let tax = checkout
            .amount_tax_cents
            .unwrap_or_else(|| (subtotal * i64::from(self.settings.tax_rate_bps) + 5_000) / 10_000);
        OrderTotals::compute(
            items,
            tax,
            checkout.amount_shipping_cents.unwrap_or(0),
            checkout.amount_discount_cents.unwrap_or(0),
        )
    }

    /// Marks the order behind a paid checkout session as paid and takes the
    /// purchased units out of stock.
    #[instrument(skip(self, checkout), fields(session_id = %checkout.session_id))]
    pub async fn fulfill_checkout(&self, checkout: CompletedCheckout) -> Result<Reconciliation, FulfillmentError> {
        let order = self
            .orders
            .find_by_session(checkout.session_id.clone())
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(checkout.session_id.clone()))?;

        if order.status != OrderStatus::Pending {
            info!(order_id = %order.id, status = %order.status, "Checkout already reconciled");
            return Ok(Reconciliation::AlreadyProcessed { order_id: order.id, status: order.status });
        }

        // Availability check. Read-then-compare; the decrement below is the
        // step that refuses to go negative.
        let mut snapshot = Vec::with_capacity(order.items.len());
        let mut pos_links = BTreeMap::new();
        for item in &order.items {
            let product = self
                .products
                .get_product(item.product_id.clone())
                .await?
                .ok_or_else(|| FulfillmentError::ProductNotFound {
                    order_id: order.id.clone(),
                    product_id: item.product_id.clone(),
                })?;
            if product.quantity < item.quantity {
                warn!(order_id = %order.id, product_id = %product.id, requested = item.quantity, available = product.quantity, "Paid order exceeds stock");
                return Err(FulfillmentError::InsufficientStock {
                    order_id: order.id.clone(),
                    product_id: product.id,
                    requested: item.quantity,
                    available: product.quantity,
                });
            }
            if let Some(variation) = product.pos_variation_id {
                pos_links.insert(product.id.clone(), variation);
            }
            snapshot.push(OrderItem {
                product_id: product.id,
                name: product.name,
                quantity: item.quantity,
                // Charged price, captured when the session was created.
                unit_price_cents: item.unit_price_cents,
            });
        }

        let record = PaymentRecord {
            totals: self.totals_for(&snapshot, &checkout),
            items: snapshot,
            payment_intent_id: checkout.payment_intent_id,
            customer: checkout.customer,
            shipping_address: checkout.shipping_address,
            paid_at: Utc::now(),
        };

        let paid = match self.orders.mark_paid(order.id.clone(), record).await {
            Ok(paid) => paid,
            Err(OrderError::InvalidTransition { from, .. }) => {
                info!(order_id = %order.id, status = %from, "Concurrent delivery reconciled the order first");
                return Ok(Reconciliation::AlreadyProcessed { order_id: order.id, status: from });
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            order_id = %paid.id,
            order_number = %paid.order_number,
            units = paid.item_count(),
            total_cents = paid.totals.total_cents,
            "Order marked paid"
        );

        let mut stock_failures = Vec::new();
        let mut pos_counts = Vec::new();
        for item in &paid.items {
            match self.products.decrement_stock(item.product_id.clone(), item.quantity).await {
                Ok(level) => {
                    let event = NewInventoryEvent::sale(&item.product_id, item.quantity, &paid.id);
                    if let Err(e) = self.inventory.record(event).await {
                        error!(
                            order_id = %paid.id,
                            product_id = %item.product_id,
                            error = %e,
                            "Failed to append sale event, a refund will not restock this product"
                        );
                        stock_failures.push(item.product_id.clone());
                    }
                    if let Some(variation_id) = pos_links.get(&item.product_id) {
                        pos_counts.push(PosCount {
                            variation_id: variation_id.clone(),
                            quantity: level.quantity,
                            occurred_at: level.as_of,
                        });
                    }
                }
                Err(e) => {
                    error!(order_id = %paid.id, product_id = %item.product_id, error = %e, "Stock decrement failed after payment");
                    stock_failures.push(item.product_id.clone());
                }
            }
        }

        self.notify(paid.clone(), pos_counts, order_confirmation);

        Ok(Reconciliation::Fulfilled {
            order_id: paid.id,
            order_number: paid.order_number,
            stock_failures,
        })
    }

    /// Units still out of stock on behalf of an order: sales minus earlier
    /// refunds, per product.
    async fn outstanding_units(&self, order_id: &str) -> Result<BTreeMap<String, u32>, FulfillmentError> {
        let events = self.inventory.events_for_order(order_id.to_string()).await?;
        let mut net: BTreeMap<String, i64> = BTreeMap::new();
        for event in events {
            if matches!(event.reason, InventoryReason::Sale | InventoryReason::Refund) {
                *net.entry(event.product_id).or_default() += event.delta;
            }
        }
        Ok(net
            .into_iter()
            .filter(|(_, delta)| *delta < 0)
            .map(|(product_id, delta)| (product_id, u32::try_from(-delta).unwrap_or(u32::MAX)))
            .collect())
    }

    /// Reverses the stock taken by an order and marks it refunded.
    #[instrument(skip(self))]
    pub async fn refund_order(&self, order_id: String) -> Result<Reconciliation, FulfillmentError> {
        let order = self
            .orders
            .require_order(order_id)
            .await
            .map_err(|e| transition_error(e, "refunded"))?;

        match order.status {
            OrderStatus::Refunded => {
                info!(order_id = %order.id, "Order already refunded");
                return Ok(Reconciliation::AlreadyProcessed { order_id: order.id, status: order.status });
            }
            OrderStatus::Pending => {
                return Err(FulfillmentError::InvalidTransition {
                    order_id: order.id,
                    status: order.status,
                    action: "refunded",
                });
            }
            _ => {}
        }

        // Read before the status guard so a failed read can be redelivered.
        let outstanding = self.outstanding_units(&order.id).await?;

        let refunded = match self.orders.mark_refunded(order.id.clone()).await {
            Ok(refunded) => refunded,
            Err(OrderError::InvalidTransition { from: OrderStatus::Refunded, .. }) => {
                return Ok(Reconciliation::AlreadyProcessed { order_id: order.id, status: OrderStatus::Refunded });
            }
            Err(e) => return Err(transition_error(e, "refunded")),
        };

        let mut restocked_units = 0;
        let mut pos_counts = Vec::new();
        for (product_id, quantity) in outstanding {
            let level = match self.products.restock(product_id.clone(), quantity).await {
                Ok(level) => level,
                Err(e) => {
                    error!(order_id = %refunded.id, product_id = %product_id, error = %e, "Restock failed during refund");
                    continue;
                }
            };
            restocked_units += quantity;
            let event = NewInventoryEvent::refund(&product_id, quantity, &refunded.id);
            if let Err(e) = self.inventory.record(event).await {
                error!(product_id = %product_id, error = %e, "Failed to append refund event");
            }
            match self.products.get_product(product_id.clone()).await {
                Ok(Some(product)) => {
                    if let Some(variation_id) = product.pos_variation_id {
                        pos_counts.push(PosCount { variation_id, quantity: level.quantity, occurred_at: level.as_of });
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(product_id = %product_id, error = %e, "Could not read product for POS sync"),
            }
        }
        info!(order_id = %refunded.id, restocked_units, "Order refunded");

        self.notify(refunded.clone(), pos_counts, refund_notice);

        Ok(Reconciliation::Refunded { order_id: refunded.id, restocked_units })
    }

    #[instrument(skip(self))]
    pub async fn refund_by_payment_intent(&self, payment_intent_id: String) -> Result<Reconciliation, FulfillmentError> {
        let order = self
            .orders
            .find_by_payment_intent(payment_intent_id.clone())
            .await?
            .ok_or(FulfillmentError::OrderNotFound(payment_intent_id))?;
        self.refund_order(order.id).await
    }

    /// Flags a chargeback. Stock stays out until the dispute is settled as a
    /// refund.
    #[instrument(skip(self))]
    pub async fn mark_disputed(&self, order_id: String) -> Result<Reconciliation, FulfillmentError> {
        let order = self
            .orders
            .require_order(order_id)
            .await
            .map_err(|e| transition_error(e, "disputed"))?;
        if order.status == OrderStatus::Disputed {
            return Ok(Reconciliation::AlreadyProcessed { order_id: order.id, status: order.status });
        }
        let disputed = self
            .orders
            .mark_disputed(order.id)
            .await
            .map_err(|e| transition_error(e, "disputed"))?;
        warn!(order_id = %disputed.id, order_number = %disputed.order_number, "Payment disputed");
        Ok(Reconciliation::Disputed { order_id: disputed.id })
    }

    #[instrument(skip(self))]
    pub async fn dispute_by_payment_intent(&self, payment_intent_id: String) -> Result<Reconciliation, FulfillmentError> {
        let order = self
            .orders
            .find_by_payment_intent(payment_intent_id.clone())
            .await?
            .ok_or(FulfillmentError::OrderNotFound(payment_intent_id))?;
        self.mark_disputed(order.id).await
    }

    /// Admin action once the piece has shipped or been collected.
    #[instrument(skip(self))]
    pub async fn mark_fulfilled(&self, order_id: String) -> Result<Order, FulfillmentError> {
        self.orders
            .mark_fulfilled(order_id)
            .await
            .map_err(|e| transition_error(e, "fulfilled"))
    }

    /// POS push and customer email run after the caller has its answer; a
    /// failure here never undoes the reconciliation.
    fn notify(&self, order: Order, counts: Vec<PosCount>, template: fn(&Order) -> EmailMessage) {
        let pos = Arc::clone(&self.pos);
        let mailer = Arc::clone(&self.mailer);
        let span = tracing::info_span!("order_notifications", order_id = %order.id);
        tokio::spawn(
            async move {
                if let Err(e) = pos.set_counts(&counts).await {
                    warn!(error = %e, retryable = e.is_retryable(), "POS count push failed");
                }
                if let Err(e) = mailer.send(&template(&order)).await {
                    warn!(error = %e, retryable = e.is_retryable(), "Order email failed");
                }
            }
            .instrument(span),
        );
    }
}
