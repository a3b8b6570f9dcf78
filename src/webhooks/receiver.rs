use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::clients::{InventoryClient, ProductClient};
use crate::domain::{InventoryReason, NewInventoryEvent};
use crate::fulfillment::{FulfillmentError, FulfillmentService, Reconciliation};
use crate::product_actor::ProductError;
use super::events::{parse_payment_event, parse_pos_event, PaymentNotification};
use super::signature::{verify_payment_signature, verify_pos_signature, SignatureError};

/// Secrets and addressing needed to authenticate inbound notifications.
#[derive(Debug, Clone, Default)]
pub struct WebhookSettings {
    pub payment_secret: Option<String>,
    pub tolerance_secs: i64,
    pub pos_signature_key: Option<String>,
    /// Public URL the POS provider posts to; part of its signed message.
    pub pos_notification_url: String,
    /// When set, counts for other locations are ignored.
    pub pos_location_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Processed(Reconciliation),
    PosSynced { updated: usize },
    Ignored { reason: &'static str },
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook signing secret not configured for {0}")]
    NotConfigured(&'static str),
    #[error("Missing signature header")]
    MissingSignature,
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error("Malformed webhook payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),
    #[error(transparent)]
    Product(#[from] ProductError),
}

impl WebhookError {
    /// True when redelivering the same event may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WebhookError::Fulfillment(e) => e.is_retryable(),
            WebhookError::Product(ProductError::ActorCommunicationError(_)) => true,
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct WebhookReceiver {
    fulfillment: FulfillmentService,
    products: ProductClient,
    inventory: InventoryClient,
    settings: WebhookSettings,
}

impl WebhookReceiver {
    pub fn new(
        fulfillment: FulfillmentService,
        products: ProductClient,
        inventory: InventoryClient,
        settings: WebhookSettings,
    ) -> Self {
        Self { fulfillment, products, inventory, settings }
    }

    /// Authenticates and dispatches a payment provider event.
    #[instrument(skip(self, payload, signature), fields(bytes = payload.len()))]
    pub async fn handle_payment(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookOutcome, WebhookError> {
        let secret = self
            .settings
            .payment_secret
            .as_deref()
            .ok_or(WebhookError::NotConfigured("payments"))?;
        let header = signature.ok_or(WebhookError::MissingSignature)?;
        verify_payment_signature(payload, header, secret, self.settings.tolerance_secs, Utc::now().timestamp())?;

        let event = parse_payment_event(payload)?;
        info!(event_id = %event.id, event_type = %event.kind, "Payment event received");

        let reconciliation = match event.notification {
            PaymentNotification::CheckoutCompleted(session) => {
                if !session.is_paid() {
                    info!(session_id = %session.id, "Checkout completed without captured payment");
                    return Ok(WebhookOutcome::Ignored { reason: "payment not yet captured" });
                }
                self.fulfillment.fulfill_checkout(session.into_completed()).await?
            }
            PaymentNotification::AsyncPaymentSucceeded(session) => {
                self.fulfillment.fulfill_checkout(session.into_completed()).await?
            }
            PaymentNotification::CheckoutExpired(session) => {
                info!(session_id = %session.id, order_id = ?session.order_id(), "Checkout session expired");
                return Ok(WebhookOutcome::Ignored { reason: "checkout expired" });
            }
            PaymentNotification::ChargeRefunded(charge) => {
                if !charge.refunded {
                    info!(charge_id = %charge.id, amount_refunded = charge.amount_refunded, "Partial refund, order unchanged");
                    return Ok(WebhookOutcome::Ignored { reason: "partial refund" });
                }
                let Some(payment_intent) = charge.payment_intent else {
                    warn!(charge_id = %charge.id, "Refunded charge has no payment intent");
                    return Ok(WebhookOutcome::Ignored { reason: "charge without payment intent" });
                };
                self.fulfillment.refund_by_payment_intent(payment_intent).await?
            }
            PaymentNotification::DisputeCreated(dispute) => {
                let Some(payment_intent) = dispute.payment_intent else {
                    warn!(dispute_id = %dispute.id, "Dispute has no payment intent");
                    return Ok(WebhookOutcome::Ignored { reason: "dispute without payment intent" });
                };
                info!(dispute_id = %dispute.id, reason = ?dispute.reason, "Dispute opened");
                self.fulfillment.dispute_by_payment_intent(payment_intent).await?
            }
            PaymentNotification::Other => {
                debug!(event_type = %event.kind, "Unhandled event type");
                return Ok(WebhookOutcome::Ignored { reason: "unhandled event type" });
            }
        };
        Ok(WebhookOutcome::Processed(reconciliation))
    }

    /// Authenticates a POS notification and copies its on-hand counts onto
    /// linked products.
    #[instrument(skip(self, payload, signature), fields(bytes = payload.len()))]
    pub async fn handle_pos(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookOutcome, WebhookError> {
        let key = self
            .settings
            .pos_signature_key
            .as_deref()
            .ok_or(WebhookError::NotConfigured("pos"))?;
        let header = signature.ok_or(WebhookError::MissingSignature)?;
        verify_pos_signature(payload, header, key, &self.settings.pos_notification_url)?;

        let event = parse_pos_event(payload)?;
        info!(event_id = ?event.event_id, event_type = %event.kind, counts = event.counts.len(), "POS event received");
        if event.kind != "inventory.count.updated" {
            return Ok(WebhookOutcome::Ignored { reason: "unhandled event type" });
        }

        let mut updated = 0;
        for count in event.counts {
            if count.state != "IN_STOCK" {
                continue;
            }
            if let (Some(expected), Some(actual)) = (&self.settings.pos_location_id, &count.location_id) {
                if expected != actual {
                    continue;
                }
            }
            let Some(units) = count.units() else {
                warn!(variation_id = %count.catalog_object_id, quantity = %count.quantity, "Unusable POS quantity");
                continue;
            };
            let Some(product) = self.products.find_by_pos_variation(count.catalog_object_id.clone()).await? else {
                debug!(variation_id = %count.catalog_object_id, "No product linked to variation");
                continue;
            };

            let delta = self.products.set_count(product.id.clone(), units).await?;
            // Our own pushes come back as unchanged counts.
            if delta == 0 {
                continue;
            }
            let event = NewInventoryEvent::adjustment(&product.id, delta, InventoryReason::PosSync);
            if let Err(e) = self.inventory.record(event).await {
                error!(product_id = %product.id, error = %e, "Failed to append POS sync event");
            }
            info!(product_id = %product.id, delta, quantity = units, "Stock synced from POS");
            updated += 1;
        }
        Ok(WebhookOutcome::PosSynced { updated })
    }
}
