//! Wire shapes of the inbound payment and POS notifications.
//!
//! Only the fields reconciliation reads are modelled; everything else in the
//! provider payloads is ignored.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{CustomerContact, ShippingAddress};
use crate::fulfillment::CompletedCheckout;

#[derive(Debug, Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Address {
    fn into_shipping(self) -> Option<ShippingAddress> {
        Some(ShippingAddress {
            line1: self.line1?,
            line2: self.line2,
            city: self.city?,
            state: self.state,
            postal_code: self.postal_code?,
            country: self.country?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingDetails {
    pub name: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectedInformation {
    pub shipping_details: Option<ShippingDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TotalDetails {
    pub amount_tax: Option<i64>,
    pub amount_shipping: Option<i64>,
    pub amount_discount: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
    #[serde(default)]
    pub collected_information: Option<CollectedInformation>,
    #[serde(default)]
    pub total_details: Option<TotalDetails>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CheckoutSessionObject {
    pub fn is_paid(&self) -> bool {
        matches!(self.payment_status.as_deref(), Some("paid") | Some("no_payment_required"))
    }

    pub fn order_id(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("order_id").map(String::as_str)
    }

    pub fn into_completed(self) -> CompletedCheckout {
        let customer = self.customer_details.and_then(|details| {
            let email = details.email.filter(|e| !e.trim().is_empty())?;
            Some(CustomerContact { email, name: details.name, phone: details.phone })
        });
        // Newer API versions nest shipping under collected_information.
        let shipping_address = self
            .collected_information
            .and_then(|info| info.shipping_details)
            .or(self.shipping_details)
            .and_then(|details| details.address)
            .and_then(Address::into_shipping);
        let totals = self.total_details.unwrap_or_default();
        CompletedCheckout {
            session_id: self.id,
            payment_intent_id: self.payment_intent,
            customer,
            shipping_address,
            amount_tax_cents: totals.amount_tax,
            amount_shipping_cents: totals.amount_shipping,
            amount_discount_cents: totals.amount_discount,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeObject {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    /// True only once the whole charge has been refunded.
    #[serde(default)]
    pub refunded: bool,
    #[serde(default)]
    pub amount_refunded: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisputeObject {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub enum PaymentNotification {
    CheckoutCompleted(CheckoutSessionObject),
    AsyncPaymentSucceeded(CheckoutSessionObject),
    CheckoutExpired(CheckoutSessionObject),
    ChargeRefunded(ChargeObject),
    DisputeCreated(DisputeObject),
    Other,
}

#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub id: String,
    pub kind: String,
    pub notification: PaymentNotification,
}

pub fn parse_payment_event(payload: &[u8]) -> Result<PaymentEvent, serde_json::Error> {
    let envelope: Envelope = serde_json::from_slice(payload)?;
    let object = envelope.data.object;
    let notification = match envelope.kind.as_str() {
        "checkout.session.completed" => PaymentNotification::CheckoutCompleted(serde_json::from_value(object)?),
        "checkout.session.async_payment_succeeded" => {
            PaymentNotification::AsyncPaymentSucceeded(serde_json::from_value(object)?)
        }
        "checkout.session.expired" => PaymentNotification::CheckoutExpired(serde_json::from_value(object)?),
        "charge.refunded" => PaymentNotification::ChargeRefunded(serde_json::from_value(object)?),
        "charge.dispute.created" => PaymentNotification::DisputeCreated(serde_json::from_value(object)?),
        _ => PaymentNotification::Other,
    };
    Ok(PaymentEvent { id: envelope.id, kind: envelope.kind, notification })
}

#[derive(Debug, Deserialize)]
struct PosEnvelope {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<PosData>,
}

#[derive(Debug, Deserialize)]
struct PosData {
    #[serde(default)]
    object: Option<PosObject>,
}

#[derive(Debug, Deserialize)]
struct PosObject {
    #[serde(default)]
    inventory_counts: Vec<PosInventoryCount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PosInventoryCount {
    pub catalog_object_id: String,
    pub state: String,
    #[serde(default)]
    pub location_id: Option<String>,
    pub quantity: String,
}

impl PosInventoryCount {
    /// Whole units on hand. Fractional counts round down; negative or
    /// unparseable counts yield `None`.
    pub fn units(&self) -> Option<u32> {
        let quantity: f64 = self.quantity.trim().parse().ok()?;
        if !quantity.is_finite() || quantity < 0.0 || quantity > f64::from(u32::MAX) {
            return None;
        }
        Some(quantity.floor() as u32)
    }
}

#[derive(Debug, Clone)]
pub struct PosEvent {
    pub event_id: Option<String>,
    pub kind: String,
    pub counts: Vec<PosInventoryCount>,
}

pub fn parse_pos_event(payload: &[u8]) -> Result<PosEvent, serde_json::Error> {
    let envelope: PosEnvelope = serde_json::from_slice(payload)?;
    let counts = envelope
        .data
        .and_then(|data| data.object)
        .map(|object| object.inventory_counts)
        .unwrap_or_default();
    Ok(PosEvent { event_id: envelope.event_id, kind: envelope.kind, counts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn completed_session_maps_contact_shipping_and_amounts() {
        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_1",
                "payment_status": "paid",
                "payment_intent": "pi_1",
                "customer_details": { "email": "buyer@example.com", "name": "Robin", "phone": null },
                "collected_information": { "shipping_details": { "name": "Robin", "address": {
                    "line1": "1 Elm St", "line2": null, "city": "Portland",
                    "state": "OR", "postal_code": "97201", "country": "US"
                }}},
                "total_details": { "amount_tax": 1200, "amount_shipping": 5000, "amount_discount": 0 },
                "metadata": { "order_id": "ord-1" }
            }}
        });
        let event = parse_payment_event(payload.to_string().as_bytes()).unwrap();
        assert_eq!(event.id, "evt_1");
        let PaymentNotification::CheckoutCompleted(session) = event.notification else {
            panic!("expected a completed checkout");
        };
        assert!(session.is_paid());
        assert_eq!(session.order_id(), Some("ord-1"));

        let completed = session.into_completed();
        assert_eq!(completed.session_id, "cs_test_1");
        assert_eq!(completed.payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(completed.customer.unwrap().email, "buyer@example.com");
        assert_eq!(completed.shipping_address.unwrap().city, "Portland");
        assert_eq!(completed.amount_tax_cents, Some(1200));
        assert_eq!(completed.amount_shipping_cents, Some(5000));
    }

    #[test]
    fn incomplete_address_is_dropped() {
        let address = Address { line1: Some("1 Elm St".into()), city: None, ..Default::default() };
        assert!(address.into_shipping().is_none());
    }

    #[test]
    fn unknown_event_types_parse_as_other() {
        let payload = json!({ "id": "evt_2", "type": "customer.created", "data": { "object": { "id": "cus_1" } } });
        let event = parse_payment_event(payload.to_string().as_bytes()).unwrap();
        assert_eq!(event.kind, "customer.created");
        assert!(matches!(event.notification, PaymentNotification::Other));
    }

    #[test]
    fn missing_envelope_fields_are_errors() {
        assert!(parse_payment_event(b"{\"type\":\"charge.refunded\"}").is_err());
        assert!(parse_payment_event(b"not json").is_err());
    }

    #[test]
    fn pos_counts_parse_string_quantities() {
        let payload = json!({
            "merchant_id": "M1",
            "type": "inventory.count.updated",
            "event_id": "sq_evt_1",
            "data": { "type": "inventory", "id": "x", "object": { "inventory_counts": [
                { "catalog_object_id": "VAR1", "state": "IN_STOCK", "location_id": "LOC1", "quantity": "3" },
                { "catalog_object_id": "VAR2", "state": "SOLD", "location_id": "LOC1", "quantity": "1.5" },
                { "catalog_object_id": "VAR3", "state": "IN_STOCK", "location_id": "LOC1", "quantity": "-2" }
            ]}}
        });
        let event = parse_pos_event(payload.to_string().as_bytes()).unwrap();
        assert_eq!(event.kind, "inventory.count.updated");
        assert_eq!(event.counts.len(), 3);
        assert_eq!(event.counts[0].units(), Some(3));
        assert_eq!(event.counts[1].units(), Some(1));
        assert_eq!(event.counts[2].units(), None);
    }
}
