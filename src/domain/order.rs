use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a customer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Fulfilled,
    Refunded,
    Disputed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Disputed => "disputed",
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Paid, Fulfilled)
                | (Paid, Refunded)
                | (Fulfilled, Refunded)
                | (Paid, Disputed)
                | (Fulfilled, Disputed)
                | (Disputed, Refunded)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One purchased line, captured at purchase time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl OrderItem {
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }
}

/// Monetary totals in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl OrderTotals {
    pub fn compute(items: &[OrderItem], tax_cents: i64, shipping_cents: i64, discount_cents: i64) -> Self {
        let subtotal_cents = items.iter().map(OrderItem::line_total_cents).sum::<i64>();
        let total_cents = (subtotal_cents + tax_cents + shipping_cents - discount_cents).max(0);
        Self {
            subtotal_cents,
            tax_cents,
            shipping_cents,
            discount_cents,
            total_cents,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

/// Represents a customer order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub checkout_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub customer: CustomerContact,
    pub shipping_address: Option<ShippingAddress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

/// Payload for creating a pending order at checkout initiation.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub items: Vec<OrderItem>,
    pub customer: CustomerContact,
    pub created_at: DateTime<Utc>,
}

/// Everything written onto an order when payment is confirmed.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub payment_intent_id: Option<String>,
    pub customer: Option<CustomerContact>,
    pub shipping_address: Option<ShippingAddress>,
    pub paid_at: DateTime<Utc>,
}

/// Derives the customer-facing number from the opaque id.
pub fn order_number_for(id: &str) -> String {
    let hex: String = id
        .chars()
        .filter(char::is_ascii_hexdigit)
        .take(8)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("RS-{}", hex)
}

impl Order {
    pub fn new(id: impl Into<String>, items: Vec<OrderItem>, customer: CustomerContact) -> Self {
        let id = id.into();
        let now = Utc::now();
        let totals = OrderTotals::compute(&items, 0, 0, 0);
        Self {
            order_number: order_number_for(&id),
            id,
            status: OrderStatus::Pending,
            items,
            totals,
            checkout_session_id: None,
            payment_intent_id: None,
            customer,
            shipping_address: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
            fulfilled_at: None,
            refunded_at: None,
        }
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: i64, qty: u32) -> OrderItem {
        OrderItem { product_id: "p".into(), name: "Oak sideboard".into(), quantity: qty, unit_price_cents: price }
    }

    #[test]
    fn totals_add_tax_and_shipping_and_subtract_discount() {
        let totals = OrderTotals::compute(&[item(12_500, 2), item(4_000, 1)], 2_320, 1_500, 1_000);
        assert_eq!(totals.subtotal_cents, 29_000);
        assert_eq!(totals.total_cents, 29_000 + 2_320 + 1_500 - 1_000);
    }

    #[test]
    fn total_never_goes_below_zero() {
        let totals = OrderTotals::compute(&[item(500, 1)], 0, 0, 10_000);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn only_forward_transitions_are_allowed() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Fulfilled));
        assert!(Disputed.can_transition_to(Refunded));
        assert!(!Pending.can_transition_to(Refunded));
        assert!(!Refunded.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Paid));
        assert!(!Fulfilled.can_transition_to(Paid));
    }

    #[test]
    fn order_number_uses_leading_hex_of_id() {
        assert_eq!(order_number_for("1a2b3c4d-5e6f-7081-92a3-b4c5d6e7f809"), "RS-1A2B3C4D");
    }
}
