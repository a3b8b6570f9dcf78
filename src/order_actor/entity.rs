use tracing::info;

use crate::actor_framework::Entity;
use crate::domain::{order_number_for, Order, OrderCreate, OrderStatus, OrderTotals};
use super::actions::OrderAction;
use super::error::OrderError;

impl Order {
    fn transition(&mut self, to: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { order_id: self.id.clone(), from: self.status, to });
        }
        info!(order_id = %self.id, from = %self.status, to = %to, "Order status changed");
        self.status = to;
        Ok(())
    }
}

impl Entity for Order {
    type Id = String;
    type CreateParams = OrderCreate;
    type Patch = ();
    type Action = OrderAction;
    type ActionResult = Order;
    type Error = OrderError;

    const KIND: &'static str = "order";

    fn id(&self) -> &String { &self.id }

    /// Creates a pending order from the checkout cart.
    fn from_create_params(id: String, params: OrderCreate) -> Result<Self, OrderError> {
        if params.items.is_empty() {
            return Err(OrderError::ValidationError("order has no items".to_string()));
        }
        if params.items.iter().any(|item| item.quantity == 0) {
            return Err(OrderError::ValidationError("item quantity must be positive".to_string()));
        }
        if params.customer.email.trim().is_empty() {
            return Err(OrderError::ValidationError("customer email is required".to_string()));
        }
        let totals = OrderTotals::compute(&params.items, 0, 0, 0);
        Ok(Self {
            order_number: order_number_for(&id),
            id,
            status: OrderStatus::Pending,
            items: params.items,
            totals,
            checkout_session_id: None,
            payment_intent_id: None,
            customer: params.customer,
            shipping_address: None,
            created_at: params.created_at,
            updated_at: params.created_at,
            paid_at: None,
            fulfilled_at: None,
            refunded_at: None,
        })
    }

    /// Orders are only changed through status actions.
    fn on_update(&mut self, _patch: ()) -> Result<(), OrderError> {
        Err(OrderError::ValidationError("orders change only through status transitions".to_string()))
    }

    fn on_delete(&self) -> Result<(), OrderError> {
        Err(OrderError::ValidationError("orders are never deleted".to_string()))
    }

    fn handle_action(&mut self, action: OrderAction) -> Result<Order, OrderError> {
        match action {
            OrderAction::AttachSession(session_id) => {
                if self.status != OrderStatus::Pending {
                    return Err(OrderError::InvalidTransition {
                        order_id: self.id.clone(),
                        from: self.status,
                        to: OrderStatus::Pending,
                    });
                }
                self.checkout_session_id = Some(session_id);
                self.updated_at = chrono::Utc::now();
            }
            OrderAction::MarkPaid(record) => {
                self.transition(OrderStatus::Paid)?;
                self.items = record.items;
                self.totals = record.totals;
                self.payment_intent_id = record.payment_intent_id.or(self.payment_intent_id.take());
                if let Some(customer) = record.customer {
                    if !customer.email.is_empty() {
                        self.customer.email = customer.email;
                    }
                    self.customer.name = customer.name.or(self.customer.name.take());
                    self.customer.phone = customer.phone.or(self.customer.phone.take());
                }
                if record.shipping_address.is_some() {
                    self.shipping_address = record.shipping_address;
                }
                self.paid_at = Some(record.paid_at);
                self.updated_at = record.paid_at;
            }
            OrderAction::MarkFulfilled { at } => {
                self.transition(OrderStatus::Fulfilled)?;
                self.fulfilled_at = Some(at);
                self.updated_at = at;
            }
            OrderAction::MarkRefunded { at } => {
                self.transition(OrderStatus::Refunded)?;
                self.refunded_at = Some(at);
                self.updated_at = at;
            }
            OrderAction::MarkDisputed { at } => {
                self.transition(OrderStatus::Disputed)?;
                self.updated_at = at;
            }
        }
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CustomerContact, OrderItem, PaymentRecord, ShippingAddress};
    use chrono::Utc;

    fn pending() -> Order {
        let items = vec![OrderItem {
            product_id: "product_1".into(),
            name: "Rattan armchair".into(),
            quantity: 1,
            unit_price_cents: 22_000,
        }];
        Order::new("0f1e2d3c-aaaa", items, CustomerContact { email: "cart@example.com".into(), ..Default::default() })
    }

    fn payment() -> PaymentRecord {
        let items = pending().items;
        PaymentRecord {
            totals: OrderTotals::compute(&items, 1_800, 2_500, 0),
            items,
            payment_intent_id: Some("pi_123".into()),
            customer: Some(CustomerContact {
                email: "buyer@example.com".into(),
                name: Some("Robin Vale".into()),
                phone: None,
            }),
            shipping_address: Some(ShippingAddress {
                line1: "12 Mill Lane".into(),
                line2: None,
                city: "Leeds".into(),
                state: None,
                postal_code: "LS1 4AP".into(),
                country: "GB".into(),
            }),
            paid_at: Utc::now(),
        }
    }

    #[test]
    fn mark_paid_writes_snapshot_totals_and_contact() {
        let mut order = pending();
        let paid = order.handle_action(OrderAction::MarkPaid(payment())).unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.totals.total_cents, 22_000 + 1_800 + 2_500);
        assert_eq!(paid.customer.email, "buyer@example.com");
        assert_eq!(paid.payment_intent_id.as_deref(), Some("pi_123"));
        assert!(paid.paid_at.is_some());
        assert!(paid.shipping_address.is_some());
    }

    #[test]
    fn second_mark_paid_is_rejected() {
        let mut order = pending();
        order.handle_action(OrderAction::MarkPaid(payment())).unwrap();
        let err = order.handle_action(OrderAction::MarkPaid(payment())).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition { from: OrderStatus::Paid, to: OrderStatus::Paid, .. }
        ));
    }

    #[test]
    fn session_can_only_be_attached_while_pending() {
        let mut order = pending();
        order.handle_action(OrderAction::AttachSession("cs_1".into())).unwrap();
        assert_eq!(order.checkout_session_id.as_deref(), Some("cs_1"));

        order.handle_action(OrderAction::MarkPaid(payment())).unwrap();
        assert!(order.handle_action(OrderAction::AttachSession("cs_2".into())).is_err());
        assert_eq!(order.checkout_session_id.as_deref(), Some("cs_1"));
    }

    #[test]
    fn refund_requires_payment_first() {
        let mut order = pending();
        let err = order.handle_action(OrderAction::MarkRefunded { at: Utc::now() }).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { from: OrderStatus::Pending, .. }));
    }

    #[test]
    fn create_requires_items_and_email() {
        let no_items = OrderCreate { items: vec![], customer: CustomerContact::default(), created_at: Utc::now() };
        assert!(Order::from_create_params("o".into(), no_items).is_err());

        let no_email = OrderCreate { items: pending().items, customer: CustomerContact::default(), created_at: Utc::now() };
        assert!(Order::from_create_params("o".into(), no_email).is_err());
    }
}
