use chrono::Utc;
use tracing::{debug, instrument};

use crate::actor_framework::ResourceClient;
use crate::domain::{Order, OrderCreate, OrderStatus, PaymentRecord};
use crate::order_actor::{OrderAction, OrderError};

/// Client for interacting with the Order store.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
}

impl_basic_client!(OrderClient, Order, OrderError, order);

impl OrderClient {
    #[instrument(skip(self, params), fields(items = params.items.len()))]
    pub async fn create_order(&self, params: OrderCreate) -> Result<String, OrderError> {
        debug!("Sending request");
        Ok(self.inner.create(params).await?)
    }

    #[instrument(skip(self))]
    pub async fn attach_session(&self, id: String, session_id: String) -> Result<Order, OrderError> {
        debug!("Sending request");
        Ok(self.inner.perform_action(id, OrderAction::AttachSession(session_id)).await?)
    }

    #[instrument(skip(self))]
    pub async fn find_by_session(&self, session_id: String) -> Result<Option<Order>, OrderError> {
        debug!("Sending request");
        Ok(self
            .inner
            .find(move |o: &Order| o.checkout_session_id.as_deref() == Some(session_id.as_str()))
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn find_by_payment_intent(&self, payment_intent_id: String) -> Result<Option<Order>, OrderError> {
        debug!("Sending request");
        Ok(self
            .inner
            .find(move |o: &Order| o.payment_intent_id.as_deref() == Some(payment_intent_id.as_str()))
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError> {
        debug!("Sending request");
        Ok(self.inner.list(move |o: &Order| o.status == status).await?)
    }

    #[instrument(skip(self, record))]
    pub async fn mark_paid(&self, id: String, record: PaymentRecord) -> Result<Order, OrderError> {
        debug!("Sending request");
        Ok(self.inner.perform_action(id, OrderAction::MarkPaid(record)).await?)
    }

    #[instrument(skip(self))]
    pub async fn mark_fulfilled(&self, id: String) -> Result<Order, OrderError> {
        debug!("Sending request");
        Ok(self.inner.perform_action(id, OrderAction::MarkFulfilled { at: Utc::now() }).await?)
    }

    #[instrument(skip(self))]
    pub async fn mark_refunded(&self, id: String) -> Result<Order, OrderError> {
        debug!("Sending request");
        Ok(self.inner.perform_action(id, OrderAction::MarkRefunded { at: Utc::now() }).await?)
    }

    #[instrument(skip(self))]
    pub async fn mark_disputed(&self, id: String) -> Result<Order, OrderError> {
        debug!("Sending request");
        Ok(self.inner.perform_action(id, OrderAction::MarkDisputed { at: Utc::now() }).await?)
    }
}
