use tracing::{debug, instrument};

use crate::actor_framework::ResourceClient;
use crate::domain::{InventoryEvent, NewInventoryEvent};
use crate::inventory_actor::InventoryError;

/// Client for the inventory audit log.
#[derive(Clone)]
pub struct InventoryClient {
    inner: ResourceClient<InventoryEvent>,
}

impl_basic_client!(InventoryClient, InventoryEvent, InventoryError, inventory_event);

impl InventoryClient {
    #[instrument(skip(self), fields(product_id = %event.product_id, delta = event.delta, reason = %event.reason))]
    pub async fn record(&self, event: NewInventoryEvent) -> Result<String, InventoryError> {
        debug!("Sending request");
        Ok(self.inner.create(event).await?)
    }

    /// Events linked to an order, oldest first.
    #[instrument(skip(self))]
    pub async fn events_for_order(&self, order_id: String) -> Result<Vec<InventoryEvent>, InventoryError> {
        debug!("Sending request");
        let mut events = self
            .inner
            .list(move |e: &InventoryEvent| e.order_id.as_deref() == Some(order_id.as_str()))
            .await?;
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    #[instrument(skip(self))]
    pub async fn events_for_product(&self, product_id: String) -> Result<Vec<InventoryEvent>, InventoryError> {
        debug!("Sending request");
        let mut events = self
            .inner
            .list(move |e: &InventoryEvent| e.product_id == product_id)
            .await?;
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }
}
