use crate::actor_framework::Entity;
use crate::domain::{InventoryEvent, NewInventoryEvent};
use super::error::InventoryError;

impl Entity for InventoryEvent {
    type Id = String;
    type CreateParams = NewInventoryEvent;
    type Patch = ();
    type Action = ();
    type ActionResult = ();
    type Error = InventoryError;

    const KIND: &'static str = "inventory_event";

    fn id(&self) -> &String { &self.id }

    fn from_create_params(id: String, params: NewInventoryEvent) -> Result<Self, InventoryError> {
        if params.delta == 0 {
            return Err(InventoryError::ValidationError("delta must be non-zero".to_string()));
        }
        Ok(Self {
            id,
            product_id: params.product_id,
            delta: params.delta,
            reason: params.reason,
            order_id: params.order_id,
            created_at: params.created_at,
        })
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), InventoryError> {
        Err(InventoryError::AppendOnly)
    }

    fn on_delete(&self) -> Result<(), InventoryError> {
        Err(InventoryError::AppendOnly)
    }

    fn handle_action(&mut self, _action: ()) -> Result<(), InventoryError> {
        Err(InventoryError::AppendOnly)
    }
}
