//! Admin edits to catalog listings.

use tracing::{error, info, instrument};

use crate::clients::{InventoryClient, ProductClient};
use crate::domain::{InventoryReason, NewInventoryEvent, Product, ProductPatch};
use crate::product_actor::ProductError;

#[derive(Clone)]
pub struct CatalogService {
    products: ProductClient,
    inventory: InventoryClient,
}

impl CatalogService {
    pub fn new(products: ProductClient, inventory: InventoryClient) -> Self {
        Self { products, inventory }
    }

    /// Applies an admin patch. Field edits are written first so an invalid
    /// price leaves the count untouched; a count change is then applied as a
    /// signed adjustment with its own audit row.
    #[instrument(skip(self))]
    pub async fn update_listing(&self, id: String, mut patch: ProductPatch) -> Result<Product, ProductError> {
        let quantity = patch.quantity.take();
        let product = self.products.update_product(id.clone(), patch).await?;
        let Some(quantity) = quantity else {
            return Ok(product);
        };

        let delta = self.products.set_count(id.clone(), quantity).await?;
        if delta != 0 {
            let event = NewInventoryEvent::adjustment(&id, delta, InventoryReason::AdminAdjustment);
            if let Err(e) = self.inventory.record(event).await {
                error!(product_id = %id, error = %e, "Failed to append admin adjustment");
            }
            info!(product_id = %id, delta, quantity, "Stock adjusted by admin");
        }
        self.products.require_product(id).await
    }
}
