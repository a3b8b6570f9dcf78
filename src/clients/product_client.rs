use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::actor_framework::ResourceClient;
use crate::domain::{Product, ProductCreate, ProductPatch, StockLevel};
use crate::price_decay::DecayRule;
use crate::product_actor::{ProductAction, ProductActionResult, ProductError};

/// Client for interacting with the Product store.
#[derive(Clone)]
pub struct ProductClient {
    inner: ResourceClient<Product>,
}

impl_basic_client!(ProductClient, Product, ProductError, product);

fn unexpected(result: ProductActionResult) -> ProductError {
    ProductError::ActorCommunicationError(format!("Unexpected result: {:?}", result))
}

impl ProductClient {
    #[instrument(skip(self))]
    pub async fn create_product(&self, params: ProductCreate) -> Result<String, ProductError> {
        debug!("Sending request");
        Ok(self.inner.create(params).await?)
    }

    /// Field edit only; a patch carrying `quantity` is rejected by the store.
    /// Admin edits go through `CatalogService::update_listing`, which audits
    /// the count change.
    #[instrument(skip(self))]
    pub async fn update_product(&self, id: String, patch: ProductPatch) -> Result<Product, ProductError> {
        debug!("Sending request");
        Ok(self.inner.update(id, patch).await?)
    }

    #[instrument(skip(self))]
    pub async fn find_by_pos_variation(&self, variation_id: String) -> Result<Option<Product>, ProductError> {
        debug!("Sending request");
        Ok(self
            .inner
            .find(move |p: &Product| p.pos_variation_id.as_deref() == Some(variation_id.as_str()))
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<Product>, ProductError> {
        debug!("Sending request");
        Ok(self.inner.list(|p: &Product| p.is_active).await?)
    }

    /// Admin stock read. Checkout and fulfillment read the whole product since
    /// they also need its price and name.
    #[instrument(skip(self))]
    pub async fn check_stock(&self, id: String) -> Result<u32, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::CheckStock).await? {
            ProductActionResult::CheckStock(level) => Ok(level),
            other => Err(unexpected(other)),
        }
    }

    /// Returns the remaining stock and when it was written.
    #[instrument(skip(self))]
    pub async fn decrement_stock(&self, id: String, quantity: u32) -> Result<StockLevel, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::DecrementStock(quantity)).await? {
            ProductActionResult::DecrementStock(remaining) => Ok(remaining),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn restock(&self, id: String, quantity: u32) -> Result<StockLevel, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::Restock(quantity)).await? {
            ProductActionResult::Restock(level) => Ok(level),
            other => Err(unexpected(other)),
        }
    }

    /// Returns the signed change between the old and new counts.
    #[instrument(skip(self))]
    pub async fn set_count(&self, id: String, count: u32) -> Result<i64, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::SetCount(count)).await? {
            ProductActionResult::SetCount(delta) => Ok(delta),
            other => Err(unexpected(other)),
        }
    }

    #[instrument(skip(self, rule))]
    pub async fn apply_price_decay(
        &self,
        id: String,
        rule: DecayRule,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::ApplyPriceDecay { rule, now }).await? {
            ProductActionResult::ApplyPriceDecay(price) => Ok(price),
            other => Err(unexpected(other)),
        }
    }
}
