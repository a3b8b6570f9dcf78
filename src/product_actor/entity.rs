use chrono::Utc;
use tracing::info;

use crate::actor_framework::Entity;
use crate::domain::{Product, ProductCreate, ProductPatch, StockLevel};
use crate::price_decay::decayed_price;
use super::actions::{ProductAction, ProductActionResult};
use super::error::ProductError;

impl Entity for Product {
    type Id = String;
    type CreateParams = ProductCreate;
    type Patch = ProductPatch;
    type Action = ProductAction;
    type ActionResult = ProductActionResult;
    type Error = ProductError;

    const KIND: &'static str = "product";

    fn id(&self) -> &String { &self.id }

    /// Creates a new Product from creation parameters.
    ///
    /// The floor price defaults to the listing price, which disables decay
    /// for the product until an admin sets a lower floor.
    fn from_create_params(id: String, params: ProductCreate) -> Result<Self, ProductError> {
        if params.name.trim().is_empty() {
            return Err(ProductError::ValidationError("name must not be empty".to_string()));
        }
        if params.price_cents <= 0 {
            return Err(ProductError::InvalidPrice(params.price_cents));
        }
        let floor = params.floor_price_cents.unwrap_or(params.price_cents);
        if floor <= 0 || floor > params.price_cents {
            return Err(ProductError::InvalidPrice(floor));
        }
        Ok(Self {
            id,
            name: params.name,
            price_cents: params.price_cents,
            quantity: params.quantity,
            is_active: params.quantity > 0,
            pos_catalog_object_id: params.pos_catalog_object_id,
            pos_variation_id: params.pos_variation_id,
            original_price_cents: params.price_cents,
            floor_price_cents: floor,
            listed_at: params.listed_at,
            updated_at: Utc::now(),
        })
    }

    /// Applies an admin edit.
    ///
    /// Setting a price re-bases decay on the new price and restarts the decay
    /// clock; the floor is clamped so it never exceeds the price. Stock counts
    /// change only through actions so every change has an audit row.
    fn on_update(&mut self, patch: ProductPatch) -> Result<(), ProductError> {
        if patch.quantity.is_some() {
            return Err(ProductError::ValidationError("quantity changes go through set_count".to_string()));
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.price_cents {
            if price <= 0 {
                return Err(ProductError::InvalidPrice(price));
            }
            self.price_cents = price;
            self.original_price_cents = price;
            self.floor_price_cents = self.floor_price_cents.min(price);
            self.listed_at = Utc::now();
        }
        if let Some(floor) = patch.floor_price_cents {
            if floor <= 0 || floor > self.original_price_cents {
                return Err(ProductError::InvalidPrice(floor));
            }
            self.floor_price_cents = floor;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(catalog_id) = patch.pos_catalog_object_id {
            self.pos_catalog_object_id = Some(catalog_id);
        }
        if let Some(variation_id) = patch.pos_variation_id {
            self.pos_variation_id = Some(variation_id);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Handles stock and pricing actions.
    ///
    /// A sale that empties stock hides the listing; restocking an empty
    /// listing shows it again.
    fn handle_action(&mut self, action: ProductAction) -> Result<ProductActionResult, ProductError> {
        match action {
            ProductAction::CheckStock => Ok(ProductActionResult::CheckStock(self.quantity)),
            ProductAction::DecrementStock(amount) => {
                if amount == 0 {
                    return Err(ProductError::InvalidQuantity(amount));
                }
                if self.quantity < amount {
                    return Err(ProductError::InsufficientStock {
                        product_id: self.id.clone(),
                        requested: amount,
                        available: self.quantity,
                    });
                }
                self.quantity -= amount;
                if self.quantity == 0 {
                    self.is_active = false;
                    info!(product_id = %self.id, "Sold out, listing hidden");
                }
                self.updated_at = Utc::now();
                Ok(ProductActionResult::DecrementStock(self.stock_level()))
            }
            ProductAction::Restock(amount) => {
                if amount == 0 {
                    return Err(ProductError::InvalidQuantity(amount));
                }
                if self.quantity == 0 {
                    self.is_active = true;
                }
                self.quantity += amount;
                self.updated_at = Utc::now();
                Ok(ProductActionResult::Restock(self.stock_level()))
            }
            ProductAction::SetCount(count) => {
                let delta = i64::from(count) - i64::from(self.quantity);
                self.quantity = count;
                self.updated_at = Utc::now();
                Ok(ProductActionResult::SetCount(delta))
            }
            ProductAction::ApplyPriceDecay { rule, now } => {
                let price = decayed_price(
                    self.original_price_cents,
                    self.floor_price_cents,
                    self.listed_at,
                    now,
                    &rule,
                );
                if price == self.price_cents {
                    return Ok(ProductActionResult::ApplyPriceDecay(None));
                }
                self.price_cents = price;
                self.updated_at = now;
                Ok(ProductActionResult::ApplyPriceDecay(Some(price)))
            }
        }
    }
}

impl Product {
    fn stock_level(&self) -> StockLevel {
        StockLevel { quantity: self.quantity, as_of: self.updated_at }
    }
}
