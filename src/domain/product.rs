use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog listing. Resale pieces are usually one-offs, so `quantity` is
/// often 1 and the listing is hidden once it sells out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub quantity: u32,
    pub is_active: bool,
    pub pos_catalog_object_id: Option<String>,
    pub pos_variation_id: Option<String>,
    /// Price decay is computed from; the listing price or the last admin price.
    pub original_price_cents: i64,
    pub floor_price_cents: i64,
    /// Start of the decay clock. An admin price edit restarts it.
    pub listed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// On-hand count as of the store write that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockLevel {
    pub quantity: u32,
    pub as_of: DateTime<Utc>,
}

/// Payload for listing a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub price_cents: i64,
    pub quantity: u32,
    /// Lowest price the decay job may reach. Defaults to the listing price.
    #[serde(default)]
    pub floor_price_cents: Option<i64>,
    #[serde(default)]
    pub pos_catalog_object_id: Option<String>,
    #[serde(default)]
    pub pos_variation_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub listed_at: DateTime<Utc>,
}

/// Admin edit of an existing product.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    /// Also restarts decay from this price.
    pub price_cents: Option<i64>,
    pub floor_price_cents: Option<i64>,
    /// Applied as an audited count change, never as a plain field write.
    pub quantity: Option<u32>,
    pub is_active: Option<bool>,
    pub pos_catalog_object_id: Option<String>,
    pub pos_variation_id: Option<String>,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price_cents: i64, quantity: u32) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            price_cents,
            quantity,
            is_active: true,
            pos_catalog_object_id: None,
            pos_variation_id: None,
            original_price_cents: price_cents,
            floor_price_cents: price_cents,
            listed_at: now,
            updated_at: now,
        }
    }
}

impl ProductCreate {
    pub fn new(name: impl Into<String>, price_cents: i64, quantity: u32) -> Self {
        Self {
            name: name.into(),
            price_cents,
            quantity,
            floor_price_cents: None,
            pos_catalog_object_id: None,
            pos_variation_id: None,
            listed_at: Utc::now(),
        }
    }
}
