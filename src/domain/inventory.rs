use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryReason {
    Sale,
    Refund,
    PosSync,
    AdminAdjustment,
}

impl fmt::Display for InventoryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InventoryReason::Sale => "sale",
            InventoryReason::Refund => "refund",
            InventoryReason::PosSync => "pos_sync",
            InventoryReason::AdminAdjustment => "admin_adjustment",
        };
        f.write_str(s)
    }
}

/// Audit row for one stock movement. Written once, never changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryEvent {
    pub id: String,
    pub product_id: String,
    pub delta: i64,
    pub reason: InventoryReason,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInventoryEvent {
    pub product_id: String,
    pub delta: i64,
    pub reason: InventoryReason,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewInventoryEvent {
    pub fn sale(product_id: impl Into<String>, quantity: u32, order_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            delta: -i64::from(quantity),
            reason: InventoryReason::Sale,
            order_id: Some(order_id.into()),
            created_at: Utc::now(),
        }
    }

    pub fn refund(product_id: impl Into<String>, quantity: u32, order_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            delta: i64::from(quantity),
            reason: InventoryReason::Refund,
            order_id: Some(order_id.into()),
            created_at: Utc::now(),
        }
    }

    pub fn adjustment(product_id: impl Into<String>, delta: i64, reason: InventoryReason) -> Self {
        Self {
            product_id: product_id.into(),
            delta,
            reason,
            order_id: None,
            created_at: Utc::now(),
        }
    }
}
