use chrono::{DateTime, Utc};

use crate::domain::StockLevel;
use crate::price_decay::DecayRule;

/// Custom actions for Product entities.
///
/// These actions represent stock and pricing operations beyond plain
/// field edits.
#[derive(Debug, Clone)]
pub enum ProductAction {
    /// Reads the current stock level without modifying it.
    CheckStock,
    /// Removes sold units. Fails rather than going below zero.
    DecrementStock(u32),
    /// Returns units to stock (refunds).
    Restock(u32),
    /// Overwrites the on-hand count with the POS's authoritative value.
    SetCount(u32),
    ApplyPriceDecay { rule: DecayRule, now: DateTime<Utc> },
}

/// Results from ProductActions - variants match 1:1 with ProductAction
#[derive(Debug, Clone, PartialEq)]
pub enum ProductActionResult {
    /// Current stock level
    CheckStock(u32),
    /// Remaining stock after the decrement
    DecrementStock(StockLevel),
    /// Stock level after restocking
    Restock(StockLevel),
    /// Signed change applied by the new count
    SetCount(i64),
    /// New price when it changed
    ApplyPriceDecay(Option<i64>),
}
