//! Scheduled markdown of aging listings.
//!
//! A listing keeps its price for `grace_days`, then loses `rate_bps` of its
//! price every `step_days`, never dropping below its floor. The price is a
//! pure function of the listing date, so a rerun after a crash or an
//! overlapping tick writes the same value.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::clients::ProductClient;
use crate::product_actor::ProductError;

/// Upper bound on compounding steps; the floor is reached long before this.
const MAX_STEPS: i64 = 520;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecayRule {
    pub grace_days: i64,
    pub step_days: i64,
    /// Markdown per step in basis points (1000 = 10%).
    pub rate_bps: u32,
}

impl Default for DecayRule {
    fn default() -> Self {
        Self { grace_days: 30, step_days: 14, rate_bps: 1_000 }
    }
}

pub fn decayed_price(
    original_cents: i64,
    floor_cents: i64,
    listed_at: DateTime<Utc>,
    now: DateTime<Utc>,
    rule: &DecayRule,
) -> i64 {
    let age_days = (now - listed_at).num_days();
    if age_days < rule.grace_days || rule.step_days <= 0 || rule.rate_bps == 0 {
        return original_cents;
    }
    let steps = ((age_days - rule.grace_days) / rule.step_days).min(MAX_STEPS);
    let rate = i64::from(rule.rate_bps.min(10_000));

    let mut price = original_cents;
    for _ in 0..steps {
        price -= price * rate / 10_000;
        if price <= floor_cents {
            return floor_cents;
        }
    }
    price.max(floor_cents)
}

/// Runs one decay pass over every active listing. Returns how many prices
/// changed. A failure on one product is logged and does not stop the pass.
#[instrument(skip(products, rule))]
pub async fn apply_price_decay_once(
    products: &ProductClient,
    rule: &DecayRule,
    now: DateTime<Utc>,
) -> Result<usize, ProductError> {
    let listings = products.list_active().await?;
    let mut changed = 0;
    for product in listings {
        if product.price_cents <= product.floor_price_cents {
            continue;
        }
        match products.apply_price_decay(product.id.clone(), rule.clone(), now).await {
            Ok(Some(price)) => {
                info!(product_id = %product.id, old_price = product.price_cents, new_price = price, "Price marked down");
                changed += 1;
            }
            Ok(None) => debug!(product_id = %product.id, "Price unchanged"),
            Err(e) => warn!(product_id = %product.id, error = %e, "Price decay failed"),
        }
    }
    Ok(changed)
}

/// Background loop driving [`apply_price_decay_once`] on a fixed interval.
pub async fn run_price_decay(products: ProductClient, rule: DecayRule, interval: Duration) {
    let mut timer = tokio::time::interval(interval);
    loop {
        timer.tick().await;
        match apply_price_decay_once(&products, &rule, Utc::now()).await {
            Ok(changed) => debug!(changed, "Price decay pass complete"),
            Err(e) => error!(error = %e, "Price decay pass failed"),
        }
    }
}
