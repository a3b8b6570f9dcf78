use chrono::{DateTime, Utc};

use crate::domain::PaymentRecord;

/// Status transitions and session bookkeeping for orders. Every variant
/// answers with the updated order.
#[derive(Debug, Clone)]
pub enum OrderAction {
    /// Stores the hosted checkout session id; only while pending.
    AttachSession(String),
    MarkPaid(PaymentRecord),
    MarkFulfilled { at: DateTime<Utc> },
    MarkRefunded { at: DateTime<Utc> },
    MarkDisputed { at: DateTime<Utc> },
}
