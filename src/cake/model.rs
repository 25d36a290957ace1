//! Cake record.

use chrono::{DateTime, Utc};

/// A cake owned by one customer.
///
/// `committed = false` means a draft still being composed; once committed
/// (attached to an order) the cake is immutable. Price is never stored on
/// the record — it is always the live sum of the chosen options' prices.
#[derive(Debug, Clone)]
pub struct Cake {
    pub id: i64,
    pub customer_id: String,
    pub inscription: Option<String>,
    pub committed: bool,
    pub created_at: DateTime<Utc>,
}
