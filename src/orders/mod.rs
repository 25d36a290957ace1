//! Orders — record model and lifecycle ledger.

pub mod ledger;
pub mod model;

pub use ledger::OrderLedger;
pub use model::{Order, OrderStatus};
