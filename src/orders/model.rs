//! Order record and status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The order lifecycle.
///
/// Progresses strictly forward: Forming → Processing → Baking → InTransit →
/// Completed. There is no back-transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Forming,
    Processing,
    Baking,
    InTransit,
    Completed,
}

impl OrderStatus {
    /// Next status in the forward progression, if any.
    pub fn next(&self) -> Option<OrderStatus> {
        use OrderStatus::*;
        match self {
            Forming => Some(Processing),
            Processing => Some(Baking),
            Baking => Some(InTransit),
            InTransit => Some(Completed),
            Completed => None,
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// DB string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forming => "forming",
            Self::Processing => "processing",
            Self::Baking => "baking",
            Self::InTransit => "in_transit",
            Self::Completed => "completed",
        }
    }

    /// Parse the DB string form. Unrecognized values read as `Forming`.
    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "baking" => Self::Baking,
            "in_transit" => Self::InTransit,
            "completed" => Self::Completed,
            _ => Self::Forming,
        }
    }

    /// Human-readable label for order summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Forming => "Forming",
            Self::Processing => "Processing",
            Self::Baking => "Baking",
            Self::InTransit => "In transit",
            Self::Completed => "Completed",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Forming
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An order owned by one customer, holding one or more committed cakes.
///
/// `total` tracks the sum of the cakes' prices while the order is Forming;
/// once the status moves past Forming, the total is a frozen snapshot.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: i64,
    pub customer_id: String,
    pub status: OrderStatus,
    pub total: i64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_all_statuses() {
        use OrderStatus::*;
        let expected = [Processing, Baking, InTransit, Completed];
        let mut current = Forming;
        for expected_next in expected {
            let next = current.next().unwrap();
            assert_eq!(next, expected_next);
            current = next;
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn is_terminal() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(!OrderStatus::Forming.is_terminal());
        assert!(!OrderStatus::InTransit.is_terminal());
    }

    #[test]
    fn display_matches_serde() {
        use OrderStatus::*;
        for status in [Forming, Processing, Baking, InTransit, Completed] {
            let display = format!("{status}");
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(format!("\"{display}\""), json);
        }
    }

    #[test]
    fn parse_roundtrip() {
        use OrderStatus::*;
        for status in [Forming, Processing, Baking, InTransit, Completed] {
            assert_eq!(OrderStatus::parse(status.as_str()), status);
        }
        assert_eq!(OrderStatus::parse("nonsense"), Forming);
    }
}
