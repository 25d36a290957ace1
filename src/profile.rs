//! Customer profiles — identity, contact details, and consent state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DatabaseError;
use crate::store::Database;

/// Personal-data processing consent. Tri-state: a fresh customer has not
/// answered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consent {
    Unknown,
    Granted,
    Declined,
}

impl Default for Consent {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Consent {
    /// DB string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Granted => "granted",
            Self::Declined => "declined",
        }
    }

    /// Parse the DB string form. Unrecognized values read as `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "granted" => Self::Granted,
            "declined" => Self::Declined,
            _ => Self::Unknown,
        }
    }
}

/// A customer record, keyed by chat identity. Created on first contact,
/// never deleted.
#[derive(Debug, Clone)]
pub struct Customer {
    pub chat_id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub consent: Consent,
}

impl Customer {
    /// Full display name.
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// Customer record access backed by the database.
pub struct ProfileStore {
    db: Arc<dyn Database>,
}

impl ProfileStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Fetch the customer for `chat_id`, creating a fresh record on first
    /// contact.
    pub async fn get_or_create(
        &self,
        chat_id: &str,
        first_name: &str,
        last_name: Option<&str>,
    ) -> Result<Customer, DatabaseError> {
        let customer = self
            .db
            .get_or_create_customer(chat_id, first_name, last_name)
            .await?;
        debug!(chat_id, "Loaded customer profile");
        Ok(customer)
    }

    /// Fetch an existing customer. Fails with NotFound before first contact.
    pub async fn get(&self, chat_id: &str) -> Result<Customer, DatabaseError> {
        self.db.get_customer(chat_id).await
    }

    pub async fn set_consent(&self, chat_id: &str, consent: Consent) -> Result<(), DatabaseError> {
        self.db.set_customer_consent(chat_id, consent).await
    }

    /// Persist an already-validated, normalized phone number.
    pub async fn set_phone(&self, chat_id: &str, phone: &str) -> Result<(), DatabaseError> {
        self.db.set_customer_phone(chat_id, phone).await
    }

    /// Persist the delivery address verbatim.
    pub async fn set_address(&self, chat_id: &str, address: &str) -> Result<(), DatabaseError> {
        self.db.set_customer_address(chat_id, address).await
    }
}
