//! Unified `Database` trait — single async interface for all persistence.

use async_trait::async_trait;

use crate::cake::model::Cake;
use crate::catalog::{CatalogOption, Category};
use crate::error::DatabaseError;
use crate::orders::model::{Order, OrderStatus};
use crate::profile::{Consent, Customer};

/// Backend-agnostic database trait covering customers, catalog, cakes, and
/// orders.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Customers ───────────────────────────────────────────────────

    /// Fetch a customer by chat identity, creating the record on first
    /// contact.
    async fn get_or_create_customer(
        &self,
        chat_id: &str,
        first_name: &str,
        last_name: Option<&str>,
    ) -> Result<Customer, DatabaseError>;

    /// Fetch an existing customer.
    async fn get_customer(&self, chat_id: &str) -> Result<Customer, DatabaseError>;

    async fn set_customer_consent(
        &self,
        chat_id: &str,
        consent: Consent,
    ) -> Result<(), DatabaseError>;

    async fn set_customer_phone(&self, chat_id: &str, phone: &str) -> Result<(), DatabaseError>;

    async fn set_customer_address(&self, chat_id: &str, address: &str)
        -> Result<(), DatabaseError>;

    // ── Catalog ─────────────────────────────────────────────────────

    async fn insert_category(
        &self,
        title: &str,
        is_mandatory: bool,
        choice_order: i64,
    ) -> Result<i64, DatabaseError>;

    async fn insert_option(
        &self,
        category_id: i64,
        name: &str,
        price: i64,
    ) -> Result<i64, DatabaseError>;

    /// All categories, sorted by `choice_order` ascending, ties by row id.
    async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError>;

    /// Options of one category, in insertion order.
    async fn list_options(&self, category_id: i64) -> Result<Vec<CatalogOption>, DatabaseError>;

    async fn get_category(&self, category_id: i64) -> Result<Category, DatabaseError>;

    async fn get_option(&self, option_id: i64) -> Result<CatalogOption, DatabaseError>;

    // ── Cakes ───────────────────────────────────────────────────────

    /// Create an empty draft cake for the customer. Returns the cake id.
    async fn create_cake(&self, chat_id: &str) -> Result<i64, DatabaseError>;

    async fn get_cake(&self, cake_id: i64) -> Result<Cake, DatabaseError>;

    async fn add_cake_option(&self, cake_id: i64, option_id: i64) -> Result<(), DatabaseError>;

    /// The options chosen for a cake, in choice order.
    async fn cake_options(&self, cake_id: i64) -> Result<Vec<CatalogOption>, DatabaseError>;

    /// Aggregate sum of the cake's chosen option prices. Fails with NotFound
    /// for a missing cake.
    async fn cake_price(&self, cake_id: i64) -> Result<i64, DatabaseError>;

    async fn set_cake_inscription(&self, cake_id: i64, text: &str) -> Result<(), DatabaseError>;

    async fn mark_cake_committed(&self, cake_id: i64) -> Result<(), DatabaseError>;

    /// Delete a cake and its option links. Deleting a missing cake is a
    /// no-op.
    async fn delete_cake(&self, cake_id: i64) -> Result<(), DatabaseError>;

    // ── Orders ──────────────────────────────────────────────────────

    /// Create an order holding the given cakes with a precomputed total.
    async fn create_order(
        &self,
        chat_id: &str,
        cake_ids: &[i64],
        total: i64,
    ) -> Result<i64, DatabaseError>;

    async fn get_order(&self, order_id: i64) -> Result<Order, DatabaseError>;

    /// The customer's orders, ordered by creation time ascending.
    async fn list_orders(&self, chat_id: &str) -> Result<Vec<Order>, DatabaseError>;

    async fn order_cake_count(&self, order_id: i64) -> Result<i64, DatabaseError>;

    /// Aggregate sum of the prices of all cakes in the order.
    async fn order_cakes_price(&self, order_id: i64) -> Result<i64, DatabaseError>;

    async fn set_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<(), DatabaseError>;

    async fn set_order_total(&self, order_id: i64, total: i64) -> Result<(), DatabaseError>;

    /// Delete an order together with the cakes it holds.
    async fn delete_order(&self, order_id: i64) -> Result<(), DatabaseError>;

    async fn customer_has_orders(&self, chat_id: &str) -> Result<bool, DatabaseError>;
}
