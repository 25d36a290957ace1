//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::cake::model::Cake;
use crate::catalog::{CatalogOption, Category};
use crate::error::DatabaseError;
use crate::orders::model::{Order, OrderStatus};
use crate::profile::{Consent, Customer};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init().await?;
        Ok(backend)
    }

    async fn init(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to enable foreign keys: {e}")))?;
        migrations::run_migrations(&self.conn).await
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn fetch_one(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<libsql::Row>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
        rows.next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))
    }

    async fn fetch_scalar(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<i64, DatabaseError> {
        let row = self
            .fetch_one(sql, params)
            .await?
            .ok_or_else(|| DatabaseError::Query("scalar query returned no row".into()))?;
        row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))
    }

    async fn exec(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<u64, DatabaseError> {
        self.conn()
            .execute(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql Row to a Customer.
///
/// Column order: 0:chat_id, 1:first_name, 2:last_name, 3:phone, 4:address,
/// 5:consent
fn row_to_customer(row: &libsql::Row) -> Result<Customer, DatabaseError> {
    Ok(Customer {
        chat_id: row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))?,
        first_name: row.get(1).map_err(|e| DatabaseError::Query(e.to_string()))?,
        last_name: row.get::<String>(2).ok(),
        phone: row.get::<String>(3).ok(),
        address: row.get::<String>(4).ok(),
        consent: Consent::parse(
            &row.get::<String>(5)
                .map_err(|e| DatabaseError::Query(e.to_string()))?,
        ),
    })
}

/// Column order: 0:id, 1:title, 2:is_mandatory, 3:choice_order
fn row_to_category(row: &libsql::Row) -> Result<Category, DatabaseError> {
    Ok(Category {
        id: row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))?,
        title: row.get(1).map_err(|e| DatabaseError::Query(e.to_string()))?,
        is_mandatory: row
            .get::<i64>(2)
            .map_err(|e| DatabaseError::Query(e.to_string()))?
            != 0,
        choice_order: row.get(3).map_err(|e| DatabaseError::Query(e.to_string()))?,
    })
}

/// Column order: 0:id, 1:category_id, 2:name, 3:price
fn row_to_option(row: &libsql::Row) -> Result<CatalogOption, DatabaseError> {
    Ok(CatalogOption {
        id: row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))?,
        category_id: row.get(1).map_err(|e| DatabaseError::Query(e.to_string()))?,
        name: row.get(2).map_err(|e| DatabaseError::Query(e.to_string()))?,
        price: row.get(3).map_err(|e| DatabaseError::Query(e.to_string()))?,
    })
}

/// Column order: 0:id, 1:customer_id, 2:is_committed, 3:inscription,
/// 4:created_at
fn row_to_cake(row: &libsql::Row) -> Result<Cake, DatabaseError> {
    let created: String = row.get(4).map_err(|e| DatabaseError::Query(e.to_string()))?;
    Ok(Cake {
        id: row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))?,
        customer_id: row.get(1).map_err(|e| DatabaseError::Query(e.to_string()))?,
        committed: row
            .get::<i64>(2)
            .map_err(|e| DatabaseError::Query(e.to_string()))?
            != 0,
        inscription: row.get::<String>(3).ok(),
        created_at: parse_datetime(&created),
    })
}

/// Column order: 0:id, 1:customer_id, 2:status, 3:total, 4:created_at,
/// 5:modified_at
fn row_to_order(row: &libsql::Row) -> Result<Order, DatabaseError> {
    let status: String = row.get(2).map_err(|e| DatabaseError::Query(e.to_string()))?;
    let created: String = row.get(4).map_err(|e| DatabaseError::Query(e.to_string()))?;
    let modified: String = row.get(5).map_err(|e| DatabaseError::Query(e.to_string()))?;
    Ok(Order {
        id: row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))?,
        customer_id: row.get(1).map_err(|e| DatabaseError::Query(e.to_string()))?,
        status: OrderStatus::parse(&status),
        total: row.get(3).map_err(|e| DatabaseError::Query(e.to_string()))?,
        created_at: parse_datetime(&created),
        modified_at: parse_datetime(&modified),
    })
}

const CUSTOMER_COLUMNS: &str = "chat_id, first_name, last_name, phone, address, consent";
const CAKE_COLUMNS: &str = "id, customer_id, is_committed, inscription, created_at";
const ORDER_COLUMNS: &str = "id, customer_id, status, total, created_at, modified_at";

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Customers ───────────────────────────────────────────────────

    async fn get_or_create_customer(
        &self,
        chat_id: &str,
        first_name: &str,
        last_name: Option<&str>,
    ) -> Result<Customer, DatabaseError> {
        if let Ok(existing) = self.get_customer(chat_id).await {
            return Ok(existing);
        }

        self.exec(
            "INSERT INTO customers (chat_id, first_name, last_name) VALUES (?1, ?2, ?3)",
            params![chat_id, first_name, last_name],
        )
        .await?;
        info!(chat_id, "Created customer record");
        self.get_customer(chat_id).await
    }

    async fn get_customer(&self, chat_id: &str) -> Result<Customer, DatabaseError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE chat_id = ?1");
        let row = self
            .fetch_one(&sql, params![chat_id])
            .await?
            .ok_or_else(|| DatabaseError::not_found("customer", chat_id))?;
        row_to_customer(&row)
    }

    async fn set_customer_consent(
        &self,
        chat_id: &str,
        consent: Consent,
    ) -> Result<(), DatabaseError> {
        let updated = self
            .exec(
                "UPDATE customers SET consent = ?1, updated_at = ?2 WHERE chat_id = ?3",
                params![consent.as_str(), Utc::now().to_rfc3339(), chat_id],
            )
            .await?;
        if updated == 0 {
            return Err(DatabaseError::not_found("customer", chat_id));
        }
        Ok(())
    }

    async fn set_customer_phone(&self, chat_id: &str, phone: &str) -> Result<(), DatabaseError> {
        let updated = self
            .exec(
                "UPDATE customers SET phone = ?1, updated_at = ?2 WHERE chat_id = ?3",
                params![phone, Utc::now().to_rfc3339(), chat_id],
            )
            .await?;
        if updated == 0 {
            return Err(DatabaseError::not_found("customer", chat_id));
        }
        Ok(())
    }

    async fn set_customer_address(
        &self,
        chat_id: &str,
        address: &str,
    ) -> Result<(), DatabaseError> {
        let updated = self
            .exec(
                "UPDATE customers SET address = ?1, updated_at = ?2 WHERE chat_id = ?3",
                params![address, Utc::now().to_rfc3339(), chat_id],
            )
            .await?;
        if updated == 0 {
            return Err(DatabaseError::not_found("customer", chat_id));
        }
        Ok(())
    }

    // ── Catalog ─────────────────────────────────────────────────────

    async fn insert_category(
        &self,
        title: &str,
        is_mandatory: bool,
        choice_order: i64,
    ) -> Result<i64, DatabaseError> {
        self.exec(
            "INSERT INTO categories (title, is_mandatory, choice_order) VALUES (?1, ?2, ?3)",
            params![title, is_mandatory as i64, choice_order],
        )
        .await?;
        Ok(self.conn().last_insert_rowid())
    }

    async fn insert_option(
        &self,
        category_id: i64,
        name: &str,
        price: i64,
    ) -> Result<i64, DatabaseError> {
        if price < 0 {
            return Err(DatabaseError::Constraint(format!(
                "option price must be non-negative, got {price}"
            )));
        }
        self.exec(
            "INSERT INTO options (category_id, name, price) VALUES (?1, ?2, ?3)",
            params![category_id, name, price],
        )
        .await?;
        Ok(self.conn().last_insert_rowid())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, title, is_mandatory, choice_order FROM categories
                 ORDER BY choice_order ASC, id ASC",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut categories = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            categories.push(row_to_category(&row)?);
        }
        Ok(categories)
    }

    async fn list_options(&self, category_id: i64) -> Result<Vec<CatalogOption>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, category_id, name, price FROM options
                 WHERE category_id = ?1 ORDER BY id ASC",
                params![category_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut options = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            options.push(row_to_option(&row)?);
        }
        Ok(options)
    }

    async fn get_category(&self, category_id: i64) -> Result<Category, DatabaseError> {
        let row = self
            .fetch_one(
                "SELECT id, title, is_mandatory, choice_order FROM categories WHERE id = ?1",
                params![category_id],
            )
            .await?
            .ok_or_else(|| DatabaseError::not_found("category", category_id))?;
        row_to_category(&row)
    }

    async fn get_option(&self, option_id: i64) -> Result<CatalogOption, DatabaseError> {
        let row = self
            .fetch_one(
                "SELECT id, category_id, name, price FROM options WHERE id = ?1",
                params![option_id],
            )
            .await?
            .ok_or_else(|| DatabaseError::not_found("option", option_id))?;
        row_to_option(&row)
    }

    // ── Cakes ───────────────────────────────────────────────────────

    async fn create_cake(&self, chat_id: &str) -> Result<i64, DatabaseError> {
        self.exec(
            "INSERT INTO cakes (customer_id, created_at) VALUES (?1, ?2)",
            params![chat_id, Utc::now().to_rfc3339()],
        )
        .await?;
        Ok(self.conn().last_insert_rowid())
    }

    async fn get_cake(&self, cake_id: i64) -> Result<Cake, DatabaseError> {
        let sql = format!("SELECT {CAKE_COLUMNS} FROM cakes WHERE id = ?1");
        let row = self
            .fetch_one(&sql, params![cake_id])
            .await?
            .ok_or_else(|| DatabaseError::not_found("cake", cake_id))?;
        row_to_cake(&row)
    }

    async fn add_cake_option(&self, cake_id: i64, option_id: i64) -> Result<(), DatabaseError> {
        self.exec(
            "INSERT INTO cake_options (cake_id, option_id) VALUES (?1, ?2)",
            params![cake_id, option_id],
        )
        .await?;
        Ok(())
    }

    async fn cake_options(&self, cake_id: i64) -> Result<Vec<CatalogOption>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT o.id, o.category_id, o.name, o.price
                 FROM cake_options co JOIN options o ON o.id = co.option_id
                 WHERE co.cake_id = ?1 ORDER BY o.id ASC",
                params![cake_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut options = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            options.push(row_to_option(&row)?);
        }
        Ok(options)
    }

    async fn cake_price(&self, cake_id: i64) -> Result<i64, DatabaseError> {
        // Fails for a missing cake rather than reporting a zero price.
        self.get_cake(cake_id).await?;
        self.fetch_scalar(
            "SELECT COALESCE(SUM(o.price), 0)
             FROM cake_options co JOIN options o ON o.id = co.option_id
             WHERE co.cake_id = ?1",
            params![cake_id],
        )
        .await
    }

    async fn set_cake_inscription(&self, cake_id: i64, text: &str) -> Result<(), DatabaseError> {
        let updated = self
            .exec(
                "UPDATE cakes SET inscription = ?1 WHERE id = ?2",
                params![text, cake_id],
            )
            .await?;
        if updated == 0 {
            return Err(DatabaseError::not_found("cake", cake_id));
        }
        Ok(())
    }

    async fn mark_cake_committed(&self, cake_id: i64) -> Result<(), DatabaseError> {
        let updated = self
            .exec(
                "UPDATE cakes SET is_committed = 1 WHERE id = ?1",
                params![cake_id],
            )
            .await?;
        if updated == 0 {
            return Err(DatabaseError::not_found("cake", cake_id));
        }
        Ok(())
    }

    async fn delete_cake(&self, cake_id: i64) -> Result<(), DatabaseError> {
        self.exec(
            "DELETE FROM cake_options WHERE cake_id = ?1",
            params![cake_id],
        )
        .await?;
        self.exec("DELETE FROM cakes WHERE id = ?1", params![cake_id])
            .await?;
        Ok(())
    }

    // ── Orders ──────────────────────────────────────────────────────

    async fn create_order(
        &self,
        chat_id: &str,
        cake_ids: &[i64],
        total: i64,
    ) -> Result<i64, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.exec(
            "INSERT INTO orders (customer_id, status, total, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                chat_id,
                OrderStatus::Forming.as_str(),
                total,
                now.clone(),
                now
            ],
        )
        .await?;
        let order_id = self.conn().last_insert_rowid();

        for &cake_id in cake_ids {
            self.exec(
                "INSERT INTO order_cakes (order_id, cake_id) VALUES (?1, ?2)",
                params![order_id, cake_id],
            )
            .await?;
        }
        Ok(order_id)
    }

    async fn get_order(&self, order_id: i64) -> Result<Order, DatabaseError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let row = self
            .fetch_one(&sql, params![order_id])
            .await?
            .ok_or_else(|| DatabaseError::not_found("order", order_id))?;
        row_to_order(&row)
    }

    async fn list_orders(&self, chat_id: &str) -> Result<Vec<Order>, DatabaseError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ?1
             ORDER BY created_at ASC, id ASC"
        );
        let mut rows = self
            .conn()
            .query(&sql, params![chat_id])
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut orders = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            orders.push(row_to_order(&row)?);
        }
        Ok(orders)
    }

    async fn order_cake_count(&self, order_id: i64) -> Result<i64, DatabaseError> {
        self.fetch_scalar(
            "SELECT COUNT(*) FROM order_cakes WHERE order_id = ?1",
            params![order_id],
        )
        .await
    }

    async fn order_cakes_price(&self, order_id: i64) -> Result<i64, DatabaseError> {
        self.fetch_scalar(
            "SELECT COALESCE(SUM(o.price), 0)
             FROM order_cakes oc
             JOIN cake_options co ON co.cake_id = oc.cake_id
             JOIN options o ON o.id = co.option_id
             WHERE oc.order_id = ?1",
            params![order_id],
        )
        .await
    }

    async fn set_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<(), DatabaseError> {
        let updated = self
            .exec(
                "UPDATE orders SET status = ?1, modified_at = ?2 WHERE id = ?3",
                params![status.as_str(), Utc::now().to_rfc3339(), order_id],
            )
            .await?;
        if updated == 0 {
            return Err(DatabaseError::not_found("order", order_id));
        }
        Ok(())
    }

    async fn set_order_total(&self, order_id: i64, total: i64) -> Result<(), DatabaseError> {
        let updated = self
            .exec(
                "UPDATE orders SET total = ?1, modified_at = ?2 WHERE id = ?3",
                params![total, Utc::now().to_rfc3339(), order_id],
            )
            .await?;
        if updated == 0 {
            return Err(DatabaseError::not_found("order", order_id));
        }
        Ok(())
    }

    async fn delete_order(&self, order_id: i64) -> Result<(), DatabaseError> {
        // Remove the order's cakes with it; they exist only inside this order.
        let mut rows = self
            .conn()
            .query(
                "SELECT cake_id FROM order_cakes WHERE order_id = ?1",
                params![order_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut cake_ids = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            let cake_id: i64 = row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))?;
            cake_ids.push(cake_id);
        }

        self.exec(
            "DELETE FROM order_cakes WHERE order_id = ?1",
            params![order_id],
        )
        .await?;
        for cake_id in cake_ids {
            self.delete_cake(cake_id).await?;
        }
        self.exec("DELETE FROM orders WHERE id = ?1", params![order_id])
            .await?;
        Ok(())
    }

    async fn customer_has_orders(&self, chat_id: &str) -> Result<bool, DatabaseError> {
        let count = self
            .fetch_scalar(
                "SELECT COUNT(*) FROM orders WHERE customer_id = ?1",
                params![chat_id],
            )
            .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backend() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn get_or_create_is_stable() {
        let db = backend().await;
        let first = db
            .get_or_create_customer("42", "Anna", Some("Petrova"))
            .await
            .unwrap();
        assert_eq!(first.first_name, "Anna");
        assert_eq!(first.consent, Consent::Unknown);

        // Second call returns the same record; the name is not overwritten.
        let again = db
            .get_or_create_customer("42", "Somebody", None)
            .await
            .unwrap();
        assert_eq!(again.first_name, "Anna");
        assert_eq!(again.last_name.as_deref(), Some("Petrova"));
    }

    #[tokio::test]
    async fn customer_fields_persist() {
        let db = backend().await;
        db.get_or_create_customer("42", "Anna", None).await.unwrap();

        db.set_customer_consent("42", Consent::Granted).await.unwrap();
        db.set_customer_phone("42", "+79123456789").await.unwrap();
        db.set_customer_address("42", "Arbat st. 1, apt. 2").await.unwrap();

        let customer = db.get_customer("42").await.unwrap();
        assert_eq!(customer.consent, Consent::Granted);
        assert_eq!(customer.phone.as_deref(), Some("+79123456789"));
        assert_eq!(customer.address.as_deref(), Some("Arbat st. 1, apt. 2"));
    }

    #[tokio::test]
    async fn updates_to_unknown_customer_fail() {
        let db = backend().await;
        let err = db.set_customer_phone("404", "+79123456789").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn cake_price_is_aggregate_sum() {
        let db = backend().await;
        db.get_or_create_customer("42", "Anna", None).await.unwrap();
        let category = db.insert_category("Layers", true, 1).await.unwrap();
        let small = db.insert_option(category, "One layer", 400).await.unwrap();
        let category2 = db.insert_category("Berries", false, 2).await.unwrap();
        let berries = db.insert_option(category2, "Raspberries", 300).await.unwrap();

        let cake = db.create_cake("42").await.unwrap();
        assert_eq!(db.cake_price(cake).await.unwrap(), 0);
        db.add_cake_option(cake, small).await.unwrap();
        db.add_cake_option(cake, berries).await.unwrap();
        assert_eq!(db.cake_price(cake).await.unwrap(), 700);
    }

    #[tokio::test]
    async fn cake_price_for_missing_cake_is_not_found() {
        let db = backend().await;
        let err = db.cake_price(999).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn negative_price_rejected() {
        let db = backend().await;
        let category = db.insert_category("Layers", true, 1).await.unwrap();
        let err = db.insert_option(category, "Bad", -5).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint(_)));
    }

    #[tokio::test]
    async fn delete_cake_is_idempotent_and_clears_links() {
        let db = backend().await;
        db.get_or_create_customer("42", "Anna", None).await.unwrap();
        let category = db.insert_category("Layers", true, 1).await.unwrap();
        let option = db.insert_option(category, "One layer", 400).await.unwrap();
        let cake = db.create_cake("42").await.unwrap();
        db.add_cake_option(cake, option).await.unwrap();

        db.delete_cake(cake).await.unwrap();
        db.delete_cake(cake).await.unwrap();
        assert!(matches!(
            db.get_cake(cake).await.unwrap_err(),
            DatabaseError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn order_roundtrip_and_history_flag() {
        let db = backend().await;
        db.get_or_create_customer("42", "Anna", None).await.unwrap();
        assert!(!db.customer_has_orders("42").await.unwrap());

        let category = db.insert_category("Layers", true, 1).await.unwrap();
        let option = db.insert_option(category, "One layer", 400).await.unwrap();
        let cake = db.create_cake("42").await.unwrap();
        db.add_cake_option(cake, option).await.unwrap();
        db.mark_cake_committed(cake).await.unwrap();

        let order = db.create_order("42", &[cake], 400).await.unwrap();
        assert!(db.customer_has_orders("42").await.unwrap());
        assert_eq!(db.order_cake_count(order).await.unwrap(), 1);
        assert_eq!(db.order_cakes_price(order).await.unwrap(), 400);

        let fetched = db.get_order(order).await.unwrap();
        assert_eq!(fetched.status, OrderStatus::Forming);
        assert_eq!(fetched.total, 400);
    }

    #[tokio::test]
    async fn file_backed_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bakebot.db");
        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.get_or_create_customer("42", "Anna", None).await.unwrap();
        }
        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let customer = db.get_customer("42").await.unwrap();
        assert_eq!(customer.first_name, "Anna");
    }
}
