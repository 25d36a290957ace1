//! Cake option catalog — categories and their priced options.
//!
//! The catalog is read-only to the dialogue engine; it is set up out-of-band
//! (seed tooling or operator inserts). Traversal order is `choice_order`
//! ascending, ties broken by insertion order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;
use crate::store::Database;

/// An option category presented once per cake traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub is_mandatory: bool,
    pub choice_order: i64,
}

/// A priced option belonging to exactly one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogOption {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    /// Non-negative, smallest currency unit.
    pub price: i64,
}

/// A category together with its options, in display order.
#[derive(Debug, Clone)]
pub struct CategoryWithOptions {
    pub category: Category,
    pub options: Vec<CatalogOption>,
}

/// Catalog access backed by the database.
pub struct Catalog {
    db: Arc<dyn Database>,
}

impl Catalog {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Load all categories with their options, sorted by `choice_order`
    /// ascending, ties by insertion order.
    pub async fn load_ordered_categories(&self) -> Result<Vec<CategoryWithOptions>, DatabaseError> {
        let categories = self.db.list_categories().await?;
        let mut out = Vec::with_capacity(categories.len());
        for category in categories {
            let options = self.db.list_options(category.id).await?;
            out.push(CategoryWithOptions { category, options });
        }
        Ok(out)
    }

    pub async fn get_category(&self, category_id: i64) -> Result<Category, DatabaseError> {
        self.db.get_category(category_id).await
    }

    pub async fn get_option(&self, option_id: i64) -> Result<CatalogOption, DatabaseError> {
        self.db.get_option(option_id).await
    }

    pub async fn is_empty(&self) -> Result<bool, DatabaseError> {
        Ok(self.db.list_categories().await?.is_empty())
    }

    // ── Out-of-band setup ───────────────────────────────────────────

    pub async fn insert_category(
        &self,
        title: &str,
        is_mandatory: bool,
        choice_order: i64,
    ) -> Result<i64, DatabaseError> {
        self.db.insert_category(title, is_mandatory, choice_order).await
    }

    pub async fn insert_option(
        &self,
        category_id: i64,
        name: &str,
        price: i64,
    ) -> Result<i64, DatabaseError> {
        self.db.insert_option(category_id, name, price).await
    }

    /// Seed a small demo catalog. Intended for first runs and local testing;
    /// does nothing if the catalog already has categories.
    pub async fn seed_demo(&self) -> Result<(), DatabaseError> {
        if !self.is_empty().await? {
            return Ok(());
        }
        let layers = self.insert_category("Layers", true, 1).await?;
        self.insert_option(layers, "One layer", 400).await?;
        self.insert_option(layers, "Two layers", 750).await?;
        self.insert_option(layers, "Three layers", 1100).await?;

        let shape = self.insert_category("Shape", true, 2).await?;
        self.insert_option(shape, "Round", 600).await?;
        self.insert_option(shape, "Square", 600).await?;
        self.insert_option(shape, "Heart", 1000).await?;

        let topping = self.insert_category("Topping", false, 3).await?;
        self.insert_option(topping, "White chocolate", 200).await?;
        self.insert_option(topping, "Caramel", 180).await?;
        self.insert_option(topping, "Berry jam", 300).await?;

        let berries = self.insert_category("Berries", false, 4).await?;
        self.insert_option(berries, "Blueberries", 400).await?;
        self.insert_option(berries, "Raspberries", 300).await?;
        self.insert_option(berries, "Strawberries", 300).await?;

        let inscription = self.insert_category("Inscription", false, 5).await?;
        self.insert_option(inscription, "Custom inscription", 500).await?;

        tracing::info!("Seeded demo catalog");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    async fn catalog() -> Catalog {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        Catalog::new(db)
    }

    #[tokio::test]
    async fn traversal_follows_choice_order() {
        let catalog = catalog().await;
        // Inserted out of order on purpose.
        catalog.insert_category("Topping", false, 2).await.unwrap();
        catalog.insert_category("Layers", true, 1).await.unwrap();

        let ordered = catalog.load_ordered_categories().await.unwrap();
        let titles: Vec<&str> = ordered.iter().map(|c| c.category.title.as_str()).collect();
        assert_eq!(titles, ["Layers", "Topping"]);
    }

    #[tokio::test]
    async fn choice_order_ties_break_by_insertion() {
        let catalog = catalog().await;
        catalog.insert_category("First", true, 1).await.unwrap();
        catalog.insert_category("Second", true, 1).await.unwrap();

        let ordered = catalog.load_ordered_categories().await.unwrap();
        let titles: Vec<&str> = ordered.iter().map(|c| c.category.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);
    }

    #[tokio::test]
    async fn options_attach_to_their_category() {
        let catalog = catalog().await;
        let layers = catalog.insert_category("Layers", true, 1).await.unwrap();
        let shape = catalog.insert_category("Shape", true, 2).await.unwrap();
        catalog.insert_option(layers, "One layer", 400).await.unwrap();
        catalog.insert_option(shape, "Round", 600).await.unwrap();

        let ordered = catalog.load_ordered_categories().await.unwrap();
        assert_eq!(ordered[0].options.len(), 1);
        assert_eq!(ordered[0].options[0].name, "One layer");
        assert_eq!(ordered[1].options[0].name, "Round");
    }

    #[tokio::test]
    async fn seed_demo_is_idempotent() {
        let catalog = catalog().await;
        catalog.seed_demo().await.unwrap();
        let before = catalog.load_ordered_categories().await.unwrap().len();
        catalog.seed_demo().await.unwrap();
        let after = catalog.load_ordered_categories().await.unwrap().len();
        assert_eq!(before, after);
    }
}
