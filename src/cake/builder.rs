//! CakeBuilder — accumulates a customer's option choices into a draft cake.
//!
//! The builder holds no traversal state of its own; the dialogue session
//! tracks which category is current. The builder enforces the per-cake
//! invariants: at most one option per category, no mutation after commit,
//! and every mandatory category answered before commit.

use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::Category;
use crate::error::{BuilderError, Result};
use crate::store::Database;

pub struct CakeBuilder {
    db: Arc<dyn Database>,
}

impl CakeBuilder {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Start a new draft cake for the customer. Returns the draft id.
    pub async fn start(&self, chat_id: &str) -> Result<i64> {
        // The customer must exist before a cake can reference them.
        self.db.get_customer(chat_id).await?;
        let draft_id = self.db.create_cake(chat_id).await?;
        info!(chat_id, draft_id, "Started draft cake");
        Ok(draft_id)
    }

    /// Attach an option to the draft.
    ///
    /// Fails with `CategoryAlreadyFilled` if the option's category has
    /// already been answered for this draft, and with `AlreadyCommitted`
    /// if the cake has been attached to an order.
    pub async fn choose(&self, draft_id: i64, option_id: i64) -> Result<()> {
        let cake = self.db.get_cake(draft_id).await?;
        if cake.committed {
            return Err(BuilderError::AlreadyCommitted { id: draft_id }.into());
        }

        let option = self.db.get_option(option_id).await?;
        let chosen = self.db.cake_options(draft_id).await?;
        if chosen.iter().any(|o| o.category_id == option.category_id) {
            let category = self.db.get_category(option.category_id).await?;
            return Err(BuilderError::CategoryAlreadyFilled {
                category: category.title,
            }
            .into());
        }

        self.db.add_cake_option(draft_id, option_id).await?;
        debug!(draft_id, option_id, "Added option to draft cake");
        Ok(())
    }

    /// Skip a category, leaving it unset.
    ///
    /// Fails with `MandatoryCategory` if the category requires a choice.
    pub async fn skip(&self, draft_id: i64, category: &Category) -> Result<()> {
        if category.is_mandatory {
            return Err(BuilderError::MandatoryCategory {
                category: category.title.clone(),
            }
            .into());
        }
        // The draft must still exist and be open.
        let cake = self.db.get_cake(draft_id).await?;
        if cake.committed {
            return Err(BuilderError::AlreadyCommitted { id: draft_id }.into());
        }
        debug!(draft_id, category = %category.title, "Skipped optional category");
        Ok(())
    }

    /// Set the inscription text on the draft.
    pub async fn set_inscription(&self, draft_id: i64, text: &str) -> Result<()> {
        let cake = self.db.get_cake(draft_id).await?;
        if cake.committed {
            return Err(BuilderError::AlreadyCommitted { id: draft_id }.into());
        }
        self.db.set_cake_inscription(draft_id, text).await?;
        Ok(())
    }

    /// The options chosen so far.
    pub async fn options(&self, draft_id: i64) -> Result<Vec<crate::catalog::CatalogOption>> {
        self.db.get_cake(draft_id).await?;
        Ok(self.db.cake_options(draft_id).await?)
    }

    /// Live price of the draft: the sum of the chosen options' prices.
    pub async fn price(&self, draft_id: i64) -> Result<i64> {
        Ok(self.db.cake_price(draft_id).await?)
    }

    /// Discard a draft. Idempotent: discarding an already-gone draft is a
    /// no-op.
    pub async fn discard(&self, draft_id: i64) -> Result<()> {
        self.db.delete_cake(draft_id).await?;
        info!(draft_id, "Discarded draft cake");
        Ok(())
    }

    /// Commit the draft, freezing it for ordering. Returns the cake id.
    ///
    /// Fails with `MandatoryUnanswered` naming the first mandatory category
    /// with no chosen option.
    pub async fn commit(&self, draft_id: i64) -> Result<i64> {
        let cake = self.db.get_cake(draft_id).await?;
        if cake.committed {
            return Err(BuilderError::AlreadyCommitted { id: draft_id }.into());
        }

        let answered: Vec<i64> = self
            .db
            .cake_options(draft_id)
            .await?
            .iter()
            .map(|o| o.category_id)
            .collect();

        for category in self.db.list_categories().await? {
            if category.is_mandatory && !answered.contains(&category.id) {
                return Err(BuilderError::MandatoryUnanswered {
                    category: category.title,
                }
                .into());
            }
        }

        self.db.mark_cake_committed(draft_id).await?;
        info!(draft_id, "Committed cake");
        Ok(draft_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::LibSqlBackend;

    struct Fixture {
        db: Arc<dyn Database>,
        builder: CakeBuilder,
        layers_one: i64,
        layers_two: i64,
        topping_caramel: i64,
        topping_cat: Category,
    }

    async fn fixture() -> Fixture {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        db.get_or_create_customer("100", "Anna", None).await.unwrap();

        let layers = db.insert_category("Layers", true, 1).await.unwrap();
        let layers_one = db.insert_option(layers, "One layer", 400).await.unwrap();
        let layers_two = db.insert_option(layers, "Two layers", 750).await.unwrap();

        let topping = db.insert_category("Topping", false, 2).await.unwrap();
        let topping_caramel = db.insert_option(topping, "Caramel", 180).await.unwrap();
        let topping_cat = db.get_category(topping).await.unwrap();

        let builder = CakeBuilder::new(Arc::clone(&db));
        Fixture {
            db,
            builder,
            layers_one,
            layers_two,
            topping_caramel,
            topping_cat,
        }
    }

    #[tokio::test]
    async fn choose_rejects_second_option_in_same_category() {
        let fx = fixture().await;
        let draft = fx.builder.start("100").await.unwrap();
        fx.builder.choose(draft, fx.layers_one).await.unwrap();

        let err = fx.builder.choose(draft, fx.layers_two).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Builder(BuilderError::CategoryAlreadyFilled { .. })
        ));
    }

    #[tokio::test]
    async fn skip_rejects_mandatory_category() {
        let fx = fixture().await;
        let draft = fx.builder.start("100").await.unwrap();
        let layers = fx.db.list_categories().await.unwrap().remove(0);
        assert!(layers.is_mandatory);

        let err = fx.builder.skip(draft, &layers).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Builder(BuilderError::MandatoryCategory { .. })
        ));
        // Optional category skips fine.
        fx.builder.skip(draft, &fx.topping_cat).await.unwrap();
    }

    #[tokio::test]
    async fn commit_fails_while_mandatory_unanswered() {
        let fx = fixture().await;
        let draft = fx.builder.start("100").await.unwrap();
        fx.builder.choose(draft, fx.topping_caramel).await.unwrap();

        let err = fx.builder.commit(draft).await.unwrap_err();
        match err {
            Error::Builder(BuilderError::MandatoryUnanswered { category }) => {
                assert_eq!(category, "Layers");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn commit_freezes_the_cake() {
        let fx = fixture().await;
        let draft = fx.builder.start("100").await.unwrap();
        fx.builder.choose(draft, fx.layers_one).await.unwrap();
        fx.builder.commit(draft).await.unwrap();

        let err = fx.builder.choose(draft, fx.topping_caramel).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Builder(BuilderError::AlreadyCommitted { .. })
        ));
        let err = fx.builder.set_inscription(draft, "Happy birthday").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Builder(BuilderError::AlreadyCommitted { .. })
        ));
    }

    #[tokio::test]
    async fn price_is_live_sum_of_choices() {
        let fx = fixture().await;
        let draft = fx.builder.start("100").await.unwrap();
        assert_eq!(fx.builder.price(draft).await.unwrap(), 0);

        fx.builder.choose(draft, fx.layers_one).await.unwrap();
        assert_eq!(fx.builder.price(draft).await.unwrap(), 400);

        fx.builder.choose(draft, fx.topping_caramel).await.unwrap();
        assert_eq!(fx.builder.price(draft).await.unwrap(), 580);
    }

    #[tokio::test]
    async fn discard_is_idempotent() {
        let fx = fixture().await;
        let draft = fx.builder.start("100").await.unwrap();
        fx.builder.discard(draft).await.unwrap();
        fx.builder.discard(draft).await.unwrap();

        let err = fx.builder.price(draft).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn inscription_persists_on_draft() {
        let fx = fixture().await;
        let draft = fx.builder.start("100").await.unwrap();
        fx.builder.set_inscription(draft, "Congrats, Lena!").await.unwrap();

        let cake = fx.db.get_cake(draft).await.unwrap();
        assert_eq!(cake.inscription.as_deref(), Some("Congrats, Lena!"));
    }
}
