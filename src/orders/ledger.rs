//! OrderLedger — turns committed cakes into orders and tracks their
//! lifecycle.

use std::sync::Arc;

use tracing::info;

use crate::error::{OrderError, Result};
use crate::orders::model::{Order, OrderStatus};
use crate::store::Database;

pub struct OrderLedger {
    db: Arc<dyn Database>,
}

impl OrderLedger {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Create an order from one or more committed cakes. The total is
    /// computed from the cakes' prices at creation time.
    pub async fn create_order(&self, chat_id: &str, cake_ids: &[i64]) -> Result<i64> {
        if cake_ids.is_empty() {
            return Err(OrderError::Empty.into());
        }

        let mut total = 0;
        for &cake_id in cake_ids {
            let cake = self.db.get_cake(cake_id).await?;
            if !cake.committed {
                return Err(OrderError::UncommittedCake { id: cake_id }.into());
            }
            total += self.db.cake_price(cake_id).await?;
        }

        let order_id = self.db.create_order(chat_id, cake_ids, total).await?;
        info!(chat_id, order_id, total, "Created order");
        Ok(order_id)
    }

    /// Advance the order's status one step forward.
    ///
    /// Strictly monotonic; fails with `InvalidTransition` once the order is
    /// completed.
    pub async fn advance_status(&self, order_id: i64) -> Result<OrderStatus> {
        let order = self.db.get_order(order_id).await?;
        let next = order.status.next().ok_or(OrderError::InvalidTransition {
            id: order_id,
            status: order.status.as_str().to_string(),
        })?;

        // Last chance to sync the total before it freezes.
        if order.status == OrderStatus::Forming {
            let live = self.db.order_cakes_price(order_id).await?;
            if live != order.total {
                self.db.set_order_total(order_id, live).await?;
            }
        }

        self.db.set_order_status(order_id, next).await?;
        info!(order_id, from = %order.status, to = %next, "Advanced order status");
        Ok(next)
    }

    /// Recompute and save the order total from its cakes' prices.
    ///
    /// Only effective while the order is Forming; after that the total is a
    /// frozen snapshot and this is a no-op.
    pub async fn refresh_total(&self, order_id: i64) -> Result<i64> {
        let order = self.db.get_order(order_id).await?;
        if order.status != OrderStatus::Forming {
            return Ok(order.total);
        }
        let total = self.db.order_cakes_price(order_id).await?;
        self.db.set_order_total(order_id, total).await?;
        Ok(total)
    }

    /// Cancel a still-forming order, deleting it and its cakes.
    pub async fn cancel_order(&self, order_id: i64) -> Result<()> {
        let order = self.db.get_order(order_id).await?;
        if order.status != OrderStatus::Forming {
            return Err(OrderError::InvalidTransition {
                id: order_id,
                status: order.status.as_str().to_string(),
            }
            .into());
        }
        self.db.delete_order(order_id).await?;
        info!(order_id, "Cancelled order");
        Ok(())
    }

    /// The customer's orders, oldest first.
    pub async fn list_orders(&self, chat_id: &str) -> Result<Vec<Order>> {
        Ok(self.db.list_orders(chat_id).await?)
    }

    pub async fn get_order(&self, order_id: i64) -> Result<Order> {
        Ok(self.db.get_order(order_id).await?)
    }

    /// Number of cakes in the order, for summaries.
    pub async fn cake_count(&self, order_id: i64) -> Result<i64> {
        Ok(self.db.order_cake_count(order_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cake::CakeBuilder;
    use crate::error::Error;
    use crate::store::LibSqlBackend;

    struct Fixture {
        db: Arc<dyn Database>,
        builder: CakeBuilder,
        ledger: OrderLedger,
        layers_one: i64,
    }

    async fn fixture() -> Fixture {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        db.get_or_create_customer("100", "Anna", None).await.unwrap();
        let layers = db.insert_category("Layers", true, 1).await.unwrap();
        let layers_one = db.insert_option(layers, "One layer", 400).await.unwrap();
        Fixture {
            builder: CakeBuilder::new(Arc::clone(&db)),
            ledger: OrderLedger::new(Arc::clone(&db)),
            db,
            layers_one,
        }
    }

    async fn committed_cake(fx: &Fixture) -> i64 {
        let draft = fx.builder.start("100").await.unwrap();
        fx.builder.choose(draft, fx.layers_one).await.unwrap();
        fx.builder.commit(draft).await.unwrap()
    }

    #[tokio::test]
    async fn total_computed_from_cake_prices() {
        let fx = fixture().await;
        let cake = committed_cake(&fx).await;
        let order_id = fx.ledger.create_order("100", &[cake]).await.unwrap();

        let order = fx.ledger.get_order(order_id).await.unwrap();
        assert_eq!(order.total, 400);
        assert_eq!(order.status, OrderStatus::Forming);
        assert_eq!(fx.ledger.cake_count(order_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejects_empty_and_uncommitted() {
        let fx = fixture().await;
        let err = fx.ledger.create_order("100", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Order(OrderError::Empty)));

        let draft = fx.builder.start("100").await.unwrap();
        let err = fx.ledger.create_order("100", &[draft]).await.unwrap_err();
        assert!(matches!(err, Error::Order(OrderError::UncommittedCake { .. })));
    }

    #[tokio::test]
    async fn status_moves_strictly_forward() {
        let fx = fixture().await;
        let cake = committed_cake(&fx).await;
        let order_id = fx.ledger.create_order("100", &[cake]).await.unwrap();

        let walked = [
            OrderStatus::Processing,
            OrderStatus::Baking,
            OrderStatus::InTransit,
            OrderStatus::Completed,
        ];
        for expected in walked {
            assert_eq!(fx.ledger.advance_status(order_id).await.unwrap(), expected);
        }

        // Past terminal: rejected, repeatedly.
        for _ in 0..2 {
            let err = fx.ledger.advance_status(order_id).await.unwrap_err();
            assert!(matches!(err, Error::Order(OrderError::InvalidTransition { .. })));
        }
        let order = fx.ledger.get_order(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn total_freezes_once_processing() {
        let fx = fixture().await;
        let cake = committed_cake(&fx).await;
        let order_id = fx.ledger.create_order("100", &[cake]).await.unwrap();

        fx.ledger.advance_status(order_id).await.unwrap(); // Forming → Processing
        let frozen = fx.ledger.get_order(order_id).await.unwrap().total;

        // Refresh after freeze does not change the stored total.
        let total = fx.ledger.refresh_total(order_id).await.unwrap();
        assert_eq!(total, frozen);
        assert_eq!(fx.ledger.get_order(order_id).await.unwrap().total, frozen);
    }

    #[tokio::test]
    async fn list_orders_by_creation_time() {
        let fx = fixture().await;
        let first = committed_cake(&fx).await;
        let second = committed_cake(&fx).await;
        let o1 = fx.ledger.create_order("100", &[first]).await.unwrap();
        let o2 = fx.ledger.create_order("100", &[second]).await.unwrap();

        let orders = fx.ledger.list_orders("100").await.unwrap();
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, [o1, o2]);
    }

    #[tokio::test]
    async fn cancel_only_while_forming() {
        let fx = fixture().await;
        let cake = committed_cake(&fx).await;
        let order_id = fx.ledger.create_order("100", &[cake]).await.unwrap();

        fx.ledger.advance_status(order_id).await.unwrap();
        let err = fx.ledger.cancel_order(order_id).await.unwrap_err();
        assert!(matches!(err, Error::Order(OrderError::InvalidTransition { .. })));

        let cake2 = committed_cake(&fx).await;
        let order2 = fx.ledger.create_order("100", &[cake2]).await.unwrap();
        fx.ledger.cancel_order(order2).await.unwrap();
        let err = fx.ledger.get_order(order2).await.unwrap_err();
        assert!(err.is_not_found());
        // The cancelled order's cake goes with it.
        let err = fx.db.get_cake(cake2).await.unwrap_err();
        assert!(matches!(err, crate::error::DatabaseError::NotFound { .. }));
    }
}
