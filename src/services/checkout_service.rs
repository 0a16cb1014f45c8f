use crate::{
    db::{with_retry, with_transaction},
    entities::{cart_line, order_line, OrderLineModel, UserId},
    errors::ServiceError,
    repositories::{CartLineRepository, OrderLineRepository, UserRepository},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of a successful checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub user_id: UserId,
    pub line_count: usize,
    pub lines: Vec<OrderLineModel>,
    pub placed_at: DateTime<Utc>,
}

/// Converts carts into orders.
///
/// A checkout is one unit of work: it snapshots the user's cart lines, writes
/// one order line for each and deletes exactly the snapshotted lines. Either
/// all of it becomes visible or none of it does. Lines added to the cart while
/// a checkout runs are left in the cart.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    max_retries: u32,
    users: UserRepository,
    cart_lines: CartLineRepository,
    order_lines: OrderLineRepository,
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>, max_retries: u32) -> Self {
        Self {
            db,
            max_retries,
            users: UserRepository::new(),
            cart_lines: CartLineRepository::new(),
            order_lines: OrderLineRepository::new(),
        }
    }

    /// Place an order from everything currently in the user's cart.
    ///
    /// Transient write conflicts re-run the whole unit up to `max_retries`
    /// more times. A re-run that finds the cart already converted reports
    /// [`ServiceError::EmptyCart`].
    #[instrument(skip(self))]
    pub async fn place_order(&self, user_id: UserId) -> Result<OrderSummary, ServiceError> {
        if self.users.find_by_id(&*self.db, user_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("User {} not found", user_id)));
        }

        let result = with_retry("checkout.place_order", self.max_retries, || {
            self.convert_cart(user_id)
        })
        .await;

        match result {
            Ok(summary) => {
                counter!("storefront_checkout.completed", 1);
                info!(line_count = summary.line_count, "Order placed");
                Ok(summary)
            }
            Err(err) => {
                counter!("storefront_checkout.failed", 1);
                warn!(error = %err, "Checkout failed");
                Err(err)
            }
        }
    }

    async fn convert_cart(&self, user_id: UserId) -> Result<OrderSummary, ServiceError> {
        let cart_lines = self.cart_lines.clone();
        let order_lines = self.order_lines.clone();

        with_transaction(&self.db, "checkout.place_order", move |txn| {
            Box::pin(async move {
                let snapshot = cart_lines
                    .list_for_update(
                        txn,
                        Condition::all().add(cart_line::Column::UserId.eq(user_id)),
                    )
                    .await?;
                if snapshot.is_empty() {
                    return Err(ServiceError::EmptyCart(user_id));
                }

                let placed_at = Utc::now();
                let mut lines = Vec::with_capacity(snapshot.len());
                for line in &snapshot {
                    let written = order_lines
                        .insert(
                            txn,
                            order_line::ActiveModel {
                                user_id: Set(line.user_id),
                                product_id: Set(line.product_id),
                                quantity: Set(line.quantity),
                                placed_at: Set(placed_at),
                                ..Default::default()
                            },
                        )
                        .await
                        .map_err(|e| {
                            ServiceError::from_write(e, || {
                                format!("Order line for cart line {} already exists", line.id)
                            })
                        })?;
                    lines.push(written);
                }

                let snapshot_ids: Vec<i32> = snapshot.iter().map(|line| line.id).collect();
                let deleted = cart_lines
                    .delete_many(
                        txn,
                        Condition::all().add(cart_line::Column::Id.is_in(snapshot_ids)),
                    )
                    .await?;
                if deleted != snapshot.len() as u64 {
                    return Err(ServiceError::ConcurrentModification(format!(
                        "expected to remove {} cart lines for user {}, removed {}",
                        snapshot.len(),
                        user_id,
                        deleted
                    )));
                }

                Ok(OrderSummary {
                    user_id,
                    line_count: lines.len(),
                    lines,
                    placed_at,
                })
            })
        })
        .await
    }

    /// Every order line ever placed by the user, ascending by id
    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderLineModel>, ServiceError> {
        Ok(self
            .order_lines
            .list(
                &*self.db,
                Condition::all().add(order_line::Column::UserId.eq(user_id)),
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_summary_serializes_lines_and_count() {
        let placed_at = Utc::now();
        let summary = OrderSummary {
            user_id: 1,
            line_count: 1,
            lines: vec![OrderLineModel {
                id: 10,
                user_id: 1,
                product_id: 2,
                quantity: 3,
                placed_at,
            }],
            placed_at,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["user_id"], 1);
        assert_eq!(json["line_count"], 1);
        assert_eq!(json["lines"][0]["product_id"], 2);
        assert_eq!(json["lines"][0]["quantity"], 3);
    }
}
