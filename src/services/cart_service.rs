use crate::{
    db::{with_retry, with_transaction},
    entities::{cart_line, CartLine, CartLineId, ProductId, UserId},
    errors::ServiceError,
    repositories::{CartLineRepository, ProductRepository, UserRepository},
};
use chrono::Utc;
use sea_orm::{
    sea_query::{Alias, Expr, OnConflict},
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Largest quantity a single cart line can hold
pub const MAX_LINE_QUANTITY: i32 = i32::MAX;

/// One entry of a cart listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Per-user pending carts.
///
/// A cart holds at most one line per product; adding a product already in the
/// cart grows that line's quantity instead of inserting a second row.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    max_retries: u32,
    users: UserRepository,
    products: ProductRepository,
    lines: CartLineRepository,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, max_retries: u32) -> Self {
        Self {
            db,
            max_retries,
            users: UserRepository::new(),
            products: ProductRepository::new(),
            lines: CartLineRepository::new(),
        }
    }

    /// Add `quantity` of a product to the user's cart and return the id of the
    /// line that now holds it.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLineId, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity must be positive, got {}",
                quantity
            )));
        }

        let line_id = with_retry("cart.add_item", self.max_retries, || {
            self.merge_line(user_id, product_id, quantity)
        })
        .await?;

        info!(cart_line_id = line_id, "Item added to cart");
        Ok(line_id)
    }

    async fn merge_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLineId, ServiceError> {
        let users = self.users.clone();
        let products = self.products.clone();
        let lines = self.lines.clone();

        with_transaction(&self.db, "cart.add_item", move |txn| {
            Box::pin(async move {
                if users.find_by_id(txn, user_id).await?.is_none() {
                    return Err(ServiceError::NotFound(format!("User {} not found", user_id)));
                }
                if products.find_by_id(txn, product_id).await?.is_none() {
                    return Err(ServiceError::NotFound(format!(
                        "Product {} not found",
                        product_id
                    )));
                }

                let line = cart_line::ActiveModel {
                    user_id: Set(user_id),
                    product_id: Set(product_id),
                    quantity: Set(quantity),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                };

                // quantity = cart_lines.quantity + excluded.quantity, unless
                // the sum would leave the column's range
                let written = CartLine::insert(line)
                    .on_conflict(
                        OnConflict::columns([cart_line::Column::UserId, cart_line::Column::ProductId])
                            .value(
                                cart_line::Column::Quantity,
                                Expr::col((CartLine, cart_line::Column::Quantity)).add(Expr::col((
                                    Alias::new("excluded"),
                                    cart_line::Column::Quantity,
                                ))),
                            )
                            .update_column(cart_line::Column::UpdatedAt)
                            .action_and_where(
                                Expr::col((CartLine, cart_line::Column::Quantity))
                                    .lte(MAX_LINE_QUANTITY - quantity),
                            )
                            .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await
                    .map_err(|e| {
                        ServiceError::from_write(e, || {
                            format!("Cart line for product {} already exists", product_id)
                        })
                    })?;
                if written == 0 {
                    return Err(ServiceError::ValidationError(format!(
                        "Quantity of product {} in the cart cannot exceed {}",
                        product_id, MAX_LINE_QUANTITY
                    )));
                }

                let merged = lines
                    .find_one(txn, line_filter(user_id, product_id))
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "Cart line for user {} product {} missing after upsert",
                            user_id, product_id
                        ))
                    })?;

                Ok(merged.id)
            })
        })
        .await
    }

    /// Current cart contents, ascending by line id
    #[instrument(skip(self))]
    pub async fn list_items(&self, user_id: UserId) -> Result<Vec<CartItem>, ServiceError> {
        let lines = self
            .lines
            .list(
                &*self.db,
                Condition::all().add(cart_line::Column::UserId.eq(user_id)),
            )
            .await?;

        Ok(lines
            .into_iter()
            .map(|line| CartItem {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect())
    }
}

fn line_filter(user_id: UserId, product_id: ProductId) -> Condition {
    Condition::all()
        .add(cart_line::Column::UserId.eq(user_id))
        .add(cart_line::Column::ProductId.eq(product_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryFilter, QueryTrait};

    #[test]
    fn cart_item_serializes_as_product_and_quantity() {
        let item = CartItem {
            product_id: 4,
            quantity: 2,
        };
        let json = serde_json::to_value(item).unwrap();
        assert_eq!(json, serde_json::json!({"product_id": 4, "quantity": 2}));
    }

    #[test]
    fn line_filter_matches_user_and_product() {
        let sql = CartLine::find()
            .filter(line_filter(7, 9))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""cart_lines"."user_id" = 7"#));
        assert!(sql.contains(r#""cart_lines"."product_id" = 9"#));
    }

    #[tokio::test]
    async fn rejects_non_positive_quantity_before_touching_storage() {
        // The connection is never used: validation fails first
        let service = CartService::new(Arc::new(DatabaseConnection::Disconnected), 0);
        for quantity in [0, -3] {
            let err = service.add_item(1, 1, quantity).await.unwrap_err();
            assert!(matches!(err, ServiceError::ValidationError(_)));
        }
    }
}
