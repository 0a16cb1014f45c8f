use crate::{
    entities::{product, ProductId, ProductModel},
    errors::ServiceError,
    repositories::ProductRepository,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{Condition, DatabaseConnection, Set};
use std::sync::Arc;
use tracing::{info, instrument};

/// Product catalog: read by everyone, written only through `create_product`
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    products: ProductRepository,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            products: ProductRepository::new(),
        }
    }

    /// Every product, ascending by id
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductModel>, ServiceError> {
        Ok(self.products.list(&*self.db, Condition::all()).await?)
    }

    #[instrument(skip(self))]
    pub async fn create_product(&self, name: &str, price: Decimal) -> Result<ProductId, ServiceError> {
        validate_product(name, price)?;

        let created = self
            .products
            .insert(
                &*self.db,
                product::ActiveModel {
                    name: Set(name.to_string()),
                    price: Set(price),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        info!(product_id = created.id, "Product created");
        Ok(created.id)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: ProductId) -> Result<ProductModel, ServiceError> {
        self.products
            .find_by_id(&*self.db, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }
}

fn validate_product(name: &str, price: Decimal) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "Product name must not be empty".to_string(),
        ));
    }
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "Price must not be negative, got {}",
            price
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(0.01))]
    #[case(dec!(19.99))]
    fn accepts_non_negative_prices(#[case] price: Decimal) {
        assert!(validate_product("Mug", price).is_ok());
    }

    #[rstest]
    #[case(dec!(-1))]
    #[case(dec!(-0.0001))]
    fn rejects_negative_prices(#[case] price: Decimal) {
        assert_matches!(
            validate_product("Mug", price),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn rejects_blank_name() {
        assert_matches!(
            validate_product(" \t", dec!(5)),
            Err(ServiceError::ValidationError(_))
        );
    }
}
