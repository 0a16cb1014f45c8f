use crate::{
    config::AppConfig,
    db::DbPool,
    services::{AccountService, CartService, CatalogService, CheckoutService},
    AppState,
};
use axum::Router;
use std::sync::Arc;

pub mod accounts;
pub mod carts;
pub mod common;
pub mod health;
pub mod orders;
pub mod products;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(db_pool.clone())),
            catalog: Arc::new(CatalogService::new(db_pool.clone())),
            cart: Arc::new(CartService::new(
                db_pool.clone(),
                config.checkout_max_retries,
            )),
            checkout: Arc::new(CheckoutService::new(
                db_pool,
                config.checkout_max_retries,
            )),
        }
    }
}

/// Every `/api` route, relative to the `/api` prefix
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(accounts::accounts_routes())
        .merge(products::products_routes())
        .merge(carts::carts_routes())
        .merge(orders::orders_routes())
}
