#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseBackend as DbBackend, Statement};
use serde_json::Value;
use storefront_api::{
    config::AppConfig,
    db,
    entities::{ProductId, UserId},
    services::RegisterUserInput,
    AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;

/// Helper harness for spinning up an application state backed by SQLite.
///
/// [`TestApp::new`] uses an in-memory database on exactly one connection:
/// every connection to `sqlite::memory:` opens its own empty database, so
/// concurrent transactions run one after another. [`TestApp::with_file_database`]
/// shares a temporary database file between several connections, so
/// transactions really interleave.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    _dir: Option<TempDir>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Like [`TestApp::new`] but lets the caller tweak configuration first.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "development".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        tweak(&mut cfg);

        Self::start(cfg, None).await
    }

    /// Fresh database file in a temporary directory, pooled over `connections`.
    /// Write retries are raised to the configured maximum.
    pub async fn with_file_database(connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("temp dir for test database");
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("storefront.db").display()
        );
        let mut cfg = AppConfig::new(
            url,
            "127.0.0.1".to_string(),
            18_080,
            "development".to_string(),
        );
        cfg.db_max_connections = connections;
        cfg.db_min_connections = 1;
        cfg.checkout_max_retries = 10;

        Self::start(cfg, Some(dir)).await
    }

    async fn start(cfg: AppConfig, dir: Option<TempDir>) -> Self {
        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = Arc::new(AppState::new(Arc::new(pool), cfg));
        let router = storefront_api::app_router(state.clone()).expect("router");

        Self {
            router,
            state,
            _dir: dir,
        }
    }

    /// Send a JSON request against the router.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Run raw SQL against the test database.
    pub async fn execute(&self, sql: &str) {
        self.state
            .db
            .execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
            .await
            .expect("raw sql");
    }

    pub async fn seed_user(&self, username: &str) -> UserId {
        self.state
            .services
            .accounts
            .register(RegisterUserInput {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: "password123".to_string(),
            })
            .await
            .expect("seed user for tests")
    }

    pub async fn seed_product(&self, name: &str, price: Decimal) -> ProductId {
        self.state
            .services
            .catalog
            .create_product(name, price)
            .await
            .expect("seed product for tests")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
