/*!
 * Transaction Helper Utilities
 *
 * Wraps sea-orm's closure transactions with logging and metrics so every unit
 * of work in the services commits or rolls back the same way.
 */

use crate::errors::ServiceError;
use futures::future::BoxFuture;
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::{future::Future, time::Duration};
use tracing::{debug, warn};
use uuid::Uuid;

/// Pause before the first retry; grows linearly with the attempt number
pub const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Execute a function within a database transaction
///
/// The transaction commits when `f` resolves to `Ok` and rolls back when it
/// resolves to `Err` (or is dropped). Errors raised inside `f` come back
/// unchanged; failures to begin or commit become `ServiceError::DatabaseError`.
///
/// # Example
///
/// ```rust,ignore
/// use crate::db::transaction::with_transaction;
///
/// let inserted = with_transaction(&db, "checkout", move |txn| {
///     Box::pin(async move {
///         OrderLine::insert_many(lines).exec(txn).await?;
///         CartLine::delete_many().filter(filter).exec(txn).await?;
///         Ok(count)
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, T>(
    db: &DatabaseConnection,
    label: &'static str,
    f: F,
) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let transaction_id = Uuid::new_v4();
    let start = std::time::Instant::now();

    debug!(transaction_id = %transaction_id, label, "Starting database transaction");
    counter!("storefront_db.transaction.started", 1, "label" => label);

    let result = db.transaction(f).await.map_err(ServiceError::from);

    let elapsed = start.elapsed();
    histogram!("storefront_db.transaction.duration", elapsed, "label" => label);

    match &result {
        Ok(_) => {
            counter!("storefront_db.transaction.committed", 1, "label" => label);
            debug!(transaction_id = %transaction_id, label, "Transaction committed in {:?}", elapsed);
        }
        Err(e) => {
            counter!("storefront_db.transaction.rolled_back", 1, "label" => label);
            warn!(transaction_id = %transaction_id, label, error = %e, "Transaction rolled back after {:?}", elapsed);
        }
    }

    result
}

/// Re-run `op` while it fails with a retryable error, up to `max_retries`
/// extra attempts. Each `op()` call must start a fresh transaction.
pub async fn with_retry<T, F, Fut>(
    label: &'static str,
    max_retries: u32,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Err(err) if err.is_retryable() && attempt < max_retries => {
                attempt += 1;
                counter!("storefront_db.transaction.retried", 1, "label" => label);
                warn!(label, error = %err, attempt, "Write conflicted, retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use crate::entities::{user, User};
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    async fn memory_db() -> DatabaseConnection {
        let db = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("connect");
        run_migrations(&db).await.expect("migrate");
        db
    }

    fn new_user(username: &str) -> user::ActiveModel {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            password: Set("secret".to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn commits_when_closure_succeeds() {
        let db = memory_db().await;

        let id = with_transaction(&db, "test_commit", |txn| {
            Box::pin(async move {
                let model = new_user("alice").insert(txn).await?;
                Ok(model.id)
            })
        })
        .await
        .expect("transaction");

        let found = User::find_by_id(id).one(&db).await.expect("query");
        assert_eq!(found.map(|u| u.username), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn rolls_back_when_closure_fails() {
        let db = memory_db().await;

        let result: Result<(), ServiceError> = with_transaction(&db, "test_rollback", |txn| {
            Box::pin(async move {
                new_user("bob").insert(txn).await?;
                Err(ServiceError::EmptyCart(1))
            })
        })
        .await;

        assert!(matches!(result, Err(ServiceError::EmptyCart(1))));
        assert_eq!(User::find().count(&db).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn retries_only_retryable_errors() {
        let mut calls = 0;
        let result: Result<u32, ServiceError> = with_retry("test_retry", 3, || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 3 {
                    Err(ServiceError::ConcurrentModification("busy".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);

        let mut calls = 0;
        let result: Result<(), ServiceError> = with_retry("test_retry", 3, || {
            calls += 1;
            async { Err(ServiceError::EmptyCart(7)) }
        })
        .await;
        assert!(matches!(result, Err(ServiceError::EmptyCart(7))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let mut calls = 0;
        let result: Result<(), ServiceError> = with_retry("test_retry", 2, || {
            calls += 1;
            async { Err(ServiceError::ConcurrentModification("busy".into())) }
        })
        .await;
        assert!(matches!(result, Err(ServiceError::ConcurrentModification(_))));
        assert_eq!(calls, 3);
    }
}
