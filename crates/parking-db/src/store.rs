//! PostgreSQL transaction coordinator
//!
//! Every transaction starts with `SET TRANSACTION ISOLATION LEVEL` so that two
//! writers racing for the same spot cannot both succeed. The store traits are
//! implemented on [`PgParkingTx`] in the `repositories` modules.

use async_trait::async_trait;
use parking_core::{
    config::IsolationLevel,
    traits::{StoreTransaction, TransactionCoordinator},
    AppError, AppResult,
};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, instrument, warn};

/// SQLSTATE reported when a serializable transaction loses a conflict
const SERIALIZATION_FAILURE: &str = "40001";

/// PostgreSQL implementation of TransactionCoordinator
#[derive(Clone)]
pub struct PgParkingStore {
    pool: PgPool,
    isolation: IsolationLevel,
}

impl PgParkingStore {
    /// Create a new store over an existing pool
    pub fn new(pool: PgPool, isolation: IsolationLevel) -> Self {
        Self { pool, isolation }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// An open PostgreSQL transaction
///
/// Dropping it without [`StoreTransaction::commit`] rolls back.
pub struct PgParkingTx {
    pub(crate) tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TransactionCoordinator for PgParkingStore {
    type Tx = PgParkingTx;

    #[instrument(skip(self))]
    async fn begin(&self) -> AppResult<PgParkingTx> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let statement = format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            self.isolation.as_sql()
        );
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to set isolation level: {}", e);
                AppError::Transaction(format!("Failed to set isolation level: {}", e))
            })?;

        debug!("Transaction started at {}", self.isolation.as_sql());

        Ok(PgParkingTx { tx })
    }
}

#[async_trait]
impl StoreTransaction for PgParkingTx {
    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            if is_serialization_failure(&e) {
                warn!("Commit lost a serialization conflict: {}", e);
                return AppError::Conflict(format!("Failed to commit transaction: {}", e));
            }
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })
    }
}

/// True when the error is a serialization failure of the current transaction
pub(crate) fn is_serialization_failure(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(SERIALIZATION_FAILURE),
        _ => false,
    }
}

/// Map a sqlx error to `AppError`, logging it first
///
/// A serialization failure becomes `AppError::Conflict`: PostgreSQL has
/// aborted the transaction, so the caller must stop issuing statements.
pub(crate) fn db_error(context: &str, err: sqlx::Error) -> AppError {
    if is_serialization_failure(&err) {
        warn!("Serialization conflict during {}: {}", context, err);
        return AppError::Conflict(format!("Failed to {}: {}", context, err));
    }
    error!("Database error {}: {}", context, err);
    AppError::Database(format!("Failed to {}: {}", context, err))
}
