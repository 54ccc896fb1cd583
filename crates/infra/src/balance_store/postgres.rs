//! Postgres-backed balance store implementation.
//!
//! Persists one row per `(product_id, location_id)` pair and applies
//! operation batches inside a single transaction, taking row locks with
//! `SELECT ... FOR UPDATE` so concurrent writers serialize per pair.
//!
//! ## Expected schema
//!
//! ```sql
//! CREATE TABLE stock_balances (
//!     product_id  UUID        NOT NULL,
//!     location_id UUID        NOT NULL,
//!     quantity    BIGINT      NOT NULL CHECK (quantity >= 0),
//!     updated_at  TIMESTAMPTZ NOT NULL,
//!     PRIMARY KEY (product_id, location_id)
//! );
//! ```
//!
//! Schema management lives outside this crate; the store assumes the table
//! exists and surfaces anything else as a `Storage` error.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `LedgerError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerError | Scenario |
//! |------------|----------------------|-------------|----------|
//! | Database (lock not available) | `55P03` | `Busy` | Row lock held past the configured `lock_timeout` |
//! | Database (unique violation) | `23505` | `Conflict` | Concurrent insert of the same balance row |
//! | Database (check violation) | `23514` | `Validation` | Write would violate `quantity >= 0` |
//! | Database (foreign key violation) | `23503` | `Validation` | Referential integrity violation |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | PoolClosed | N/A | `Storage` | Connection pool was closed |
//! | RowNotFound | N/A | `NotFound` | Expected balance row missing |
//! | Other | N/A | `Storage` | Network errors, connection failures, etc. |
//!
//! ## Bounded locking
//!
//! Every transaction runs `SET LOCAL lock_timeout` before touching rows, so
//! a writer blocked behind another transaction fails with `Busy` instead of
//! queueing indefinitely. Callers are expected to retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::{instrument, Span};

use stockyard_core::{LedgerError, LedgerResult, LocationId, ProductId};
use stockyard_ledger::{AppliedOperation, BalanceKey, BalanceOperation, StockBalance};

use super::r#trait::{ensure_well_formed, BalanceStore};
use crate::lock_map::DEFAULT_LOCK_TIMEOUT;
use crate::query::{BalanceFilter, Page, Pagination};

/// Postgres-backed balance store.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool which is thread-safe (Arc + Send + Sync).
/// All mutations run inside transactions so a failed batch rolls back whole.
#[derive(Debug, Clone)]
pub struct PostgresBalanceStore {
    pool: Arc<PgPool>,
    lock_timeout: Duration,
}

impl PostgresBalanceStore {
    /// Creates a store over the given pool with the default lock timeout.
    pub fn new(pool: PgPool) -> Self {
        Self::with_lock_timeout(pool, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(pool: PgPool, lock_timeout: Duration) -> Self {
        Self {
            pool: Arc::new(pool),
            lock_timeout,
        }
    }
}

#[async_trait::async_trait]
impl BalanceStore for PostgresBalanceStore {
    #[instrument(
        skip(self),
        fields(
            product_id = %key.product_id,
            location_id = %key.location_id
        ),
        err
    )]
    async fn get(&self, key: &BalanceKey) -> LedgerResult<Option<StockBalance>> {
        let row = sqlx::query(
            r#"
            SELECT product_id, location_id, quantity, updated_at
            FROM stock_balances
            WHERE product_id = $1 AND location_id = $2
            "#,
        )
        .bind(key.product_id.as_uuid())
        .bind(key.location_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        match row {
            Some(row) => {
                let stored = BalanceRow::from_row(&row).map_err(|e| {
                    LedgerError::storage(format!("failed to deserialize balance row: {e}"))
                })?;
                Ok(Some(stored.into()))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, filter), err)]
    async fn list(
        &self,
        filter: &BalanceFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<StockBalance>> {
        let product_id = filter.product_id.map(uuid::Uuid::from);
        let location_id = filter.location_id.map(uuid::Uuid::from);

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM stock_balances
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR location_id = $2)
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list.count", e))?;
        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| map_sqlx_error("list.count", e))?;

        let rows = sqlx::query(
            r#"
            SELECT product_id, location_id, quantity, updated_at
            FROM stock_balances
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR location_id = $2)
            ORDER BY product_id ASC, location_id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .bind(i64::from(pagination.limit))
        .bind(pagination.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        let mut balances = Vec::with_capacity(rows.len());
        for row in rows {
            let stored = BalanceRow::from_row(&row).map_err(|e| {
                LedgerError::storage(format!("failed to deserialize balance row: {e}"))
            })?;
            balances.push(stored.into());
        }

        Span::current().record("row_count", balances.len());
        Ok(Page::new(balances, pagination, total.max(0) as u64))
    }

    #[instrument(
        skip(self, operations),
        fields(operation_count = operations.len()),
        err
    )]
    async fn apply(
        &self,
        operations: &[BalanceOperation],
    ) -> LedgerResult<Vec<AppliedOperation>> {
        ensure_well_formed(operations)?;
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("apply.begin", e))?;

        // Bounded waiting: a blocked row lock fails the transaction with
        // 55P03 rather than queueing behind the holder.
        let set_timeout = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        sqlx::query(&set_timeout)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("apply.lock_timeout", e))?;

        let now = Utc::now();
        let mut applied = Vec::with_capacity(operations.len());
        for operation in operations {
            let key = operation.key();

            let locked = sqlx::query(
                r#"
                SELECT quantity
                FROM stock_balances
                WHERE product_id = $1 AND location_id = $2
                FOR UPDATE
                "#,
            )
            .bind(key.product_id.as_uuid())
            .bind(key.location_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("apply.lock_row", e))?;

            let before: i64 = match locked {
                Some(row) => row
                    .try_get("quantity")
                    .map_err(|e| map_sqlx_error("apply.lock_row", e))?,
                None => 0,
            };

            let after = match operation {
                BalanceOperation::Credit { amount, .. } => match before.checked_add(*amount) {
                    Some(after) => after,
                    None => {
                        let _ = tx.rollback().await;
                        return Err(LedgerError::conflict(format!(
                            "stock quantity overflow for {key}"
                        )));
                    }
                },
                BalanceOperation::Debit { amount, .. } => {
                    if before < *amount {
                        let _ = tx.rollback().await;
                        return Err(LedgerError::insufficient_stock(
                            key.product_id,
                            key.location_id,
                            *amount,
                            before,
                        ));
                    }
                    before - *amount
                }
                BalanceOperation::Set { value, .. } => *value,
            };

            sqlx::query(
                r#"
                INSERT INTO stock_balances (product_id, location_id, quantity, updated_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (product_id, location_id)
                DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(key.product_id.as_uuid())
            .bind(key.location_id.as_uuid())
            .bind(after)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("apply.upsert", e))?;

            applied.push(AppliedOperation { key, before, after });
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("apply.commit", e))?;

        Ok(applied)
    }
}

/// Map SQLx errors to `LedgerError` per the table in the module docs.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            match code.as_str() {
                "55P03" => LedgerError::busy(format!(
                    "{operation}: a concurrent transaction holds the balance row lock"
                )),
                "23505" => LedgerError::conflict(format!(
                    "{operation}: unique constraint violated: {}",
                    db_err.message()
                )),
                "23514" | "23503" => LedgerError::validation(format!(
                    "{operation}: constraint violated: {}",
                    db_err.message()
                )),
                _ => LedgerError::storage(format!(
                    "{operation}: database error: {}",
                    db_err.message()
                )),
            }
        }
        sqlx::Error::PoolClosed => {
            LedgerError::storage(format!("{operation}: connection pool closed"))
        }
        sqlx::Error::RowNotFound => LedgerError::not_found("stock balance"),
        _ => LedgerError::storage(format!("{operation}: {err}")),
    }
}

/// Internal row shape for deserializing balance rows.
struct BalanceRow {
    product_id: uuid::Uuid,
    location_id: uuid::Uuid,
    quantity: i64,
    updated_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for BalanceRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            product_id: row.try_get("product_id")?,
            location_id: row.try_get("location_id")?,
            quantity: row.try_get("quantity")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<BalanceRow> for StockBalance {
    fn from(row: BalanceRow) -> Self {
        StockBalance {
            product_id: ProductId::from_uuid(row.product_id),
            location_id: LocationId::from_uuid(row.location_id),
            quantity: row.quantity,
            updated_at: row.updated_at,
        }
    }
}
