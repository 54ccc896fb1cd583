//! In-memory balance store for tests and single-node deployments.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use stockyard_core::{LedgerError, LedgerResult};
use stockyard_ledger::{AppliedOperation, BalanceKey, BalanceOperation, StockBalance};

use super::r#trait::{ensure_well_formed, BalanceStore};
use crate::lock_map::DEFAULT_LOCK_TIMEOUT;
use crate::query::{BalanceFilter, Page, Pagination};

/// Balance store backed by a single mutex-guarded map.
///
/// The whole map is locked per batch, which makes batch atomicity trivial:
/// operations are validated against a staged view first and only written
/// once every one of them has passed. Lock acquisition is bounded; a caller
/// that cannot take the lock within the configured timeout gets `Busy`
/// instead of queueing forever.
#[derive(Debug)]
pub struct InMemoryBalanceStore {
    inner: Mutex<HashMap<BalanceKey, StockBalance>>,
    lock_timeout: Duration,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            lock_timeout,
        }
    }

    async fn lock(&self) -> LedgerResult<tokio::sync::MutexGuard<'_, HashMap<BalanceKey, StockBalance>>> {
        tokio::time::timeout(self.lock_timeout, self.inner.lock())
            .await
            .map_err(|_| LedgerError::busy("timed out waiting for the balance store"))
    }
}

impl Default for InMemoryBalanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn get(&self, key: &BalanceKey) -> LedgerResult<Option<StockBalance>> {
        let map = self.lock().await?;
        Ok(map.get(key).cloned())
    }

    async fn list(
        &self,
        filter: &BalanceFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<StockBalance>> {
        let map = self.lock().await?;
        let mut matching: Vec<StockBalance> =
            map.values().filter(|b| filter.matches(b)).cloned().collect();
        matching.sort_by_key(StockBalance::key);

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit as usize)
            .collect();
        Ok(Page::new(items, pagination, total))
    }

    async fn apply(
        &self,
        operations: &[BalanceOperation],
    ) -> LedgerResult<Vec<AppliedOperation>> {
        ensure_well_formed(operations)?;

        let mut map = self.lock().await?;
        let now = Utc::now();

        // Stage every change first so a failing operation leaves the map untouched.
        let mut staged: HashMap<BalanceKey, i64> = HashMap::new();
        let mut applied = Vec::with_capacity(operations.len());
        for operation in operations {
            let key = operation.key();
            let before = staged
                .get(&key)
                .copied()
                .or_else(|| map.get(&key).map(|b| b.quantity))
                .unwrap_or(0);
            let after = match operation {
                BalanceOperation::Credit { amount, .. } => {
                    before.checked_add(*amount).ok_or_else(|| {
                        LedgerError::conflict(format!("stock quantity overflow for {key}"))
                    })?
                }
                BalanceOperation::Debit { amount, .. } => {
                    if before < *amount {
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
            staged.insert(key, after);
            applied.push(AppliedOperation { key, before, after });
        }

        for (key, quantity) in staged {
            map.entry(key)
                .and_modify(|balance| {
                    balance.quantity = quantity;
                    balance.updated_at = now;
                })
                .or_insert_with(|| StockBalance {
                    product_id: key.product_id,
                    location_id: key.location_id,
                    quantity,
                    updated_at: now,
                });
        }

        Ok(applied)
    }
}
