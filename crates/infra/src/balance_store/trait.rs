//! Balance store abstraction.
//!
//! A balance store keeps one non-negative quantity per `(product, location)`
//! pair and applies batches of operations atomically: either every operation
//! in a batch lands, or none do and the caller gets the first failure.

use std::sync::Arc;

use stockyard_core::{LedgerError, LedgerResult};
use stockyard_ledger::{AppliedOperation, BalanceKey, BalanceOperation, StockBalance};

use crate::query::{BalanceFilter, Page, Pagination};

/// Keyed quantity store with atomic batch application.
///
/// `apply` is the only mutation primitive. The convenience methods
/// (`credit`, `debit`, `set`, `transfer`) build single batches on top of it,
/// so implementations get them for free.
#[async_trait::async_trait]
pub trait BalanceStore: Send + Sync {
    /// Returns the balance for `key`, or `None` if the pair has never held stock.
    async fn get(&self, key: &BalanceKey) -> LedgerResult<Option<StockBalance>>;

    /// Lists balances matching `filter`, ordered by product then location.
    async fn list(
        &self,
        filter: &BalanceFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<StockBalance>>;

    /// Applies every operation in order, atomically.
    ///
    /// Returns one `AppliedOperation` per input, in input order. A debit that
    /// would take a balance below zero fails the whole batch with
    /// `InsufficientStock`; a missing balance debits as zero on hand.
    async fn apply(
        &self,
        operations: &[BalanceOperation],
    ) -> LedgerResult<Vec<AppliedOperation>>;

    /// Adds `amount` to the balance at `key`, creating it at zero first.
    async fn credit(&self, key: BalanceKey, amount: i64) -> LedgerResult<AppliedOperation> {
        single(self.apply(&[BalanceOperation::Credit { key, amount }]).await?)
    }

    /// Removes `amount` from the balance at `key`.
    async fn debit(&self, key: BalanceKey, amount: i64) -> LedgerResult<AppliedOperation> {
        single(self.apply(&[BalanceOperation::Debit { key, amount }]).await?)
    }

    /// Overwrites the balance at `key` with `value`.
    async fn set(&self, key: BalanceKey, value: i64) -> LedgerResult<AppliedOperation> {
        single(self.apply(&[BalanceOperation::Set { key, value }]).await?)
    }

    /// Moves `amount` from one key to another as a single atomic pair.
    async fn transfer(
        &self,
        from: BalanceKey,
        to: BalanceKey,
        amount: i64,
    ) -> LedgerResult<Vec<AppliedOperation>> {
        if from == to {
            return Err(LedgerError::validation("transfer endpoints must differ"));
        }
        self.apply(&[
            BalanceOperation::Debit { key: from, amount },
            BalanceOperation::Credit { key: to, amount },
        ])
        .await
    }
}

#[async_trait::async_trait]
impl<S> BalanceStore for Arc<S>
where
    S: BalanceStore + ?Sized,
{
    async fn get(&self, key: &BalanceKey) -> LedgerResult<Option<StockBalance>> {
        (**self).get(key).await
    }

    async fn list(
        &self,
        filter: &BalanceFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<StockBalance>> {
        (**self).list(filter, pagination).await
    }

    async fn apply(
        &self,
        operations: &[BalanceOperation],
    ) -> LedgerResult<Vec<AppliedOperation>> {
        (**self).apply(operations).await
    }
}

fn single(mut applied: Vec<AppliedOperation>) -> LedgerResult<AppliedOperation> {
    applied
        .pop()
        .ok_or_else(|| LedgerError::storage("balance store applied an empty batch"))
}

/// Rejects malformed operations before any state is touched.
///
/// Credits and debits must move a strictly positive amount; sets may not
/// write a negative quantity. Shared by every store implementation so the
/// failure messages match.
pub(crate) fn ensure_well_formed(operations: &[BalanceOperation]) -> LedgerResult<()> {
    for operation in operations {
        match operation {
            BalanceOperation::Credit { key, amount } | BalanceOperation::Debit { key, amount } => {
                if *amount <= 0 {
                    return Err(LedgerError::validation(format!(
                        "operation amount must be positive for {key}, got {amount}"
                    )));
                }
            }
            BalanceOperation::Set { key, value } => {
                if *value < 0 {
                    return Err(LedgerError::validation(format!(
                        "balance for {key} cannot be set negative, got {value}"
                    )));
                }
            }
        }
    }
    Ok(())
}
