//! Stock balances: per-(product, location) quantities and the primitive
//! operations that mutate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockyard_core::{LocationId, ProductId};

/// Key of one ledger entry: a product at a location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceKey {
    pub product_id: ProductId,
    pub location_id: LocationId,
}

impl BalanceKey {
    pub fn new(product_id: ProductId, location_id: LocationId) -> Self {
        Self {
            product_id,
            location_id,
        }
    }
}

impl core::fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.product_id, self.location_id)
    }
}

/// Current on-hand quantity for one key. Never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBalance {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

impl StockBalance {
    pub fn key(&self) -> BalanceKey {
        BalanceKey::new(self.product_id, self.location_id)
    }
}

/// One primitive mutation of the balance ledger.
///
/// Operations are applied in batches (all-or-nothing); movement completion
/// and count reconciliation build their whole effect as one batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceOperation {
    /// Add `amount` (> 0), creating the key at zero first if absent.
    Credit { key: BalanceKey, amount: i64 },
    /// Subtract `amount` (> 0); fails with `InsufficientStock` rather than
    /// letting the balance go negative.
    Debit { key: BalanceKey, amount: i64 },
    /// Overwrite the key to `value` (>= 0), creating it if absent.
    Set { key: BalanceKey, value: i64 },
}

impl BalanceOperation {
    pub fn key(&self) -> BalanceKey {
        match self {
            BalanceOperation::Credit { key, .. } => *key,
            BalanceOperation::Debit { key, .. } => *key,
            BalanceOperation::Set { key, .. } => *key,
        }
    }
}

/// Before/after snapshot of one key touched by an applied batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedOperation {
    pub key: BalanceKey,
    pub before: i64,
    pub after: i64,
}
