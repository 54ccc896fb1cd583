//! Inventory counts: physical-count snapshots, variance math, and the
//! reconciliation that folds them back into the balance ledger.

use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stockyard_core::{
    CountId, CountLineId, LedgerError, LedgerResult, LocationId, ProductId, ReferenceNo, UserId,
};

use crate::balance::{BalanceKey, BalanceOperation};

/// Lifecycle state of a count. Counting progress is tracked per line; the
/// count itself only distinguishes open from reconciled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CountStatus {
    Draft,
    Reconciled,
}

impl CountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountStatus::Draft => "DRAFT",
            CountStatus::Reconciled => "RECONCILED",
        }
    }
}

impl core::fmt::Display for CountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(CountStatus::Draft),
            "RECONCILED" => Ok(CountStatus::Reconciled),
            other => Err(LedgerError::validation(format!(
                "unknown count status '{other}'"
            ))),
        }
    }
}

/// Counting progress of one line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CountLineStatus {
    Pending,
    Counted,
}

/// One product of a count: the expected quantity snapshotted at creation and
/// the physically counted quantity once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountLine {
    pub id: CountLineId,
    pub product_id: ProductId,
    pub expected_quantity: i64,
    pub counted_quantity: Option<i64>,
    /// `counted - expected`; zero until the line is counted.
    pub variance: i64,
    pub status: CountLineStatus,
}

/// Request to create a count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCount {
    pub location_id: LocationId,
    pub created_by: UserId,
    pub assigned_to: Option<UserId>,
    pub notes: Option<String>,
    pub lines: Vec<NewCountLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCountLine {
    pub product_id: ProductId,
    /// Defaults to zero when omitted; the sheet then expects an empty shelf.
    #[serde(default)]
    pub expected_quantity: i64,
}

/// Balance adjustment produced by reconciling one counted line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountAdjustment {
    pub product_id: ProductId,
    pub variance: i64,
}

/// An inventory count document for one location.
///
/// Construct through [`InventoryCount::create`]; reconciliation happens at
/// most once, enforced by the `ensure_open` guard on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCount {
    pub id: CountId,
    pub reference_no: ReferenceNo,
    pub location_id: LocationId,
    pub status: CountStatus,
    pub total_variance: i64,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub assigned_to: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub lines: Vec<CountLine>,
}

impl InventoryCount {
    /// Validate a request and build a Draft count with a fresh reference.
    ///
    /// Expected quantities are snapshotted as supplied; lines may be empty
    /// (a count sheet the staff fills in later).
    pub fn create(request: NewCount) -> LedgerResult<Self> {
        for (idx, line) in request.lines.iter().enumerate() {
            if line.expected_quantity < 0 {
                return Err(LedgerError::validation(format!(
                    "lines[{idx}].expected_quantity must not be negative"
                )));
            }
        }

        let lines = request
            .lines
            .into_iter()
            .map(|line| CountLine {
                id: CountLineId::new(),
                product_id: line.product_id,
                expected_quantity: line.expected_quantity,
                counted_quantity: None,
                variance: 0,
                status: CountLineStatus::Pending,
            })
            .collect();

        Ok(Self {
            id: CountId::new(),
            reference_no: ReferenceNo::generate("CNT"),
            location_id: request.location_id,
            status: CountStatus::Draft,
            total_variance: 0,
            notes: request.notes,
            created_by: request.created_by,
            assigned_to: request.assigned_to,
            created_at: Utc::now(),
            reconciled_at: None,
            lines,
        })
    }

    /// Fail with `AlreadyReconciled` once the count is closed.
    pub fn ensure_open(&self) -> LedgerResult<()> {
        match self.status {
            CountStatus::Draft => Ok(()),
            CountStatus::Reconciled => Err(LedgerError::AlreadyReconciled),
        }
    }

    /// Record the physically counted quantity for one line and recompute its
    /// variance.
    pub fn record_count(&mut self, line_id: CountLineId, counted_quantity: i64) -> LedgerResult<()> {
        self.ensure_open()?;
        if counted_quantity < 0 {
            return Err(LedgerError::validation(
                "counted_quantity must not be negative",
            ));
        }

        let line = self
            .lines
            .iter_mut()
            .find(|line| line.id == line_id)
            .ok_or_else(|| LedgerError::not_found("count line"))?;

        line.counted_quantity = Some(counted_quantity);
        line.variance = counted_quantity - line.expected_quantity;
        line.status = CountLineStatus::Counted;

        Ok(())
    }

    /// Balance overwrites for counted lines whose variance is non-zero, as
    /// one batch. Uncounted lines produce nothing.
    pub fn reconciliation_operations(&self) -> Vec<BalanceOperation> {
        self.lines
            .iter()
            .filter(|line| line.variance != 0)
            .filter_map(|line| {
                line.counted_quantity.map(|counted| BalanceOperation::Set {
                    key: BalanceKey::new(line.product_id, self.location_id),
                    value: counted,
                })
            })
            .collect()
    }

    /// Adjustments reported back to the caller, matching
    /// [`InventoryCount::reconciliation_operations`] line for line.
    pub fn adjustments(&self) -> Vec<CountAdjustment> {
        self.lines
            .iter()
            .filter(|line| line.variance != 0 && line.counted_quantity.is_some())
            .map(|line| CountAdjustment {
                product_id: line.product_id,
                variance: line.variance,
            })
            .collect()
    }

    /// Close the count: stamps the total absolute variance and the
    /// reconciliation time.
    pub fn mark_reconciled(&mut self, now: DateTime<Utc>) {
        self.total_variance = self.lines.iter().map(|line| line.variance.abs()).sum();
        self.status = CountStatus::Reconciled;
        self.reconciled_at = Some(now);
    }
}
