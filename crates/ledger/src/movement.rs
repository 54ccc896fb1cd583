//! Stock movements: the documents that change balances, and their lifecycle.

use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stockyard_core::{
    BatchId, LedgerError, LedgerResult, LocationId, MovementId, MovementLineId, ProductId,
    ReferenceNo, SupplierId, UserId,
};

use crate::balance::{BalanceKey, BalanceOperation};

/// Kind of stock movement. Determines the validation rules and the balance
/// effect applied when the movement completes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Receipt,
    Delivery,
    Transfer,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Receipt => "RECEIPT",
            MovementType::Delivery => "DELIVERY",
            MovementType::Transfer => "TRANSFER",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }

    /// Document prefix used in generated reference numbers.
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            MovementType::Receipt => "RCP",
            MovementType::Delivery => "DEL",
            MovementType::Transfer => "TRN",
            MovementType::Adjustment => "ADJ",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIPT" => Ok(MovementType::Receipt),
            "DELIVERY" => Ok(MovementType::Delivery),
            "TRANSFER" => Ok(MovementType::Transfer),
            "ADJUSTMENT" => Ok(MovementType::Adjustment),
            other => Err(LedgerError::validation(format!(
                "unknown movement type '{other}'"
            ))),
        }
    }
}

/// Lifecycle state of a movement.
///
/// The graph is fixed: Draft -> Waiting -> Ready -> Done, with Canceled
/// reachable from every non-terminal state. Done and Canceled are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementStatus {
    Draft,
    Waiting,
    Ready,
    Done,
    Canceled,
}

impl MovementStatus {
    pub const ALL: [MovementStatus; 5] = [
        MovementStatus::Draft,
        MovementStatus::Waiting,
        MovementStatus::Ready,
        MovementStatus::Done,
        MovementStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Draft => "DRAFT",
            MovementStatus::Waiting => "WAITING",
            MovementStatus::Ready => "READY",
            MovementStatus::Done => "DONE",
            MovementStatus::Canceled => "CANCELED",
        }
    }

    /// Statuses reachable from this one.
    pub fn allowed_targets(&self) -> &'static [MovementStatus] {
        match self {
            MovementStatus::Draft => &[MovementStatus::Waiting, MovementStatus::Canceled],
            MovementStatus::Waiting => &[MovementStatus::Ready, MovementStatus::Canceled],
            MovementStatus::Ready => &[MovementStatus::Done, MovementStatus::Canceled],
            MovementStatus::Done | MovementStatus::Canceled => &[],
        }
    }

    pub fn can_transition(&self, target: MovementStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MovementStatus::Done | MovementStatus::Canceled)
    }
}

impl core::fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(MovementStatus::Draft),
            "WAITING" => Ok(MovementStatus::Waiting),
            "READY" => Ok(MovementStatus::Ready),
            "DONE" => Ok(MovementStatus::Done),
            "CANCELED" => Ok(MovementStatus::Canceled),
            other => Err(LedgerError::validation(format!(
                "unknown movement status '{other}'"
            ))),
        }
    }
}

/// Warehouse-floor progress of one line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    Pending,
    Picked,
    Confirmed,
}

/// One product line of a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLine {
    pub id: MovementLineId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub batch_id: Option<BatchId>,
    pub picked_quantity: Option<i64>,
    pub status: LineStatus,
}

/// Request to create a movement. Shape is checked by [`NewMovement::validate`]
/// before any `Movement` exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub from_location_id: Option<LocationId>,
    pub to_location_id: Option<LocationId>,
    pub supplier_id: Option<SupplierId>,
    pub created_by: UserId,
    pub notes: Option<String>,
    pub lines: Vec<NewMovementLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovementLine {
    pub product_id: ProductId,
    /// Omitted on the wire counts as zero, which validation rejects.
    #[serde(default)]
    pub quantity: i64,
    pub batch_id: Option<BatchId>,
}

/// Pick confirmation for one line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickedLine {
    pub line_id: MovementLineId,
    pub picked_quantity: i64,
}

impl NewMovement {
    /// Check the request against the per-type rules.
    ///
    /// All failures are collected so the caller sees every bad field at once,
    /// not just the first.
    pub fn validate(&self) -> LedgerResult<()> {
        let mut problems: Vec<String> = Vec::new();

        match self.movement_type {
            MovementType::Receipt => {
                if self.to_location_id.is_none() {
                    problems.push("to_location_id is required for receipts".to_string());
                }
                if self.supplier_id.is_none() {
                    problems.push("supplier_id is required for receipts".to_string());
                }
            }
            MovementType::Delivery => {
                if self.from_location_id.is_none() {
                    problems.push("from_location_id is required for deliveries".to_string());
                }
            }
            MovementType::Transfer => {
                if self.from_location_id.is_none() {
                    problems.push("from_location_id is required for transfers".to_string());
                }
                if self.to_location_id.is_none() {
                    problems.push("to_location_id is required for transfers".to_string());
                }
                if let (Some(from), Some(to)) = (self.from_location_id, self.to_location_id) {
                    if from == to {
                        problems.push(
                            "from_location_id and to_location_id must differ for transfers"
                                .to_string(),
                        );
                    }
                }
            }
            MovementType::Adjustment => {
                if self.from_location_id.is_none() {
                    problems.push("location_id is required for adjustments".to_string());
                }
            }
        }

        if self.lines.is_empty() {
            problems.push("at least one line is required".to_string());
        }
        for (idx, line) in self.lines.iter().enumerate() {
            if line.quantity <= 0 {
                problems.push(format!("lines[{idx}].quantity must be positive"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::validation(problems.join("; ")))
        }
    }
}

/// A stock movement document.
///
/// Construct through [`Movement::create`] and mutate only through the guarded
/// methods; the movement service is the sole writer in production code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub reference_no: ReferenceNo,
    pub movement_type: MovementType,
    pub status: MovementStatus,
    pub from_location_id: Option<LocationId>,
    pub to_location_id: Option<LocationId>,
    pub supplier_id: Option<SupplierId>,
    pub created_by: UserId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub lines: Vec<MovementLine>,
}

impl Movement {
    /// Validate a request and build a Draft movement with a fresh reference.
    pub fn create(request: NewMovement) -> LedgerResult<Self> {
        request.validate()?;

        let lines = request
            .lines
            .into_iter()
            .map(|line| MovementLine {
                id: MovementLineId::new(),
                product_id: line.product_id,
                quantity: line.quantity,
                batch_id: line.batch_id,
                picked_quantity: None,
                status: LineStatus::Pending,
            })
            .collect();

        Ok(Self {
            id: MovementId::new(),
            reference_no: ReferenceNo::generate(request.movement_type.reference_prefix()),
            movement_type: request.movement_type,
            status: MovementStatus::Draft,
            from_location_id: request.from_location_id,
            to_location_id: request.to_location_id,
            supplier_id: request.supplier_id,
            created_by: request.created_by,
            notes: request.notes,
            created_at: Utc::now(),
            completed_at: None,
            lines,
        })
    }

    /// Check transition legality without mutating.
    pub fn ensure_transition(&self, target: MovementStatus) -> LedgerResult<()> {
        if self.status.can_transition(target) {
            Ok(())
        } else {
            Err(LedgerError::invalid_transition(
                self.status.as_str(),
                target.as_str(),
            ))
        }
    }

    /// Apply a legal transition. Entering Done stamps `completed_at`.
    ///
    /// This only moves the status; callers wanting stock effects must apply
    /// [`Movement::balance_operations`] to the balance store first, so a
    /// failed application never leaves a Done movement behind.
    pub fn transition(&mut self, target: MovementStatus, now: DateTime<Utc>) -> LedgerResult<()> {
        self.ensure_transition(target)?;
        self.status = target;
        if target == MovementStatus::Done {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Balance effects of completing this movement, as one batch to apply
    /// atomically.
    ///
    /// Transfers emit a debit immediately followed by the matching credit so
    /// the pair lands in the same batch.
    pub fn balance_operations(&self) -> LedgerResult<Vec<BalanceOperation>> {
        let mut operations = Vec::with_capacity(self.lines.len() * 2);

        match self.movement_type {
            MovementType::Receipt => {
                let to = self.require_location(self.to_location_id, "to_location_id")?;
                for line in &self.lines {
                    operations.push(BalanceOperation::Credit {
                        key: BalanceKey::new(line.product_id, to),
                        amount: line.quantity,
                    });
                }
            }
            MovementType::Delivery => {
                let from = self.require_location(self.from_location_id, "from_location_id")?;
                for line in &self.lines {
                    operations.push(BalanceOperation::Debit {
                        key: BalanceKey::new(line.product_id, from),
                        amount: line.quantity,
                    });
                }
            }
            MovementType::Transfer => {
                let from = self.require_location(self.from_location_id, "from_location_id")?;
                let to = self.require_location(self.to_location_id, "to_location_id")?;
                for line in &self.lines {
                    operations.push(BalanceOperation::Debit {
                        key: BalanceKey::new(line.product_id, from),
                        amount: line.quantity,
                    });
                    operations.push(BalanceOperation::Credit {
                        key: BalanceKey::new(line.product_id, to),
                        amount: line.quantity,
                    });
                }
            }
            MovementType::Adjustment => {
                // Adjustments overwrite the adjusted location absolutely.
                let location = self.require_location(self.from_location_id, "location_id")?;
                for line in &self.lines {
                    operations.push(BalanceOperation::Set {
                        key: BalanceKey::new(line.product_id, location),
                        value: line.quantity,
                    });
                }
            }
        }

        Ok(operations)
    }

    /// Record picked quantities. No status or balance effect.
    pub fn record_picks(&mut self, picks: &[PickedLine]) -> LedgerResult<()> {
        if self.status.is_terminal() {
            return Err(LedgerError::invalid_transition(
                self.status.as_str(),
                self.status.as_str(),
            ));
        }

        // Mutate a working copy so a bad pick leaves the movement untouched.
        let mut lines = self.lines.clone();
        for pick in picks {
            if pick.picked_quantity < 0 {
                return Err(LedgerError::validation(
                    "picked_quantity must not be negative",
                ));
            }
            let line = lines
                .iter_mut()
                .find(|line| line.id == pick.line_id)
                .ok_or_else(|| LedgerError::not_found("movement line"))?;
            line.picked_quantity = Some(pick.picked_quantity);
            line.status = LineStatus::Picked;
        }
        self.lines = lines;

        Ok(())
    }

    /// Force every line to Confirmed. Completion does this before the final
    /// Ready -> Done transition.
    pub fn confirm_all_lines(&mut self) {
        for line in &mut self.lines {
            line.status = LineStatus::Confirmed;
        }
    }

    fn require_location(
        &self,
        location: Option<LocationId>,
        field: &str,
    ) -> LedgerResult<LocationId> {
        location.ok_or_else(|| {
            LedgerError::validation(format!(
                "{} movement {} is missing {field}",
                self.movement_type, self.id
            ))
        })
    }
}
