//! Movement workflows: creation, status transitions, picking, completion.
//!
//! ## Transition Flow
//!
//! Every status change runs the same pipeline:
//!
//! ```text
//! Request
//!   ↓
//! 1. Take the per-movement lock (bounded wait, `Busy` on timeout)
//!   ↓
//! 2. Load the movement and check the transition is legal
//!   ↓
//! 3. On DONE: apply the movement's balance operations as one atomic batch
//!   ↓
//! 4. Persist the new status
//!   ↓
//! 5. Emit the audit event (best effort, never fails the request)
//! ```
//!
//! Ordering carries the exactly-once guarantee: balances are applied before
//! the status flips to DONE, and the persisted DONE status is the guard
//! against re-application. A failed balance batch leaves the movement in its
//! previous status so the caller can retry; a repeated DONE request
//! short-circuits before touching any balance.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use stockyard_audit::{snapshot, AuditAction, AuditEntity, AuditRecorder};
use stockyard_core::{LedgerError, LedgerResult, LocationId, MovementId, SupplierId, UserId};
use stockyard_ledger::{
    Movement, MovementStatus, MovementType, NewMovement, NewMovementLine, PickedLine,
};

use super::{audit_event, Actor};
use crate::balance_store::BalanceStore;
use crate::lock_map::LockMap;
use crate::movement_store::MovementStore;
use crate::query::{MovementFilter, Page, Pagination};

/// Payload for a supplier receipt into a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptDraft {
    pub to_location_id: Option<LocationId>,
    pub supplier_id: Option<SupplierId>,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<NewMovementLine>,
}

impl ReceiptDraft {
    fn into_new_movement(self, created_by: UserId) -> NewMovement {
        NewMovement {
            movement_type: MovementType::Receipt,
            from_location_id: None,
            to_location_id: self.to_location_id,
            supplier_id: self.supplier_id,
            created_by,
            notes: self.notes,
            lines: self.lines,
        }
    }
}

/// Payload for a delivery out of a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryDraft {
    pub from_location_id: Option<LocationId>,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<NewMovementLine>,
}

impl DeliveryDraft {
    fn into_new_movement(self, created_by: UserId) -> NewMovement {
        NewMovement {
            movement_type: MovementType::Delivery,
            from_location_id: self.from_location_id,
            to_location_id: None,
            supplier_id: None,
            created_by,
            notes: self.notes,
            lines: self.lines,
        }
    }
}

/// Payload for an internal transfer between two locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferDraft {
    pub from_location_id: Option<LocationId>,
    pub to_location_id: Option<LocationId>,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<NewMovementLine>,
}

impl TransferDraft {
    fn into_new_movement(self, created_by: UserId) -> NewMovement {
        NewMovement {
            movement_type: MovementType::Transfer,
            from_location_id: self.from_location_id,
            to_location_id: self.to_location_id,
            supplier_id: None,
            created_by,
            notes: self.notes,
            lines: self.lines,
        }
    }
}

/// Payload for an absolute stock adjustment at one location.
///
/// The draft's `location_id` is carried as the movement's `from_location_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentDraft {
    pub location_id: Option<LocationId>,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<NewMovementLine>,
}

impl AdjustmentDraft {
    fn into_new_movement(self, created_by: UserId) -> NewMovement {
        NewMovement {
            movement_type: MovementType::Adjustment,
            from_location_id: self.location_id,
            to_location_id: None,
            supplier_id: None,
            created_by,
            notes: self.notes,
            lines: self.lines,
        }
    }
}

/// Orchestrates movement lifecycles over a balance store and movement store.
pub struct MovementService<B, M> {
    balances: B,
    movements: M,
    locks: Arc<LockMap>,
    audit: Arc<dyn AuditRecorder>,
}

impl<B, M> MovementService<B, M>
where
    B: BalanceStore,
    M: MovementStore,
{
    pub fn new(
        balances: B,
        movements: M,
        locks: Arc<LockMap>,
        audit: Arc<dyn AuditRecorder>,
    ) -> Self {
        Self {
            balances,
            movements,
            locks,
            audit,
        }
    }

    pub fn create_receipt(&self, actor: &Actor, draft: ReceiptDraft) -> LedgerResult<Movement> {
        self.create(actor, draft.into_new_movement(actor.user_id))
    }

    pub fn create_delivery(&self, actor: &Actor, draft: DeliveryDraft) -> LedgerResult<Movement> {
        self.create(actor, draft.into_new_movement(actor.user_id))
    }

    pub fn create_transfer(&self, actor: &Actor, draft: TransferDraft) -> LedgerResult<Movement> {
        self.create(actor, draft.into_new_movement(actor.user_id))
    }

    pub fn create_adjustment(
        &self,
        actor: &Actor,
        draft: AdjustmentDraft,
    ) -> LedgerResult<Movement> {
        self.create(actor, draft.into_new_movement(actor.user_id))
    }

    fn create(&self, actor: &Actor, new: NewMovement) -> LedgerResult<Movement> {
        let movement = Movement::create(new)?;
        self.movements.insert(movement.clone())?;
        self.audit.record(
            audit_event(
                actor,
                AuditEntity::StockMovement,
                movement.id,
                AuditAction::Create,
            )
            .with_after(snapshot(&movement)),
        );
        Ok(movement)
    }

    pub fn get(&self, id: MovementId) -> LedgerResult<Movement> {
        self.movements
            .get(&id)?
            .ok_or_else(|| LedgerError::not_found("stock movement"))
    }

    pub fn list(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<Movement>> {
        self.movements.list(filter, pagination)
    }

    /// Moves a movement to `target`, applying stock deltas when it becomes DONE.
    pub async fn transition(
        &self,
        actor: &Actor,
        id: MovementId,
        target: MovementStatus,
    ) -> LedgerResult<Movement> {
        let _guard = self.locks.acquire(id).await?;
        let mut movement = self.get(id)?;

        // A repeated DONE request is acknowledged without re-applying deltas.
        if movement.status == MovementStatus::Done && target == MovementStatus::Done {
            return Ok(movement);
        }
        movement.ensure_transition(target)?;

        let before = snapshot(&movement);
        if target == MovementStatus::Done {
            let operations = movement.balance_operations()?;
            self.balances.apply(&operations).await?;
        }
        movement.transition(target, Utc::now())?;
        self.movements.update(movement.clone())?;

        self.audit.record(
            audit_event(
                actor,
                AuditEntity::StockMovement,
                movement.id,
                AuditAction::Update,
            )
            .with_before(before)
            .with_after(snapshot(&movement)),
        );
        Ok(movement)
    }

    /// Records picked quantities against the movement's lines.
    pub async fn confirm_pick(
        &self,
        actor: &Actor,
        id: MovementId,
        picks: &[PickedLine],
    ) -> LedgerResult<Movement> {
        let _guard = self.locks.acquire(id).await?;
        let mut movement = self.get(id)?;

        let before = snapshot(&movement);
        movement.record_picks(picks)?;
        self.movements.update(movement.clone())?;

        self.audit.record(
            audit_event(
                actor,
                AuditEntity::StockMovement,
                movement.id,
                AuditAction::Update,
            )
            .with_before(before)
            .with_after(snapshot(&movement)),
        );
        Ok(movement)
    }

    /// Confirms every line and finishes the movement in one step.
    ///
    /// Only READY movements can be completed; completing a DONE movement is
    /// acknowledged without re-applying deltas.
    pub async fn complete(&self, actor: &Actor, id: MovementId) -> LedgerResult<Movement> {
        let _guard = self.locks.acquire(id).await?;
        let mut movement = self.get(id)?;

        if movement.status == MovementStatus::Done {
            return Ok(movement);
        }
        movement.ensure_transition(MovementStatus::Done)?;

        let before = snapshot(&movement);
        movement.confirm_all_lines();
        let operations = movement.balance_operations()?;
        self.balances.apply(&operations).await?;
        movement.transition(MovementStatus::Done, Utc::now())?;
        self.movements.update(movement.clone())?;

        self.audit.record(
            audit_event(
                actor,
                AuditEntity::StockMovement,
                movement.id,
                AuditAction::Complete,
            )
            .with_before(before)
            .with_after(snapshot(&movement)),
        );
        Ok(movement)
    }
}
