//! Count workflows: sheet creation, line capture, reconciliation.
//!
//! ## Reconcile Flow
//!
//! ```text
//! Request
//!   ↓
//! 1. Take the per-count lock (bounded wait, `Busy` on timeout)
//!   ↓
//! 2. Load the count and reject anything already reconciled
//!   ↓
//! 3. Set every counted, variance-carrying balance as one atomic batch
//!   ↓
//! 4. Mark the count reconciled and total its absolute variance
//!   ↓
//! 5. Emit the audit event (best effort, never fails the request)
//! ```
//!
//! The persisted RECONCILED status is the exactly-once guard: a second
//! reconcile request fails with `AlreadyReconciled` before any balance is
//! touched. A failed balance batch leaves the count open for retry.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use stockyard_audit::{snapshot, AuditAction, AuditEntity, AuditRecorder};
use stockyard_core::{CountId, CountLineId, LedgerError, LedgerResult, LocationId, UserId};
use stockyard_ledger::{CountAdjustment, CountLine, InventoryCount, NewCount, NewCountLine};

use super::{audit_event, Actor};
use crate::balance_store::BalanceStore;
use crate::count_store::CountStore;
use crate::lock_map::LockMap;
use crate::query::{CountFilter, Page, Pagination};

/// Payload for opening a count sheet at one location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountDraft {
    pub location_id: Option<LocationId>,
    pub assigned_to: Option<UserId>,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<NewCountLine>,
}

/// Payload for capturing one counted quantity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CountLineUpdate {
    pub counted_quantity: i64,
}

/// What a reconciliation did: the closed count plus the applied variances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub count: InventoryCount,
    pub adjustments: Vec<CountAdjustment>,
}

/// Orchestrates count lifecycles over a balance store and count store.
pub struct CountService<B, C> {
    balances: B,
    counts: C,
    locks: Arc<LockMap>,
    audit: Arc<dyn AuditRecorder>,
}

impl<B, C> CountService<B, C>
where
    B: BalanceStore,
    C: CountStore,
{
    pub fn new(balances: B, counts: C, locks: Arc<LockMap>, audit: Arc<dyn AuditRecorder>) -> Self {
        Self {
            balances,
            counts,
            locks,
            audit,
        }
    }

    pub fn create(&self, actor: &Actor, draft: CountDraft) -> LedgerResult<InventoryCount> {
        let location_id = draft
            .location_id
            .ok_or_else(|| LedgerError::validation("location_id is required"))?;
        let count = InventoryCount::create(NewCount {
            location_id,
            created_by: actor.user_id,
            assigned_to: draft.assigned_to,
            notes: draft.notes,
            lines: draft.lines,
        })?;
        self.counts.insert(count.clone())?;

        self.audit.record(
            audit_event(
                actor,
                AuditEntity::InventoryCount,
                count.id,
                AuditAction::Create,
            )
            .with_after(snapshot(&count)),
        );
        Ok(count)
    }

    pub fn get(&self, id: CountId) -> LedgerResult<InventoryCount> {
        self.counts
            .get(&id)?
            .ok_or_else(|| LedgerError::not_found("inventory count"))
    }

    pub fn list(
        &self,
        filter: &CountFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<InventoryCount>> {
        self.counts.list(filter, pagination)
    }

    /// Records a counted quantity against one line of an open count.
    pub async fn update_line(
        &self,
        actor: &Actor,
        count_id: CountId,
        line_id: CountLineId,
        update: CountLineUpdate,
    ) -> LedgerResult<CountLine> {
        let _guard = self.locks.acquire(count_id).await?;
        let mut count = self.get(count_id)?;

        let before = count
            .lines
            .iter()
            .find(|line| line.id == line_id)
            .map(snapshot);
        count.record_count(line_id, update.counted_quantity)?;
        let line = count
            .lines
            .iter()
            .find(|line| line.id == line_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("count line"))?;
        self.counts.update(count)?;

        let mut event = audit_event(
            actor,
            AuditEntity::InventoryCountLine,
            line_id,
            AuditAction::Update,
        )
        .with_after(snapshot(&line));
        if let Some(before) = before {
            event = event.with_before(before);
        }
        self.audit.record(event);
        Ok(line)
    }

    /// Closes the count, overwriting balances with counted quantities.
    ///
    /// Only lines that were counted and disagree with their expectation
    /// produce balance writes; matching lines and untouched lines are left
    /// alone.
    pub async fn reconcile(&self, actor: &Actor, count_id: CountId) -> LedgerResult<ReconcileOutcome> {
        let _guard = self.locks.acquire(count_id).await?;
        let mut count = self.get(count_id)?;
        count.ensure_open()?;

        let before = snapshot(&count);
        let operations = count.reconciliation_operations();
        self.balances.apply(&operations).await?;
        count.mark_reconciled(Utc::now());
        let adjustments = count.adjustments();
        self.counts.update(count.clone())?;

        self.audit.record(
            audit_event(
                actor,
                AuditEntity::InventoryCount,
                count.id,
                AuditAction::Complete,
            )
            .with_before(before)
            .with_after(snapshot(&count)),
        );
        Ok(ReconcileOutcome { count, adjustments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockyard_audit::InMemoryAuditRecorder;
    use stockyard_core::ProductId;
    use stockyard_ledger::{BalanceKey, CountStatus};
    use uuid::Uuid;

    use crate::balance_store::InMemoryBalanceStore;
    use crate::count_store::InMemoryCountStore;

    type TestService = CountService<Arc<InMemoryBalanceStore>, Arc<InMemoryCountStore>>;

    fn setup() -> (TestService, Arc<InMemoryBalanceStore>, Arc<InMemoryAuditRecorder>) {
        let balances = Arc::new(InMemoryBalanceStore::new());
        let counts = Arc::new(InMemoryCountStore::new());
        let audit = Arc::new(InMemoryAuditRecorder::new());
        let service = CountService::new(
            balances.clone(),
            counts.clone(),
            Arc::new(LockMap::default()),
            audit.clone(),
        );
        (service, balances, audit)
    }

    fn actor() -> Actor {
        Actor::new(UserId::new()).with_ip_address("10.0.0.9")
    }

    fn draft(location: LocationId, expectations: &[(ProductId, i64)]) -> CountDraft {
        CountDraft {
            location_id: Some(location),
            assigned_to: None,
            notes: None,
            lines: expectations
                .iter()
                .map(|(product_id, expected_quantity)| NewCountLine {
                    product_id: *product_id,
                    expected_quantity: *expected_quantity,
                })
                .collect(),
        }
    }

    #[test]
    fn create_opens_a_draft_sheet() {
        let (service, _, _) = setup();
        let count = service
            .create(&actor(), draft(LocationId::new(), &[(ProductId::new(), 10)]))
            .unwrap();

        assert_eq!(count.status, CountStatus::Draft);
        assert!(count.reference_no.as_str().starts_with("CNT-"));
        assert_eq!(count.lines.len(), 1);
    }

    #[test]
    fn create_without_location_is_rejected() {
        let (service, _, _) = setup();
        let mut empty = draft(LocationId::new(), &[]);
        empty.location_id = None;

        match service.create(&actor(), empty) {
            Err(LedgerError::Validation(msg)) if msg.contains("location_id") => {}
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reconcile_overwrites_balances_with_counted_quantities() {
        let (service, balances, _) = setup();
        let actor = actor();
        let location = LocationId::new();
        let product = ProductId::new();
        balances.set(BalanceKey::new(product, location), 10).await.unwrap();

        let count = service
            .create(&actor, draft(location, &[(product, 10)]))
            .unwrap();
        service
            .update_line(
                &actor,
                count.id,
                count.lines[0].id,
                CountLineUpdate { counted_quantity: 7 },
            )
            .await
            .unwrap();
        let outcome = service.reconcile(&actor, count.id).await.unwrap();

        assert_eq!(outcome.count.status, CountStatus::Reconciled);
        assert_eq!(outcome.count.total_variance, 3);
        assert!(outcome.count.reconciled_at.is_some());
        assert_eq!(outcome.adjustments.len(), 1);
        assert_eq!(outcome.adjustments[0].variance, -3);

        let balance = balances
            .get(&BalanceKey::new(product, location))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.quantity, 7);
    }

    #[tokio::test]
    async fn reconcile_creates_rows_for_found_stock() {
        let (service, balances, _) = setup();
        let actor = actor();
        let location = LocationId::new();
        let product = ProductId::new();

        // Expected zero, found five: the pair has no balance row yet.
        let count = service.create(&actor, draft(location, &[(product, 0)])).unwrap();
        service
            .update_line(
                &actor,
                count.id,
                count.lines[0].id,
                CountLineUpdate { counted_quantity: 5 },
            )
            .await
            .unwrap();
        service.reconcile(&actor, count.id).await.unwrap();

        let balance = balances
            .get(&BalanceKey::new(product, location))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.quantity, 5);
    }

    #[tokio::test]
    async fn matching_counts_leave_balances_untouched() {
        let (service, balances, _) = setup();
        let actor = actor();
        let location = LocationId::new();
        let product = ProductId::new();

        let count = service.create(&actor, draft(location, &[(product, 4)])).unwrap();
        service
            .update_line(
                &actor,
                count.id,
                count.lines[0].id,
                CountLineUpdate { counted_quantity: 4 },
            )
            .await
            .unwrap();
        let outcome = service.reconcile(&actor, count.id).await.unwrap();

        assert_eq!(outcome.adjustments.len(), 0);
        assert_eq!(outcome.count.total_variance, 0);
        // No write happened, so the pair still has no row.
        assert!(balances
            .get(&BalanceKey::new(product, location))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn second_reconcile_is_rejected() {
        let (service, _, _) = setup();
        let actor = actor();

        let count = service
            .create(&actor, draft(LocationId::new(), &[]))
            .unwrap();
        service.reconcile(&actor, count.id).await.unwrap();

        match service.reconcile(&actor, count.id).await {
            Err(LedgerError::AlreadyReconciled) => {}
            other => panic!("expected AlreadyReconciled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn line_updates_after_reconcile_are_rejected() {
        let (service, _, _) = setup();
        let actor = actor();
        let product = ProductId::new();

        let count = service
            .create(&actor, draft(LocationId::new(), &[(product, 2)]))
            .unwrap();
        let line_id = count.lines[0].id;
        service.reconcile(&actor, count.id).await.unwrap();

        match service
            .update_line(&actor, count.id, line_id, CountLineUpdate { counted_quantity: 3 })
            .await
        {
            Err(LedgerError::AlreadyReconciled) => {}
            other => panic!("expected AlreadyReconciled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn total_variance_sums_absolute_values() {
        let (service, balances, _) = setup();
        let actor = actor();
        let location = LocationId::new();
        let over = ProductId::new();
        let short = ProductId::new();
        balances.set(BalanceKey::new(short, location), 10).await.unwrap();

        let count = service
            .create(&actor, draft(location, &[(over, 10), (short, 10)]))
            .unwrap();
        service
            .update_line(
                &actor,
                count.id,
                count.lines[0].id,
                CountLineUpdate { counted_quantity: 13 },
            )
            .await
            .unwrap();
        service
            .update_line(
                &actor,
                count.id,
                count.lines[1].id,
                CountLineUpdate { counted_quantity: 6 },
            )
            .await
            .unwrap();
        let outcome = service.reconcile(&actor, count.id).await.unwrap();

        assert_eq!(outcome.count.total_variance, 7);
        assert_eq!(outcome.adjustments.len(), 2);
    }

    #[tokio::test]
    async fn line_update_and_reconcile_emit_audit_events() {
        let (service, _, audit) = setup();
        let actor = actor();
        let product = ProductId::new();

        let count = service
            .create(&actor, draft(LocationId::new(), &[(product, 1)]))
            .unwrap();
        let line_id = count.lines[0].id;
        service
            .update_line(&actor, count.id, line_id, CountLineUpdate { counted_quantity: 2 })
            .await
            .unwrap();
        service.reconcile(&actor, count.id).await.unwrap();

        let events = audit.all();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].entity, AuditEntity::InventoryCount);
        assert_eq!(events[0].action, AuditAction::Create);
        assert_eq!(events[1].entity, AuditEntity::InventoryCountLine);
        assert_eq!(events[1].action, AuditAction::Update);
        assert_eq!(events[1].entity_id, Uuid::from(line_id));
        assert_eq!(events[2].entity, AuditEntity::InventoryCount);
        assert_eq!(events[2].action, AuditAction::Complete);
        assert!(events[2].before.is_some());
    }

    #[tokio::test]
    async fn unknown_count_is_not_found() {
        let (service, _, _) = setup();

        match service.reconcile(&actor(), CountId::new()).await {
            Err(LedgerError::NotFound(entity)) if entity == "inventory count" => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
