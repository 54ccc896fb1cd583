//! Storage wiring behind the HTTP handlers.
//!
//! One `AppServices` value is built at startup and shared through an
//! `Extension`. The in-memory wiring is the default; setting
//! `USE_PERSISTENT_STORES=true` with a `DATABASE_URL` keeps stock balances in
//! Postgres while movements and counts stay in memory.

use std::{sync::Arc, time::Duration};

use sqlx::PgPool;

use stockyard_audit::{AuditRecorder, TracingAuditRecorder};
use stockyard_core::{CountId, CountLineId, LedgerResult, MovementId};
use stockyard_infra::{
    balance_store::{BalanceStore, InMemoryBalanceStore, PostgresBalanceStore},
    count_store::InMemoryCountStore,
    lock_map::{LockMap, DEFAULT_LOCK_TIMEOUT},
    movement_store::InMemoryMovementStore,
    query::{BalanceFilter, CountFilter, MovementFilter, Page, Pagination},
    services::{
        Actor, AdjustmentDraft, CountDraft, CountLineUpdate, CountService, DeliveryDraft,
        MovementService, ReceiptDraft, ReconcileOutcome, TransferDraft,
    },
};
use stockyard_ledger::{
    CountLine, InventoryCount, Movement, MovementStatus, PickedLine, StockBalance,
};

// Concrete service types for the in-memory wiring
type InMemoryMovements = MovementService<Arc<InMemoryBalanceStore>, Arc<InMemoryMovementStore>>;
type InMemoryCounts = CountService<Arc<InMemoryBalanceStore>, Arc<InMemoryCountStore>>;

// Concrete service types for the persistent wiring
type PersistentMovements = MovementService<Arc<PostgresBalanceStore>, Arc<InMemoryMovementStore>>;
type PersistentCounts = CountService<Arc<PostgresBalanceStore>, Arc<InMemoryCountStore>>;

#[derive(Clone)]
pub enum AppServices {
    InMemory {
        movements: Arc<InMemoryMovements>,
        counts: Arc<InMemoryCounts>,
        balances: Arc<InMemoryBalanceStore>,
    },
    Persistent {
        movements: Arc<PersistentMovements>,
        counts: Arc<PersistentCounts>,
        balances: Arc<PostgresBalanceStore>,
    },
}

pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        match build_persistent_services() {
            Ok(services) => return services,
            Err(reason) => {
                tracing::warn!("USE_PERSISTENT_STORES=true but {reason}; falling back to in-memory stores");
            }
        }
    }

    build_in_memory_services()
}

fn build_in_memory_services() -> AppServices {
    let lock_timeout = lock_timeout_from_env();

    // In-memory wiring (dev/test): both services share one balance store, one
    // lock map, and one audit recorder.
    let balances = Arc::new(InMemoryBalanceStore::with_lock_timeout(lock_timeout));
    let movement_store = Arc::new(InMemoryMovementStore::new());
    let count_store = Arc::new(InMemoryCountStore::new());
    let locks = Arc::new(LockMap::new(lock_timeout));
    let audit: Arc<dyn AuditRecorder> = Arc::new(TracingAuditRecorder::new());

    let movements = Arc::new(MovementService::new(
        balances.clone(),
        movement_store,
        locks.clone(),
        audit.clone(),
    ));
    let counts = Arc::new(CountService::new(
        balances.clone(),
        count_store,
        locks,
        audit,
    ));

    AppServices::InMemory {
        movements,
        counts,
        balances,
    }
}

fn build_persistent_services() -> Result<AppServices, String> {
    let url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL is not set".to_string())?;

    // Lazy pool: connections open on first use, so startup does not need a
    // reachable database.
    let pool = PgPool::connect_lazy(&url).map_err(|e| format!("DATABASE_URL is unusable: {e}"))?;

    let lock_timeout = lock_timeout_from_env();
    let balances = Arc::new(PostgresBalanceStore::with_lock_timeout(pool, lock_timeout));
    let movement_store = Arc::new(InMemoryMovementStore::new());
    let count_store = Arc::new(InMemoryCountStore::new());
    let locks = Arc::new(LockMap::new(lock_timeout));
    let audit: Arc<dyn AuditRecorder> = Arc::new(TracingAuditRecorder::new());

    let movements = Arc::new(MovementService::new(
        balances.clone(),
        movement_store,
        locks.clone(),
        audit.clone(),
    ));
    let counts = Arc::new(CountService::new(
        balances.clone(),
        count_store,
        locks,
        audit,
    ));

    Ok(AppServices::Persistent {
        movements,
        counts,
        balances,
    })
}

fn lock_timeout_from_env() -> Duration {
    match std::env::var("LOCK_TIMEOUT_MS") {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                tracing::warn!("LOCK_TIMEOUT_MS={raw} is not a number; using the default");
                DEFAULT_LOCK_TIMEOUT
            }
        },
        Err(_) => DEFAULT_LOCK_TIMEOUT,
    }
}

impl AppServices {
    pub fn create_receipt(&self, actor: &Actor, draft: ReceiptDraft) -> LedgerResult<Movement> {
        match self {
            AppServices::InMemory { movements, .. } => movements.create_receipt(actor, draft),
            AppServices::Persistent { movements, .. } => movements.create_receipt(actor, draft),
        }
    }

    pub fn create_delivery(&self, actor: &Actor, draft: DeliveryDraft) -> LedgerResult<Movement> {
        match self {
            AppServices::InMemory { movements, .. } => movements.create_delivery(actor, draft),
            AppServices::Persistent { movements, .. } => movements.create_delivery(actor, draft),
        }
    }

    pub fn create_transfer(&self, actor: &Actor, draft: TransferDraft) -> LedgerResult<Movement> {
        match self {
            AppServices::InMemory { movements, .. } => movements.create_transfer(actor, draft),
            AppServices::Persistent { movements, .. } => movements.create_transfer(actor, draft),
        }
    }

    pub fn create_adjustment(
        &self,
        actor: &Actor,
        draft: AdjustmentDraft,
    ) -> LedgerResult<Movement> {
        match self {
            AppServices::InMemory { movements, .. } => movements.create_adjustment(actor, draft),
            AppServices::Persistent { movements, .. } => movements.create_adjustment(actor, draft),
        }
    }

    pub fn get_movement(&self, id: MovementId) -> LedgerResult<Movement> {
        match self {
            AppServices::InMemory { movements, .. } => movements.get(id),
            AppServices::Persistent { movements, .. } => movements.get(id),
        }
    }

    pub fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<Movement>> {
        match self {
            AppServices::InMemory { movements, .. } => movements.list(filter, pagination),
            AppServices::Persistent { movements, .. } => movements.list(filter, pagination),
        }
    }

    pub async fn transition_movement(
        &self,
        actor: &Actor,
        id: MovementId,
        target: MovementStatus,
    ) -> LedgerResult<Movement> {
        match self {
            AppServices::InMemory { movements, .. } => {
                movements.transition(actor, id, target).await
            }
            AppServices::Persistent { movements, .. } => {
                movements.transition(actor, id, target).await
            }
        }
    }

    pub async fn confirm_pick(
        &self,
        actor: &Actor,
        id: MovementId,
        picks: &[PickedLine],
    ) -> LedgerResult<Movement> {
        match self {
            AppServices::InMemory { movements, .. } => {
                movements.confirm_pick(actor, id, picks).await
            }
            AppServices::Persistent { movements, .. } => {
                movements.confirm_pick(actor, id, picks).await
            }
        }
    }

    pub async fn complete_movement(&self, actor: &Actor, id: MovementId) -> LedgerResult<Movement> {
        match self {
            AppServices::InMemory { movements, .. } => movements.complete(actor, id).await,
            AppServices::Persistent { movements, .. } => movements.complete(actor, id).await,
        }
    }

    pub fn create_count(&self, actor: &Actor, draft: CountDraft) -> LedgerResult<InventoryCount> {
        match self {
            AppServices::InMemory { counts, .. } => counts.create(actor, draft),
            AppServices::Persistent { counts, .. } => counts.create(actor, draft),
        }
    }

    pub fn get_count(&self, id: CountId) -> LedgerResult<InventoryCount> {
        match self {
            AppServices::InMemory { counts, .. } => counts.get(id),
            AppServices::Persistent { counts, .. } => counts.get(id),
        }
    }

    pub fn list_counts(
        &self,
        filter: &CountFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<InventoryCount>> {
        match self {
            AppServices::InMemory { counts, .. } => counts.list(filter, pagination),
            AppServices::Persistent { counts, .. } => counts.list(filter, pagination),
        }
    }

    pub async fn update_count_line(
        &self,
        actor: &Actor,
        count_id: CountId,
        line_id: CountLineId,
        update: CountLineUpdate,
    ) -> LedgerResult<CountLine> {
        match self {
            AppServices::InMemory { counts, .. } => {
                counts.update_line(actor, count_id, line_id, update).await
            }
            AppServices::Persistent { counts, .. } => {
                counts.update_line(actor, count_id, line_id, update).await
            }
        }
    }

    pub async fn reconcile_count(
        &self,
        actor: &Actor,
        count_id: CountId,
    ) -> LedgerResult<ReconcileOutcome> {
        match self {
            AppServices::InMemory { counts, .. } => counts.reconcile(actor, count_id).await,
            AppServices::Persistent { counts, .. } => counts.reconcile(actor, count_id).await,
        }
    }

    pub async fn list_balances(
        &self,
        filter: &BalanceFilter,
        pagination: &Pagination,
    ) -> LedgerResult<Page<StockBalance>> {
        match self {
            AppServices::InMemory { balances, .. } => balances.list(filter, pagination).await,
            AppServices::Persistent { balances, .. } => balances.list(filter, pagination).await,
        }
    }
}
