//! Application services (workflow orchestration).
//!
//! The services compose the domain types from `stockyard-ledger` with the
//! stores in this crate. Route handlers stay thin: they parse a request,
//! resolve the acting user, and call exactly one service method.

mod counts;
mod movements;

pub use counts::{CountDraft, CountLineUpdate, CountService, ReconcileOutcome};
pub use movements::{
    AdjustmentDraft, DeliveryDraft, MovementService, ReceiptDraft, TransferDraft,
};

use uuid::Uuid;

use stockyard_audit::{AuditAction, AuditEntity, AuditEvent};
use stockyard_core::UserId;

/// The user a request is acting as, resolved by the caller.
///
/// The ledger does not authenticate anyone; it records who asked for a
/// mutation and from where, and stamps both into the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Option<String>,
    pub ip_address: Option<String>,
}

impl Actor {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            role: None,
            ip_address: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }
}

/// Builds an audit event carrying the actor's identity and source address.
pub(crate) fn audit_event(
    actor: &Actor,
    entity: AuditEntity,
    entity_id: impl Into<Uuid>,
    action: AuditAction,
) -> AuditEvent {
    let event = AuditEvent::new(actor.user_id, entity, entity_id, action);
    match &actor.ip_address {
        Some(ip) => event.with_ip_address(ip.clone()),
        None => event,
    }
}
