use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockyard_core::UserId;

/// What happened to the entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Complete,
}

/// Which kind of entity the event refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEntity {
    StockMovement,
    InventoryCount,
    InventoryCountLine,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::StockMovement => "StockMovement",
            AuditEntity::InventoryCount => "InventoryCount",
            AuditEntity::InventoryCountLine => "InventoryCountLine",
        }
    }
}

impl core::fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit trail entry: who did what to which entity, with JSON snapshots
/// of the state before and after.
///
/// This is an operational record, not a domain event; nothing in the ledger
/// replays it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub user_id: UserId,
    pub entity: AuditEntity,
    pub entity_id: Uuid,
    pub action: AuditAction,
    pub before: Option<JsonValue>,
    pub after: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        user_id: UserId,
        entity: AuditEntity,
        entity_id: impl Into<Uuid>,
        action: AuditAction,
    ) -> Self {
        Self {
            user_id,
            entity,
            entity_id: entity_id.into(),
            action,
            before: None,
            after: None,
            ip_address: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_before(mut self, before: JsonValue) -> Self {
        self.before = Some(before);
        self
    }

    pub fn with_after(mut self, after: JsonValue) -> Self {
        self.after = Some(after);
        self
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }
}

/// Serialize a snapshot for an audit event.
///
/// Audit is best-effort: a value that fails to serialize becomes `null`
/// rather than failing the operation being audited.
pub fn snapshot<T: Serialize>(value: &T) -> JsonValue {
    serde_json::to_value(value).unwrap_or(JsonValue::Null)
}
