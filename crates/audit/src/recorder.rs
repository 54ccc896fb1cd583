use std::sync::{Arc, Mutex};

use crate::event::AuditEvent;

/// Sink for audit events.
///
/// `record` is fire-and-forget: implementations swallow their own failures
/// (logging them) so auditing can never fail or block the mutation being
/// audited.
pub trait AuditRecorder: Send + Sync {
    fn record(&self, event: AuditEvent);
}

impl<R> AuditRecorder for Arc<R>
where
    R: AuditRecorder + ?Sized,
{
    fn record(&self, event: AuditEvent) {
        (**self).record(event)
    }
}

/// In-memory recorder for tests and dev wiring.
#[derive(Debug, Default)]
pub struct InMemoryAuditRecorder {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

impl AuditRecorder for InMemoryAuditRecorder {
    fn record(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(_) => tracing::warn!("audit recorder lock poisoned, event dropped"),
        }
    }
}

/// Recorder that forwards events to the tracing pipeline.
///
/// Default production wiring until a durable audit collaborator is attached;
/// entries land in the structured log stream.
#[derive(Debug, Default)]
pub struct TracingAuditRecorder;

impl TracingAuditRecorder {
    pub fn new() -> Self {
        Self
    }
}

impl AuditRecorder for TracingAuditRecorder {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "stockyard::audit",
            user_id = %event.user_id,
            entity = %event.entity,
            entity_id = %event.entity_id,
            action = ?event.action,
            ip_address = event.ip_address.as_deref().unwrap_or("-"),
            "audit event"
        );
    }
}
