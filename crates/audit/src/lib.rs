//! `stockyard-audit`
//!
//! **Responsibility:** the audit trail boundary.
//!
//! The ledger emits before/after snapshots of every mutation to an
//! [`AuditRecorder`]; the durable audit store is an external collaborator.
//! This crate is intentionally **not** part of the domain model:
//! - recording is fire-and-forget and never fails the audited operation,
//! - nothing in the ledger reads audit events back.

pub mod event;
pub mod recorder;

pub use event::{snapshot, AuditAction, AuditEntity, AuditEvent};
pub use recorder::{AuditRecorder, InMemoryAuditRecorder, TracingAuditRecorder};
