//! Ledger error model.

use thiserror::Error;

use crate::id::{LocationId, ProductId};

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Error taxonomy shared by the domain, storage, and service layers.
///
/// Callers branch on these variants, so keep them stable: validation and
/// lifecycle failures are deterministic, `Busy`/`Conflict`/`Storage` are the
/// infrastructure outcomes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A request failed validation (missing or malformed fields).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced movement, count, line, product, or location does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A requested status change is not an edge of the lifecycle graph.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// A debit would take a balance below zero.
    #[error(
        "insufficient stock for product {product_id} at location {location_id}: \
         requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        location_id: LocationId,
        requested: i64,
        available: i64,
    },

    /// The count has already been reconciled; reconciliation happens at most once.
    #[error("count already reconciled")]
    AlreadyReconciled,

    /// Concurrent modification detected (e.g. duplicate key, stale write).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A lock or storage resource could not be acquired within the deadline.
    #[error("busy: {0}")]
    Busy(String),

    /// Underlying storage failure (connection, query, serialization).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn insufficient_stock(
        product_id: ProductId,
        location_id: LocationId,
        requested: i64,
        available: i64,
    ) -> Self {
        Self::InsufficientStock {
            product_id,
            location_id,
            requested,
            available,
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
