//! `stockyard-core`: identifiers, errors, and reference numbers.
//!
//! This crate contains the **pure foundations** shared by every layer of the
//! stock ledger (no IO, no storage concerns).

pub mod error;
pub mod id;
pub mod reference;

pub use error::{LedgerError, LedgerResult};
pub use id::{
    BatchId, CountId, CountLineId, LocationId, MovementId, MovementLineId, ProductId, SupplierId,
    UserId,
};
pub use reference::ReferenceNo;
