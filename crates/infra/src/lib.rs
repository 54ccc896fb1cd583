//! Infrastructure layer: balance/movement/count stores, per-entity locking,
//! and the workflow services that tie them together.

pub mod balance_store;
pub mod count_store;
pub mod lock_map;
pub mod movement_store;
pub mod query;
pub mod services;
