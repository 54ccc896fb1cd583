//! `stockyard-ledger`: the pure stock-ledger domain.
//!
//! Movements, counts, and balance operations with no IO: validation, the
//! status lifecycle graph, per-type balance effects, and variance math.
//! Storage and orchestration live in `stockyard-infra`.

pub mod balance;
pub mod count;
pub mod movement;

pub use balance::{AppliedOperation, BalanceKey, BalanceOperation, StockBalance};
pub use count::{
    CountAdjustment, CountLine, CountLineStatus, CountStatus, InventoryCount, NewCount,
    NewCountLine,
};
pub use movement::{
    LineStatus, Movement, MovementLine, MovementStatus, MovementType, NewMovement,
    NewMovementLine, PickedLine,
};
