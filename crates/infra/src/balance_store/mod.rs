//! Stock balance storage: one non-negative quantity per `(product, location)`.

mod in_memory;
mod postgres;
mod r#trait;

pub use in_memory::InMemoryBalanceStore;
pub use postgres::PostgresBalanceStore;
pub use r#trait::BalanceStore;
