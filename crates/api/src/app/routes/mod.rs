use axum::{routing::get, Router};

pub mod balances;
pub mod counts;
pub mod movements;
pub mod system;

/// Router for all ledger endpoints (actor middleware applies).
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/movements", movements::router())
        .nest("/counts", counts::router())
        .nest("/balances", balances::router())
}
