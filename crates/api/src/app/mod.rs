//! HTTP API application wiring (Axum router + service wiring).
//!
//! If you're new to Rust, this folder is structured like:
//! - `services.rs`: storage wiring (balance/movement/count stores, lock map, audit)
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app() -> Router {
    let services = Arc::new(services::build_services().await);

    // Ledger routes: resolve the acting user before any handler runs.
    let ledger = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::actor_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(ledger)
        .layer(ServiceBuilder::new())
}
