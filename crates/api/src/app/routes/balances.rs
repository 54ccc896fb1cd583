use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(list_balances))
}

pub async fn list_balances(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListBalancesQuery>,
) -> axum::response::Response {
    match services
        .list_balances(&query.filter(), &query.pagination())
        .await
    {
        Ok(page) => Json(dto::page_to_json(page)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
