use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use stockyard_core::{CountId, CountLineId};
use stockyard_infra::services::{CountDraft, CountLineUpdate};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_count).get(list_counts))
        .route("/:id", get(get_count))
        .route("/:id/lines/:line_id", put(update_line))
        .route("/:id/reconcile", post(reconcile))
}

pub async fn create_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<CountDraft>,
) -> axum::response::Response {
    let count = match services.create_count(actor.actor(), body) {
        Ok(c) => c,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    (StatusCode::CREATED, Json(count)).into_response()
}

pub async fn list_counts(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListCountsQuery>,
) -> axum::response::Response {
    match services.list_counts(&query.filter(), &query.pagination()) {
        Ok(page) => Json(dto::page_to_json(page)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_count(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CountId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get_count(id) {
        Ok(c) => Json(c).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_line(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path((id, line_id)): Path<(String, String)>,
    Json(body): Json<CountLineUpdate>,
) -> axum::response::Response {
    let count_id: CountId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let line_id: CountLineId = match errors::parse_id(&line_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .update_count_line(actor.actor(), count_id, line_id, body)
        .await
    {
        Ok(line) => Json(line).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn reconcile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CountId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.reconcile_count(actor.actor(), id).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
