use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use stockyard_core::MovementId;
use stockyard_infra::services::{AdjustmentDraft, DeliveryDraft, ReceiptDraft, TransferDraft};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_movements))
        .route("/receipts", post(create_receipt))
        .route("/deliveries", post(create_delivery))
        .route("/transfers", post(create_transfer))
        .route("/adjustments", post(create_adjustment))
        .route("/:id", get(get_movement))
        .route("/:id/status", put(update_status))
        .route("/:id/confirm-pick", post(confirm_pick))
        .route("/:id/complete", post(complete))
}

pub async fn create_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<ReceiptDraft>,
) -> axum::response::Response {
    let movement = match services.create_receipt(actor.actor(), body) {
        Ok(m) => m,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    (StatusCode::CREATED, Json(movement)).into_response()
}

pub async fn create_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<DeliveryDraft>,
) -> axum::response::Response {
    let movement = match services.create_delivery(actor.actor(), body) {
        Ok(m) => m,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    (StatusCode::CREATED, Json(movement)).into_response()
}

pub async fn create_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<TransferDraft>,
) -> axum::response::Response {
    let movement = match services.create_transfer(actor.actor(), body) {
        Ok(m) => m,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    (StatusCode::CREATED, Json(movement)).into_response()
}

pub async fn create_adjustment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<AdjustmentDraft>,
) -> axum::response::Response {
    let movement = match services.create_adjustment(actor.actor(), body) {
        Ok(m) => m,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    (StatusCode::CREATED, Json(movement)).into_response()
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListMovementsQuery>,
) -> axum::response::Response {
    match services.list_movements(&query.filter(), &query.pagination()) {
        Ok(page) => Json(dto::page_to_json(page)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MovementId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get_movement(id) {
        Ok(m) => Json(m).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    let id: MovementId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .transition_movement(actor.actor(), id, body.status)
        .await
    {
        Ok(m) => Json(m).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn confirm_pick(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ConfirmPickRequest>,
) -> axum::response::Response {
    let id: MovementId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .confirm_pick(actor.actor(), id, &body.picked_lines)
        .await
    {
        Ok(m) => Json(m).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn complete(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MovementId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.complete_movement(actor.actor(), id).await {
        Ok(m) => Json(m).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
