use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::errors;
use crate::context::ActorContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Echo the identity resolved from the request headers.
pub async fn whoami(actor: Option<Extension<ActorContext>>) -> axum::response::Response {
    let Some(Extension(actor)) = actor else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "missing_user",
            "x-user-id header is required",
        );
    };

    Json(serde_json::json!({
        "user_id": actor.user_id(),
        "role": actor.actor().role,
        "ip_address": actor.actor().ip_address,
    }))
    .into_response()
}
