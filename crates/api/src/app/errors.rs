use std::str::FromStr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockyard_core::LedgerError;

/// Map a ledger error onto the wire contract.
///
/// | error                 | status | code                 |
/// |-----------------------|--------|----------------------|
/// | `Validation`          | 400    | `validation_error`   |
/// | `InvalidId`           | 400    | `invalid_id`         |
/// | `NotFound`            | 404    | `not_found`          |
/// | `InvalidTransition`   | 422    | `invalid_transition` |
/// | `InsufficientStock`   | 422    | `insufficient_stock` |
/// | `AlreadyReconciled`   | 409    | `already_reconciled` |
/// | `Conflict`            | 409    | `conflict`           |
/// | `Busy`                | 503    | `busy`               |
/// | `Storage`             | 500    | `storage_error`      |
pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        LedgerError::Validation(problems) => {
            // The domain joins individual failures with "; "; the wire
            // contract lists them separately.
            let details: Vec<&str> = problems.split("; ").collect();
            json_error_with_details(
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                json!(details),
            )
        }
        LedgerError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        LedgerError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        LedgerError::InvalidTransition { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition", message)
        }
        LedgerError::InsufficientStock {
            product_id,
            location_id,
            requested,
            available,
        } => json_error_with_details(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_stock",
            message,
            json!({
                "product_id": product_id,
                "location_id": location_id,
                "requested": requested,
                "available": available,
            }),
        ),
        LedgerError::AlreadyReconciled => {
            json_error(StatusCode::CONFLICT, "already_reconciled", message)
        }
        LedgerError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        LedgerError::Busy(_) => json_error(StatusCode::SERVICE_UNAVAILABLE, "busy", message),
        LedgerError::Storage(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn json_error_with_details(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: serde_json::Value,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "details": details,
        })),
    )
        .into_response()
}

/// Parse a path segment into a typed id, or produce the 400 response.
pub fn parse_id<T>(s: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = LedgerError>,
{
    s.parse::<T>().map_err(ledger_error_to_response)
}
