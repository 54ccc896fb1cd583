use axum::{
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};

use stockyard_core::UserId;
use stockyard_infra::services::Actor;

use crate::app::errors::json_error;
use crate::context::ActorContext;

/// Identity headers set by the upstream gateway.
///
/// Authentication happens before requests reach this service; these headers
/// carry the already-verified identity.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Resolves the acting user from identity headers.
///
/// Mutating requests must carry `x-user-id`; reads may be anonymous. A
/// malformed `x-user-id` is rejected on any method.
pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    match resolve_actor(req.headers())? {
        Some(actor) => {
            req.extensions_mut().insert(ActorContext::new(actor));
        }
        None if is_read(req.method()) => {}
        None => {
            return Err(json_error(
                StatusCode::BAD_REQUEST,
                "missing_user",
                format!("{USER_ID_HEADER} header is required"),
            ));
        }
    }

    Ok(next.run(req).await)
}

fn is_read(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn resolve_actor(headers: &HeaderMap) -> Result<Option<Actor>, Response> {
    let Some(raw) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let raw = raw.to_str().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("{USER_ID_HEADER} header is not valid text"),
        )
    })?;

    let user_id: UserId = raw
        .trim()
        .parse()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("{e}")))?;

    let mut actor = Actor::new(user_id);
    if let Some(role) = header_str(headers, USER_ROLE_HEADER) {
        actor = actor.with_role(role);
    }
    if let Some(ip) = client_ip(headers) {
        actor = actor.with_ip_address(ip);
    }

    Ok(Some(actor))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value)
}

/// Client IP as reported by the proxy chain.
///
/// `x-forwarded-for` lists hops comma-separated; the first entry is the
/// original client.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = header_str(headers, FORWARDED_FOR_HEADER) {
        let first = forwarded.split(',').next()?.trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }
    header_str(headers, REAL_IP_HEADER).map(str::to_string)
}
