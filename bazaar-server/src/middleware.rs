//! Request logging middleware

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::auth::Identity;

/// One line per request: request id, method, matched route, caller,
/// status and latency. 5xx logs at error, 4xx at warn.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();

    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    debug!(request_id = %request_id, method = %method, route = %route, "Request started");

    let response = next.run(req).await;

    let latency_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();
    // Auth runs inside this layer, so the caller is only known afterwards
    let caller = response
        .extensions()
        .get::<Identity>()
        .map(|u| format!("{}({})", u.role, u.user_id))
        .unwrap_or_else(|| "anonymous".to_string());

    match status {
        500.. => error!(
            request_id = %request_id, method = %method, route = %route,
            caller = %caller, status, latency_ms, "Request failed"
        ),
        400..=499 => warn!(
            request_id = %request_id, method = %method, route = %route,
            caller = %caller, status, latency_ms, "Request rejected"
        ),
        _ => info!(
            request_id = %request_id, method = %method, route = %route,
            caller = %caller, status, latency_ms, "Request completed"
        ),
    }

    response
}
