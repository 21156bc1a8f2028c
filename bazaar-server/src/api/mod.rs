//! HTTP API for bazaar-server
//!
//! - `/health`: public
//! - `/api/buyer/*`: bearer token with the buyer role
//! - `/api/seller/*`: bearer token with the seller role
//! - `/api/admin/*`: bearer token with the admin role

pub mod admin;
pub mod buyer;
pub mod health;
pub mod seller;

use axum::routing::get;
use axum::{Json, Router, middleware as axum_middleware};
use http::{HeaderName, HeaderValue};
use shared::error::{ApiResponse, AppError};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::middleware::logging_middleware;
use crate::state::AppState;

/// Handler result: success envelope or error envelope
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// All routes with their auth layers, no global middleware
pub fn build_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/buyer", buyer::router(state))
        .nest("/api/seller", seller::router(state))
        .nest("/api/admin", admin::router(state))
}

/// Fully configured application, used by the server and by route tests
pub fn build_app(state: AppState) -> Router {
    build_router(&state)
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Request logging
        .layer(axum_middleware::from_fn(logging_middleware))
        // Trace - Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
        // Propagate request ID to response
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        // Request ID - outermost, so every inner layer sees it
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        .with_state(state)
}
