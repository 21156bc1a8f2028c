//! AppError and the response envelope

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Error reported to API callers: a stable code, a message and optional
/// structured details such as `product_id` or `available`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Error carrying the default message of its code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn too_many_requests() -> Self {
        Self::new(ErrorCode::RateLimited)
    }

    /// Caller holds a different role than the route expects
    pub fn role_required(role: &str) -> Self {
        Self::with_message(ErrorCode::RoleRequired, format!("{role} role is required"))
            .with_detail("role", role)
    }
}

/// Envelope for every API response
///
/// Success: `{code: 0, message, data}`.
/// Failure: `{code, message, details?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::success_with_message("OK", data)
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            code: Some(ErrorCode::Success.code()),
            message: message.into(),
            data: Some(data),
            details: None,
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload
    pub fn ok() -> Self {
        Self {
            code: Some(ErrorCode::Success.code()),
            message: "OK".to_string(),
            data: None,
            details: None,
        }
    }

    pub fn error(err: &AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message.clone(),
            data: None,
            details: err.details.clone(),
        }
    }
}

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::<()>::error(&self);

        if self.code.category().is_system() {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_custom_messages() {
        let err = AppError::new(ErrorCode::OrderNotCancellable);
        assert_eq!(err.message, ErrorCode::OrderNotCancellable.message());
        assert!(err.details.is_none());

        let err = AppError::with_message(ErrorCode::OrderNotFound, "Order 42 not found");
        assert_eq!(err.to_string(), "Order 42 not found");
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_details_accumulate() {
        let err = AppError::with_message(ErrorCode::InsufficientStock, "Only 3 items available")
            .with_detail("product_id", 42)
            .with_detail("available", 3);
        let details = err.details.unwrap();
        assert_eq!(details["product_id"], 42);
        assert_eq!(details["available"], 3);
    }

    #[test]
    fn test_role_required_names_the_role() {
        let err = AppError::role_required("seller");
        assert_eq!(err.code, ErrorCode::RoleRequired);
        assert_eq!(err.message, "seller role is required");
        assert_eq!(err.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::too_many_requests().http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_envelope_shapes() {
        let json = serde_json::to_value(ApiResponse::success_with_message("Orders placed", 2))
            .unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["message"], "Orders placed");
        assert_eq!(json["data"], 2);
        assert!(json.get("details").is_none());

        let json = serde_json::to_value(ApiResponse::<()>::ok()).unwrap();
        assert!(json.get("data").is_none());

        let err = AppError::new(ErrorCode::PayoutNothingEligible).with_detail("seller_id", 7);
        let json = serde_json::to_value(ApiResponse::<()>::error(&err)).unwrap();
        assert_eq!(json["code"], 5002);
        assert_eq!(json["details"]["seller_id"], 7);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_envelope_round_trip_for_clients() {
        let json = r#"{"code":6003,"message":"Only 3 items available","details":{"available":3}}"#;
        let response: ApiResponse<()> = serde_json::from_str(json).unwrap();
        assert_eq!(response.code, Some(6003));
        assert!(response.data.is_none());
        assert_eq!(response.details.unwrap()["available"], 3);
    }
}
