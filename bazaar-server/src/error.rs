//! Unified service-layer error type for bazaar-server
//!
//! `ServiceError` bridges the gap between store-layer errors (`StoreError`,
//! `sqlx::Error`) and the API-layer error (`AppError`), so services can use `?`
//! on both.

use shared::error::{AppError, ErrorCode};

use crate::store::StoreError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error
///
/// - `Db`: Database/infrastructure errors (auto-logged, mapped to InternalError)
/// - `App`: Business-rule errors (transparent pass-through to client)
#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error
    Db(BoxError),
    /// Business-rule error (already an AppError with the correct ErrorCode)
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

/// Default mapping of store conflicts; services override where the
/// context calls for a more specific message.
impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(db) => ServiceError::Db(db.into()),
            StoreError::Corrupt(msg) => ServiceError::Db(msg.into()),
            StoreError::NotFound => ServiceError::App(AppError::new(ErrorCode::NotFound)),
            StoreError::InsufficientStock {
                product_id,
                available,
            } => ServiceError::App(
                AppError::with_message(
                    ErrorCode::InsufficientStock,
                    format!("Only {available} items available"),
                )
                .with_detail("product_id", product_id)
                .with_detail("available", available),
            ),
            StoreError::OrderState { order_id, current } => ServiceError::App(
                AppError::with_message(
                    ErrorCode::OrderStatusConflict,
                    format!("Order is already {current}"),
                )
                .with_detail("order_id", order_id)
                .with_detail("status", current.as_str()),
            ),
            StoreError::OrderClaimed => {
                ServiceError::App(AppError::new(ErrorCode::OrderAlreadyClaimed))
            }
            StoreError::PayoutState { payout_id, current } => ServiceError::App(
                AppError::with_message(
                    ErrorCode::PayoutInvalidState,
                    format!("Payout is already {current}"),
                )
                .with_detail("payout_id", payout_id)
                .with_detail("status", current.as_str()),
            ),
            StoreError::InsufficientBalance {
                available,
                required,
            } => ServiceError::App(
                AppError::new(ErrorCode::WalletInsufficientBalance)
                    .with_detail("available", available.to_string())
                    .with_detail("required", required.to_string()),
            ),
            StoreError::KycLocked(kind) => ServiceError::App(
                AppError::with_message(
                    ErrorCode::KycAlreadyVerified,
                    format!("{} details are already verified", kind.as_str().to_uppercase()),
                )
                .with_detail("kind", kind.as_str()),
            ),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;
