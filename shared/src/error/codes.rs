//! Unified error codes for the Bazaar marketplace
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payout, wallet and commission errors
//! - 6xxx: Catalog and cart errors
//! - 7xxx: KYC and seller errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Too many requests from the same caller
    RateLimited = 1005,

    // ==================== 2xxx: Permission ====================
    /// Specific role required
    RoleRequired = 2002,
    /// Admin role required
    AdminRequired = 2003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is not in a cancellable state
    OrderNotCancellable = 4002,
    /// Order changed concurrently (status/version mismatch)
    OrderStatusConflict = 4003,
    /// Checkout contains no items
    OrderEmpty = 4004,
    /// Shipping address not found
    AddressNotFound = 4005,
    /// Order is already covered by a payout request
    OrderAlreadyClaimed = 4006,
    /// Requested status transition is not allowed
    InvalidStatusTransition = 4007,

    // ==================== 5xxx: Payout / Wallet ====================
    /// Payout not found
    PayoutNotFound = 5001,
    /// No orders are eligible for payout
    PayoutNothingEligible = 5002,
    /// Payout is not in the required state
    PayoutInvalidState = 5003,
    /// Admin notes are required for this action
    AdminNotesRequired = 5004,
    /// Wallet balance cannot cover the payout
    WalletInsufficientBalance = 5005,
    /// Commission rate outside [0, 1]
    InvalidCommissionRate = 5101,

    // ==================== 6xxx: Catalog / Cart ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product's store is inactive
    ProductUnavailable = 6002,
    /// Not enough stock for the requested quantity
    InsufficientStock = 6003,
    /// Quantity must be at least 1
    InvalidQuantity = 6004,
    /// Cart item not found
    CartItemNotFound = 6101,
    /// Cart is empty
    CartEmpty = 6102,
    /// Store not found
    StoreNotFound = 6201,

    // ==================== 7xxx: KYC / Seller ====================
    /// Seller is not fully KYC verified
    KycNotVerified = 7001,
    /// KYC record is already verified and locked
    KycAlreadyVerified = 7002,
    /// Identifier has an invalid format
    KycInvalidIdentifier = 7003,
    /// KYC record not found
    KycNotFound = 7004,
    /// Seller profile not found
    SellerNotFound = 7101,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::RateLimited => "Too many requests, try again later",

            // Permission
            ErrorCode::RoleRequired => "Specific role is required",
            ErrorCode::AdminRequired => "Administrator role is required",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderNotCancellable => "Only pending orders can be cancelled",
            ErrorCode::OrderStatusConflict => "Order was modified concurrently",
            ErrorCode::OrderEmpty => "No items provided",
            ErrorCode::AddressNotFound => "Address not found",
            ErrorCode::OrderAlreadyClaimed => "Order is already included in a payout request",
            ErrorCode::InvalidStatusTransition => "Order status transition is not allowed",

            // Payout / Wallet
            ErrorCode::PayoutNotFound => "Payout not found",
            ErrorCode::PayoutNothingEligible => "No orders are eligible for payout",
            ErrorCode::PayoutInvalidState => "Payout is not in the required state",
            ErrorCode::AdminNotesRequired => "Admin notes are required",
            ErrorCode::WalletInsufficientBalance => "Wallet balance cannot cover the payout",
            ErrorCode::InvalidCommissionRate => "Commission rate must be between 0 and 1",

            // Catalog / Cart
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductUnavailable => "This product is not available",
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::InvalidQuantity => "Quantity must be at least 1",
            ErrorCode::CartItemNotFound => "Cart item not found",
            ErrorCode::CartEmpty => "Your cart is empty",
            ErrorCode::StoreNotFound => "Store not found",

            // KYC / Seller
            ErrorCode::KycNotVerified => "KYC verification is required before requesting payouts",
            ErrorCode::KycAlreadyVerified => "KYC record is already verified",
            ErrorCode::KycInvalidIdentifier => "Identifier has an invalid format",
            ErrorCode::KycNotFound => "KYC record not found",
            ErrorCode::SellerNotFound => "Seller profile not found",

            // System
            ErrorCode::InternalError => "Internal server error",
        }
    }

    /// Whether the code belongs to the business-rule (Validation) family of the taxonomy
    pub fn is_validation(&self) -> bool {
        self.http_status() == ::http::StatusCode::BAD_REQUEST
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1005 => Ok(ErrorCode::RateLimited),

            // Permission
            2002 => Ok(ErrorCode::RoleRequired),
            2003 => Ok(ErrorCode::AdminRequired),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderNotCancellable),
            4003 => Ok(ErrorCode::OrderStatusConflict),
            4004 => Ok(ErrorCode::OrderEmpty),
            4005 => Ok(ErrorCode::AddressNotFound),
            4006 => Ok(ErrorCode::OrderAlreadyClaimed),
            4007 => Ok(ErrorCode::InvalidStatusTransition),

            // Payout / Wallet
            5001 => Ok(ErrorCode::PayoutNotFound),
            5002 => Ok(ErrorCode::PayoutNothingEligible),
            5003 => Ok(ErrorCode::PayoutInvalidState),
            5004 => Ok(ErrorCode::AdminNotesRequired),
            5005 => Ok(ErrorCode::WalletInsufficientBalance),
            5101 => Ok(ErrorCode::InvalidCommissionRate),

            // Catalog / Cart
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductUnavailable),
            6003 => Ok(ErrorCode::InsufficientStock),
            6004 => Ok(ErrorCode::InvalidQuantity),
            6101 => Ok(ErrorCode::CartItemNotFound),
            6102 => Ok(ErrorCode::CartEmpty),
            6201 => Ok(ErrorCode::StoreNotFound),

            // KYC / Seller
            7001 => Ok(ErrorCode::KycNotVerified),
            7002 => Ok(ErrorCode::KycAlreadyVerified),
            7003 => Ok(ErrorCode::KycInvalidIdentifier),
            7004 => Ok(ErrorCode::KycNotFound),
            7101 => Ok(ErrorCode::SellerNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip_through_u16() {
        for code in [
            ErrorCode::Success,
            ErrorCode::OrderNotCancellable,
            ErrorCode::PayoutNothingEligible,
            ErrorCode::InsufficientStock,
            ErrorCode::KycNotVerified,
            ErrorCode::InternalError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
        // Unassigned slots inside otherwise populated ranges
        for value in [1, 4, 2001, 9002] {
            assert_eq!(ErrorCode::try_from(value), Err(InvalidErrorCode(value)));
        }
    }

    #[test]
    fn test_display_is_padded() {
        assert_eq!(ErrorCode::NotFound.to_string(), "E0003");
        assert_eq!(ErrorCode::OrderNotFound.to_string(), "E4001");
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "6003");
        let code: ErrorCode = serde_json::from_str("5002").unwrap();
        assert_eq!(code, ErrorCode::PayoutNothingEligible);
    }
}
