//! Data models
//!
//! Shared between bazaar-server and API clients.
//! All IDs are `i64` (snowflake, see [`crate::util::snowflake_id`]) and all
//! timestamps are unix milliseconds. Status enums are stored as lowercase
//! text and parsed back through `FromStr`.

pub mod cart;
pub mod catalog;
pub mod kyc;
pub mod ledger;
pub mod order;
pub mod payout;

// Re-exports
pub use cart::*;
pub use catalog::*;
pub use kyc::*;
pub use ledger::*;
pub use order::*;
pub use payout::*;

use thiserror::Error;

/// Unknown text value for a status-like enum
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
