//! Error category by code range

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Leading digit of the code; 3xxx and 8xxx are unassigned and count as
/// `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Permission,
    Order,
    Payout,
    Catalog,
    Kyc,
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code {
            1000..2000 => Self::Auth,
            2000..3000 => Self::Permission,
            4000..5000 => Self::Order,
            5000..6000 => Self::Payout,
            6000..7000 => Self::Catalog,
            7000..8000 => Self::Kyc,
            9000.. => Self::System,
            _ => Self::General,
        }
    }

    /// Infrastructure failures, logged and never explained to the caller
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
