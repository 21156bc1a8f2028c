//! Payout Model

use super::ParseEnumError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payout lifecycle
///
/// `requested → approved → processing → completed`, with `rejected`
/// (from requested) and `failed` (from approved or processing).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    #[default]
    Requested,
    Approved,
    Processing,
    Completed,
    Rejected,
    Failed,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Failed)
    }

    pub fn can_transition_to(&self, target: PayoutStatus) -> bool {
        use PayoutStatus::*;
        matches!(
            (self, target),
            (Requested, Approved)
                | (Requested, Rejected)
                | (Approved, Processing)
                | (Approved, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(Self::Requested),
            "approved" => Ok(Self::Approved),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            "failed" => Ok(Self::Failed),
            other => Err(ParseEnumError::new("payout status", other)),
        }
    }
}

/// Seller payout request and its settlement record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payout {
    pub id: i64,
    pub seller_id: i64,
    pub store_id: Option<i64>,
    /// Σ total_amount of the claimed orders
    pub gross_amount: Decimal,
    /// Σ admin_commission of the claimed orders
    pub commission_amount: Decimal,
    /// Net amount owed to the seller (Σ seller_amount)
    pub amount: Decimal,
    /// Effective commission rate when the request was made
    pub commission_rate: Decimal,
    pub order_ids: Vec<i64>,
    pub status: PayoutStatus,
    pub request_notes: Option<String>,
    pub admin_notes: Option<String>,
    pub transaction_id: Option<String>,
    pub processed_by: Option<i64>,
    pub processed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Seller payout request
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreatePayoutRequest {
    pub store_id: Option<i64>,
    pub order_ids: Option<Vec<i64>>,
    pub notes: Option<String>,
}

/// Admin decision on a requested payout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayoutDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPayoutRequest {
    pub status: PayoutDecision,
    pub admin_notes: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompletePayoutRequest {
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailPayoutRequest {
    pub admin_notes: String,
}

/// Payout listing filter
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PayoutListQuery {
    pub status: Option<PayoutStatus>,
    pub seller_id: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use PayoutStatus::*;
        assert!(Requested.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
    }

    #[test]
    fn test_side_branches() {
        use PayoutStatus::*;
        assert!(Requested.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Failed));

        assert!(!Requested.can_transition_to(Failed));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Requested.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        use PayoutStatus::*;
        let all = [Requested, Approved, Processing, Completed, Rejected, Failed];
        for from in [Completed, Rejected, Failed] {
            assert!(from.is_terminal());
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_decision_serde() {
        let req: ProcessPayoutRequest =
            serde_json::from_str(r#"{"status":"rejected","admin_notes":"duplicate"}"#).unwrap();
        assert_eq!(req.status, PayoutDecision::Rejected);
        assert_eq!(req.admin_notes.as_deref(), Some("duplicate"));
        assert!(req.transaction_id.is_none());
    }
}
