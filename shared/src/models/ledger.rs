//! Commission settings, admin wallet and seller earnings

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One entry of the append-only commission rate history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommissionSetting {
    pub id: i64,
    pub rate: Decimal,
    pub updated_by: Option<i64>,
    pub update_note: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCommissionRequest {
    pub rate: Decimal,
    pub note: Option<String>,
}

/// Pooled wallet holding buyer payments until sellers are paid out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AdminWallet {
    pub total_balance: Decimal,
    pub available_balance: Decimal,
    pub pending_payouts: Decimal,
    pub total_commission_earned: Decimal,
    pub total_payouts_processed: Decimal,
    pub updated_at: i64,
}

/// Seller earnings over non-cancelled orders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SellerEarnings {
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub total_commission: Decimal,
    pub net_earnings: Decimal,
    /// Net amount claimed by payouts not yet completed
    pub pending_payout: Decimal,
    /// Net amount already paid out
    pub completed_payouts: Decimal,
    /// Net amount of paid, unclaimed orders
    pub available_for_payout: Decimal,
}

/// Per-store breakdown of [`SellerEarnings`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreEarnings {
    pub store_id: i64,
    pub store_name: String,
    #[serde(flatten)]
    pub earnings: SellerEarnings,
}
