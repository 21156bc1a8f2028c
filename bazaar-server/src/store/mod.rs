//! Persistence seam for the marketplace
//!
//! Every piece of shared mutable state lives behind [`MarketStore`]. Each
//! method is one atomic unit: multi-row writes (checkout, cancellation,
//! payout claims, wallet movements) either fully apply or leave nothing
//! behind.
//!
//! Two implementations:
//! - [`PgStore`]: PostgreSQL via sqlx, conditional `UPDATE`s inside transactions
//! - [`MemoryStore`]: a single guarded map set, used in development and tests

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    Address, AdminWallet, CartItem, CommissionSetting, KycKind, KycRecord, Order,
    OrderItem, OrderPayoutStatus, OrderStatus, Payout, PayoutStatus, Product, Store,
};
use thiserror::Error;

/// Store errors
///
/// Conflict variants carry what the caller needs to phrase a business error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Record not found")]
    NotFound,

    #[error("Insufficient stock for product {product_id}: {available} available")]
    InsufficientStock { product_id: i64, available: i32 },

    #[error("Order {order_id} is {current}")]
    OrderState { order_id: i64, current: OrderStatus },

    #[error("Order already claimed by a payout")]
    OrderClaimed,

    #[error("Payout {payout_id} is {current}")]
    PayoutState {
        payout_id: i64,
        current: PayoutStatus,
    },

    #[error("Wallet has {available} available, {required} required")]
    InsufficientBalance {
        available: Decimal,
        required: Decimal,
    },

    #[error("KYC {0} is already verified")]
    KycLocked(KycKind),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One per-store order ready to be written, with its frozen lines
#[derive(Debug, Clone)]
pub struct PlacementGroup {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Everything a checkout writes in one transaction
#[derive(Debug, Clone)]
pub struct PlacementRequest {
    pub buyer_id: i64,
    pub groups: Vec<PlacementGroup>,
    /// Cart lines this checkout was built from, deleted in the same
    /// transaction. Lines added after they were read are left alone.
    pub cart_item_ids: Vec<i64>,
}

/// Compare-and-set on an order's status and version
///
/// `None` for the seller fields keeps what the order already has.
#[derive(Debug, Clone)]
pub struct OrderTransition {
    pub order_id: i64,
    pub from: OrderStatus,
    pub expected_version: i64,
    pub to: OrderStatus,
    pub tracking_number: Option<String>,
    pub seller_notes: Option<String>,
    pub now: i64,
}

/// Compare-and-set on a payout's status plus its wallet and order effects
#[derive(Debug, Clone)]
pub struct PayoutTransition {
    pub payout_id: i64,
    pub from: PayoutStatus,
    pub to: PayoutStatus,
    pub admin_notes: Option<String>,
    pub transaction_id: Option<String>,
    pub processed_by: i64,
    pub now: i64,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub buyer_id: Option<i64>,
    pub store_ids: Option<Vec<i64>>,
    pub status: Option<OrderStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PayoutFilter {
    pub seller_id: Option<i64>,
    pub status: Option<PayoutStatus>,
    pub limit: i64,
    pub offset: i64,
}

/// KYC write: identifier already hashed
#[derive(Debug, Clone)]
pub struct KycSubmission {
    pub seller_id: i64,
    pub kind: KycKind,
    pub holder_name: String,
    pub identifier_hash: String,
    pub identifier_last4: String,
    pub ifsc_code: Option<String>,
    pub now: i64,
}

/// Signed change applied to the admin wallet
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WalletDelta {
    pub total_balance: Decimal,
    pub available_balance: Decimal,
    pub pending_payouts: Decimal,
    pub total_commission_earned: Decimal,
    pub total_payouts_processed: Decimal,
}

impl WalletDelta {
    /// Buyer payment captured for an order
    pub fn payment(order: &Order) -> Self {
        Self {
            total_balance: order.total_amount,
            available_balance: order.total_amount,
            total_commission_earned: order.admin_commission,
            ..Self::default()
        }
    }

    /// Seller asked for `amount`
    pub fn payout_requested(amount: Decimal) -> Self {
        Self {
            pending_payouts: amount,
            ..Self::default()
        }
    }

    /// Wallet effect of moving a payout of `amount` from `from` to `to`
    pub fn payout_transition(from: PayoutStatus, to: PayoutStatus, amount: Decimal) -> Self {
        use PayoutStatus::*;
        match (from, to) {
            (Requested, Approved) => Self {
                pending_payouts: -amount,
                available_balance: -amount,
                ..Self::default()
            },
            (Requested, Rejected) => Self {
                pending_payouts: -amount,
                ..Self::default()
            },
            (Processing, Completed) => Self {
                total_balance: -amount,
                total_payouts_processed: amount,
                ..Self::default()
            },
            (Approved | Processing, Failed) => Self {
                available_balance: amount,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    pub fn apply(&self, wallet: &mut AdminWallet) {
        wallet.total_balance += self.total_balance;
        wallet.available_balance += self.available_balance;
        wallet.pending_payouts += self.pending_payouts;
        wallet.total_commission_earned += self.total_commission_earned;
        wallet.total_payouts_processed += self.total_payouts_processed;
    }
}

/// What a payout transition does to the orders it claims
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimEffect {
    /// Set the orders' payout_status
    Mark(OrderPayoutStatus),
    /// Clear payout_id and reset payout_status to pending
    Release,
}

impl ClaimEffect {
    pub fn of(to: PayoutStatus) -> Self {
        match to {
            PayoutStatus::Requested => Self::Mark(OrderPayoutStatus::Requested),
            PayoutStatus::Approved | PayoutStatus::Processing => {
                Self::Mark(OrderPayoutStatus::Processing)
            }
            PayoutStatus::Completed => Self::Mark(OrderPayoutStatus::Completed),
            PayoutStatus::Rejected | PayoutStatus::Failed => Self::Release,
        }
    }
}

#[async_trait]
pub trait MarketStore: Send + Sync {
    // ========== Catalog / address book ==========

    /// Address owned by `buyer_id`
    async fn find_address(&self, buyer_id: i64, address_id: i64) -> StoreResult<Option<Address>>;

    /// Products by id; missing ids are simply absent from the result
    async fn find_products(&self, ids: &[i64]) -> StoreResult<Vec<Product>>;

    async fn find_stores(&self, ids: &[i64]) -> StoreResult<Vec<Store>>;

    async fn stores_for_seller(&self, seller_id: i64) -> StoreResult<Vec<Store>>;

    /// Seller profile id of a user
    async fn seller_id_for_user(&self, user_id: i64) -> StoreResult<Option<i64>>;

    // ========== Cart ==========

    async fn cart_items(&self, buyer_id: i64) -> StoreResult<Vec<CartItem>>;

    /// Insert a line or add to the quantity of the existing line for the product.
    ///
    /// A merged quantity that would overflow fails with
    /// [`StoreError::InsufficientStock`] and leaves the line as it was.
    async fn add_cart_item(
        &self,
        buyer_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> StoreResult<CartItem>;

    async fn set_cart_item_quantity(
        &self,
        buyer_id: i64,
        item_id: i64,
        quantity: i32,
    ) -> StoreResult<Option<CartItem>>;

    /// Returns whether a line was removed
    async fn remove_cart_item(&self, buyer_id: i64, item_id: i64) -> StoreResult<bool>;

    /// Remove the buyer's line for a product; returns whether one existed
    async fn remove_cart_product(&self, buyer_id: i64, product_id: i64) -> StoreResult<bool>;

    async fn clear_cart(&self, buyer_id: i64) -> StoreResult<()>;

    // ========== Orders ==========

    /// Decrement stock for every line, insert every order and its lines, and
    /// delete the consumed cart lines, all in one transaction.
    ///
    /// A stock decrement that would go negative aborts everything with
    /// [`StoreError::InsufficientStock`].
    async fn place_orders(&self, request: &PlacementRequest) -> StoreResult<Vec<Order>>;

    /// Cancel a pending order of `buyer_id` and restore its stock.
    ///
    /// Fails with [`StoreError::NotFound`] or [`StoreError::OrderState`].
    async fn cancel_order(&self, buyer_id: i64, order_id: i64, now: i64) -> StoreResult<Order>;

    /// Apply a status CAS; moving to `paid` also captures payment into the wallet.
    async fn advance_order(&self, transition: &OrderTransition) -> StoreResult<Order>;

    async fn get_order(&self, order_id: i64) -> StoreResult<Option<Order>>;

    async fn order_items(&self, order_ids: &[i64]) -> StoreResult<Vec<OrderItem>>;

    /// Newest first
    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;

    /// All orders of a seller, optionally restricted to one store
    async fn seller_orders(&self, seller_id: i64, store_id: Option<i64>)
    -> StoreResult<Vec<Order>>;

    // ========== Commission / wallet ==========

    /// Newest commission setting
    async fn current_commission(&self) -> StoreResult<Option<CommissionSetting>>;

    /// Newest first
    async fn commission_history(&self, limit: i64) -> StoreResult<Vec<CommissionSetting>>;

    async fn insert_commission(&self, setting: &CommissionSetting) -> StoreResult<()>;

    async fn wallet(&self) -> StoreResult<AdminWallet>;

    // ========== Payouts ==========

    /// Insert the payout and claim its orders (`payout_id IS NULL` guard).
    ///
    /// If any order is already claimed nothing is written and
    /// [`StoreError::OrderClaimed`] is returned.
    async fn create_payout(&self, payout: &Payout) -> StoreResult<()>;

    async fn get_payout(&self, payout_id: i64) -> StoreResult<Option<Payout>>;

    /// Newest first
    async fn list_payouts(&self, filter: &PayoutFilter) -> StoreResult<Vec<Payout>>;

    /// Status CAS with wallet and claimed-order effects
    async fn transition_payout(&self, transition: &PayoutTransition) -> StoreResult<Payout>;

    // ========== KYC ==========

    async fn kyc_records(&self, seller_id: i64) -> StoreResult<Vec<KycRecord>>;

    /// Replace the record for (seller, kind), resetting `verified`.
    ///
    /// A verified record is locked: [`StoreError::KycLocked`].
    async fn upsert_kyc(&self, submission: &KycSubmission) -> StoreResult<KycRecord>;

    async fn set_kyc_verified(
        &self,
        seller_id: i64,
        kind: KycKind,
        verified: bool,
        now: i64,
    ) -> StoreResult<Option<KycRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_payout_lifecycle_nets_to_zero_in_flight() {
        let amount = d("190.00");
        let mut wallet = AdminWallet {
            total_balance: d("200.00"),
            available_balance: d("200.00"),
            total_commission_earned: d("10.00"),
            ..AdminWallet::default()
        };

        WalletDelta::payout_requested(amount).apply(&mut wallet);
        assert_eq!(wallet.pending_payouts, amount);

        for (from, to) in [
            (PayoutStatus::Requested, PayoutStatus::Approved),
            (PayoutStatus::Approved, PayoutStatus::Processing),
            (PayoutStatus::Processing, PayoutStatus::Completed),
        ] {
            WalletDelta::payout_transition(from, to, amount).apply(&mut wallet);
        }

        assert_eq!(wallet.pending_payouts, Decimal::ZERO);
        assert_eq!(wallet.available_balance, d("10.00"));
        assert_eq!(wallet.total_balance, d("10.00"));
        assert_eq!(wallet.total_payouts_processed, amount);
        assert_eq!(wallet.total_commission_earned, d("10.00"));
    }

    #[test]
    fn test_failed_payout_restores_available() {
        let amount = d("28.50");
        let mut wallet = AdminWallet {
            total_balance: d("30.00"),
            available_balance: d("30.00"),
            ..AdminWallet::default()
        };
        WalletDelta::payout_requested(amount).apply(&mut wallet);
        WalletDelta::payout_transition(PayoutStatus::Requested, PayoutStatus::Approved, amount)
            .apply(&mut wallet);
        assert_eq!(wallet.available_balance, d("1.50"));

        WalletDelta::payout_transition(PayoutStatus::Approved, PayoutStatus::Failed, amount)
            .apply(&mut wallet);
        assert_eq!(wallet.available_balance, d("30.00"));
        assert_eq!(wallet.pending_payouts, Decimal::ZERO);
        assert_eq!(wallet.total_balance, d("30.00"));
    }

    #[test]
    fn test_rejection_only_releases_pending() {
        let amount = d("5.00");
        let delta =
            WalletDelta::payout_transition(PayoutStatus::Requested, PayoutStatus::Rejected, amount);
        assert_eq!(delta.pending_payouts, -amount);
        assert_eq!(delta.available_balance, Decimal::ZERO);
        assert_eq!(delta.total_balance, Decimal::ZERO);
    }

    #[test]
    fn test_claim_effects() {
        assert_eq!(
            ClaimEffect::of(PayoutStatus::Approved),
            ClaimEffect::Mark(OrderPayoutStatus::Processing)
        );
        assert_eq!(
            ClaimEffect::of(PayoutStatus::Completed),
            ClaimEffect::Mark(OrderPayoutStatus::Completed)
        );
        assert_eq!(ClaimEffect::of(PayoutStatus::Rejected), ClaimEffect::Release);
        assert_eq!(ClaimEffect::of(PayoutStatus::Failed), ClaimEffect::Release);
    }
}
