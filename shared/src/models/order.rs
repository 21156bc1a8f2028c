//! Order Model
//!
//! A checkout is never persisted as such: it becomes one [`Order`] per
//! distinct store, each carrying its own frozen commission split.

use super::ParseEnumError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fulfilment status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Only pending orders can still be cancelled by the buyer
    pub fn is_mutable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Next step on the seller-driven path `pending → paid → shipped → delivered`
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            Self::Pending => Some(Self::Paid),
            Self::Paid => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Whether a seller may move an order from `self` to `target`
    pub fn can_advance_to(&self, target: OrderStatus) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ParseEnumError::new("order status", other)),
        }
    }
}

/// Settlement status of an order with respect to seller payouts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderPayoutStatus {
    /// Not claimed by any payout
    #[default]
    Pending,
    /// Claimed by a payout awaiting admin review
    Requested,
    /// Payout approved and being paid out
    Processing,
    /// Seller has been paid for this order
    Completed,
}

impl OrderPayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Requested => "requested",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for OrderPayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderPayoutStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "requested" => Ok(Self::Requested),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            other => Err(ParseEnumError::new("order payout status", other)),
        }
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub buyer_id: i64,
    pub store_id: i64,
    pub address_id: i64,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub admin_commission: Decimal,
    pub seller_amount: Decimal,
    /// Commission rate in effect when the order was placed
    pub commission_rate: Decimal,
    pub payment_received: bool,
    pub payout_status: OrderPayoutStatus,
    /// Payout that currently claims this order
    pub payout_id: Option<i64>,
    /// Set by the seller on any status update
    pub tracking_number: Option<String>,
    pub seller_notes: Option<String>,
    /// Optimistic lock, bumped on every status change
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn is_mutable(&self) -> bool {
        self.status.is_mutable()
    }

    /// Counted towards a seller's available balance
    pub fn is_payout_eligible(&self) -> bool {
        self.status != OrderStatus::Cancelled && self.payment_received && self.payout_id.is_none()
    }
}

/// Order line with price and title frozen at purchase time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub title: String,
}

/// Flat read projection of an order, its store name and its lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderView {
    pub id: i64,
    pub buyer_id: i64,
    pub store_id: i64,
    pub store_name: String,
    pub address_id: i64,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub admin_commission: Decimal,
    pub seller_amount: Decimal,
    pub commission_rate: Decimal,
    pub payment_received: bool,
    pub payout_status: OrderPayoutStatus,
    pub payout_id: Option<i64>,
    pub tracking_number: Option<String>,
    pub seller_notes: Option<String>,
    pub items_count: i64,
    pub items: Vec<OrderItem>,
    pub created_at: i64,
    pub updated_at: i64,
}

// ============================================================================
// Requests / Responses
// ============================================================================

/// A requested (product, quantity) pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItemInput {
    pub product_id: i64,
    pub quantity: i32,
}

/// Checkout from the buyer's cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCheckoutRequest {
    pub address_id: i64,
}

/// Single-item "buy now" checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyNowRequest {
    pub address_id: i64,
    pub product_id: i64,
    pub quantity: i32,
}

/// Checkout from an explicit item list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectOrderRequest {
    pub address_id: i64,
    pub items: Vec<LineItemInput>,
}

/// Result of any checkout entry point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub orders: Vec<OrderView>,
    pub total_orders: usize,
    pub total_amount: Decimal,
}

/// Where an order summary takes its lines from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    #[default]
    Cart,
    Items,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderSummaryRequest {
    #[serde(default)]
    pub source: SummarySource,
    #[serde(default)]
    pub items: Option<Vec<LineItemInput>>,
}

/// Pre-checkout price breakdown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub stores_count: usize,
    pub items_count: i64,
}

impl OrderSummary {
    pub fn empty() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            shipping_fee: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
            stores_count: 0,
            items_count: 0,
        }
    }
}

/// Seller request to move an order one step forward
///
/// `tracking_number` and `notes` overwrite the stored values when present
/// and leave them untouched when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateOrderStatusRequest {
    pub fn to(status: OrderStatus) -> Self {
        Self {
            status,
            tracking_number: None,
            notes: None,
        }
    }
}

/// Paged order listing
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    /// Seller listings only: restrict to one of the seller's stores
    pub store_id: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path_is_one_step() {
        use OrderStatus::*;
        assert!(Pending.can_advance_to(Paid));
        assert!(Paid.can_advance_to(Shipped));
        assert!(Shipped.can_advance_to(Delivered));

        assert!(!Pending.can_advance_to(Shipped));
        assert!(!Pending.can_advance_to(Delivered));
        assert!(!Paid.can_advance_to(Pending));
        assert!(!Shipped.can_advance_to(Cancelled));
    }

    #[test]
    fn test_terminal_states_have_no_successor() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(!status.is_mutable());
            assert_eq!(status.next(), None);
        }
    }

    #[test]
    fn test_only_pending_is_mutable() {
        assert!(OrderStatus::Pending.is_mutable());
        assert!(!OrderStatus::Paid.is_mutable());
        assert!(!OrderStatus::Shipped.is_mutable());
    }

    #[test]
    fn test_status_text_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
        assert_eq!("requested".parse(), Ok(OrderPayoutStatus::Requested));
    }

    #[test]
    fn test_payout_eligibility_starts_at_payment() {
        let mut order = Order {
            id: 1,
            buyer_id: 2,
            store_id: 3,
            address_id: 4,
            status: OrderStatus::Paid,
            total_amount: Decimal::new(10000, 2),
            admin_commission: Decimal::new(500, 2),
            seller_amount: Decimal::new(9500, 2),
            commission_rate: Decimal::new(5, 2),
            payment_received: true,
            payout_status: OrderPayoutStatus::Pending,
            payout_id: None,
            tracking_number: None,
            seller_notes: None,
            version: 1,
            created_at: 0,
            updated_at: 0,
        };
        // Paid is enough; delivery is not required
        assert!(order.is_payout_eligible());
        order.status = OrderStatus::Shipped;
        assert!(order.is_payout_eligible());

        order.payout_id = Some(9);
        assert!(!order.is_payout_eligible());
        order.payout_id = None;

        order.status = OrderStatus::Cancelled;
        assert!(!order.is_payout_eligible());
        order.status = OrderStatus::Pending;
        order.payment_received = false;
        assert!(!order.is_payout_eligible());
    }

    #[test]
    fn test_money_goes_out_as_json_numbers() {
        let summary = OrderSummary {
            subtotal: Decimal::new(23000, 2),
            total: Decimal::new(23000, 2),
            ..OrderSummary::empty()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["subtotal"], 230.0);
        assert!(json["total"].is_number());
        assert!(json["discount"].is_number());

        let back: OrderSummary = serde_json::from_value(json).unwrap();
        assert_eq!(back.subtotal, Decimal::new(230, 0));
    }

    #[test]
    fn test_status_update_extras_are_optional() {
        let req: UpdateOrderStatusRequest =
            serde_json::from_str(r#"{"status":"shipped"}"#).unwrap();
        assert_eq!(req.status, OrderStatus::Shipped);
        assert!(req.tracking_number.is_none() && req.notes.is_none());

        let req: UpdateOrderStatusRequest = serde_json::from_str(
            r#"{"status":"shipped","tracking_number":"AWB123","notes":"Left at gate"}"#,
        )
        .unwrap();
        assert_eq!(req.tracking_number.as_deref(), Some("AWB123"));
        assert_eq!(req.notes.as_deref(), Some("Left at gate"));
    }

    #[test]
    fn test_summary_request_defaults_to_cart() {
        let req: OrderSummaryRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.source, SummarySource::Cart);
        assert!(req.items.is_none());
    }
}
