//! Outbound notifications (email/SMS/push live outside this service)

use rust_decimal::Decimal;
use shared::models::{OrderStatus, PayoutStatus};

/// Events buyers, sellers and admins are told about
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    OrdersPlaced {
        buyer_id: i64,
        order_ids: Vec<i64>,
        total_amount: Decimal,
    },
    OrderStatusChanged {
        order_id: i64,
        buyer_id: i64,
        status: OrderStatus,
    },
    PayoutRequested {
        payout_id: i64,
        seller_id: i64,
        amount: Decimal,
    },
    PayoutStatusChanged {
        payout_id: i64,
        seller_id: i64,
        status: PayoutStatus,
    },
}

/// Fire-and-forget delivery; failures never reach the caller
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Default notifier: writes each event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::OrdersPlaced {
                buyer_id,
                order_ids,
                total_amount,
            } => tracing::info!(
                buyer_id,
                orders = order_ids.len(),
                total_amount = %total_amount,
                "Orders placed"
            ),
            Notification::OrderStatusChanged {
                order_id,
                buyer_id,
                status,
            } => tracing::info!(order_id, buyer_id, status = %status, "Order status changed"),
            Notification::PayoutRequested {
                payout_id,
                seller_id,
                amount,
            } => tracing::info!(payout_id, seller_id, amount = %amount, "Payout requested"),
            Notification::PayoutStatusChanged {
                payout_id,
                seller_id,
                status,
            } => tracing::info!(payout_id, seller_id, status = %status, "Payout status changed"),
        }
    }
}
