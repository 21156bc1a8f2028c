//! Commission settings, the admin wallet and seller earnings

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AdminWallet, CommissionSetting, Order, OrderPayoutStatus, OrderStatus, SellerEarnings,
    StoreEarnings, UpdateCommissionRequest,
};
use shared::money::{RATE_DECIMAL_PLACES, is_valid_rate};
use shared::util::{now_millis, snowflake_id};

use crate::error::ServiceResult;
use crate::state::AppState;

const HISTORY_LIMIT: i64 = 20;

/// Current rate plus recent changes, newest first
#[derive(Debug, Clone, Serialize)]
pub struct CommissionSettings {
    pub rate: Decimal,
    pub history: Vec<CommissionSetting>,
}

/// Rate applied to new orders and payout requests
pub async fn effective_rate(state: &AppState) -> ServiceResult<Decimal> {
    Ok(state
        .store()
        .current_commission()
        .await?
        .map(|s| s.rate)
        .unwrap_or(state.default_commission_rate))
}

/// Seed the history with the configured default when it is empty
pub async fn ensure_default_rate(state: &AppState) -> ServiceResult<()> {
    if state.store().current_commission().await?.is_some() {
        return Ok(());
    }
    state
        .store()
        .insert_commission(&CommissionSetting {
            id: snowflake_id(),
            rate: state.default_commission_rate,
            updated_by: None,
            update_note: Some("Initial default".to_string()),
            created_at: now_millis(),
        })
        .await?;
    tracing::info!(rate = %state.default_commission_rate, "Seeded default commission rate");
    Ok(())
}

pub async fn get_commission_settings(state: &AppState) -> ServiceResult<CommissionSettings> {
    let history = state.store().commission_history(HISTORY_LIMIT).await?;
    let rate = history
        .first()
        .map(|s| s.rate)
        .unwrap_or(state.default_commission_rate);
    Ok(CommissionSettings { rate, history })
}

/// Append a new rate; orders already placed keep their snapshot
pub async fn update_commission_rate(
    state: &AppState,
    admin_id: i64,
    req: UpdateCommissionRequest,
) -> ServiceResult<CommissionSetting> {
    if !is_valid_rate(req.rate) {
        return Err(AppError::with_message(
            ErrorCode::InvalidCommissionRate,
            "Commission rate must be between 0 and 1",
        )
        .with_detail("rate", req.rate.to_string())
        .into());
    }

    let setting = CommissionSetting {
        id: snowflake_id(),
        rate: req
            .rate
            .round_dp_with_strategy(RATE_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero),
        updated_by: Some(admin_id),
        update_note: req
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        created_at: now_millis(),
    };
    state.store().insert_commission(&setting).await?;

    tracing::info!(admin_id, rate = %setting.rate, "Commission rate updated");
    Ok(setting)
}

pub async fn wallet(state: &AppState) -> ServiceResult<AdminWallet> {
    Ok(state.store().wallet().await?)
}

/// Fold a seller's orders into earnings; cancelled orders never count
pub fn compute_earnings<'a>(orders: impl IntoIterator<Item = &'a Order>) -> SellerEarnings {
    let mut e = SellerEarnings::default();
    for o in orders
        .into_iter()
        .filter(|o| o.status != OrderStatus::Cancelled)
    {
        e.total_orders += 1;
        e.total_revenue += o.total_amount;
        e.total_commission += o.admin_commission;
        e.net_earnings += o.seller_amount;
        match o.payout_status {
            OrderPayoutStatus::Requested | OrderPayoutStatus::Processing => {
                e.pending_payout += o.seller_amount
            }
            OrderPayoutStatus::Completed => e.completed_payouts += o.seller_amount,
            OrderPayoutStatus::Pending => {}
        }
        if o.is_payout_eligible() {
            e.available_for_payout += o.seller_amount;
        }
    }
    e
}

pub async fn seller_earnings(state: &AppState, seller_id: i64) -> ServiceResult<SellerEarnings> {
    let orders = state.store().seller_orders(seller_id, None).await?;
    Ok(compute_earnings(&orders))
}

/// Earnings per store, including stores without orders
pub async fn earnings_by_store(
    state: &AppState,
    seller_id: i64,
) -> ServiceResult<Vec<StoreEarnings>> {
    let stores = state.store().stores_for_seller(seller_id).await?;
    let orders = state.store().seller_orders(seller_id, None).await?;
    Ok(stores
        .into_iter()
        .map(|s| StoreEarnings {
            earnings: compute_earnings(orders.iter().filter(|o| o.store_id == s.id)),
            store_id: s.id,
            store_name: s.name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{Fixture, d};

    fn order(total: &str, commission: &str, status: OrderStatus) -> Order {
        let total = d(total);
        let commission = d(commission);
        Order {
            id: 1,
            buyer_id: 1,
            store_id: 1,
            address_id: 1,
            status,
            total_amount: total,
            admin_commission: commission,
            seller_amount: total - commission,
            commission_rate: d("0.05"),
            payment_received: status != OrderStatus::Pending && status != OrderStatus::Cancelled,
            payout_status: OrderPayoutStatus::Pending,
            payout_id: None,
            tracking_number: None,
            seller_notes: None,
            version: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_earnings_split_by_payout_state() {
        let unpaid = order("100.00", "5.00", OrderStatus::Pending);
        let paid = order("200.00", "10.00", OrderStatus::Paid);
        let mut requested = order("30.00", "1.50", OrderStatus::Shipped);
        requested.payout_id = Some(9);
        requested.payout_status = OrderPayoutStatus::Requested;
        let mut settled = order("40.00", "2.00", OrderStatus::Delivered);
        settled.payout_id = Some(8);
        settled.payout_status = OrderPayoutStatus::Completed;
        let cancelled = order("999.00", "49.95", OrderStatus::Cancelled);

        let e = compute_earnings(&[unpaid, paid, requested, settled, cancelled]);
        assert_eq!(e.total_orders, 4);
        assert_eq!(e.total_revenue, d("370.00"));
        assert_eq!(e.total_commission, d("18.50"));
        assert_eq!(e.net_earnings, d("351.50"));
        assert_eq!(e.pending_payout, d("28.50"));
        assert_eq!(e.completed_payouts, d("38.00"));
        // Only the paid, unclaimed order
        assert_eq!(e.available_for_payout, d("190.00"));
        assert_eq!(e.total_commission + e.net_earnings, e.total_revenue);
    }

    #[tokio::test]
    async fn test_rate_update_is_append_only() {
        let fx = Fixture::new().await;
        assert_eq!(effective_rate(&fx.state).await.unwrap(), d("0.05"));

        let setting = update_commission_rate(
            &fx.state,
            1,
            UpdateCommissionRequest {
                rate: d("0.07255"),
                note: Some("  festive season ".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(setting.rate, d("0.0726"));
        assert_eq!(setting.update_note.as_deref(), Some("festive season"));

        let settings = get_commission_settings(&fx.state).await.unwrap();
        assert_eq!(settings.rate, d("0.0726"));
        assert_eq!(settings.history.len(), 2);
        assert_eq!(settings.history[1].rate, d("0.05"));
    }

    #[tokio::test]
    async fn test_rate_out_of_range_is_rejected() {
        let fx = Fixture::new().await;
        for rate in ["-0.01", "1.0001"] {
            let err: AppError = update_commission_rate(
                &fx.state,
                1,
                UpdateCommissionRequest {
                    rate: d(rate),
                    note: None,
                },
            )
            .await
            .unwrap_err()
            .into();
            assert_eq!(err.code, ErrorCode::InvalidCommissionRate);
        }
        assert_eq!(effective_rate(&fx.state).await.unwrap(), d("0.05"));
    }

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let fx = Fixture::new().await;
        ensure_default_rate(&fx.state).await.unwrap();
        let settings = get_commission_settings(&fx.state).await.unwrap();
        assert_eq!(settings.history.len(), 1);
    }
}
