//! Payout reconciliation
//!
//! A payout claims a set of paid seller orders and moves money out of the
//! admin wallet in stages:
//!
//! ```text
//! requested ──approve──> approved ──start──> processing ──complete──> completed
//!     │                     │                    │
//!     └──reject──> rejected └──fail──> failed <──┘
//! ```
//!
//! Rejected and failed payouts release their orders so they can be claimed
//! again.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CompletePayoutRequest, CreatePayoutRequest, FailPayoutRequest, KycStatus, Order, Payout,
    PayoutDecision, PayoutListQuery, PayoutStatus, ProcessPayoutRequest,
};
use shared::util::{now_millis, snowflake_id};

use super::{ledger, seller_of};
use crate::error::ServiceResult;
use crate::notify::Notification;
use crate::state::AppState;
use crate::store::{PayoutFilter, PayoutTransition};
use crate::util::page_window;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

fn payout_not_found() -> AppError {
    AppError::with_message(ErrorCode::PayoutNotFound, "Payout not found")
}

fn non_empty(notes: Option<String>) -> Option<String> {
    notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Pick the orders a request covers
///
/// Explicit ids must all be the seller's, unclaimed and paid; without ids
/// every eligible order in scope is taken.
fn select_orders(orders: Vec<Order>, order_ids: Option<Vec<i64>>) -> Result<Vec<Order>, AppError> {
    let Some(mut ids) = order_ids else {
        return Ok(orders.into_iter().filter(Order::is_payout_eligible).collect());
    };
    ids.sort_unstable();
    ids.dedup();

    let mut selected = Vec::with_capacity(ids.len());
    for id in ids {
        let order = orders.iter().find(|o| o.id == id).ok_or_else(|| {
            AppError::with_message(ErrorCode::OrderNotFound, format!("Order {id} not found"))
                .with_detail("order_id", id)
        })?;
        if order.payout_id.is_some() {
            return Err(AppError::new(ErrorCode::OrderAlreadyClaimed).with_detail("order_id", id));
        }
        if !order.is_payout_eligible() {
            return Err(AppError::validation(format!(
                "Order {id} is not eligible for payout"
            ))
            .with_detail("order_id", id)
            .with_detail("status", order.status.as_str()));
        }
        selected.push(order.clone());
    }
    Ok(selected)
}

/// Seller asks to be paid for eligible orders
pub async fn request_payout(
    state: &AppState,
    seller_user_id: i64,
    req: CreatePayoutRequest,
) -> ServiceResult<Payout> {
    let seller_id = seller_of(state, seller_user_id).await?;

    let kyc = KycStatus::from_records(state.store().kyc_records(seller_id).await?);
    if !kyc.is_fully_verified {
        return Err(AppError::new(ErrorCode::KycNotVerified)
            .with_detail("pan", serde_json::to_value(kyc.pan).unwrap_or_default())
            .with_detail("aadhaar", serde_json::to_value(kyc.aadhaar).unwrap_or_default())
            .with_detail("bank", serde_json::to_value(kyc.bank).unwrap_or_default())
            .into());
    }

    if let Some(store_id) = req.store_id {
        let owned = state.store().stores_for_seller(seller_id).await?;
        if !owned.iter().any(|s| s.id == store_id) {
            return Err(AppError::with_message(ErrorCode::StoreNotFound, "Store not found")
                .with_detail("store_id", store_id)
                .into());
        }
    }

    let orders = state.store().seller_orders(seller_id, req.store_id).await?;
    let selected = select_orders(orders, req.order_ids)?;

    let gross: Decimal = selected.iter().map(|o| o.total_amount).sum();
    if selected.is_empty() || gross <= Decimal::ZERO {
        return Err(AppError::new(ErrorCode::PayoutNothingEligible).into());
    }
    let commission: Decimal = selected.iter().map(|o| o.admin_commission).sum();
    let net: Decimal = selected.iter().map(|o| o.seller_amount).sum();

    let now = now_millis();
    let payout = Payout {
        id: snowflake_id(),
        seller_id,
        store_id: req.store_id,
        gross_amount: gross,
        commission_amount: commission,
        amount: net,
        commission_rate: ledger::effective_rate(state).await?,
        order_ids: selected.iter().map(|o| o.id).collect(),
        status: PayoutStatus::Requested,
        request_notes: non_empty(req.notes),
        admin_notes: None,
        transaction_id: None,
        processed_by: None,
        processed_at: None,
        created_at: now,
        updated_at: now,
    };
    state.store().create_payout(&payout).await?;

    tracing::info!(
        payout_id = payout.id,
        seller_id,
        orders = payout.order_ids.len(),
        amount = %payout.amount,
        "Payout requested"
    );
    state.notifier.notify(Notification::PayoutRequested {
        payout_id: payout.id,
        seller_id,
        amount: payout.amount,
    });
    Ok(payout)
}

/// Load a payout and apply one lifecycle step to it
async fn move_payout(
    state: &AppState,
    admin_id: i64,
    payout_id: i64,
    to: PayoutStatus,
    admin_notes: Option<String>,
    transaction_id: Option<String>,
) -> ServiceResult<Payout> {
    let payout = state
        .store()
        .get_payout(payout_id)
        .await?
        .ok_or_else(payout_not_found)?;

    if !payout.status.can_transition_to(to) {
        return Err(AppError::with_message(
            ErrorCode::PayoutInvalidState,
            format!("Cannot move payout from {} to {}", payout.status, to),
        )
        .with_detail("from", payout.status.as_str())
        .with_detail("to", to.as_str())
        .into());
    }

    let updated = state
        .store()
        .transition_payout(&PayoutTransition {
            payout_id,
            from: payout.status,
            to,
            admin_notes,
            transaction_id,
            processed_by: admin_id,
            now: now_millis(),
        })
        .await?;

    tracing::info!(
        payout_id,
        admin_id,
        from = %payout.status,
        to = %updated.status,
        amount = %updated.amount,
        "Payout status changed"
    );
    state.notifier.notify(Notification::PayoutStatusChanged {
        payout_id,
        seller_id: updated.seller_id,
        status: updated.status,
    });
    Ok(updated)
}

/// Admin approves or rejects a requested payout
pub async fn process_payout(
    state: &AppState,
    admin_id: i64,
    payout_id: i64,
    req: ProcessPayoutRequest,
) -> ServiceResult<Payout> {
    let current = state
        .store()
        .get_payout(payout_id)
        .await?
        .ok_or_else(payout_not_found)?;
    if current.status != PayoutStatus::Requested {
        return Err(AppError::with_message(
            ErrorCode::PayoutInvalidState,
            "Only requested payouts can be processed",
        )
        .with_detail("status", current.status.as_str())
        .into());
    }

    let admin_notes = non_empty(req.admin_notes);
    let to = match req.status {
        PayoutDecision::Approved => PayoutStatus::Approved,
        PayoutDecision::Rejected => {
            if admin_notes.is_none() {
                return Err(AppError::new(ErrorCode::AdminNotesRequired).into());
            }
            PayoutStatus::Rejected
        }
    };
    move_payout(
        state,
        admin_id,
        payout_id,
        to,
        admin_notes,
        non_empty(req.transaction_id),
    )
    .await
}

pub async fn start_processing(
    state: &AppState,
    admin_id: i64,
    payout_id: i64,
) -> ServiceResult<Payout> {
    move_payout(state, admin_id, payout_id, PayoutStatus::Processing, None, None).await
}

pub async fn complete_payout(
    state: &AppState,
    admin_id: i64,
    payout_id: i64,
    req: CompletePayoutRequest,
) -> ServiceResult<Payout> {
    move_payout(
        state,
        admin_id,
        payout_id,
        PayoutStatus::Completed,
        None,
        non_empty(req.transaction_id),
    )
    .await
}

pub async fn fail_payout(
    state: &AppState,
    admin_id: i64,
    payout_id: i64,
    req: FailPayoutRequest,
) -> ServiceResult<Payout> {
    let notes = non_empty(Some(req.admin_notes))
        .ok_or_else(|| AppError::new(ErrorCode::AdminNotesRequired))?;
    move_payout(state, admin_id, payout_id, PayoutStatus::Failed, Some(notes), None).await
}

pub async fn list_seller_payouts(
    state: &AppState,
    seller_user_id: i64,
    query: PayoutListQuery,
) -> ServiceResult<Vec<Payout>> {
    let seller_id = seller_of(state, seller_user_id).await?;
    list_payouts(
        state,
        PayoutListQuery {
            seller_id: Some(seller_id),
            ..query
        },
    )
    .await
}

pub async fn get_seller_payout(
    state: &AppState,
    seller_user_id: i64,
    payout_id: i64,
) -> ServiceResult<Payout> {
    let seller_id = seller_of(state, seller_user_id).await?;
    Ok(state
        .store()
        .get_payout(payout_id)
        .await?
        .filter(|p| p.seller_id == seller_id)
        .ok_or_else(payout_not_found)?)
}

/// Admin listing, filtered by status and seller
pub async fn list_payouts(state: &AppState, query: PayoutListQuery) -> ServiceResult<Vec<Payout>> {
    let (limit, offset) = page_window(query.page, query.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    Ok(state
        .store()
        .list_payouts(&PayoutFilter {
            seller_id: query.seller_id,
            status: query.status,
            limit,
            offset,
        })
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::services::checkout::{CheckoutSource, place_orders};
    use crate::services::ledger::seller_earnings;
    use crate::services::testing::{BUYER, Fixture, SELLER_A_USER, SELLER_B_USER, d};
    use shared::models::{LineItemInput, OrderPayoutStatus};

    const ADMIN: i64 = 1;

    fn err(e: ServiceError) -> AppError {
        e.into()
    }

    /// Place and pay an order of `quantity` × product
    async fn paid_order(fx: &Fixture, seller_user: i64, product_id: i64, quantity: i32) -> i64 {
        let order_id = place_orders(
            &fx.state,
            BUYER,
            fx.address,
            CheckoutSource::Single(LineItemInput {
                product_id,
                quantity,
            }),
        )
        .await
        .unwrap()
        .orders[0]
            .id;
        fx.mark_paid(seller_user, order_id).await;
        order_id
    }

    fn approve() -> ProcessPayoutRequest {
        ProcessPayoutRequest {
            status: PayoutDecision::Approved,
            admin_notes: None,
            transaction_id: None,
        }
    }

    #[tokio::test]
    async fn test_full_settlement() {
        let fx = Fixture::new().await;
        fx.verify_kyc(fx.seller_a).await;
        let first = paid_order(&fx, SELLER_A_USER, fx.p1, 1).await;
        let second = paid_order(&fx, SELLER_A_USER, fx.p2, 2).await;

        let payout = request_payout(&fx.state, SELLER_A_USER, CreatePayoutRequest::default())
            .await
            .unwrap();
        assert_eq!(payout.status, PayoutStatus::Requested);
        assert_eq!(payout.gross_amount, d("200.00"));
        assert_eq!(payout.commission_amount, d("10.00"));
        assert_eq!(payout.amount, d("190.00"));
        assert_eq!(payout.commission_amount + payout.amount, payout.gross_amount);
        assert_eq!(payout.commission_rate, d("0.05"));
        let mut claimed = payout.order_ids.clone();
        claimed.sort_unstable();
        let mut expected = vec![first, second];
        expected.sort_unstable();
        assert_eq!(claimed, expected);

        let wallet = fx.store().wallet().await.unwrap();
        assert_eq!(wallet.pending_payouts, d("190.00"));
        let earnings = seller_earnings(&fx.state, fx.seller_a).await.unwrap();
        assert_eq!(earnings.available_for_payout, Decimal::ZERO);
        assert_eq!(earnings.pending_payout, d("190.00"));

        let approved = process_payout(&fx.state, ADMIN, payout.id, approve()).await.unwrap();
        assert_eq!(approved.status, PayoutStatus::Approved);
        assert_eq!(approved.processed_by, Some(ADMIN));
        assert!(approved.processed_at.is_some());
        let wallet = fx.store().wallet().await.unwrap();
        assert_eq!(wallet.pending_payouts, Decimal::ZERO);
        assert_eq!(wallet.available_balance, d("10.00"));

        start_processing(&fx.state, ADMIN, payout.id).await.unwrap();
        let done = complete_payout(
            &fx.state,
            ADMIN,
            payout.id,
            CompletePayoutRequest {
                transaction_id: Some("UTR-88812".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(done.status, PayoutStatus::Completed);
        assert_eq!(done.transaction_id.as_deref(), Some("UTR-88812"));

        let wallet = fx.store().wallet().await.unwrap();
        assert_eq!(wallet.total_balance, d("10.00"));
        assert_eq!(wallet.total_payouts_processed, d("190.00"));
        assert_eq!(wallet.total_commission_earned, d("10.00"));

        let order = fx.store().get_order(first).await.unwrap().unwrap();
        assert_eq!(order.payout_status, OrderPayoutStatus::Completed);
        let earnings = seller_earnings(&fx.state, fx.seller_a).await.unwrap();
        assert_eq!(earnings.completed_payouts, d("190.00"));

        let e = err(
            request_payout(&fx.state, SELLER_A_USER, CreatePayoutRequest::default())
                .await
                .unwrap_err(),
        );
        assert_eq!(e.code, ErrorCode::PayoutNothingEligible);
    }

    #[tokio::test]
    async fn test_kyc_required() {
        let fx = Fixture::new().await;
        paid_order(&fx, SELLER_A_USER, fx.p1, 1).await;
        let e = err(
            request_payout(&fx.state, SELLER_A_USER, CreatePayoutRequest::default())
                .await
                .unwrap_err(),
        );
        assert_eq!(e.code, ErrorCode::KycNotVerified);
        assert!(e.code.is_validation());
    }

    #[tokio::test]
    async fn test_unpaid_orders_are_not_eligible() {
        let fx = Fixture::new().await;
        fx.verify_kyc(fx.seller_a).await;
        let pending = place_orders(
            &fx.state,
            BUYER,
            fx.address,
            CheckoutSource::Single(LineItemInput {
                product_id: fx.p1,
                quantity: 1,
            }),
        )
        .await
        .unwrap()
        .orders[0]
            .id;

        let e = err(
            request_payout(&fx.state, SELLER_A_USER, CreatePayoutRequest::default())
                .await
                .unwrap_err(),
        );
        assert_eq!(e.code, ErrorCode::PayoutNothingEligible);

        let e = err(
            request_payout(
                &fx.state,
                SELLER_A_USER,
                CreatePayoutRequest {
                    order_ids: Some(vec![pending]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err(),
        );
        assert_eq!(e.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_foreign_order_ids_are_not_found() {
        let fx = Fixture::new().await;
        fx.verify_kyc(fx.seller_a).await;
        paid_order(&fx, SELLER_A_USER, fx.p1, 1).await;
        let foreign = paid_order(&fx, SELLER_B_USER, fx.p3, 1).await;

        let e = err(
            request_payout(
                &fx.state,
                SELLER_A_USER,
                CreatePayoutRequest {
                    order_ids: Some(vec![foreign]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err(),
        );
        assert_eq!(e.code, ErrorCode::OrderNotFound);
        assert_eq!(fx.store().wallet().await.unwrap().pending_payouts, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_store_scope() {
        let fx = Fixture::new().await;
        fx.verify_kyc(fx.seller_a).await;
        paid_order(&fx, SELLER_A_USER, fx.p1, 1).await;

        let e = err(
            request_payout(
                &fx.state,
                SELLER_A_USER,
                CreatePayoutRequest {
                    store_id: Some(fx.store_b),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err(),
        );
        assert_eq!(e.code, ErrorCode::StoreNotFound);

        let payout = request_payout(
            &fx.state,
            SELLER_A_USER,
            CreatePayoutRequest {
                store_id: Some(fx.store_a),
                notes: Some("weekly".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(payout.store_id, Some(fx.store_a));
        assert_eq!(payout.request_notes.as_deref(), Some("weekly"));
    }

    #[tokio::test]
    async fn test_rejection_needs_notes_and_releases_orders() {
        let fx = Fixture::new().await;
        fx.verify_kyc(fx.seller_a).await;
        let order_id = paid_order(&fx, SELLER_A_USER, fx.p1, 1).await;
        let payout = request_payout(&fx.state, SELLER_A_USER, CreatePayoutRequest::default())
            .await
            .unwrap();

        let e = err(
            process_payout(
                &fx.state,
                ADMIN,
                payout.id,
                ProcessPayoutRequest {
                    status: PayoutDecision::Rejected,
                    admin_notes: Some("   ".into()),
                    transaction_id: None,
                },
            )
            .await
            .unwrap_err(),
        );
        assert_eq!(e.code, ErrorCode::AdminNotesRequired);

        let rejected = process_payout(
            &fx.state,
            ADMIN,
            payout.id,
            ProcessPayoutRequest {
                status: PayoutDecision::Rejected,
                admin_notes: Some("Bank details mismatch".into()),
                transaction_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(rejected.status, PayoutStatus::Rejected);
        assert_eq!(rejected.admin_notes.as_deref(), Some("Bank details mismatch"));

        let order = fx.store().get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.payout_id, None);
        assert_eq!(order.payout_status, OrderPayoutStatus::Pending);
        assert_eq!(fx.store().wallet().await.unwrap().pending_payouts, Decimal::ZERO);

        let e = err(process_payout(&fx.state, ADMIN, payout.id, approve()).await.unwrap_err());
        assert_eq!(e.code, ErrorCode::PayoutInvalidState);

        // Released orders can be claimed again
        let again = request_payout(&fx.state, SELLER_A_USER, CreatePayoutRequest::default())
            .await
            .unwrap();
        assert_eq!(again.order_ids, vec![order_id]);
    }

    #[tokio::test]
    async fn test_failure_restores_available_balance() {
        let fx = Fixture::new().await;
        fx.verify_kyc(fx.seller_b).await;
        let order_id = paid_order(&fx, SELLER_B_USER, fx.p3, 1).await;
        let payout = request_payout(&fx.state, SELLER_B_USER, CreatePayoutRequest::default())
            .await
            .unwrap();
        process_payout(&fx.state, ADMIN, payout.id, approve()).await.unwrap();
        assert_eq!(fx.store().wallet().await.unwrap().available_balance, d("1.50"));

        let e = err(
            complete_payout(&fx.state, ADMIN, payout.id, CompletePayoutRequest::default())
                .await
                .unwrap_err(),
        );
        assert_eq!(e.code, ErrorCode::PayoutInvalidState);

        let failed = fail_payout(
            &fx.state,
            ADMIN,
            payout.id,
            FailPayoutRequest {
                admin_notes: "Beneficiary account closed".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(failed.status, PayoutStatus::Failed);

        let wallet = fx.store().wallet().await.unwrap();
        assert_eq!(wallet.available_balance, d("30.00"));
        assert_eq!(wallet.total_balance, d("30.00"));
        let order = fx.store().get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.payout_id, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_orders_are_never_double_claimed() {
        let fx = Fixture::new().await;
        fx.verify_kyc(fx.seller_a).await;
        let order_id = paid_order(&fx, SELLER_A_USER, fx.p1, 1).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = fx.state.clone();
            handles.push(tokio::spawn(async move {
                request_payout(
                    &state,
                    SELLER_A_USER,
                    CreatePayoutRequest {
                        order_ids: Some(vec![order_id]),
                        ..Default::default()
                    },
                )
                .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert_eq!(err(e).code, ErrorCode::OrderAlreadyClaimed),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(fx.store().wallet().await.unwrap().pending_payouts, d("95.00"));
    }

    #[tokio::test]
    async fn test_seller_reads_are_scoped() {
        let fx = Fixture::new().await;
        fx.verify_kyc(fx.seller_a).await;
        paid_order(&fx, SELLER_A_USER, fx.p1, 1).await;
        let payout = request_payout(&fx.state, SELLER_A_USER, CreatePayoutRequest::default())
            .await
            .unwrap();

        assert_eq!(
            list_seller_payouts(&fx.state, SELLER_A_USER, PayoutListQuery::default())
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(
            list_seller_payouts(&fx.state, SELLER_B_USER, PayoutListQuery::default())
                .await
                .unwrap()
                .is_empty()
        );
        let e = err(
            get_seller_payout(&fx.state, SELLER_B_USER, payout.id)
                .await
                .unwrap_err(),
        );
        assert_eq!(e.code, ErrorCode::PayoutNotFound);

        let requested = list_payouts(
            &fx.state,
            PayoutListQuery {
                status: Some(PayoutStatus::Requested),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(requested.len(), 1);
    }
}
