//! Seller API: fulfilment, earnings, payouts and KYC

use axum::extract::{Extension, Path, Query, State};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router, middleware};
use shared::error::ApiResponse;
use shared::models::{
    CreatePayoutRequest, KycRecord, KycStatus, OrderListQuery, OrderView, Payout,
    PayoutListQuery, SellerEarnings, StoreEarnings, SubmitAadhaarRequest, SubmitBankRequest,
    SubmitPanRequest, UpdateOrderStatusRequest,
};

use super::ApiResult;
use crate::auth::Identity;
use crate::auth::identity::{identity_auth_middleware, require_seller};
use crate::auth::rate_limit::payout_rate_limit;
use crate::services::{kyc, ledger, lifecycle, payouts, seller_of};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let requesting = Router::new()
        .route("/payouts/request", post(request_payout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            payout_rate_limit,
        ));

    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/earnings", get(earnings))
        .route("/earnings/by-store", get(earnings_by_store))
        .route("/payouts", get(list_payouts))
        .route("/payouts/{id}", get(get_payout))
        .merge(requesting)
        .route("/kyc", get(kyc_status))
        .route("/kyc/pan", put(submit_pan))
        .route("/kyc/aadhaar", put(submit_aadhaar))
        .route("/kyc/bank", put(submit_bank))
        .route_layer(middleware::from_fn(require_seller))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            identity_auth_middleware,
        ))
}

// ── Orders ──

async fn list_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Vec<OrderView>> {
    let orders = lifecycle::list_seller_orders(&state, identity.user_id, query).await?;
    Ok(Json(ApiResponse::success(orders)))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(order_id): Path<i64>,
) -> ApiResult<OrderView> {
    let order = lifecycle::get_seller_order(&state, identity.user_id, order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn update_order_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(order_id): Path<i64>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderView> {
    let order = lifecycle::advance_order(&state, identity.user_id, order_id, req).await?;
    Ok(Json(ApiResponse::success(order)))
}

// ── Earnings ──

async fn earnings(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<SellerEarnings> {
    let seller_id = seller_of(&state, identity.user_id).await?;
    let earnings = ledger::seller_earnings(&state, seller_id).await?;
    Ok(Json(ApiResponse::success(earnings)))
}

async fn earnings_by_store(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Vec<StoreEarnings>> {
    let seller_id = seller_of(&state, identity.user_id).await?;
    let earnings = ledger::earnings_by_store(&state, seller_id).await?;
    Ok(Json(ApiResponse::success(earnings)))
}

// ── Payouts ──

async fn list_payouts(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PayoutListQuery>,
) -> ApiResult<Vec<Payout>> {
    let payouts = payouts::list_seller_payouts(&state, identity.user_id, query).await?;
    Ok(Json(ApiResponse::success(payouts)))
}

async fn get_payout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(payout_id): Path<i64>,
) -> ApiResult<Payout> {
    let payout = payouts::get_seller_payout(&state, identity.user_id, payout_id).await?;
    Ok(Json(ApiResponse::success(payout)))
}

async fn request_payout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreatePayoutRequest>,
) -> ApiResult<Payout> {
    let payout = payouts::request_payout(&state, identity.user_id, req).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Payout requested",
        payout,
    )))
}

// ── KYC ──

async fn kyc_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<KycStatus> {
    let status = kyc::kyc_status(&state, identity.user_id).await?;
    Ok(Json(ApiResponse::success(status)))
}

async fn submit_pan(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SubmitPanRequest>,
) -> ApiResult<KycRecord> {
    let record = kyc::submit_pan(&state, identity.user_id, req).await?;
    Ok(Json(ApiResponse::success(record)))
}

async fn submit_aadhaar(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SubmitAadhaarRequest>,
) -> ApiResult<KycRecord> {
    let record = kyc::submit_aadhaar(&state, identity.user_id, req).await?;
    Ok(Json(ApiResponse::success(record)))
}

async fn submit_bank(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SubmitBankRequest>,
) -> ApiResult<KycRecord> {
    let record = kyc::submit_bank(&state, identity.user_id, req).await?;
    Ok(Json(ApiResponse::success(record)))
}
