//! Admin API: payout processing, platform wallet, commission and KYC review

use axum::extract::{Extension, Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::error::{ApiResponse, AppError};
use shared::models::{
    AdminWallet, CommissionSetting, CompletePayoutRequest, FailPayoutRequest, KycKind,
    KycRecord, Payout, PayoutListQuery, ProcessPayoutRequest, UpdateCommissionRequest,
    VerifyKycRequest,
};

use super::ApiResult;
use crate::auth::Identity;
use crate::auth::identity::{identity_auth_middleware, require_admin};
use crate::services::{kyc, ledger, payouts};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/payouts", get(list_payouts))
        .route("/payouts/{id}/process", post(process_payout))
        .route("/payouts/{id}/start", post(start_payout))
        .route("/payouts/{id}/complete", post(complete_payout))
        .route("/payouts/{id}/fail", post(fail_payout))
        .route("/wallet", get(wallet))
        .route("/commission", get(get_commission).put(update_commission))
        .route("/sellers/{seller_id}/kyc/{kind}/verify", put(verify_kyc))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            identity_auth_middleware,
        ))
}

#[derive(Serialize)]
struct CommissionResponse {
    rate: Decimal,
    history: Vec<CommissionSetting>,
}

// ── Payouts ──

async fn list_payouts(
    State(state): State<AppState>,
    Query(query): Query<PayoutListQuery>,
) -> ApiResult<Vec<Payout>> {
    let payouts = payouts::list_payouts(&state, query).await?;
    Ok(Json(ApiResponse::success(payouts)))
}

async fn process_payout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(payout_id): Path<i64>,
    Json(req): Json<ProcessPayoutRequest>,
) -> ApiResult<Payout> {
    let payout = payouts::process_payout(&state, identity.user_id, payout_id, req).await?;
    Ok(Json(ApiResponse::success(payout)))
}

async fn start_payout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(payout_id): Path<i64>,
) -> ApiResult<Payout> {
    let payout = payouts::start_processing(&state, identity.user_id, payout_id).await?;
    Ok(Json(ApiResponse::success(payout)))
}

async fn complete_payout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(payout_id): Path<i64>,
    Json(req): Json<CompletePayoutRequest>,
) -> ApiResult<Payout> {
    let payout = payouts::complete_payout(&state, identity.user_id, payout_id, req).await?;
    Ok(Json(ApiResponse::success(payout)))
}

async fn fail_payout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(payout_id): Path<i64>,
    Json(req): Json<FailPayoutRequest>,
) -> ApiResult<Payout> {
    let payout = payouts::fail_payout(&state, identity.user_id, payout_id, req).await?;
    Ok(Json(ApiResponse::success(payout)))
}

// ── Wallet & commission ──

async fn wallet(State(state): State<AppState>) -> ApiResult<AdminWallet> {
    let wallet = ledger::wallet(&state).await?;
    Ok(Json(ApiResponse::success(wallet)))
}

async fn get_commission(State(state): State<AppState>) -> ApiResult<CommissionResponse> {
    let settings = ledger::get_commission_settings(&state).await?;
    Ok(Json(ApiResponse::success(CommissionResponse {
        rate: settings.rate,
        history: settings.history,
    })))
}

async fn update_commission(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UpdateCommissionRequest>,
) -> ApiResult<CommissionSetting> {
    let setting = ledger::update_commission_rate(&state, identity.user_id, req).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Commission rate updated",
        setting,
    )))
}

// ── KYC ──

async fn verify_kyc(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((seller_id, kind)): Path<(i64, String)>,
    Json(req): Json<VerifyKycRequest>,
) -> ApiResult<KycRecord> {
    let kind: KycKind = kind
        .parse()
        .map_err(|e: shared::models::ParseEnumError| AppError::validation(e.to_string()))?;
    let record = kyc::set_verified(&state, identity.user_id, seller_id, kind, req).await?;
    Ok(Json(ApiResponse::success(record)))
}
