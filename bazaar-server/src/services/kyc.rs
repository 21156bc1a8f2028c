//! Seller KYC: PAN, Aadhaar and bank details
//!
//! Identifiers are normalised, format-checked, then stored only as a salted
//! argon2 hash plus their last four characters. A verified record is
//! locked until an admin revokes it.

use shared::error::{AppError, ErrorCode};
use shared::models::{
    KycKind, KycRecord, KycStatus, SubmitAadhaarRequest, SubmitBankRequest, SubmitPanRequest,
    VerifyKycRequest,
};
use shared::util::now_millis;

use super::seller_of;
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::store::KycSubmission;
use crate::util::{hash_identifier, last4};

/// Uppercase and drop spaces and hyphens
fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// `AAAAA9999A`
pub fn is_valid_pan(pan: &str) -> bool {
    let b = pan.as_bytes();
    b.len() == 10
        && b[..5].iter().all(u8::is_ascii_uppercase)
        && b[5..9].iter().all(u8::is_ascii_digit)
        && b[9].is_ascii_uppercase()
}

/// 12 digits
pub fn is_valid_aadhaar(aadhaar: &str) -> bool {
    aadhaar.len() == 12 && aadhaar.bytes().all(|b| b.is_ascii_digit())
}

/// 9 to 18 digits
pub fn is_valid_account_number(account: &str) -> bool {
    (9..=18).contains(&account.len()) && account.bytes().all(|b| b.is_ascii_digit())
}

/// `AAAA0XXXXXX`: bank code, a literal zero, branch code
pub fn is_valid_ifsc(ifsc: &str) -> bool {
    let b = ifsc.as_bytes();
    b.len() == 11
        && b[..4].iter().all(u8::is_ascii_uppercase)
        && b[4] == b'0'
        && b[5..].iter().all(u8::is_ascii_alphanumeric)
}

fn invalid_identifier(kind: KycKind, message: &str) -> AppError {
    AppError::with_message(ErrorCode::KycInvalidIdentifier, message)
        .with_detail("kind", kind.as_str())
}

fn holder_name(raw: &str, kind: KycKind) -> Result<String, AppError> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(AppError::validation("Holder name is required").with_detail("kind", kind.as_str()));
    }
    Ok(name)
}

async fn submit(
    state: &AppState,
    seller_user_id: i64,
    kind: KycKind,
    holder: String,
    identifier: String,
    ifsc_code: Option<String>,
) -> ServiceResult<KycRecord> {
    let seller_id = seller_of(state, seller_user_id).await?;
    let identifier_hash = hash_identifier(&identifier).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash KYC identifier");
        AppError::new(ErrorCode::InternalError)
    })?;

    let record = state
        .store()
        .upsert_kyc(&KycSubmission {
            seller_id,
            kind,
            holder_name: holder,
            identifier_hash,
            identifier_last4: last4(&identifier),
            ifsc_code,
            now: now_millis(),
        })
        .await?;

    tracing::info!(seller_id, kind = %kind, "KYC details submitted");
    Ok(record)
}

pub async fn submit_pan(
    state: &AppState,
    seller_user_id: i64,
    req: SubmitPanRequest,
) -> ServiceResult<KycRecord> {
    let pan = normalize(&req.pan_number);
    if !is_valid_pan(&pan) {
        return Err(invalid_identifier(KycKind::Pan, "PAN must look like ABCDE1234F").into());
    }
    let holder = holder_name(&req.holder_name, KycKind::Pan)?;
    submit(state, seller_user_id, KycKind::Pan, holder, pan, None).await
}

pub async fn submit_aadhaar(
    state: &AppState,
    seller_user_id: i64,
    req: SubmitAadhaarRequest,
) -> ServiceResult<KycRecord> {
    let aadhaar = normalize(&req.aadhaar_number);
    if !is_valid_aadhaar(&aadhaar) {
        return Err(invalid_identifier(KycKind::Aadhaar, "Aadhaar number must be 12 digits").into());
    }
    let holder = holder_name(&req.holder_name, KycKind::Aadhaar)?;
    submit(state, seller_user_id, KycKind::Aadhaar, holder, aadhaar, None).await
}

pub async fn submit_bank(
    state: &AppState,
    seller_user_id: i64,
    req: SubmitBankRequest,
) -> ServiceResult<KycRecord> {
    let account = normalize(&req.account_number);
    if !is_valid_account_number(&account) {
        return Err(
            invalid_identifier(KycKind::Bank, "Account number must be 9 to 18 digits").into(),
        );
    }
    let ifsc = normalize(&req.ifsc_code);
    if !is_valid_ifsc(&ifsc) {
        return Err(invalid_identifier(KycKind::Bank, "IFSC must look like SBIN0001234").into());
    }
    let holder = holder_name(&req.account_holder_name, KycKind::Bank)?;
    submit(state, seller_user_id, KycKind::Bank, holder, account, Some(ifsc)).await
}

/// Status of the calling seller
pub async fn kyc_status(state: &AppState, seller_user_id: i64) -> ServiceResult<KycStatus> {
    let seller_id = seller_of(state, seller_user_id).await?;
    Ok(KycStatus::from_records(
        state.store().kyc_records(seller_id).await?,
    ))
}

/// Admin sets or revokes verification of one kind
pub async fn set_verified(
    state: &AppState,
    admin_id: i64,
    seller_id: i64,
    kind: KycKind,
    req: VerifyKycRequest,
) -> ServiceResult<KycRecord> {
    let record = state
        .store()
        .set_kyc_verified(seller_id, kind, req.verified, now_millis())
        .await?
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::KycNotFound, format!("No {kind} details submitted"))
                .with_detail("seller_id", seller_id)
                .with_detail("kind", kind.as_str())
        })?;

    tracing::info!(admin_id, seller_id, kind = %kind, verified = req.verified, "KYC verification set");
    Ok(record)
}
