use shared::models::{KycKind, KycRecord};
use sqlx::PgPool;

use super::parse_column;
use crate::store::{KycSubmission, StoreError, StoreResult};

const KYC_COLUMNS: &str = "seller_id, kind, holder_name, identifier_last4, ifsc_code, verified, \
     submitted_at, verified_at";

#[derive(sqlx::FromRow)]
struct KycRow {
    seller_id: i64,
    kind: String,
    holder_name: String,
    identifier_last4: String,
    ifsc_code: Option<String>,
    verified: bool,
    submitted_at: i64,
    verified_at: Option<i64>,
}

impl TryFrom<KycRow> for KycRecord {
    type Error = StoreError;

    fn try_from(r: KycRow) -> StoreResult<Self> {
        Ok(Self {
            seller_id: r.seller_id,
            kind: parse_column(&r.kind)?,
            holder_name: r.holder_name,
            identifier_last4: r.identifier_last4,
            ifsc_code: r.ifsc_code,
            verified: r.verified,
            submitted_at: r.submitted_at,
            verified_at: r.verified_at,
        })
    }
}

pub async fn list(pool: &PgPool, seller_id: i64) -> StoreResult<Vec<KycRecord>> {
    let rows: Vec<KycRow> = sqlx::query_as(&format!(
        "SELECT {KYC_COLUMNS} FROM kyc_records WHERE seller_id = $1 ORDER BY kind"
    ))
    .bind(seller_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(KycRecord::try_from).collect()
}

/// Replace an unverified record; a verified one stays untouched
pub async fn upsert(pool: &PgPool, s: &KycSubmission) -> StoreResult<KycRecord> {
    let row: Option<KycRow> = sqlx::query_as(&format!(
        "INSERT INTO kyc_records (seller_id, kind, holder_name, identifier_hash,
            identifier_last4, ifsc_code, verified, submitted_at)
         VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
         ON CONFLICT (seller_id, kind) DO UPDATE SET
            holder_name = EXCLUDED.holder_name,
            identifier_hash = EXCLUDED.identifier_hash,
            identifier_last4 = EXCLUDED.identifier_last4,
            ifsc_code = EXCLUDED.ifsc_code,
            verified = FALSE,
            verified_at = NULL,
            submitted_at = EXCLUDED.submitted_at
         WHERE kyc_records.verified = FALSE
         RETURNING {KYC_COLUMNS}"
    ))
    .bind(s.seller_id)
    .bind(s.kind.as_str())
    .bind(&s.holder_name)
    .bind(&s.identifier_hash)
    .bind(&s.identifier_last4)
    .bind(&s.ifsc_code)
    .bind(s.now)
    .fetch_optional(pool)
    .await?;
    row.ok_or(StoreError::KycLocked(s.kind))?.try_into()
}

pub async fn set_verified(
    pool: &PgPool,
    seller_id: i64,
    kind: KycKind,
    verified: bool,
    now: i64,
) -> StoreResult<Option<KycRecord>> {
    let row: Option<KycRow> = sqlx::query_as(&format!(
        "UPDATE kyc_records SET verified = $3,
            verified_at = CASE WHEN $3 THEN $4::BIGINT ELSE NULL END
         WHERE seller_id = $1 AND kind = $2
         RETURNING {KYC_COLUMNS}"
    ))
    .bind(seller_id)
    .bind(kind.as_str())
    .bind(verified)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    row.map(KycRecord::try_from).transpose()
}
