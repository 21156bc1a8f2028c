use rust_decimal::Decimal;
use shared::models::{Payout, PayoutStatus};
use sqlx::PgPool;

use super::ledger::{apply_wallet_delta, lock_available_balance};
use super::parse_column;
use crate::store::{
    ClaimEffect, PayoutFilter, PayoutTransition, StoreError, StoreResult, WalletDelta,
};

const PAYOUT_COLUMNS: &str = "id, seller_id, store_id, gross_amount, commission_amount, amount, \
     commission_rate, order_ids, status, request_notes, admin_notes, transaction_id, \
     processed_by, processed_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PayoutRow {
    id: i64,
    seller_id: i64,
    store_id: Option<i64>,
    gross_amount: Decimal,
    commission_amount: Decimal,
    amount: Decimal,
    commission_rate: Decimal,
    order_ids: Vec<i64>,
    status: String,
    request_notes: Option<String>,
    admin_notes: Option<String>,
    transaction_id: Option<String>,
    processed_by: Option<i64>,
    processed_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<PayoutRow> for Payout {
    type Error = StoreError;

    fn try_from(r: PayoutRow) -> StoreResult<Self> {
        Ok(Self {
            id: r.id,
            seller_id: r.seller_id,
            store_id: r.store_id,
            gross_amount: r.gross_amount,
            commission_amount: r.commission_amount,
            amount: r.amount,
            commission_rate: r.commission_rate,
            order_ids: r.order_ids,
            status: parse_column(&r.status)?,
            request_notes: r.request_notes,
            admin_notes: r.admin_notes,
            transaction_id: r.transaction_id,
            processed_by: r.processed_by,
            processed_at: r.processed_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Claim the orders and insert the payout in one transaction.
///
/// The claim only touches unclaimed, paid, non-cancelled orders; if fewer
/// rows change than were asked for, another request got there first.
pub async fn create(pool: &PgPool, payout: &Payout) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    let claimed = sqlx::query(
        "UPDATE orders SET payout_id = $1, payout_status = 'requested', updated_at = $3
         WHERE id = ANY($2) AND payout_id IS NULL AND payment_received AND status <> 'cancelled'",
    )
    .bind(payout.id)
    .bind(&payout.order_ids)
    .bind(payout.created_at)
    .execute(&mut *tx)
    .await?;
    if claimed.rows_affected() != payout.order_ids.len() as u64 {
        return Err(StoreError::OrderClaimed);
    }

    sqlx::query(
        "INSERT INTO payouts (id, seller_id, store_id, gross_amount, commission_amount, amount,
            commission_rate, order_ids, status, request_notes, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(payout.id)
    .bind(payout.seller_id)
    .bind(payout.store_id)
    .bind(payout.gross_amount)
    .bind(payout.commission_amount)
    .bind(payout.amount)
    .bind(payout.commission_rate)
    .bind(&payout.order_ids)
    .bind(payout.status.as_str())
    .bind(&payout.request_notes)
    .bind(payout.created_at)
    .bind(payout.updated_at)
    .execute(&mut *tx)
    .await?;

    apply_wallet_delta(
        &mut tx,
        &WalletDelta::payout_requested(payout.amount),
        payout.created_at,
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn find(pool: &PgPool, payout_id: i64) -> StoreResult<Option<Payout>> {
    let row: Option<PayoutRow> =
        sqlx::query_as(&format!("SELECT {PAYOUT_COLUMNS} FROM payouts WHERE id = $1"))
            .bind(payout_id)
            .fetch_optional(pool)
            .await?;
    row.map(Payout::try_from).transpose()
}

pub async fn list(pool: &PgPool, filter: &PayoutFilter) -> StoreResult<Vec<Payout>> {
    let rows: Vec<PayoutRow> = sqlx::query_as(&format!(
        "SELECT {PAYOUT_COLUMNS} FROM payouts
         WHERE ($1::BIGINT IS NULL OR seller_id = $1)
           AND ($2::TEXT IS NULL OR status = $2)
         ORDER BY created_at DESC, id DESC
         LIMIT $3 OFFSET $4"
    ))
    .bind(filter.seller_id)
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Payout::try_from).collect()
}

pub async fn transition(pool: &PgPool, t: &PayoutTransition) -> StoreResult<Payout> {
    let mut tx = pool.begin().await?;

    let row: Option<PayoutRow> = sqlx::query_as(&format!(
        "SELECT {PAYOUT_COLUMNS} FROM payouts WHERE id = $1 FOR UPDATE"
    ))
    .bind(t.payout_id)
    .fetch_optional(&mut *tx)
    .await?;
    let payout = Payout::try_from(row.ok_or(StoreError::NotFound)?)?;
    if payout.status != t.from {
        return Err(StoreError::PayoutState {
            payout_id: payout.id,
            current: payout.status,
        });
    }

    if t.from == PayoutStatus::Requested && t.to == PayoutStatus::Approved {
        let available = lock_available_balance(&mut tx).await?;
        if available < payout.amount {
            return Err(StoreError::InsufficientBalance {
                available,
                required: payout.amount,
            });
        }
    }

    apply_wallet_delta(
        &mut tx,
        &WalletDelta::payout_transition(t.from, t.to, payout.amount),
        t.now,
    )
    .await?;

    match ClaimEffect::of(t.to) {
        ClaimEffect::Mark(status) => {
            sqlx::query(
                "UPDATE orders SET payout_status = $2, updated_at = $3 WHERE payout_id = $1",
            )
            .bind(payout.id)
            .bind(status.as_str())
            .bind(t.now)
            .execute(&mut *tx)
            .await?;
        }
        ClaimEffect::Release => {
            sqlx::query(
                "UPDATE orders SET payout_id = NULL, payout_status = 'pending', updated_at = $2
                 WHERE payout_id = $1",
            )
            .bind(payout.id)
            .bind(t.now)
            .execute(&mut *tx)
            .await?;
        }
    }

    let row: PayoutRow = sqlx::query_as(&format!(
        "UPDATE payouts SET status = $2,
            admin_notes = COALESCE($3, admin_notes),
            transaction_id = COALESCE($4, transaction_id),
            processed_by = $5, processed_at = $6, updated_at = $6
         WHERE id = $1
         RETURNING {PAYOUT_COLUMNS}"
    ))
    .bind(payout.id)
    .bind(t.to.as_str())
    .bind(&t.admin_notes)
    .bind(&t.transaction_id)
    .bind(t.processed_by)
    .bind(t.now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    row.try_into()
}
