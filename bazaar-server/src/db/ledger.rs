use rust_decimal::Decimal;
use shared::models::{AdminWallet, CommissionSetting};
use sqlx::{PgConnection, PgPool};

use crate::store::WalletDelta;

#[derive(sqlx::FromRow)]
struct CommissionRow {
    id: i64,
    rate: Decimal,
    updated_by: Option<i64>,
    update_note: Option<String>,
    created_at: i64,
}

impl From<CommissionRow> for CommissionSetting {
    fn from(r: CommissionRow) -> Self {
        Self {
            id: r.id,
            rate: r.rate,
            updated_by: r.updated_by,
            update_note: r.update_note,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WalletRow {
    total_balance: Decimal,
    available_balance: Decimal,
    pending_payouts: Decimal,
    total_commission_earned: Decimal,
    total_payouts_processed: Decimal,
    updated_at: i64,
}

impl From<WalletRow> for AdminWallet {
    fn from(r: WalletRow) -> Self {
        Self {
            total_balance: r.total_balance,
            available_balance: r.available_balance,
            pending_payouts: r.pending_payouts,
            total_commission_earned: r.total_commission_earned,
            total_payouts_processed: r.total_payouts_processed,
            updated_at: r.updated_at,
        }
    }
}

pub async fn commission_history(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<CommissionSetting>, sqlx::Error> {
    let rows: Vec<CommissionRow> = sqlx::query_as(
        "SELECT id, rate, updated_by, update_note, created_at FROM commission_settings
         ORDER BY created_at DESC, id DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn insert_commission(
    pool: &PgPool,
    setting: &CommissionSetting,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO commission_settings (id, rate, updated_by, update_note, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(setting.id)
    .bind(setting.rate)
    .bind(setting.updated_by)
    .bind(&setting.update_note)
    .bind(setting.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn wallet(pool: &PgPool) -> Result<AdminWallet, sqlx::Error> {
    let row: WalletRow = sqlx::query_as(
        "SELECT total_balance, available_balance, pending_payouts,
                total_commission_earned, total_payouts_processed, updated_at
         FROM admin_wallet WHERE id = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Lock the wallet row and read its available balance
pub async fn lock_available_balance(conn: &mut PgConnection) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar("SELECT available_balance FROM admin_wallet WHERE id = 1 FOR UPDATE")
        .fetch_one(&mut *conn)
        .await
}

pub async fn apply_wallet_delta(
    conn: &mut PgConnection,
    delta: &WalletDelta,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE admin_wallet SET
            total_balance = total_balance + $1,
            available_balance = available_balance + $2,
            pending_payouts = pending_payouts + $3,
            total_commission_earned = total_commission_earned + $4,
            total_payouts_processed = total_payouts_processed + $5,
            updated_at = $6
         WHERE id = 1",
    )
    .bind(delta.total_balance)
    .bind(delta.available_balance)
    .bind(delta.pending_payouts)
    .bind(delta.total_commission_earned)
    .bind(delta.total_payouts_processed)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
