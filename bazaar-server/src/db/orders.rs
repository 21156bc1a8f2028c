use rust_decimal::Decimal;
use shared::models::{Order, OrderItem, OrderStatus};
use sqlx::{PgConnection, PgPool};
use std::collections::BTreeMap;

use super::ledger::apply_wallet_delta;
use super::parse_column;
use crate::store::{
    OrderFilter, OrderTransition, PlacementRequest, StoreError, StoreResult, WalletDelta,
};

const ORDER_COLUMNS: &str = "id, buyer_id, store_id, address_id, status, total_amount, \
     admin_commission, seller_amount, commission_rate, payment_received, payout_status, \
     payout_id, tracking_number, seller_notes, version, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct OrderRow {
    id: i64,
    buyer_id: i64,
    store_id: i64,
    address_id: i64,
    status: String,
    total_amount: Decimal,
    admin_commission: Decimal,
    seller_amount: Decimal,
    commission_rate: Decimal,
    payment_received: bool,
    payout_status: String,
    payout_id: Option<i64>,
    tracking_number: Option<String>,
    seller_notes: Option<String>,
    version: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(r: OrderRow) -> StoreResult<Self> {
        Ok(Self {
            id: r.id,
            buyer_id: r.buyer_id,
            store_id: r.store_id,
            address_id: r.address_id,
            status: parse_column(&r.status)?,
            total_amount: r.total_amount,
            admin_commission: r.admin_commission,
            seller_amount: r.seller_amount,
            commission_rate: r.commission_rate,
            payment_received: r.payment_received,
            payout_status: parse_column(&r.payout_status)?,
            payout_id: r.payout_id,
            tracking_number: r.tracking_number,
            seller_notes: r.seller_notes,
            version: r.version,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    quantity: i32,
    price_at_purchase: Decimal,
    title: String,
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        Self {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            quantity: r.quantity,
            price_at_purchase: r.price_at_purchase,
            title: r.title,
        }
    }
}

/// Current status of an order after a failed CAS
async fn conflict_or_missing(
    conn: &mut PgConnection,
    order_id: i64,
    buyer_id: Option<i64>,
) -> StoreError {
    let status: Result<Option<String>, sqlx::Error> = sqlx::query_scalar(
        "SELECT status FROM orders WHERE id = $1 AND ($2::BIGINT IS NULL OR buyer_id = $2)",
    )
    .bind(order_id)
    .bind(buyer_id)
    .fetch_optional(&mut *conn)
    .await;
    match status {
        Ok(Some(s)) => match parse_column::<OrderStatus>(&s) {
            Ok(current) => StoreError::OrderState { order_id, current },
            Err(e) => e,
        },
        Ok(None) => StoreError::NotFound,
        Err(e) => e.into(),
    }
}

/// Write a whole checkout in one transaction.
///
/// Stock is decremented first, in product id order, so concurrent checkouts
/// lock product rows in the same sequence.
pub async fn place(pool: &PgPool, request: &PlacementRequest) -> StoreResult<Vec<Order>> {
    let mut tx = pool.begin().await?;

    let mut wanted: BTreeMap<i64, i32> = BTreeMap::new();
    for item in request.groups.iter().flat_map(|g| &g.items) {
        *wanted.entry(item.product_id).or_default() += item.quantity;
    }
    for (product_id, quantity) in wanted {
        let updated = sqlx::query(
            "UPDATE products SET quantity = quantity - $1 WHERE id = $2 AND quantity >= $1",
        )
        .bind(quantity)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            let available: Option<i32> =
                sqlx::query_scalar("SELECT quantity FROM products WHERE id = $1")
                    .bind(product_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(StoreError::InsufficientStock {
                product_id,
                available: available.unwrap_or(0),
            });
        }
    }

    let mut orders = Vec::with_capacity(request.groups.len());
    for group in &request.groups {
        let o = &group.order;
        sqlx::query(
            "INSERT INTO orders (id, buyer_id, store_id, address_id, status, total_amount,
                admin_commission, seller_amount, commission_rate, payment_received,
                payout_status, payout_id, version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(o.id)
        .bind(o.buyer_id)
        .bind(o.store_id)
        .bind(o.address_id)
        .bind(o.status.as_str())
        .bind(o.total_amount)
        .bind(o.admin_commission)
        .bind(o.seller_amount)
        .bind(o.commission_rate)
        .bind(o.payment_received)
        .bind(o.payout_status.as_str())
        .bind(o.payout_id)
        .bind(o.version)
        .bind(o.created_at)
        .bind(o.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &group.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, quantity, price_at_purchase, title)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price_at_purchase)
            .bind(&item.title)
            .execute(&mut *tx)
            .await?;
        }
        orders.push(o.clone());
    }

    if !request.cart_item_ids.is_empty() {
        sqlx::query("DELETE FROM cart_items WHERE buyer_id = $1 AND id = ANY($2)")
            .bind(request.buyer_id)
            .bind(request.cart_item_ids.as_slice())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(orders)
}

pub async fn cancel(pool: &PgPool, buyer_id: i64, order_id: i64, now: i64) -> StoreResult<Order> {
    let mut tx = pool.begin().await?;

    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "UPDATE orders SET status = 'cancelled', version = version + 1, updated_at = $3
         WHERE id = $1 AND buyer_id = $2 AND status = 'pending'
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(buyer_id)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(row) = row else {
        return Err(conflict_or_missing(&mut tx, order_id, Some(buyer_id)).await);
    };

    sqlx::query(
        "UPDATE products p SET quantity = p.quantity + s.qty
         FROM (SELECT product_id, SUM(quantity)::INTEGER AS qty
               FROM order_items WHERE order_id = $1 GROUP BY product_id) s
         WHERE p.id = s.product_id",
    )
    .bind(order_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    row.try_into()
}

pub async fn advance(pool: &PgPool, t: &OrderTransition) -> StoreResult<Order> {
    let mut tx = pool.begin().await?;

    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "UPDATE orders SET status = $2, version = version + 1, updated_at = $5,
            payment_received = payment_received OR $2 = 'paid',
            tracking_number = COALESCE($6, tracking_number),
            seller_notes = COALESCE($7, seller_notes)
         WHERE id = $1 AND status = $3 AND version = $4
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(t.order_id)
    .bind(t.to.as_str())
    .bind(t.from.as_str())
    .bind(t.expected_version)
    .bind(t.now)
    .bind(t.tracking_number.as_deref())
    .bind(t.seller_notes.as_deref())
    .fetch_optional(&mut *tx)
    .await?;
    let Some(row) = row else {
        return Err(conflict_or_missing(&mut tx, t.order_id, None).await);
    };
    let order = Order::try_from(row)?;

    if t.to == OrderStatus::Paid {
        apply_wallet_delta(&mut tx, &WalletDelta::payment(&order), t.now).await?;
    }

    tx.commit().await?;
    Ok(order)
}

pub async fn find(pool: &PgPool, order_id: i64) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> =
        sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id)
            .fetch_optional(pool)
            .await?;
    row.map(Order::try_from).transpose()
}

pub async fn items(pool: &PgPool, order_ids: &[i64]) -> Result<Vec<OrderItem>, sqlx::Error> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(
        "SELECT id, order_id, product_id, quantity, price_at_purchase, title
         FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, id",
    )
    .bind(order_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn list(pool: &PgPool, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE ($1::BIGINT IS NULL OR buyer_id = $1)
           AND ($2::BIGINT[] IS NULL OR store_id = ANY($2))
           AND ($3::TEXT IS NULL OR status = $3)
         ORDER BY created_at DESC, id DESC
         LIMIT $4 OFFSET $5"
    ))
    .bind(filter.buyer_id)
    .bind(filter.store_ids.as_deref())
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;
    into_orders(rows)
}

pub async fn for_seller(
    pool: &PgPool,
    seller_id: i64,
    store_id: Option<i64>,
) -> StoreResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE store_id IN (SELECT id FROM stores WHERE seller_id = $1)
           AND ($2::BIGINT IS NULL OR store_id = $2)
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(seller_id)
    .bind(store_id)
    .fetch_all(pool)
    .await?;
    into_orders(rows)
}
