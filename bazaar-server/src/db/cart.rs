use shared::models::CartItem;
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: i64,
    buyer_id: i64,
    product_id: i64,
    quantity: i32,
}

impl From<CartItemRow> for CartItem {
    fn from(r: CartItemRow) -> Self {
        Self {
            id: r.id,
            buyer_id: r.buyer_id,
            product_id: r.product_id,
            quantity: r.quantity,
        }
    }
}

pub async fn list(pool: &PgPool, buyer_id: i64) -> Result<Vec<CartItem>, sqlx::Error> {
    let rows: Vec<CartItemRow> = sqlx::query_as(
        "SELECT id, buyer_id, product_id, quantity FROM cart_items
         WHERE buyer_id = $1 ORDER BY created_at, id",
    )
    .bind(buyer_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Insert or merge into the existing line for the product.
///
/// `None` when the merged quantity would not fit an INTEGER; the existing
/// line is then left untouched.
pub async fn add(
    pool: &PgPool,
    id: i64,
    buyer_id: i64,
    product_id: i64,
    quantity: i32,
    now: i64,
) -> Result<Option<CartItem>, sqlx::Error> {
    let row: Option<CartItemRow> = sqlx::query_as(
        "INSERT INTO cart_items (id, buyer_id, product_id, quantity, created_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (buyer_id, product_id)
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
         WHERE cart_items.quantity <= 2147483647 - EXCLUDED.quantity
         RETURNING id, buyer_id, product_id, quantity",
    )
    .bind(id)
    .bind(buyer_id)
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn set_quantity(
    pool: &PgPool,
    buyer_id: i64,
    item_id: i64,
    quantity: i32,
) -> Result<Option<CartItem>, sqlx::Error> {
    let row: Option<CartItemRow> = sqlx::query_as(
        "UPDATE cart_items SET quantity = $3 WHERE id = $1 AND buyer_id = $2
         RETURNING id, buyer_id, product_id, quantity",
    )
    .bind(item_id)
    .bind(buyer_id)
    .bind(quantity)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn remove(pool: &PgPool, buyer_id: i64, item_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND buyer_id = $2")
        .bind(item_id)
        .bind(buyer_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn remove_product(
    pool: &PgPool,
    buyer_id: i64,
    product_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE buyer_id = $1 AND product_id = $2")
        .bind(buyer_id)
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear(pool: &PgPool, buyer_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_items WHERE buyer_id = $1")
        .bind(buyer_id)
        .execute(pool)
        .await?;
    Ok(())
}
