use rust_decimal::Decimal;
use shared::models::{Address, Product, Store};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    store_id: i64,
    store_name: String,
    title: String,
    price: Decimal,
    quantity: i32,
    store_active: bool,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            store_id: r.store_id,
            store_name: r.store_name,
            title: r.title,
            price: r.price,
            quantity: r.quantity,
            store_active: r.store_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: i64,
    seller_id: i64,
    name: String,
    slug: String,
    is_active: bool,
}

impl From<StoreRow> for Store {
    fn from(r: StoreRow) -> Self {
        Self {
            id: r.id,
            seller_id: r.seller_id,
            name: r.name,
            slug: r.slug,
            is_active: r.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: i64,
    buyer_id: i64,
    name: String,
    phone: String,
    line1: String,
    line2: Option<String>,
    city: String,
    state: String,
    country: String,
    pincode: String,
}

impl From<AddressRow> for Address {
    fn from(r: AddressRow) -> Self {
        Self {
            id: r.id,
            buyer_id: r.buyer_id,
            name: r.name,
            phone: r.phone,
            line1: r.line1,
            line2: r.line2,
            city: r.city,
            state: r.state,
            country: r.country,
            pincode: r.pincode,
        }
    }
}

pub async fn find_address(
    pool: &PgPool,
    buyer_id: i64,
    address_id: i64,
) -> Result<Option<Address>, sqlx::Error> {
    let row: Option<AddressRow> =
        sqlx::query_as("SELECT * FROM addresses WHERE id = $1 AND buyer_id = $2")
            .bind(address_id)
            .bind(buyer_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(Into::into))
}

pub async fn find_products(pool: &PgPool, ids: &[i64]) -> Result<Vec<Product>, sqlx::Error> {
    let rows: Vec<ProductRow> = sqlx::query_as(
        "SELECT p.id, p.store_id, s.name AS store_name, p.title, p.price, p.quantity,
                s.is_active AS store_active
         FROM products p
         JOIN stores s ON s.id = p.store_id
         WHERE p.id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn find_stores(pool: &PgPool, ids: &[i64]) -> Result<Vec<Store>, sqlx::Error> {
    let rows: Vec<StoreRow> = sqlx::query_as(
        "SELECT id, seller_id, name, slug, is_active FROM stores WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn stores_for_seller(pool: &PgPool, seller_id: i64) -> Result<Vec<Store>, sqlx::Error> {
    let rows: Vec<StoreRow> = sqlx::query_as(
        "SELECT id, seller_id, name, slug, is_active FROM stores WHERE seller_id = $1 ORDER BY id",
    )
    .bind(seller_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn seller_id_for_user(pool: &PgPool, user_id: i64) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM sellers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}
