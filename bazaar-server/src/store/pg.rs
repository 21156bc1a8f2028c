//! PostgreSQL [`MarketStore`], delegating to the `db` modules

use async_trait::async_trait;
use shared::models::{
    Address, AdminWallet, CartItem, CommissionSetting, KycKind, KycRecord, Order, OrderItem,
    Payout, Product, Store,
};
use shared::util::{now_millis, snowflake_id};
use sqlx::PgPool;

use super::{
    KycSubmission, MarketStore, OrderFilter, OrderTransition, PayoutFilter, PayoutTransition,
    PlacementRequest, StoreError, StoreResult,
};
use crate::db;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn find_address(&self, buyer_id: i64, address_id: i64) -> StoreResult<Option<Address>> {
        Ok(db::catalog::find_address(&self.pool, buyer_id, address_id).await?)
    }

    async fn find_products(&self, ids: &[i64]) -> StoreResult<Vec<Product>> {
        Ok(db::catalog::find_products(&self.pool, ids).await?)
    }

    async fn find_stores(&self, ids: &[i64]) -> StoreResult<Vec<Store>> {
        Ok(db::catalog::find_stores(&self.pool, ids).await?)
    }

    async fn stores_for_seller(&self, seller_id: i64) -> StoreResult<Vec<Store>> {
        Ok(db::catalog::stores_for_seller(&self.pool, seller_id).await?)
    }

    async fn seller_id_for_user(&self, user_id: i64) -> StoreResult<Option<i64>> {
        Ok(db::catalog::seller_id_for_user(&self.pool, user_id).await?)
    }

    async fn cart_items(&self, buyer_id: i64) -> StoreResult<Vec<CartItem>> {
        Ok(db::cart::list(&self.pool, buyer_id).await?)
    }

    async fn add_cart_item(
        &self,
        buyer_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> StoreResult<CartItem> {
        let added = db::cart::add(
            &self.pool,
            snowflake_id(),
            buyer_id,
            product_id,
            quantity,
            now_millis(),
        )
        .await?;
        match added {
            Some(item) => Ok(item),
            None => {
                let available = db::catalog::find_products(&self.pool, &[product_id])
                    .await?
                    .first()
                    .map_or(0, |p| p.quantity);
                Err(StoreError::InsufficientStock {
                    product_id,
                    available,
                })
            }
        }
    }

    async fn set_cart_item_quantity(
        &self,
        buyer_id: i64,
        item_id: i64,
        quantity: i32,
    ) -> StoreResult<Option<CartItem>> {
        Ok(db::cart::set_quantity(&self.pool, buyer_id, item_id, quantity).await?)
    }

    async fn remove_cart_item(&self, buyer_id: i64, item_id: i64) -> StoreResult<bool> {
        Ok(db::cart::remove(&self.pool, buyer_id, item_id).await?)
    }

    async fn remove_cart_product(&self, buyer_id: i64, product_id: i64) -> StoreResult<bool> {
        Ok(db::cart::remove_product(&self.pool, buyer_id, product_id).await?)
    }

    async fn clear_cart(&self, buyer_id: i64) -> StoreResult<()> {
        Ok(db::cart::clear(&self.pool, buyer_id).await?)
    }

    async fn place_orders(&self, request: &PlacementRequest) -> StoreResult<Vec<Order>> {
        db::orders::place(&self.pool, request).await
    }

    async fn cancel_order(&self, buyer_id: i64, order_id: i64, now: i64) -> StoreResult<Order> {
        db::orders::cancel(&self.pool, buyer_id, order_id, now).await
    }

    async fn advance_order(&self, transition: &OrderTransition) -> StoreResult<Order> {
        db::orders::advance(&self.pool, transition).await
    }

    async fn get_order(&self, order_id: i64) -> StoreResult<Option<Order>> {
        db::orders::find(&self.pool, order_id).await
    }

    async fn order_items(&self, order_ids: &[i64]) -> StoreResult<Vec<OrderItem>> {
        Ok(db::orders::items(&self.pool, order_ids).await?)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        db::orders::list(&self.pool, filter).await
    }

    async fn seller_orders(
        &self,
        seller_id: i64,
        store_id: Option<i64>,
    ) -> StoreResult<Vec<Order>> {
        db::orders::for_seller(&self.pool, seller_id, store_id).await
    }

    async fn current_commission(&self) -> StoreResult<Option<CommissionSetting>> {
        Ok(db::ledger::commission_history(&self.pool, 1)
            .await?
            .into_iter()
            .next())
    }

    async fn commission_history(&self, limit: i64) -> StoreResult<Vec<CommissionSetting>> {
        Ok(db::ledger::commission_history(&self.pool, limit).await?)
    }

    async fn insert_commission(&self, setting: &CommissionSetting) -> StoreResult<()> {
        Ok(db::ledger::insert_commission(&self.pool, setting).await?)
    }

    async fn wallet(&self) -> StoreResult<AdminWallet> {
        Ok(db::ledger::wallet(&self.pool).await?)
    }

    async fn create_payout(&self, payout: &Payout) -> StoreResult<()> {
        db::payouts::create(&self.pool, payout).await
    }

    async fn get_payout(&self, payout_id: i64) -> StoreResult<Option<Payout>> {
        db::payouts::find(&self.pool, payout_id).await
    }

    async fn list_payouts(&self, filter: &PayoutFilter) -> StoreResult<Vec<Payout>> {
        db::payouts::list(&self.pool, filter).await
    }

    async fn transition_payout(&self, transition: &PayoutTransition) -> StoreResult<Payout> {
        db::payouts::transition(&self.pool, transition).await
    }

    async fn kyc_records(&self, seller_id: i64) -> StoreResult<Vec<KycRecord>> {
        db::kyc::list(&self.pool, seller_id).await
    }

    async fn upsert_kyc(&self, submission: &KycSubmission) -> StoreResult<KycRecord> {
        db::kyc::upsert(&self.pool, submission).await
    }

    async fn set_kyc_verified(
        &self,
        seller_id: i64,
        kind: KycKind,
        verified: bool,
        now: i64,
    ) -> StoreResult<Option<KycRecord>> {
        db::kyc::set_verified(&self.pool, seller_id, kind, verified, now).await
    }
}
