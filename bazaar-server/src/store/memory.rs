//! In-memory [`MarketStore`]
//!
//! All state sits behind one `tokio::sync::Mutex`, so every trait method is
//! trivially atomic. Multi-row writes validate first and mutate second.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    Address, AdminWallet, CartItem, CommissionSetting, KycKind, KycRecord, Order,
    OrderItem, OrderPayoutStatus, OrderStatus, Payout, PayoutStatus, Product, Store,
};
use shared::util::snowflake_id;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    ClaimEffect, KycSubmission, MarketStore, OrderFilter, OrderTransition, PayoutFilter,
    PayoutTransition, PlacementRequest, StoreError, StoreResult, WalletDelta,
};

#[derive(Debug, Clone)]
struct ProductRow {
    id: i64,
    store_id: i64,
    title: String,
    price: Decimal,
    quantity: i32,
}

#[derive(Default)]
struct MemoryData {
    /// user id -> seller id
    sellers: HashMap<i64, i64>,
    stores: HashMap<i64, Store>,
    products: HashMap<i64, ProductRow>,
    addresses: HashMap<i64, Address>,
    cart: Vec<CartItem>,
    orders: HashMap<i64, Order>,
    order_items: Vec<OrderItem>,
    commissions: Vec<CommissionSetting>,
    wallet: AdminWallet,
    payouts: HashMap<i64, Payout>,
    kyc: HashMap<(i64, KycKind), KycRecord>,
    kyc_hashes: HashMap<(i64, KycKind), String>,
}

impl MemoryData {
    fn product_view(&self, row: &ProductRow) -> Product {
        let store = self.stores.get(&row.store_id);
        Product {
            id: row.id,
            store_id: row.store_id,
            store_name: store.map(|s| s.name.clone()).unwrap_or_default(),
            title: row.title.clone(),
            price: row.price,
            quantity: row.quantity,
            store_active: store.is_some_and(|s| s.is_active),
        }
    }

    fn seller_store_ids(&self, seller_id: i64) -> Vec<i64> {
        self.stores
            .values()
            .filter(|s| s.seller_id == seller_id)
            .map(|s| s.id)
            .collect()
    }
}

/// Newest first: snowflake ids grow with time
fn sort_newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (i64, i64)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn page<T>(rows: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Seeding (catalog and address book collaborators) ==========

    /// Register a seller profile for `user_id`
    pub async fn insert_seller(&self, user_id: i64) -> i64 {
        let mut data = self.inner.lock().await;
        *data.sellers.entry(user_id).or_insert_with(snowflake_id)
    }

    pub async fn insert_store(&self, seller_id: i64, name: &str, is_active: bool) -> Store {
        let store = Store {
            id: snowflake_id(),
            seller_id,
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            is_active,
        };
        self.inner
            .lock()
            .await
            .stores
            .insert(store.id, store.clone());
        store
    }

    pub async fn set_store_active(&self, store_id: i64, is_active: bool) {
        if let Some(store) = self.inner.lock().await.stores.get_mut(&store_id) {
            store.is_active = is_active;
        }
    }

    pub async fn insert_product(
        &self,
        store_id: i64,
        title: &str,
        price: Decimal,
        quantity: i32,
    ) -> i64 {
        let id = snowflake_id();
        self.inner.lock().await.products.insert(
            id,
            ProductRow {
                id,
                store_id,
                title: title.to_string(),
                price,
                quantity,
            },
        );
        id
    }

    pub async fn insert_address(&self, buyer_id: i64, city: &str) -> i64 {
        let id = snowflake_id();
        self.inner.lock().await.addresses.insert(
            id,
            Address {
                id,
                buyer_id,
                name: "Default".to_string(),
                phone: "9000000000".to_string(),
                line1: "1 Market Road".to_string(),
                line2: None,
                city: city.to_string(),
                state: "Karnataka".to_string(),
                country: "IN".to_string(),
                pincode: "560001".to_string(),
            },
        );
        id
    }

    pub async fn product_stock(&self, product_id: i64) -> Option<i32> {
        self.inner
            .lock()
            .await
            .products
            .get(&product_id)
            .map(|p| p.quantity)
    }

    /// Stored identifier hash of a KYC record
    pub async fn kyc_hash(&self, seller_id: i64, kind: KycKind) -> Option<String> {
        self.inner
            .lock()
            .await
            .kyc_hashes
            .get(&(seller_id, kind))
            .cloned()
    }

    /// Small catalog for running the server without a database
    pub async fn with_demo_catalog() -> Self {
        let store = Self::new();
        let seller = store.insert_seller(1001).await;
        let books = store.insert_store(seller, "Paper Lantern Books", true).await;
        let crafts = store.insert_store(seller, "Loom and Clay", true).await;
        store
            .insert_product(books.id, "Field Notes", Decimal::new(24900, 2), 40)
            .await;
        store
            .insert_product(books.id, "Pocket Atlas", Decimal::new(59900, 2), 12)
            .await;
        store
            .insert_product(crafts.id, "Terracotta Mug", Decimal::new(34950, 2), 25)
            .await;
        store.insert_address(2001, "Bengaluru").await;
        store
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn find_address(&self, buyer_id: i64, address_id: i64) -> StoreResult<Option<Address>> {
        let data = self.inner.lock().await;
        Ok(data
            .addresses
            .get(&address_id)
            .filter(|a| a.buyer_id == buyer_id)
            .cloned())
    }

    async fn find_products(&self, ids: &[i64]) -> StoreResult<Vec<Product>> {
        let data = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| data.products.get(id))
            .map(|row| data.product_view(row))
            .collect())
    }

    async fn find_stores(&self, ids: &[i64]) -> StoreResult<Vec<Store>> {
        let data = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| data.stores.get(id).cloned())
            .collect())
    }

    async fn stores_for_seller(&self, seller_id: i64) -> StoreResult<Vec<Store>> {
        let data = self.inner.lock().await;
        let mut stores: Vec<Store> = data
            .stores
            .values()
            .filter(|s| s.seller_id == seller_id)
            .cloned()
            .collect();
        stores.sort_by_key(|s| s.id);
        Ok(stores)
    }

    async fn seller_id_for_user(&self, user_id: i64) -> StoreResult<Option<i64>> {
        Ok(self.inner.lock().await.sellers.get(&user_id).copied())
    }

    async fn cart_items(&self, buyer_id: i64) -> StoreResult<Vec<CartItem>> {
        let data = self.inner.lock().await;
        Ok(data
            .cart
            .iter()
            .filter(|c| c.buyer_id == buyer_id)
            .copied()
            .collect())
    }

    async fn add_cart_item(
        &self,
        buyer_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> StoreResult<CartItem> {
        let mut data = self.inner.lock().await;
        let available = data.products.get(&product_id).map_or(0, |p| p.quantity);
        if let Some(item) = data
            .cart
            .iter_mut()
            .find(|c| c.buyer_id == buyer_id && c.product_id == product_id)
        {
            item.quantity = item
                .quantity
                .checked_add(quantity)
                .ok_or(StoreError::InsufficientStock {
                    product_id,
                    available,
                })?;
            return Ok(*item);
        }
        let item = CartItem {
            id: snowflake_id(),
            buyer_id,
            product_id,
            quantity,
        };
        data.cart.push(item);
        Ok(item)
    }

    async fn set_cart_item_quantity(
        &self,
        buyer_id: i64,
        item_id: i64,
        quantity: i32,
    ) -> StoreResult<Option<CartItem>> {
        let mut data = self.inner.lock().await;
        Ok(data
            .cart
            .iter_mut()
            .find(|c| c.buyer_id == buyer_id && c.id == item_id)
            .map(|item| {
                item.quantity = quantity;
                *item
            }))
    }

    async fn remove_cart_item(&self, buyer_id: i64, item_id: i64) -> StoreResult<bool> {
        let mut data = self.inner.lock().await;
        let before = data.cart.len();
        data.cart
            .retain(|c| !(c.buyer_id == buyer_id && c.id == item_id));
        Ok(data.cart.len() != before)
    }

    async fn remove_cart_product(&self, buyer_id: i64, product_id: i64) -> StoreResult<bool> {
        let mut data = self.inner.lock().await;
        let before = data.cart.len();
        data.cart
            .retain(|c| !(c.buyer_id == buyer_id && c.product_id == product_id));
        Ok(data.cart.len() != before)
    }

    async fn clear_cart(&self, buyer_id: i64) -> StoreResult<()> {
        self.inner
            .lock()
            .await
            .cart
            .retain(|c| c.buyer_id != buyer_id);
        Ok(())
    }

    async fn place_orders(&self, request: &PlacementRequest) -> StoreResult<Vec<Order>> {
        let mut data = self.inner.lock().await;

        // Dry-run every decrement before touching anything
        let mut remaining: HashMap<i64, i32> = HashMap::new();
        for item in request.groups.iter().flat_map(|g| &g.items) {
            let stock = match remaining.get(&item.product_id) {
                Some(left) => *left,
                None => data
                    .products
                    .get(&item.product_id)
                    .map(|p| p.quantity)
                    .ok_or(StoreError::InsufficientStock {
                        product_id: item.product_id,
                        available: 0,
                    })?,
            };
            if stock < item.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: item.product_id,
                    available: stock,
                });
            }
            remaining.insert(item.product_id, stock - item.quantity);
        }

        for (product_id, left) in remaining {
            if let Some(product) = data.products.get_mut(&product_id) {
                product.quantity = left;
            }
        }
        let mut orders = Vec::with_capacity(request.groups.len());
        for group in &request.groups {
            data.orders.insert(group.order.id, group.order.clone());
            data.order_items.extend(group.items.iter().cloned());
            orders.push(group.order.clone());
        }
        data.cart.retain(|c| {
            c.buyer_id != request.buyer_id || !request.cart_item_ids.contains(&c.id)
        });
        Ok(orders)
    }

    async fn cancel_order(&self, buyer_id: i64, order_id: i64, now: i64) -> StoreResult<Order> {
        let mut data = self.inner.lock().await;
        let order = data
            .orders
            .get_mut(&order_id)
            .filter(|o| o.buyer_id == buyer_id)
            .ok_or(StoreError::NotFound)?;
        if order.status != OrderStatus::Pending {
            return Err(StoreError::OrderState {
                order_id,
                current: order.status,
            });
        }
        order.status = OrderStatus::Cancelled;
        order.version += 1;
        order.updated_at = now;
        let cancelled = order.clone();

        let restock: Vec<(i64, i32)> = data
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .map(|i| (i.product_id, i.quantity))
            .collect();
        for (product_id, quantity) in restock {
            if let Some(product) = data.products.get_mut(&product_id) {
                product.quantity += quantity;
            }
        }
        Ok(cancelled)
    }

    async fn advance_order(&self, transition: &OrderTransition) -> StoreResult<Order> {
        let mut data = self.inner.lock().await;
        let order = data
            .orders
            .get_mut(&transition.order_id)
            .ok_or(StoreError::NotFound)?;
        if order.status != transition.from || order.version != transition.expected_version {
            return Err(StoreError::OrderState {
                order_id: order.id,
                current: order.status,
            });
        }
        order.status = transition.to;
        order.version += 1;
        order.updated_at = transition.now;
        if let Some(tracking) = &transition.tracking_number {
            order.tracking_number = Some(tracking.clone());
        }
        if let Some(notes) = &transition.seller_notes {
            order.seller_notes = Some(notes.clone());
        }
        if transition.to == OrderStatus::Paid {
            order.payment_received = true;
        }
        let updated = order.clone();

        if transition.to == OrderStatus::Paid {
            WalletDelta::payment(&updated).apply(&mut data.wallet);
            data.wallet.updated_at = transition.now;
        }
        Ok(updated)
    }

    async fn get_order(&self, order_id: i64) -> StoreResult<Option<Order>> {
        Ok(self.inner.lock().await.orders.get(&order_id).cloned())
    }

    async fn order_items(&self, order_ids: &[i64]) -> StoreResult<Vec<OrderItem>> {
        let data = self.inner.lock().await;
        Ok(data
            .order_items
            .iter()
            .filter(|i| order_ids.contains(&i.order_id))
            .cloned()
            .collect())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let data = self.inner.lock().await;
        let mut orders: Vec<Order> = data
            .orders
            .values()
            .filter(|o| filter.buyer_id.is_none_or(|b| o.buyer_id == b))
            .filter(|o| {
                filter
                    .store_ids
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&o.store_id))
            })
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        sort_newest_first(&mut orders, |o| (o.created_at, o.id));
        Ok(page(orders, filter.limit, filter.offset))
    }

    async fn seller_orders(
        &self,
        seller_id: i64,
        store_id: Option<i64>,
    ) -> StoreResult<Vec<Order>> {
        let data = self.inner.lock().await;
        let store_ids = data.seller_store_ids(seller_id);
        let mut orders: Vec<Order> = data
            .orders
            .values()
            .filter(|o| store_ids.contains(&o.store_id))
            .filter(|o| store_id.is_none_or(|s| o.store_id == s))
            .cloned()
            .collect();
        sort_newest_first(&mut orders, |o| (o.created_at, o.id));
        Ok(orders)
    }

    async fn current_commission(&self) -> StoreResult<Option<CommissionSetting>> {
        Ok(self.inner.lock().await.commissions.last().cloned())
    }

    async fn commission_history(&self, limit: i64) -> StoreResult<Vec<CommissionSetting>> {
        let data = self.inner.lock().await;
        Ok(data
            .commissions
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert_commission(&self, setting: &CommissionSetting) -> StoreResult<()> {
        self.inner.lock().await.commissions.push(setting.clone());
        Ok(())
    }

    async fn wallet(&self) -> StoreResult<AdminWallet> {
        Ok(self.inner.lock().await.wallet.clone())
    }

    async fn create_payout(&self, payout: &Payout) -> StoreResult<()> {
        let mut data = self.inner.lock().await;
        let claimable = payout.order_ids.iter().all(|id| {
            data.orders.get(id).is_some_and(|o| {
                o.payout_id.is_none() && o.payment_received && o.status != OrderStatus::Cancelled
            })
        });
        if !claimable {
            return Err(StoreError::OrderClaimed);
        }

        for id in &payout.order_ids {
            if let Some(order) = data.orders.get_mut(id) {
                order.payout_id = Some(payout.id);
                order.payout_status = OrderPayoutStatus::Requested;
                order.updated_at = payout.created_at;
            }
        }
        data.payouts.insert(payout.id, payout.clone());
        WalletDelta::payout_requested(payout.amount).apply(&mut data.wallet);
        data.wallet.updated_at = payout.created_at;
        Ok(())
    }

    async fn get_payout(&self, payout_id: i64) -> StoreResult<Option<Payout>> {
        Ok(self.inner.lock().await.payouts.get(&payout_id).cloned())
    }

    async fn list_payouts(&self, filter: &PayoutFilter) -> StoreResult<Vec<Payout>> {
        let data = self.inner.lock().await;
        let mut payouts: Vec<Payout> = data
            .payouts
            .values()
            .filter(|p| filter.seller_id.is_none_or(|s| p.seller_id == s))
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        sort_newest_first(&mut payouts, |p| (p.created_at, p.id));
        Ok(page(payouts, filter.limit, filter.offset))
    }

    async fn transition_payout(&self, transition: &PayoutTransition) -> StoreResult<Payout> {
        let mut data = self.inner.lock().await;
        let payout = data
            .payouts
            .get(&transition.payout_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        if payout.status != transition.from {
            return Err(StoreError::PayoutState {
                payout_id: payout.id,
                current: payout.status,
            });
        }
        if transition.from == PayoutStatus::Requested
            && transition.to == PayoutStatus::Approved
            && data.wallet.available_balance < payout.amount
        {
            return Err(StoreError::InsufficientBalance {
                available: data.wallet.available_balance,
                required: payout.amount,
            });
        }

        WalletDelta::payout_transition(transition.from, transition.to, payout.amount)
            .apply(&mut data.wallet);
        data.wallet.updated_at = transition.now;

        let effect = ClaimEffect::of(transition.to);
        for order in data
            .orders
            .values_mut()
            .filter(|o| o.payout_id == Some(payout.id))
        {
            match effect {
                ClaimEffect::Mark(status) => order.payout_status = status,
                ClaimEffect::Release => {
                    order.payout_id = None;
                    order.payout_status = OrderPayoutStatus::Pending;
                }
            }
            order.updated_at = transition.now;
        }

        let stored = data
            .payouts
            .get_mut(&transition.payout_id)
            .ok_or(StoreError::NotFound)?;
        stored.status = transition.to;
        if transition.admin_notes.is_some() {
            stored.admin_notes = transition.admin_notes.clone();
        }
        if transition.transaction_id.is_some() {
            stored.transaction_id = transition.transaction_id.clone();
        }
        stored.processed_by = Some(transition.processed_by);
        stored.processed_at = Some(transition.now);
        stored.updated_at = transition.now;
        Ok(stored.clone())
    }

    async fn kyc_records(&self, seller_id: i64) -> StoreResult<Vec<KycRecord>> {
        let data = self.inner.lock().await;
        Ok(KycKind::ALL
            .iter()
            .filter_map(|kind| data.kyc.get(&(seller_id, *kind)).cloned())
            .collect())
    }

    async fn upsert_kyc(&self, submission: &KycSubmission) -> StoreResult<KycRecord> {
        let mut data = self.inner.lock().await;
        let key = (submission.seller_id, submission.kind);
        if data.kyc.get(&key).is_some_and(|r| r.verified) {
            return Err(StoreError::KycLocked(submission.kind));
        }
        let record = KycRecord {
            seller_id: submission.seller_id,
            kind: submission.kind,
            holder_name: submission.holder_name.clone(),
            identifier_last4: submission.identifier_last4.clone(),
            ifsc_code: submission.ifsc_code.clone(),
            verified: false,
            submitted_at: submission.now,
            verified_at: None,
        };
        data.kyc.insert(key, record.clone());
        data.kyc_hashes
            .insert(key, submission.identifier_hash.clone());
        Ok(record)
    }

    async fn set_kyc_verified(
        &self,
        seller_id: i64,
        kind: KycKind,
        verified: bool,
        now: i64,
    ) -> StoreResult<Option<KycRecord>> {
        let mut data = self.inner.lock().await;
        Ok(data.kyc.get_mut(&(seller_id, kind)).map(|record| {
            record.verified = verified;
            record.verified_at = verified.then_some(now);
            record.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PlacementGroup;

    fn pending_order(id: i64, buyer_id: i64, store_id: i64, total: Decimal) -> Order {
        Order {
            id,
            buyer_id,
            store_id,
            address_id: 1,
            status: OrderStatus::Pending,
            total_amount: total,
            admin_commission: Decimal::ZERO,
            seller_amount: total,
            commission_rate: Decimal::ZERO,
            payment_received: false,
            payout_status: OrderPayoutStatus::Pending,
            payout_id: None,
            tracking_number: None,
            seller_notes: None,
            version: 0,
            created_at: 1,
            updated_at: 1,
        }
    }

    fn item(order_id: i64, product_id: i64, quantity: i32) -> OrderItem {
        OrderItem {
            id: snowflake_id(),
            order_id,
            product_id,
            quantity,
            price_at_purchase: Decimal::ONE,
            title: "Widget".into(),
        }
    }

    #[tokio::test]
    async fn test_placement_is_all_or_nothing() {
        let store = MemoryStore::new();
        let seller = store.insert_seller(10).await;
        let shop = store.insert_store(seller, "Shop", true).await;
        let plenty = store.insert_product(shop.id, "Plenty", Decimal::ONE, 10).await;
        let scarce = store.insert_product(shop.id, "Scarce", Decimal::ONE, 1).await;

        let request = PlacementRequest {
            buyer_id: 7,
            groups: vec![
                PlacementGroup {
                    order: pending_order(100, 7, shop.id, Decimal::ONE),
                    items: vec![item(100, plenty, 4)],
                },
                PlacementGroup {
                    order: pending_order(101, 7, shop.id, Decimal::ONE),
                    items: vec![item(101, scarce, 2)],
                },
            ],
            cart_item_ids: vec![],
        };

        let err = store.place_orders(&request).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock { product_id, available: 1 } if product_id == scarce
        ));
        assert_eq!(store.product_stock(plenty).await, Some(10));
        assert!(store.get_order(100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_advance_requires_matching_version() {
        let store = MemoryStore::new();
        let request = PlacementRequest {
            buyer_id: 7,
            groups: vec![PlacementGroup {
                order: pending_order(200, 7, 1, Decimal::TEN),
                items: vec![],
            }],
            cart_item_ids: vec![],
        };
        store.place_orders(&request).await.unwrap();

        let stale = OrderTransition {
            order_id: 200,
            from: OrderStatus::Pending,
            expected_version: 3,
            to: OrderStatus::Paid,
            tracking_number: None,
            seller_notes: None,
            now: 2,
        };
        assert!(matches!(
            store.advance_order(&stale).await,
            Err(StoreError::OrderState { .. })
        ));

        let fresh = OrderTransition {
            expected_version: 0,
            ..stale
        };
        let paid = store.advance_order(&fresh).await.unwrap();
        assert!(paid.payment_received);
        assert_eq!(paid.version, 1);
        assert_eq!(store.wallet().await.unwrap().available_balance, Decimal::TEN);
    }

    #[tokio::test]
    async fn test_merged_cart_quantity_cannot_overflow() {
        let store = MemoryStore::new();
        let seller = store.insert_seller(10).await;
        let shop = store.insert_store(seller, "Shop", true).await;
        let product = store.insert_product(shop.id, "Widget", Decimal::ONE, 5).await;

        store.add_cart_item(7, product, 1).await.unwrap();
        let err = store.add_cart_item(7, product, i32::MAX).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock { available: 5, .. }
        ));
        assert_eq!(store.cart_items(7).await.unwrap()[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_placement_deletes_only_consumed_cart_lines() {
        let store = MemoryStore::new();
        let seller = store.insert_seller(10).await;
        let shop = store.insert_store(seller, "Shop", true).await;
        let first = store.insert_product(shop.id, "First", Decimal::ONE, 5).await;
        let late = store.insert_product(shop.id, "Late", Decimal::ONE, 5).await;

        let consumed = store.add_cart_item(7, first, 2).await.unwrap();
        // Lands between the checkout reading the cart and committing
        let added_later = store.add_cart_item(7, late, 1).await.unwrap();
        let other_buyer = store.add_cart_item(8, first, 1).await.unwrap();

        let request = PlacementRequest {
            buyer_id: 7,
            groups: vec![PlacementGroup {
                order: pending_order(300, 7, shop.id, Decimal::TWO),
                items: vec![item(300, first, 2)],
            }],
            cart_item_ids: vec![consumed.id, other_buyer.id],
        };
        store.place_orders(&request).await.unwrap();

        let left = store.cart_items(7).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, added_later.id);
        assert_eq!(store.cart_items(8).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_advance_keeps_seller_fields_unless_given() {
        let store = MemoryStore::new();
        store
            .place_orders(&PlacementRequest {
                buyer_id: 7,
                groups: vec![PlacementGroup {
                    order: pending_order(400, 7, 1, Decimal::ONE),
                    items: vec![],
                }],
                cart_item_ids: vec![],
            })
            .await
            .unwrap();

        let paid = OrderTransition {
            order_id: 400,
            from: OrderStatus::Pending,
            expected_version: 0,
            to: OrderStatus::Paid,
            tracking_number: None,
            seller_notes: Some("Packed".into()),
            now: 2,
        };
        store.advance_order(&paid).await.unwrap();

        let shipped = OrderTransition {
            from: OrderStatus::Paid,
            expected_version: 1,
            to: OrderStatus::Shipped,
            tracking_number: Some("AWB123".into()),
            seller_notes: None,
            ..paid
        };
        let order = store.advance_order(&shipped).await.unwrap();
        assert_eq!(order.tracking_number.as_deref(), Some("AWB123"));
        assert_eq!(order.seller_notes.as_deref(), Some("Packed"));
    }

    #[tokio::test]
    async fn test_verified_kyc_is_locked() {
        let store = MemoryStore::new();
        let submission = KycSubmission {
            seller_id: 5,
            kind: KycKind::Pan,
            holder_name: "Asha".into(),
            identifier_hash: "hash".into(),
            identifier_last4: "234F".into(),
            ifsc_code: None,
            now: 1,
        };
        store.upsert_kyc(&submission).await.unwrap();
        store
            .set_kyc_verified(5, KycKind::Pan, true, 2)
            .await
            .unwrap();
        assert!(matches!(
            store.upsert_kyc(&submission).await,
            Err(StoreError::KycLocked(KycKind::Pan))
        ));
    }
}
