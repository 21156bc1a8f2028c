//! Marketplace workflows
//!
//! Handlers stay thin: every rule about orders, money and payouts lives in
//! these modules and runs against [`crate::store::MarketStore`].

pub mod cart;
pub mod checkout;
pub mod kyc;
pub mod ledger;
pub mod lifecycle;
pub mod payouts;
pub mod view;

use shared::error::{AppError, ErrorCode};

use crate::error::ServiceResult;
use crate::state::AppState;

/// Seller profile of an authenticated seller user
pub async fn seller_of(state: &AppState, user_id: i64) -> ServiceResult<i64> {
    state
        .store()
        .seller_id_for_user(user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::SellerNotFound).into())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Two sellers, three products, one buyer with an address, 5% commission

    use rust_decimal::Decimal;
    use shared::models::{KycKind, OrderStatus, UpdateOrderStatusRequest};
    use std::str::FromStr;
    use std::sync::Arc;

    use crate::notify::recording::RecordingNotifier;
    use crate::state::AppState;
    use crate::store::{KycSubmission, MarketStore, MemoryStore};

    pub const BUYER: i64 = 2001;
    pub const OTHER_BUYER: i64 = 2002;
    pub const SELLER_A_USER: i64 = 1001;
    pub const SELLER_B_USER: i64 = 1002;

    pub fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    pub struct Fixture {
        pub state: AppState,
        pub memory: MemoryStore,
        pub notifier: Arc<RecordingNotifier>,
        pub seller_a: i64,
        pub seller_b: i64,
        pub store_a: i64,
        pub store_b: i64,
        /// store A, 100.00, stock 10
        pub p1: i64,
        /// store A, 50.00, stock 10
        pub p2: i64,
        /// store B, 30.00, stock 10
        pub p3: i64,
        pub address: i64,
    }

    impl Fixture {
        pub async fn new() -> Self {
            let memory = MemoryStore::new();
            let seller_a = memory.insert_seller(SELLER_A_USER).await;
            let seller_b = memory.insert_seller(SELLER_B_USER).await;
            let store_a = memory.insert_store(seller_a, "Paper Lantern Books", true).await.id;
            let store_b = memory.insert_store(seller_b, "Loom and Clay", true).await.id;
            let p1 = memory.insert_product(store_a, "Pocket Atlas", d("100.00"), 10).await;
            let p2 = memory.insert_product(store_a, "Field Notes", d("50.00"), 10).await;
            let p3 = memory.insert_product(store_b, "Terracotta Mug", d("30.00"), 10).await;
            let address = memory.insert_address(BUYER, "Bengaluru").await;

            let notifier = Arc::new(RecordingNotifier::default());
            let state = AppState::for_tests(memory.clone(), notifier.clone());
            super::ledger::ensure_default_rate(&state).await.unwrap();

            Self {
                state,
                memory,
                notifier,
                seller_a,
                seller_b,
                store_a,
                store_b,
                p1,
                p2,
                p3,
                address,
            }
        }

        pub fn store(&self) -> &dyn MarketStore {
            self.state.store()
        }

        pub async fn stock(&self, product_id: i64) -> i32 {
            self.memory.product_stock(product_id).await.unwrap()
        }

        /// Mark all three KYC kinds verified for a seller
        pub async fn verify_kyc(&self, seller_id: i64) {
            for kind in KycKind::ALL {
                self.store()
                    .upsert_kyc(&KycSubmission {
                        seller_id,
                        kind,
                        holder_name: "Asha Rao".into(),
                        identifier_hash: "hash".into(),
                        identifier_last4: "1234".into(),
                        ifsc_code: None,
                        now: 1,
                    })
                    .await
                    .unwrap();
                self.store()
                    .set_kyc_verified(seller_id, kind, true, 2)
                    .await
                    .unwrap();
            }
        }

        /// Advance an order from pending to paid as its seller
        pub async fn mark_paid(&self, seller_user: i64, order_id: i64) {
            super::lifecycle::advance_order(
                &self.state,
                seller_user,
                order_id,
                UpdateOrderStatusRequest::to(OrderStatus::Paid),
            )
            .await
            .unwrap();
        }
    }
}
