//! Application state for bazaar-server

use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::RateLimiter;
use crate::auth::rate_limit::RateLimits;
use crate::config::Config;
use crate::notify::{LogNotifier, Notifier};
use crate::services::ledger;
use crate::store::{MarketStore, MemoryStore, PgStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Orders, catalog, ledger and KYC persistence
    pub store: Arc<dyn MarketStore>,
    /// Outbound buyer/seller notifications
    pub notifier: Arc<dyn Notifier>,
    /// JWT secret for bearer authentication
    pub jwt_secret: String,
    /// Commission rate used until an admin sets one
    pub default_commission_rate: Decimal,
    /// Rate limiter for checkout/payout routes
    pub rate_limiter: RateLimiter,
    pub limits: RateLimits,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let store: Arc<dyn MarketStore> = match &config.database_url {
            Some(url) => {
                let pool = PgPool::connect(url).await?;
                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("PostgreSQL ready");
                Arc::new(PgStore::new(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store with demo catalog");
                Arc::new(MemoryStore::with_demo_catalog().await)
            }
        };

        let state = Self {
            store,
            notifier: Arc::new(LogNotifier),
            jwt_secret: config.jwt_secret.clone(),
            default_commission_rate: config.default_commission_rate,
            rate_limiter: RateLimiter::new(),
            limits: RateLimits {
                checkout_per_minute: config.checkout_rate_limit,
                payout_per_minute: config.payout_rate_limit,
            },
        };

        ledger::ensure_default_rate(&state)
            .await
            .map_err(|e| format!("Failed to seed commission rate: {e:?}"))?;

        Ok(state)
    }

    pub fn store(&self) -> &dyn MarketStore {
        self.store.as_ref()
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory state with the default 5% rate and generous limits
    pub fn for_tests(store: MemoryStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: Arc::new(store),
            notifier,
            jwt_secret: "test-secret".to_string(),
            default_commission_rate: shared::money::DEFAULT_COMMISSION_RATE,
            rate_limiter: RateLimiter::new(),
            limits: RateLimits {
                checkout_per_minute: 1000,
                payout_per_minute: 1000,
            },
        }
    }
}
