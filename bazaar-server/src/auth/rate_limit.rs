//! Application-layer rate limiting for checkout and payout routes
//!
//! Counters live behind [`RateLimitStore`] so a shared backend can replace
//! the in-process map when the service runs on more than one node.

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use shared::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::Identity;
use crate::state::AppState;

/// Fixed-window counter storage
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one hit for `key` under `route` and return the hits in the current window
    async fn hit(&self, route: &'static str, key: &str, window: Duration) -> u32;

    /// Drop windows that started more than `max_age` ago
    async fn sweep(&self, max_age: Duration);
}

struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Single-process counter map
#[derive(Default)]
pub struct MemoryRateLimitStore {
    /// route name -> (key -> entry)
    inner: Mutex<HashMap<&'static str, HashMap<String, WindowEntry>>>,
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(&self, route: &'static str, key: &str, window: Duration) -> u32 {
        let mut map = self.inner.lock().await;
        let route_map = map.entry(route).or_default();
        let now = Instant::now();

        let entry = route_map.entry(key.to_owned()).or_insert_with(|| WindowEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count
    }

    async fn sweep(&self, max_age: Duration) {
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        for route_map in map.values_mut() {
            route_map.retain(|_, entry| now.duration_since(entry.window_start) < max_age);
        }

        map.retain(|_, route_map| !route_map.is_empty());
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryRateLimitStore::default()))
    }

    pub fn with_store(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub async fn check(
        &self,
        route: &'static str,
        key: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> bool {
        self.store
            .hit(route, key, Duration::from_secs(window_secs))
            .await
            <= max_requests
    }

    /// Remove entries older than 5 minutes
    pub async fn cleanup(&self) {
        self.store.sweep(Duration::from_secs(300)).await;
    }
}

/// Per-minute limits for the throttled routes
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub checkout_per_minute: u32,
    pub payout_per_minute: u32,
}

/// Extract client IP: X-Forwarded-For header first, then peer address.
fn extract_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
    {
        // X-Forwarded-For can be comma-separated; first entry is the original client
        if let Some(first) = val.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Authenticated user first, client IP otherwise
fn client_key(request: &Request) -> String {
    match request.extensions().get::<Identity>() {
        Some(identity) => format!("user:{}", identity.user_id),
        None => format!("ip:{}", extract_ip(request)),
    }
}

async fn throttle(
    state: &AppState,
    route: &'static str,
    max_requests: u32,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(&request);
    if !state.rate_limiter.check(route, &key, max_requests, 60).await {
        tracing::warn!(route, key = %key, "Rate limit exceeded");
        return Err(AppError::too_many_requests());
    }
    Ok(next.run(request).await)
}

/// Rate limit middleware for checkout entry points
pub async fn checkout_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let max = state.limits.checkout_per_minute;
    throttle(&state, "checkout", max, request, next).await
}

/// Rate limit middleware for payout requests
pub async fn payout_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let max = state.limits.payout_per_minute;
    throttle(&state, "payout_request", max, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_window_allows_up_to_limit() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.check("checkout", "user:1", 3, 60).await);
        }
        assert!(!limiter.check("checkout", "user:1", 3, 60).await);
        // Other keys and routes keep their own windows
        assert!(limiter.check("checkout", "user:2", 3, 60).await);
        assert!(limiter.check("payout_request", "user:1", 3, 60).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_expiry() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("checkout", "ip:10.0.0.1", 1, 60).await);
        assert!(!limiter.check("checkout", "ip:10.0.0.1", 1, 60).await);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.check("checkout", "ip:10.0.0.1", 1, 60).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_stale_windows() {
        let store = MemoryRateLimitStore::default();
        store.hit("checkout", "user:1", Duration::from_secs(60)).await;
        tokio::time::advance(Duration::from_secs(301)).await;
        store.sweep(Duration::from_secs(300)).await;
        assert!(store.inner.lock().await.is_empty());
    }
}
