//! Server configuration

use rust_decimal::Decimal;
use shared::money::{DEFAULT_COMMISSION_RATE, is_valid_rate};
use std::str::FromStr;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP port
    pub http_port: u16,
    /// PostgreSQL connection URL; absent in development means in-memory store
    pub database_url: Option<String>,
    /// HS256 secret for bearer tokens
    pub jwt_secret: String,
    /// Commission rate seeded when no setting exists yet
    pub default_commission_rate: Decimal,
    /// Checkout requests per user per minute
    pub checkout_rate_limit: u32,
    /// Payout requests per seller per minute
    pub payout_rate_limit: u32,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn parse_or<T: FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.is_empty());
        if database_url.is_none() && environment != "development" {
            return Err(format!("DATABASE_URL must be set in {environment} environment").into());
        }

        let default_commission_rate =
            Self::parse_or("DEFAULT_COMMISSION_RATE", DEFAULT_COMMISSION_RATE);
        if !is_valid_rate(default_commission_rate) {
            return Err("DEFAULT_COMMISSION_RATE must be between 0 and 1".into());
        }

        Ok(Self {
            http_port: Self::parse_or("HTTP_PORT", 8080),
            database_url,
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            default_commission_rate,
            checkout_rate_limit: Self::parse_or("CHECKOUT_RATE_LIMIT", 10),
            payout_rate_limit: Self::parse_or("PAYOUT_RATE_LIMIT", 3),
            environment,
        })
    }
}
