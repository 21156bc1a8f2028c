//! Bearer-token identity, role gates and request throttling

pub mod identity;
pub mod rate_limit;

pub use identity::{Identity, Role};
pub use rate_limit::RateLimiter;
