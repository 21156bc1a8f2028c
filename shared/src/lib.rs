//! Shared types for the Bazaar marketplace
//!
//! Error taxonomy, domain models and money arithmetic used by the server
//! and by anything that talks to its API.

pub mod error;
pub mod models;
pub mod money;
pub mod util;

// Re-exports
pub use http;
pub use rust_decimal::Decimal;
pub use serde::{Deserialize, Serialize};
