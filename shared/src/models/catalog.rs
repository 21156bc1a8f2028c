//! Catalog and address book read models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Seller-owned storefront
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Store {
    pub id: i64,
    pub seller_id: i64,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

/// Product as seen by checkout: price, stock and owning-store state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub store_id: i64,
    pub store_name: String,
    pub title: String,
    pub price: Decimal,
    /// Units in stock
    pub quantity: i32,
    /// Derived from the owning store
    pub store_active: bool,
}

impl Product {
    pub fn is_purchasable(&self) -> bool {
        self.store_active && self.quantity > 0
    }
}

/// Buyer shipping destination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub id: i64,
    pub buyer_id: i64,
    pub name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub country: String,
    pub pincode: String,
}
