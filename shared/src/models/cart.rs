//! Cart Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Stored cart row: no price is cached
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItem {
    pub id: i64,
    pub buyer_id: i64,
    pub product_id: i64,
    pub quantity: i32,
}

/// Cart line enriched with live catalog data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub id: i64,
    pub product_id: i64,
    pub store_id: i64,
    pub store_name: String,
    pub title: String,
    pub price: Decimal,
    pub quantity: i32,
    pub available_stock: i32,
    pub store_active: bool,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    pub items: Vec<CartLine>,
    pub items_count: i64,
    pub subtotal: Decimal,
}

/// Cart badge counts, read without touching the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartCount {
    /// Units across all lines
    pub count: i64,
    pub lines: usize,
}

/// A cart line that would make checkout fail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartIssue {
    pub item_id: i64,
    pub product_id: i64,
    pub code: ErrorCode,
    pub message: String,
}

/// Pre-checkout check of the whole cart; nothing is reserved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartValidation {
    /// Non-empty and free of issues
    pub valid: bool,
    pub issues: Vec<CartIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}
