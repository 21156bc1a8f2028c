//! Order splitting engine
//!
//! Every checkout entry point funnels into [`place_orders`]:
//!
//! 1. the shipping address must belong to the buyer
//! 2. requested lines are merged per product and priced from the live catalog
//! 3. every line is validated up front; one bad line rejects the whole checkout
//! 4. lines are grouped per store (first-seen order), one order per group,
//!    each with its own frozen commission split
//! 5. stock decrements, order inserts and the cart clear commit together
//!
//! A conflicting concurrent checkout surfaces as the same "Only N items
//! available" error the up-front validation produces.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CheckoutResult, LineItemInput, Order, OrderItem, OrderPayoutStatus, OrderStatus,
    OrderSummary, OrderSummaryRequest, Product, SummarySource,
};
use shared::money::{line_total, split_commission};
use shared::util::{now_millis, snowflake_id};
use std::collections::HashMap;

use super::{ledger, view};
use crate::error::{ServiceError, ServiceResult};
use crate::notify::Notification;
use crate::state::AppState;
use crate::store::{MarketStore, PlacementGroup, PlacementRequest};

/// Where the lines of a checkout come from
#[derive(Debug, Clone)]
pub enum CheckoutSource {
    /// The buyer's cart, cleared on success
    Cart,
    /// "Buy now" for a single product
    Single(LineItemInput),
    /// Explicit item list
    Items(Vec<LineItemInput>),
}

/// A validated line: catalog product plus requested quantity
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product: Product,
    pub quantity: i32,
}

impl PricedLine {
    pub fn line_total(&self) -> Decimal {
        line_total(self.product.price, self.quantity)
    }
}

/// Lines of one store within a checkout
#[derive(Debug, Clone)]
pub struct StoreGroup {
    pub store_id: i64,
    pub store_name: String,
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
}

/// Sum quantities of repeated products, keeping first-seen order
pub fn merge_lines(lines: &[LineItemInput]) -> Vec<LineItemInput> {
    let mut merged: Vec<LineItemInput> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(*line),
        }
    }
    merged
}

/// Group lines by store in first-seen order
pub fn group_by_store(lines: Vec<PricedLine>) -> Vec<StoreGroup> {
    let mut groups: Vec<StoreGroup> = Vec::new();
    for line in lines {
        let total = line.line_total();
        match groups.iter_mut().find(|g| g.store_id == line.product.store_id) {
            Some(group) => {
                group.subtotal += total;
                group.lines.push(line);
            }
            None => groups.push(StoreGroup {
                store_id: line.product.store_id,
                store_name: line.product.store_name.clone(),
                subtotal: total,
                lines: vec![line],
            }),
        }
    }
    groups
}

/// Check one line against the catalog
fn validate_line(line: &LineItemInput, product: Option<&Product>) -> Result<Product, AppError> {
    let product = product.ok_or_else(|| {
        AppError::with_message(
            ErrorCode::ProductNotFound,
            format!("Product {} not found", line.product_id),
        )
        .with_detail("product_id", line.product_id)
    })?;
    if !product.store_active {
        return Err(AppError::with_message(
            ErrorCode::ProductUnavailable,
            format!("Product \"{}\" is not available", product.title),
        )
        .with_detail("product_id", product.id));
    }
    if line.quantity > product.quantity {
        return Err(AppError::with_message(
            ErrorCode::InsufficientStock,
            format!("Only {} items available", product.quantity),
        )
        .with_detail("product_id", product.id)
        .with_detail("available", product.quantity));
    }
    Ok(product.clone())
}

/// Merge and price lines, keeping the outcome of every merged line
pub async fn check_lines(
    store: &dyn MarketStore,
    lines: &[LineItemInput],
) -> ServiceResult<Vec<(LineItemInput, Result<PricedLine, AppError>)>> {
    let merged = merge_lines(lines);
    let ids: Vec<i64> = merged.iter().map(|l| l.product_id).collect();
    let products: HashMap<i64, Product> = store
        .find_products(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    Ok(merged
        .into_iter()
        .map(|line| {
            let priced = validate_line(&line, products.get(&line.product_id)).map(|product| {
                PricedLine {
                    product,
                    quantity: line.quantity,
                }
            });
            (line, priced)
        })
        .collect())
}

/// Merge, price and validate requested lines; all-or-nothing
pub async fn price_lines(
    store: &dyn MarketStore,
    lines: &[LineItemInput],
) -> ServiceResult<Vec<PricedLine>> {
    if let Some(bad) = lines.iter().find(|l| l.quantity < 1) {
        return Err(AppError::with_message(
            ErrorCode::InvalidQuantity,
            "Quantity must be at least 1",
        )
        .with_detail("product_id", bad.product_id)
        .with_detail("quantity", bad.quantity)
        .into());
    }

    check_lines(store, lines)
        .await?
        .into_iter()
        .map(|(_, priced)| priced.map_err(ServiceError::from))
        .collect()
}

async fn require_address(state: &AppState, buyer_id: i64, address_id: i64) -> ServiceResult<()> {
    state
        .store()
        .find_address(buyer_id, address_id)
        .await?
        .ok_or_else(|| AppError::with_message(ErrorCode::AddressNotFound, "Address not found"))?;
    Ok(())
}

/// Requested lines for a source, and the cart lines they were read from
async fn resolve_source(
    state: &AppState,
    buyer_id: i64,
    source: CheckoutSource,
) -> ServiceResult<(Vec<LineItemInput>, Vec<i64>)> {
    match source {
        CheckoutSource::Cart => {
            let items = state.store().cart_items(buyer_id).await?;
            if items.is_empty() {
                return Err(AppError::new(ErrorCode::CartEmpty).into());
            }
            let lines = items
                .iter()
                .map(|c| LineItemInput {
                    product_id: c.product_id,
                    quantity: c.quantity,
                })
                .collect();
            Ok((lines, items.iter().map(|c| c.id).collect()))
        }
        CheckoutSource::Single(line) => Ok((vec![line], Vec::new())),
        CheckoutSource::Items(lines) => {
            if lines.is_empty() {
                return Err(AppError::new(ErrorCode::OrderEmpty).into());
            }
            Ok((lines, Vec::new()))
        }
    }
}

fn build_group(
    group: &StoreGroup,
    buyer_id: i64,
    address_id: i64,
    rate: Decimal,
    now: i64,
) -> PlacementGroup {
    let (admin_commission, seller_amount) = split_commission(group.subtotal, rate);
    let order = Order {
        id: snowflake_id(),
        buyer_id,
        store_id: group.store_id,
        address_id,
        status: OrderStatus::Pending,
        total_amount: group.subtotal,
        admin_commission,
        seller_amount,
        commission_rate: rate,
        payment_received: false,
        payout_status: OrderPayoutStatus::Pending,
        payout_id: None,
        tracking_number: None,
        seller_notes: None,
        version: 0,
        created_at: now,
        updated_at: now,
    };
    let items = group
        .lines
        .iter()
        .map(|line| OrderItem {
            id: snowflake_id(),
            order_id: order.id,
            product_id: line.product.id,
            quantity: line.quantity,
            price_at_purchase: line.product.price,
            title: line.product.title.clone(),
        })
        .collect();
    PlacementGroup { order, items }
}

/// Create one pending order per store for the buyer
pub async fn place_orders(
    state: &AppState,
    buyer_id: i64,
    address_id: i64,
    source: CheckoutSource,
) -> ServiceResult<CheckoutResult> {
    require_address(state, buyer_id, address_id).await?;
    let (lines, cart_item_ids) = resolve_source(state, buyer_id, source).await?;
    let from_cart = !cart_item_ids.is_empty();
    let priced = price_lines(state.store(), &lines).await?;
    let groups = group_by_store(priced);

    let rate = ledger::effective_rate(state).await?;
    let now = now_millis();
    let placement = PlacementRequest {
        buyer_id,
        groups: groups
            .iter()
            .map(|g| build_group(g, buyer_id, address_id, rate, now))
            .collect(),
        cart_item_ids,
    };

    let orders = state.store().place_orders(&placement).await?;

    let names: HashMap<i64, String> = groups
        .into_iter()
        .map(|g| (g.store_id, g.store_name))
        .collect();
    let items: Vec<OrderItem> = placement.groups.into_iter().flat_map(|g| g.items).collect();
    let views = view::assemble(orders, items, &names);
    let total_amount: Decimal = views.iter().map(|v| v.total_amount).sum();

    tracing::info!(
        buyer_id,
        orders = views.len(),
        total_amount = %total_amount,
        from_cart,
        "Checkout completed"
    );
    state.notifier.notify(Notification::OrdersPlaced {
        buyer_id,
        order_ids: views.iter().map(|v| v.id).collect(),
        total_amount,
    });

    Ok(CheckoutResult {
        total_orders: views.len(),
        total_amount,
        orders: views,
    })
}

/// Price breakdown without placing anything
pub async fn order_summary(
    state: &AppState,
    buyer_id: i64,
    req: OrderSummaryRequest,
) -> ServiceResult<OrderSummary> {
    let lines: Vec<LineItemInput> = match req.source {
        SummarySource::Cart => state
            .store()
            .cart_items(buyer_id)
            .await?
            .iter()
            .map(|c| LineItemInput {
                product_id: c.product_id,
                quantity: c.quantity,
            })
            .collect(),
        SummarySource::Items => {
            let items = req.items.unwrap_or_default();
            if items.is_empty() {
                return Err(AppError::new(ErrorCode::OrderEmpty).into());
            }
            items
        }
    };
    if lines.is_empty() {
        return Ok(OrderSummary::empty());
    }

    let groups = group_by_store(price_lines(state.store(), &lines).await?);
    let subtotal: Decimal = groups.iter().map(|g| g.subtotal).sum();
    let shipping_fee = Decimal::ZERO;
    let discount = Decimal::ZERO;
    Ok(OrderSummary {
        subtotal,
        shipping_fee,
        discount,
        total: subtotal + shipping_fee - discount,
        stores_count: groups.len(),
        items_count: groups
            .iter()
            .flat_map(|g| &g.lines)
            .map(|l| i64::from(l.quantity))
            .sum(),
    })
}
