//! Order lifecycle: buyer cancellation, seller fulfilment, order reads
//!
//! Status changes are compare-and-set on (status, version): of two racing
//! writers exactly one wins, the other gets a conflict.

use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderListQuery, OrderView, UpdateOrderStatusRequest};
use shared::util::now_millis;

use super::{seller_of, view};
use crate::error::{ServiceError, ServiceResult};
use crate::notify::Notification;
use crate::state::AppState;
use crate::store::{OrderFilter, OrderTransition, StoreError};
use crate::util::page_window;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 50;
const MAX_TRACKING_LEN: usize = 64;
const MAX_NOTES_LEN: usize = 500;

fn order_not_found() -> AppError {
    AppError::with_message(ErrorCode::OrderNotFound, "Order not found")
}

/// Trimmed value, `None` when blank; over-long values are rejected
fn seller_field(
    value: Option<String>,
    field: &str,
    max_len: usize,
) -> Result<Option<String>, AppError> {
    let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > max_len {
        return Err(AppError::validation(format!(
            "{field} must be at most {max_len} characters"
        ))
        .with_detail("field", field));
    }
    Ok(Some(value))
}

/// Order belonging to one of the seller's stores
async fn owned_order(state: &AppState, seller_id: i64, order_id: i64) -> ServiceResult<Order> {
    let owned_stores = state.store().stores_for_seller(seller_id).await?;
    let order = state
        .store()
        .get_order(order_id)
        .await?
        .filter(|o| owned_stores.iter().any(|s| s.id == o.store_id))
        .ok_or_else(order_not_found)?;
    Ok(order)
}

async fn single_view(state: &AppState, order: Order) -> ServiceResult<OrderView> {
    view::project(state.store(), vec![order])
        .await?
        .pop()
        .ok_or_else(|| order_not_found().into())
}

/// Cancel a pending order of the buyer and put its stock back
pub async fn cancel_order(
    state: &AppState,
    buyer_id: i64,
    order_id: i64,
) -> ServiceResult<OrderView> {
    let order = state
        .store()
        .cancel_order(buyer_id, order_id, now_millis())
        .await
        .map_err(|e| match e {
            StoreError::NotFound => order_not_found().into(),
            StoreError::OrderState { current, .. } => ServiceError::App(
                AppError::new(ErrorCode::OrderNotCancellable)
                    .with_detail("status", current.as_str()),
            ),
            other => other.into(),
        })?;

    tracing::info!(order_id, buyer_id, "Order cancelled");
    state.notifier.notify(Notification::OrderStatusChanged {
        order_id,
        buyer_id,
        status: order.status,
    });
    single_view(state, order).await
}

/// Move an order of the seller's store one step forward
pub async fn advance_order(
    state: &AppState,
    seller_user_id: i64,
    order_id: i64,
    req: UpdateOrderStatusRequest,
) -> ServiceResult<OrderView> {
    let seller_id = seller_of(state, seller_user_id).await?;
    let tracking_number = seller_field(req.tracking_number, "tracking_number", MAX_TRACKING_LEN)?;
    let seller_notes = seller_field(req.notes, "notes", MAX_NOTES_LEN)?;
    let order = owned_order(state, seller_id, order_id).await?;

    if !order.status.can_advance_to(req.status) {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!("Cannot move order from {} to {}", order.status, req.status),
        )
        .with_detail("from", order.status.as_str())
        .with_detail("to", req.status.as_str())
        .into());
    }

    let transition = OrderTransition {
        order_id,
        from: order.status,
        expected_version: order.version,
        to: req.status,
        tracking_number,
        seller_notes,
        now: now_millis(),
    };
    let updated = state
        .store()
        .advance_order(&transition)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => order_not_found().into(),
            other => ServiceError::from(other),
        })?;

    tracing::info!(
        order_id,
        seller_id,
        from = %transition.from,
        to = %transition.to,
        "Order status advanced"
    );
    state.notifier.notify(Notification::OrderStatusChanged {
        order_id,
        buyer_id: updated.buyer_id,
        status: updated.status,
    });
    single_view(state, updated).await
}

pub async fn list_buyer_orders(
    state: &AppState,
    buyer_id: i64,
    query: OrderListQuery,
) -> ServiceResult<Vec<OrderView>> {
    let (limit, offset) = page_window(query.page, query.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let orders = state
        .store()
        .list_orders(&OrderFilter {
            buyer_id: Some(buyer_id),
            store_ids: None,
            status: query.status,
            limit,
            offset,
        })
        .await?;
    view::project(state.store(), orders).await
}

pub async fn get_buyer_order(
    state: &AppState,
    buyer_id: i64,
    order_id: i64,
) -> ServiceResult<OrderView> {
    let order = state
        .store()
        .get_order(order_id)
        .await?
        .filter(|o| o.buyer_id == buyer_id)
        .ok_or_else(order_not_found)?;
    single_view(state, order).await
}

pub async fn get_seller_order(
    state: &AppState,
    seller_user_id: i64,
    order_id: i64,
) -> ServiceResult<OrderView> {
    let seller_id = seller_of(state, seller_user_id).await?;
    let order = owned_order(state, seller_id, order_id).await?;
    single_view(state, order).await
}

/// Orders of the seller's stores, or of one of them when `store_id` is given
pub async fn list_seller_orders(
    state: &AppState,
    seller_user_id: i64,
    query: OrderListQuery,
) -> ServiceResult<Vec<OrderView>> {
    let seller_id = seller_of(state, seller_user_id).await?;
    let mut store_ids: Vec<i64> = state
        .store()
        .stores_for_seller(seller_id)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if let Some(wanted) = query.store_id {
        if !store_ids.contains(&wanted) {
            return Err(AppError::with_message(ErrorCode::StoreNotFound, "Store not found")
                .with_detail("store_id", wanted)
                .into());
        }
        store_ids = vec![wanted];
    }
    if store_ids.is_empty() {
        return Ok(Vec::new());
    }

    let (limit, offset) = page_window(query.page, query.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let orders = state
        .store()
        .list_orders(&OrderFilter {
            buyer_id: None,
            store_ids: Some(store_ids),
            status: query.status,
            limit,
            offset,
        })
        .await?;
    view::project(state.store(), orders).await
}
