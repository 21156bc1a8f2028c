//! Buyer API: cart, checkout and order tracking

use axum::extract::{Extension, Path, Query, State};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router, middleware};
use shared::error::ApiResponse;
use shared::models::{
    AddCartItemRequest, BuyNowRequest, Cart, CartCheckoutRequest, CartCount, CartValidation,
    CheckoutResult, DirectOrderRequest, LineItemInput, OrderListQuery, OrderSummary, OrderSummaryRequest,
    OrderView, UpdateCartItemRequest,
};

use super::ApiResult;
use crate::auth::Identity;
use crate::auth::identity::{identity_auth_middleware, require_buyer};
use crate::auth::rate_limit::checkout_rate_limit;
use crate::services::checkout::CheckoutSource;
use crate::services::{cart, checkout, lifecycle};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let placing = Router::new()
        .route("/orders/from-cart", post(checkout_from_cart))
        .route("/orders/buy-now", post(buy_now))
        .route("/orders/direct", post(direct_order))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            checkout_rate_limit,
        ));

    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/count", get(cart_count))
        .route("/cart/validate", get(validate_cart))
        .route("/cart/items", post(add_cart_item))
        .route(
            "/cart/items/{id}",
            patch(update_cart_item).delete(remove_cart_item),
        )
        .route("/cart/products/{product_id}", delete(remove_cart_product))
        .route("/orders", get(list_orders))
        .route("/orders/summary", post(order_summary))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/cancel", post(cancel_order))
        .merge(placing)
        .route_layer(middleware::from_fn(require_buyer))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            identity_auth_middleware,
        ))
}

// ── Cart ──

async fn get_cart(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Cart> {
    let cart = cart::get_cart(&state, identity.user_id).await?;
    Ok(Json(ApiResponse::success(cart)))
}

async fn add_cart_item(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<AddCartItemRequest>,
) -> ApiResult<Cart> {
    let cart = cart::add_item(&state, identity.user_id, req).await?;
    Ok(Json(ApiResponse::success(cart)))
}

async fn update_cart_item(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(item_id): Path<i64>,
    Json(req): Json<UpdateCartItemRequest>,
) -> ApiResult<Cart> {
    let cart = cart::update_item(&state, identity.user_id, item_id, req).await?;
    Ok(Json(ApiResponse::success(cart)))
}

async fn remove_cart_item(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(item_id): Path<i64>,
) -> ApiResult<Cart> {
    let cart = cart::remove_item(&state, identity.user_id, item_id).await?;
    Ok(Json(ApiResponse::success(cart)))
}

async fn remove_cart_product(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(product_id): Path<i64>,
) -> ApiResult<Cart> {
    let cart = cart::remove_product(&state, identity.user_id, product_id).await?;
    Ok(Json(ApiResponse::success(cart)))
}

async fn cart_count(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<CartCount> {
    let count = cart::count(&state, identity.user_id).await?;
    Ok(Json(ApiResponse::success(count)))
}

async fn validate_cart(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<CartValidation> {
    let report = cart::validate(&state, identity.user_id).await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn clear_cart(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<()> {
    cart::clear(&state, identity.user_id).await?;
    Ok(Json(ApiResponse::ok()))
}

// ── Checkout ──

async fn checkout_from_cart(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CartCheckoutRequest>,
) -> ApiResult<CheckoutResult> {
    let result =
        checkout::place_orders(&state, identity.user_id, req.address_id, CheckoutSource::Cart)
            .await?;
    Ok(Json(ApiResponse::success_with_message(
        "Orders placed",
        result,
    )))
}

async fn buy_now(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<BuyNowRequest>,
) -> ApiResult<CheckoutResult> {
    let source = CheckoutSource::Single(LineItemInput {
        product_id: req.product_id,
        quantity: req.quantity,
    });
    let result = checkout::place_orders(&state, identity.user_id, req.address_id, source).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Order placed",
        result,
    )))
}

async fn direct_order(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<DirectOrderRequest>,
) -> ApiResult<CheckoutResult> {
    let result = checkout::place_orders(
        &state,
        identity.user_id,
        req.address_id,
        CheckoutSource::Items(req.items),
    )
    .await?;
    Ok(Json(ApiResponse::success_with_message(
        "Orders placed",
        result,
    )))
}

async fn order_summary(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<OrderSummaryRequest>,
) -> ApiResult<OrderSummary> {
    let summary = checkout::order_summary(&state, identity.user_id, req).await?;
    Ok(Json(ApiResponse::success(summary)))
}

// ── Orders ──

async fn list_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Vec<OrderView>> {
    let orders = lifecycle::list_buyer_orders(&state, identity.user_id, query).await?;
    Ok(Json(ApiResponse::success(orders)))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(order_id): Path<i64>,
) -> ApiResult<OrderView> {
    let order = lifecycle::get_buyer_order(&state, identity.user_id, order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn cancel_order(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(order_id): Path<i64>,
) -> ApiResult<OrderView> {
    let order = lifecycle::cancel_order(&state, identity.user_id, order_id).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Order cancelled",
        order,
    )))
}
