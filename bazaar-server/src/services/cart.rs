//! Buyer cart
//!
//! Lines hold only (product, quantity); price, stock and store status are
//! read live every time the cart is shown.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AddCartItemRequest, Cart, CartCount, CartIssue, CartLine, CartValidation, LineItemInput,
    Product, UpdateCartItemRequest,
};
use shared::money::line_total;
use std::collections::HashMap;

use super::checkout::check_lines;
use crate::error::{ServiceError, ServiceResult};
use crate::state::AppState;
use crate::store::StoreError;

fn check_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(
            AppError::with_message(ErrorCode::InvalidQuantity, "Quantity must be at least 1")
                .with_detail("quantity", quantity),
        );
    }
    Ok(())
}

async fn purchasable(state: &AppState, product_id: i64) -> ServiceResult<Product> {
    let product = state
        .store()
        .find_products(&[product_id])
        .await?
        .pop()
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::ProductNotFound,
                format!("Product {product_id} not found"),
            )
        })?;
    if !product.store_active {
        return Err(AppError::with_message(
            ErrorCode::ProductUnavailable,
            format!("Product \"{}\" is not available", product.title),
        )
        .into());
    }
    Ok(product)
}

fn over_stock(product: &Product) -> AppError {
    AppError::with_message(
        ErrorCode::InsufficientStock,
        format!("Only {} items available", product.quantity),
    )
    .with_detail("product_id", product.id)
    .with_detail("available", product.quantity)
}

/// Cart with live prices; lines whose product vanished are skipped
pub async fn get_cart(state: &AppState, buyer_id: i64) -> ServiceResult<Cart> {
    let items = state.store().cart_items(buyer_id).await?;
    let ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
    let products: HashMap<i64, Product> = state
        .store()
        .find_products(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let lines: Vec<CartLine> = items
        .iter()
        .filter_map(|item| {
            let p = products.get(&item.product_id)?;
            Some(CartLine {
                id: item.id,
                product_id: p.id,
                store_id: p.store_id,
                store_name: p.store_name.clone(),
                title: p.title.clone(),
                price: p.price,
                quantity: item.quantity,
                available_stock: p.quantity,
                store_active: p.store_active,
                line_total: line_total(p.price, item.quantity),
            })
        })
        .collect();

    Ok(Cart {
        items_count: lines.iter().map(|l| i64::from(l.quantity)).sum(),
        subtotal: lines.iter().map(|l| l.line_total).sum::<Decimal>(),
        items: lines,
    })
}

/// Add a product, merging with an existing line
pub async fn add_item(
    state: &AppState,
    buyer_id: i64,
    req: AddCartItemRequest,
) -> ServiceResult<Cart> {
    check_quantity(req.quantity)?;
    let product = purchasable(state, req.product_id).await?;

    let in_cart = state
        .store()
        .cart_items(buyer_id)
        .await?
        .iter()
        .find(|i| i.product_id == req.product_id)
        .map_or(0, |i| i.quantity);
    in_cart
        .checked_add(req.quantity)
        .filter(|wanted| *wanted <= product.quantity)
        .ok_or_else(|| over_stock(&product))?;

    state
        .store()
        .add_cart_item(buyer_id, req.product_id, req.quantity)
        .await
        .map_err(|e| match e {
            StoreError::InsufficientStock { .. } => ServiceError::App(over_stock(&product)),
            other => other.into(),
        })?;
    get_cart(state, buyer_id).await
}

pub async fn update_item(
    state: &AppState,
    buyer_id: i64,
    item_id: i64,
    req: UpdateCartItemRequest,
) -> ServiceResult<Cart> {
    check_quantity(req.quantity)?;
    let item = state
        .store()
        .cart_items(buyer_id)
        .await?
        .into_iter()
        .find(|i| i.id == item_id)
        .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;
    let product = purchasable(state, item.product_id).await?;
    if req.quantity > product.quantity {
        return Err(over_stock(&product).into());
    }

    state
        .store()
        .set_cart_item_quantity(buyer_id, item_id, req.quantity)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;
    get_cart(state, buyer_id).await
}

pub async fn remove_item(state: &AppState, buyer_id: i64, item_id: i64) -> ServiceResult<Cart> {
    if !state.store().remove_cart_item(buyer_id, item_id).await? {
        return Err(AppError::new(ErrorCode::CartItemNotFound).into());
    }
    get_cart(state, buyer_id).await
}

/// Drop the buyer's line for a product
pub async fn remove_product(
    state: &AppState,
    buyer_id: i64,
    product_id: i64,
) -> ServiceResult<Cart> {
    if !state.store().remove_cart_product(buyer_id, product_id).await? {
        return Err(AppError::with_message(
            ErrorCode::CartItemNotFound,
            format!("Product {product_id} is not in the cart"),
        )
        .into());
    }
    get_cart(state, buyer_id).await
}

pub async fn clear(state: &AppState, buyer_id: i64) -> ServiceResult<()> {
    Ok(state.store().clear_cart(buyer_id).await?)
}

pub async fn count(state: &AppState, buyer_id: i64) -> ServiceResult<CartCount> {
    let items = state.store().cart_items(buyer_id).await?;
    Ok(CartCount {
        count: items.iter().map(|i| i64::from(i.quantity)).sum(),
        lines: items.len(),
    })
}

/// Run the checkout line checks over the cart and report every failing line
pub async fn validate(state: &AppState, buyer_id: i64) -> ServiceResult<CartValidation> {
    let items = state.store().cart_items(buyer_id).await?;
    let lines: Vec<LineItemInput> = items
        .iter()
        .map(|i| LineItemInput {
            product_id: i.product_id,
            quantity: i.quantity,
        })
        .collect();

    let issues: Vec<CartIssue> = check_lines(state.store(), &lines)
        .await?
        .into_iter()
        .filter_map(|(line, priced)| {
            let e = priced.err()?;
            let item = items.iter().find(|i| i.product_id == line.product_id)?;
            Some(CartIssue {
                item_id: item.id,
                product_id: line.product_id,
                code: e.code,
                message: e.message,
            })
        })
        .collect();

    Ok(CartValidation {
        valid: !items.is_empty() && issues.is_empty(),
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::checkout::{CheckoutSource, place_orders};
    use crate::services::testing::{BUYER, Fixture, OTHER_BUYER, d};

    fn err(e: ServiceError) -> AppError {
        e.into()
    }

    fn add(product_id: i64, quantity: i32) -> AddCartItemRequest {
        AddCartItemRequest {
            product_id,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_add_merges_and_prices_live() {
        let fx = Fixture::new().await;
        add_item(&fx.state, BUYER, add(fx.p2, 1)).await.unwrap();
        let cart = add_item(&fx.state, BUYER, add(fx.p2, 2)).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.items[0].line_total, d("150.00"));

        let cart = add_item(&fx.state, BUYER, add(fx.p3, 1)).await.unwrap();
        assert_eq!(cart.items_count, 4);
        assert_eq!(cart.subtotal, d("180.00"));
        // Nothing reserved
        assert_eq!(fx.stock(fx.p2).await, 10);
    }

    #[tokio::test]
    async fn test_add_rejects_over_stock_and_bad_products() {
        let fx = Fixture::new().await;
        add_item(&fx.state, BUYER, add(fx.p1, 8)).await.unwrap();
        let e = err(add_item(&fx.state, BUYER, add(fx.p1, 3)).await.unwrap_err());
        assert_eq!(e.message, "Only 10 items available");

        let e = err(add_item(&fx.state, BUYER, add(fx.p1, 0)).await.unwrap_err());
        assert_eq!(e.code, ErrorCode::InvalidQuantity);

        let e = err(add_item(&fx.state, BUYER, add(777, 1)).await.unwrap_err());
        assert_eq!(e.code, ErrorCode::ProductNotFound);

        fx.memory.set_store_active(fx.store_b, false).await;
        let e = err(add_item(&fx.state, BUYER, add(fx.p3, 1)).await.unwrap_err());
        assert_eq!(e.code, ErrorCode::ProductUnavailable);
    }

    #[tokio::test]
    async fn test_add_cannot_overflow_merged_quantity() {
        let fx = Fixture::new().await;
        add_item(&fx.state, BUYER, add(fx.p1, 1)).await.unwrap();

        let e = err(add_item(&fx.state, BUYER, add(fx.p1, i32::MAX)).await.unwrap_err());
        assert_eq!(e.code, ErrorCode::InsufficientStock);
        assert_eq!(e.message, "Only 10 items available");

        let cart = get_cart(&fx.state, BUYER).await.unwrap();
        assert_eq!(cart.items[0].quantity, 1);
        assert_eq!(cart.items_count, 1);
    }

    #[tokio::test]
    async fn test_count_and_remove_by_product() {
        let fx = Fixture::new().await;
        assert_eq!(count(&fx.state, BUYER).await.unwrap().count, 0);

        add_item(&fx.state, BUYER, add(fx.p1, 2)).await.unwrap();
        add_item(&fx.state, BUYER, add(fx.p3, 3)).await.unwrap();
        let counted = count(&fx.state, BUYER).await.unwrap();
        assert_eq!((counted.count, counted.lines), (5, 2));

        let cart = remove_product(&fx.state, BUYER, fx.p1).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_id, fx.p3);

        let e = err(remove_product(&fx.state, BUYER, fx.p1).await.unwrap_err());
        assert_eq!(e.code, ErrorCode::CartItemNotFound);
        let e = err(remove_product(&fx.state, OTHER_BUYER, fx.p3).await.unwrap_err());
        assert_eq!(e.code, ErrorCode::CartItemNotFound);
    }

    #[tokio::test]
    async fn test_validate_reports_every_failing_line() {
        let fx = Fixture::new().await;
        assert!(!validate(&fx.state, BUYER).await.unwrap().valid);

        add_item(&fx.state, BUYER, add(fx.p1, 4)).await.unwrap();
        add_item(&fx.state, BUYER, add(fx.p3, 1)).await.unwrap();
        let report = validate(&fx.state, BUYER).await.unwrap();
        assert!(report.valid);
        assert!(report.issues.is_empty());

        // Stock sold elsewhere and a store taken offline after the lines were added
        fx.store()
            .add_cart_item(OTHER_BUYER, fx.p1, 8)
            .await
            .unwrap();
        let address = fx.memory.insert_address(OTHER_BUYER, "Mysuru").await;
        place_orders(&fx.state, OTHER_BUYER, address, CheckoutSource::Cart)
        .await
        .unwrap();
        fx.memory.set_store_active(fx.store_b, false).await;

        let report = validate(&fx.state, BUYER).await.unwrap();
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].product_id, fx.p1);
        assert_eq!(report.issues[0].code, ErrorCode::InsufficientStock);
        assert_eq!(report.issues[0].message, "Only 2 items available");
        assert_eq!(report.issues[1].code, ErrorCode::ProductUnavailable);

        // Nothing was reserved or removed
        assert_eq!(fx.stock(fx.p1).await, 2);
        assert_eq!(count(&fx.state, BUYER).await.unwrap().lines, 2);
    }

    #[tokio::test]
    async fn test_update_remove_clear() {
        let fx = Fixture::new().await;
        let cart = add_item(&fx.state, BUYER, add(fx.p1, 1)).await.unwrap();
        let item_id = cart.items[0].id;

        let cart = update_item(
            &fx.state,
            BUYER,
            item_id,
            UpdateCartItemRequest { quantity: 4 },
        )
        .await
        .unwrap();
        assert_eq!(cart.items[0].quantity, 4);

        let e = err(
            update_item(
                &fx.state,
                OTHER_BUYER,
                item_id,
                UpdateCartItemRequest { quantity: 2 },
            )
            .await
            .unwrap_err(),
        );
        assert_eq!(e.code, ErrorCode::CartItemNotFound);

        let e = err(remove_item(&fx.state, OTHER_BUYER, item_id).await.unwrap_err());
        assert_eq!(e.code, ErrorCode::CartItemNotFound);

        let cart = remove_item(&fx.state, BUYER, item_id).await.unwrap();
        assert!(cart.items.is_empty());

        add_item(&fx.state, BUYER, add(fx.p3, 2)).await.unwrap();
        clear(&fx.state, BUYER).await.unwrap();
        assert_eq!(get_cart(&fx.state, BUYER).await.unwrap().subtotal, Decimal::ZERO);
    }
}
