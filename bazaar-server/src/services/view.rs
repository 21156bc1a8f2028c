//! Read projection: orders joined with their store names and lines

use shared::models::{Order, OrderItem, OrderView};
use std::collections::HashMap;

use crate::error::ServiceResult;
use crate::store::MarketStore;

/// Build flat views; input order of `orders` is preserved
pub fn assemble(
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    store_names: &HashMap<i64, String>,
) -> Vec<OrderView> {
    let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    orders
        .into_iter()
        .map(|o| {
            let items = by_order.remove(&o.id).unwrap_or_default();
            OrderView {
                id: o.id,
                buyer_id: o.buyer_id,
                store_id: o.store_id,
                store_name: store_names.get(&o.store_id).cloned().unwrap_or_default(),
                address_id: o.address_id,
                status: o.status,
                total_amount: o.total_amount,
                admin_commission: o.admin_commission,
                seller_amount: o.seller_amount,
                commission_rate: o.commission_rate,
                payment_received: o.payment_received,
                payout_status: o.payout_status,
                payout_id: o.payout_id,
                tracking_number: o.tracking_number,
                seller_notes: o.seller_notes,
                items_count: items.iter().map(|i| i64::from(i.quantity)).sum(),
                items,
                created_at: o.created_at,
                updated_at: o.updated_at,
            }
        })
        .collect()
}

/// Load lines and store names for `orders` and assemble their views
pub async fn project(store: &dyn MarketStore, orders: Vec<Order>) -> ServiceResult<Vec<OrderView>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let mut store_ids: Vec<i64> = orders.iter().map(|o| o.store_id).collect();
    store_ids.sort_unstable();
    store_ids.dedup();

    let items = store.order_items(&order_ids).await?;
    let names = store
        .find_stores(&store_ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();
    Ok(assemble(orders, items, &names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{OrderPayoutStatus, OrderStatus};

    fn order(id: i64, store_id: i64) -> Order {
        Order {
            id,
            buyer_id: 1,
            store_id,
            address_id: 1,
            status: OrderStatus::Pending,
            total_amount: Decimal::ONE_HUNDRED,
            admin_commission: Decimal::new(5, 0),
            seller_amount: Decimal::new(95, 0),
            commission_rate: Decimal::new(5, 2),
            payment_received: false,
            payout_status: OrderPayoutStatus::Pending,
            payout_id: None,
            tracking_number: None,
            seller_notes: None,
            version: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn item(order_id: i64, quantity: i32) -> OrderItem {
        OrderItem {
            id: order_id * 10 + i64::from(quantity),
            order_id,
            product_id: 7,
            quantity,
            price_at_purchase: Decimal::TEN,
            title: "Field Notes".into(),
        }
    }

    #[test]
    fn test_assemble_groups_lines_and_counts_units() {
        let names = HashMap::from([(10, "Paper Lantern Books".to_string())]);
        let views = assemble(
            vec![order(2, 10), order(1, 20)],
            vec![item(1, 1), item(2, 2), item(2, 3)],
            &names,
        );

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, 2);
        assert_eq!(views[0].store_name, "Paper Lantern Books");
        assert_eq!(views[0].items.len(), 2);
        assert_eq!(views[0].items_count, 5);
        // Unknown store falls back to an empty name
        assert_eq!(views[1].store_name, "");
        assert_eq!(views[1].items_count, 1);
    }
}
