//! Order history commands.

use anyhow::{Context as _, Result};
use storefront_commerce::{Order, OrderId, OrderStatus};
use storefront_state::backend::OrderQuery;
use storefront_state::OperationGroup;

use super::cart::settle;
use super::{OrdersArgs, OrdersCommand};
use crate::context::Context;
use crate::output::order_badge;

/// Run the orders command.
pub async fn run(args: OrdersArgs, ctx: &Context) -> Result<()> {
    let store = ctx.session().await?;
    if let Some(token) = args.token.as_deref() {
        store.customer.token().set(token);
    }
    let history = &store.orders;

    let command = args.command.unwrap_or(OrdersCommand::List {
        limit: 10,
        offset: 0,
        status: None,
        all: false,
    });

    match command {
        OrdersCommand::List {
            limit,
            offset,
            status,
            all,
        } => {
            let mut query = OrderQuery::default().with_limit(limit).with_offset(offset);
            if let Some(status) = status {
                query = query.with_status(parse_status(&status)?);
            }

            let mut orders = settle(&store, OperationGroup::Orders, history.list(query).await, ctx)?;
            while all && history.has_more().await {
                let more = settle(&store, OperationGroup::Orders, history.load_more().await, ctx)?;
                if more.is_empty() {
                    break;
                }
                orders.extend(more);
            }

            if ctx.output.is_json() {
                ctx.output.json(&serde_json::json!({
                    "orders": orders,
                    "count": history.count().await,
                }));
                return Ok(());
            }
            print_orders(ctx, &orders);
            if history.has_more().await {
                ctx.output.info(&format!(
                    "Showing {} of {} orders; use --all to list every order",
                    orders.len(),
                    history.count().await
                ));
            }
        }
        OrdersCommand::Show { id } => {
            let order = settle(
                &store,
                OperationGroup::Orders,
                history.retrieve(&OrderId::new(id)).await,
                ctx,
            )?;
            print_order(ctx, &order);
        }
    }

    Ok(())
}

fn parse_status(value: &str) -> Result<OrderStatus> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase()))
        .with_context(|| format!("Unknown order status: {}", value))
}

fn print_orders(ctx: &Context, orders: &[Order]) {
    if orders.is_empty() {
        ctx.output.info("No orders");
        return;
    }
    ctx.output.header("Orders");
    let widths = [8, 12, 16, 6, 12];
    ctx.output
        .table_row(&["ORDER", "DATE", "STATUS", "ITEMS", "TOTAL"], &widths);
    for order in orders {
        ctx.output.table_row(
            &[
                &order.display_number(),
                &order.created_at.format("%Y-%m-%d").to_string(),
                &order_badge(order.status),
                &order.item_count().to_string(),
                &order.totals.total.display(),
            ],
            &widths,
        );
    }
}

fn print_order(ctx: &Context, order: &Order) {
    if ctx.output.is_json() {
        ctx.output.json(order);
        return;
    }

    ctx.output.header(&format!("Order {}", order.display_number()));
    ctx.output.kv("id", order.id.as_str());
    ctx.output.kv("placed", &order.created_at.format("%Y-%m-%d %H:%M").to_string());
    ctx.output.kv("status", &order_badge(order.status));
    ctx.output.kv("payment", order.payment_status.as_str());
    ctx.output.kv("fulfillment", order.fulfillment_status.as_str());
    if let Some(address) = &order.shipping_address {
        ctx.output.kv("ship to", &address.one_line());
    }

    for item in &order.items {
        ctx.output.list_item(&format!(
            "{} x{} {}",
            item.title,
            item.quantity,
            item.total.display()
        ));
    }
    for method in &order.shipping_methods {
        ctx.output.list_item(&format!("{} {}", method.name, method.amount.display()));
    }
    ctx.output.kv("total", &order.totals.total.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("Completed").unwrap(), OrderStatus::Completed);
        assert_eq!(parse_status("requires_action").unwrap(), OrderStatus::RequiresAction);
        assert!(parse_status("shipped").is_err());
    }
}
