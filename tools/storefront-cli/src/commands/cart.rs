//! Cart commands.

use anyhow::Result;
use dialoguer::Confirm;
use storefront_commerce::{Cart, LineItemId, VariantId};
use storefront_state::{CartResult, MedusaBackend, OperationGroup, Storefront};

use super::{CartArgs, CartCommand, CodeCommand};
use crate::context::Context;
use crate::output::{stage_badge, truncate};

/// Run the cart command.
pub async fn run(args: CartArgs, ctx: &Context) -> Result<()> {
    let store = ctx.session().await?;
    let cart = &store.cart;

    let (group, result) = match args.command.unwrap_or(CartCommand::Show) {
        CartCommand::Show => {
            match cart.cart() {
                Some(c) => print_cart(ctx, &c),
                None => ctx.output.info("The cart is empty"),
            }
            return Ok(());
        }
        CartCommand::Add { variant, quantity } => (
            OperationGroup::Items,
            cart.add_or_update_item(&VariantId::new(variant), quantity).await,
        ),
        CartCommand::Set { variant, quantity } => (
            OperationGroup::Items,
            cart.set_item_quantity(&VariantId::new(variant), quantity).await,
        ),
        CartCommand::Inc { variant } => (
            OperationGroup::Items,
            cart.increment_item(&VariantId::new(variant)).await,
        ),
        CartCommand::Dec { variant } => (
            OperationGroup::Items,
            cart.decrement_item(&VariantId::new(variant)).await,
        ),
        CartCommand::Remove { line } => (
            OperationGroup::Items,
            cart.remove_item(&LineItemId::new(line)).await,
        ),
        CartCommand::Clear { yes } => return clear(&store, yes, ctx).await,
        CartCommand::Discount { command } => (
            OperationGroup::Promotions,
            match command {
                CodeCommand::Add { code } => cart.add_discount(&code).await,
                CodeCommand::Remove { code } => cart.remove_discount(&code).await,
            },
        ),
        CartCommand::GiftCard { command } => (
            OperationGroup::Promotions,
            match command {
                CodeCommand::Add { code } => cart.add_gift_card(&code).await,
                CodeCommand::Remove { code } => cart.remove_gift_card(&code).await,
            },
        ),
        CartCommand::Email { email } => (
            OperationGroup::Cart,
            cart.set_customer_email(&email).await,
        ),
    };

    let updated = settle(&store, group, result, ctx)?;
    ctx.output.success("Cart updated");
    print_cart(ctx, &updated);
    Ok(())
}

async fn clear(store: &Storefront<MedusaBackend>, yes: bool, ctx: &Context) -> Result<()> {
    let Some(id) = store.cart.cart_id() else {
        ctx.output.info("No cart to clear");
        return Ok(());
    };

    if !yes && !ctx.output.is_json() {
        let confirmed = Confirm::new()
            .with_prompt(format!("Forget cart {}?", id))
            .default(false)
            .interact()?;
        if !confirmed {
            ctx.output.info("Cancelled");
            return Ok(());
        }
    }

    store.cart.clear_cart().await?;
    ctx.output.success(&format!("Cleared cart {}", id));
    Ok(())
}

/// Surface the localized status message for a failed operation.
pub fn settle<T>(
    store: &Storefront<MedusaBackend>,
    group: OperationGroup,
    result: CartResult<T>,
    ctx: &Context,
) -> Result<T> {
    result.map_err(|e| {
        if let Some(message) = store.status().get(group).error {
            ctx.output.warn(&message);
        }
        e.into()
    })
}

/// Print a cart as a table, or as JSON.
pub fn print_cart(ctx: &Context, cart: &Cart) {
    if ctx.output.is_json() {
        ctx.output.json(cart);
        return;
    }

    ctx.output.header(&format!("Cart {}", cart.id));
    ctx.output.kv("region", &cart.region.name);
    if let Some(email) = &cart.email {
        ctx.output.kv("email", email);
    }
    ctx.output.kv("stage", &stage_badge(storefront_commerce::CheckoutStage::evaluate(Some(cart))));

    if cart.items.is_empty() {
        ctx.output.info("No items");
    } else {
        println!();
        let widths = [16, 32, 5, 12];
        ctx.output.table_row(&["LINE", "PRODUCT", "QTY", "TOTAL"], &widths);
        for item in &cart.items {
            let title = match &item.variant_title {
                Some(v) => format!("{} ({})", item.title, v),
                None => item.title.clone(),
            };
            ctx.output.table_row(
                &[
                    item.id.as_str(),
                    &truncate(&title, 32),
                    &item.quantity.to_string(),
                    &item.total.display(),
                ],
                &widths,
            );
        }
    }

    println!();
    let totals = &cart.totals;
    ctx.output.kv("subtotal", &totals.subtotal.display());
    if !totals.shipping_total.is_zero() {
        ctx.output.kv("shipping", &totals.shipping_total.display());
    }
    if !totals.discount_total.is_zero() {
        ctx.output.kv("discounts", &format!("-{}", totals.discount_total.display()));
    }
    if !totals.gift_card_total.is_zero() {
        ctx.output.kv("gift cards", &format!("-{}", totals.gift_card_total.display()));
    }
    if !totals.tax_total.is_zero() {
        ctx.output.kv("tax", &totals.tax_total.display());
    }
    ctx.output.kv("total", &totals.total.display());

    for discount in &cart.discounts {
        ctx.output.list_item(&format!("discount {}", discount.code));
    }
    for card in &cart.gift_cards {
        ctx.output.list_item(&format!("gift card {} ({})", card.code, card.balance.display()));
    }
}
