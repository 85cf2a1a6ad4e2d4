//! Checkout commands.

use anyhow::{bail, Result};
use dialoguer::Confirm;
use storefront_commerce::{Address, PaymentProviderId, ShippingOptionId};
use storefront_state::{CheckoutOutcome, OperationGroup};

use super::cart::{print_cart, settle};
use super::{AddressArgs, CheckoutArgs, CheckoutCommand};
use crate::context::Context;
use crate::output::stage_badge;

/// Run the checkout command.
pub async fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let store = ctx.session().await?;
    let checkout = &store.checkout;

    match args.command.unwrap_or(CheckoutCommand::Status) {
        CheckoutCommand::Status => {
            let missing = checkout.missing_requirements();
            if ctx.output.is_json() {
                ctx.output.json(&serde_json::json!({
                    "cart_id": store.cart.cart_id(),
                    "stage": checkout.stage(),
                    "can_complete": checkout.can_complete(),
                    "missing": missing,
                }));
                return Ok(());
            }
            ctx.output.header("Checkout");
            ctx.output.kv("stage", &stage_badge(checkout.stage()));
            if missing.is_empty() {
                ctx.output.success("Ready to complete");
            } else {
                ctx.output.info("Still missing:");
                for requirement in &missing {
                    ctx.output.list_item(requirement.as_str());
                }
            }
        }
        CheckoutCommand::ShippingOptions => {
            let options = settle(
                &store,
                OperationGroup::Shipping,
                checkout.list_shipping_options().await,
                ctx,
            )?;
            if ctx.output.is_json() {
                ctx.output.json(&options);
                return Ok(());
            }
            ctx.output.header("Shipping options");
            let widths = [20, 28, 12];
            ctx.output.table_row(&["ID", "NAME", "PRICE"], &widths);
            for option in &options {
                let price = match &option.amount {
                    Some(amount) => amount.display(),
                    None => "calculated".to_string(),
                };
                ctx.output
                    .table_row(&[option.id.as_str(), &option.name, &price], &widths);
            }
        }
        CheckoutCommand::Shipping { option } => {
            let cart = settle(
                &store,
                OperationGroup::Shipping,
                checkout.set_shipping_method(&ShippingOptionId::new(option)).await,
                ctx,
            )?;
            ctx.output.success("Shipping method set");
            print_cart(ctx, &cart);
        }
        CheckoutCommand::Address(address) => {
            let (shipping, billing) = addresses(address);
            let cart = settle(
                &store,
                OperationGroup::Cart,
                checkout.set_addresses(shipping, billing).await,
                ctx,
            )?;
            ctx.output.success("Addresses saved");
            ctx.output.kv("stage", &stage_badge(checkout.stage()));
            if ctx.output.is_json() {
                ctx.output.json(&cart);
            }
        }
        CheckoutCommand::Pay { provider } => {
            let cart = settle(
                &store,
                OperationGroup::Payment,
                checkout
                    .choose_payment_provider(&PaymentProviderId::new(provider))
                    .await,
                ctx,
            )?;
            ctx.output.success("Payment provider selected");
            print_cart(ctx, &cart);
        }
        CheckoutCommand::Complete { yes } => {
            let missing = checkout.missing_requirements();
            if !missing.is_empty() {
                for requirement in &missing {
                    ctx.output.list_item(requirement.as_str());
                }
                bail!("Checkout is not ready ({} step(s) missing)", missing.len());
            }

            if !yes && !ctx.output.is_json() {
                let total = store
                    .cart
                    .totals()
                    .map(|t| t.total.display())
                    .unwrap_or_default();
                let confirmed = Confirm::new()
                    .with_prompt(format!("Place the order for {}?", total))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    ctx.output.info("Cancelled");
                    return Ok(());
                }
            }

            let spinner = ctx.output.spinner("Placing order...");
            let result = checkout.complete_order().await;
            spinner.finish_and_clear();

            match settle(&store, OperationGroup::Checkout, result, ctx)? {
                CheckoutOutcome::Placed(order) => {
                    if ctx.output.is_json() {
                        ctx.output.json(&order);
                        return Ok(());
                    }
                    ctx.output.success(&format!(
                        "Order {} placed ({})",
                        order.display_number(),
                        order.totals.total.display()
                    ));
                    ctx.output.kv("id", order.id.as_str());
                }
                CheckoutOutcome::ActionRequired { cart, message } => {
                    ctx.output.warn(&message);
                    ctx.output
                        .info("The cart was kept; finish the payment step and run `storefront checkout complete` again");
                    if ctx.output.is_json() {
                        ctx.output.json(&serde_json::json!({
                            "action_required": message,
                            "cart": cart,
                        }));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Build the shipping address and, when billing fields were given, a
/// separate billing address.
fn addresses(args: AddressArgs) -> (Address, Option<Address>) {
    let mut shipping = Address::new(
        args.first_name,
        args.last_name,
        args.address,
        args.city,
        args.country,
        args.postal_code,
    );
    shipping.phone = args.phone;

    let billing = args.billing_address.map(|street| {
        let mut billing = shipping.clone();
        billing.address_1 = street;
        if let Some(city) = args.billing_city {
            billing.city = city;
        }
        if let Some(code) = args.billing_postal_code {
            billing.postal_code = code;
        }
        billing.company = args.billing_company;
        billing
    });

    (shipping, billing)
}
