//! Checkout stage evaluation.
//!
//! The stage is never stored; it is recomputed from the current cart
//! snapshot every time it is asked for.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cart::Cart;

/// A precondition for completing a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutRequirement {
    /// The cart has no line items.
    Items,
    ShippingMethod,
    ShippingAddress,
    BillingAddress,
    /// No payment session is selected.
    PaymentSession,
}

impl CheckoutRequirement {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutRequirement::Items => "items",
            CheckoutRequirement::ShippingMethod => "shipping method",
            CheckoutRequirement::ShippingAddress => "shipping address",
            CheckoutRequirement::BillingAddress => "billing address",
            CheckoutRequirement::PaymentSession => "payment session",
        }
    }
}

impl fmt::Display for CheckoutRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a cart stands in the checkout sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    /// Cart is being assembled.
    Building,
    /// A shipping method is attached.
    ShippingSelected,
    /// Shipping method plus both addresses.
    AddressesSet,
    /// All of the above plus a selected payment session.
    PaymentSelected,
    /// Everything above on a non-empty cart. A cart emptied after payment
    /// selection stays at `PaymentSelected`.
    ReadyToComplete,
}

impl CheckoutStage {
    /// Derive the stage from a cart snapshot. Steps count only when every
    /// earlier step is also satisfied.
    pub fn evaluate(cart: Option<&Cart>) -> Self {
        let Some(cart) = cart else {
            return CheckoutStage::Building;
        };
        if cart.can_complete() {
            return CheckoutStage::ReadyToComplete;
        }
        if !cart.has_shipping_method() {
            return CheckoutStage::Building;
        }
        if cart.shipping_address.is_none() || cart.billing_address.is_none() {
            return CheckoutStage::ShippingSelected;
        }
        if cart.selected_payment_session().is_none() {
            return CheckoutStage::AddressesSet;
        }
        CheckoutStage::PaymentSelected
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStage::Building => "building",
            CheckoutStage::ShippingSelected => "shipping_selected",
            CheckoutStage::AddressesSet => "addresses_set",
            CheckoutStage::PaymentSelected => "payment_selected",
            CheckoutStage::ReadyToComplete => "ready_to_complete",
        }
    }

    /// Get the step number (1-indexed).
    pub fn number(&self) -> u8 {
        match self {
            CheckoutStage::Building => 1,
            CheckoutStage::ShippingSelected => 2,
            CheckoutStage::AddressesSet => 3,
            CheckoutStage::PaymentSelected => 4,
            CheckoutStage::ReadyToComplete => 5,
        }
    }

    /// Get progress percentage.
    pub fn progress_percent(&self) -> u8 {
        self.number() * 20
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartRegion, LineItem};
    use crate::checkout::{Address, PaymentSession, PaymentSessionStatus, ShippingMethod};
    use crate::ids::*;
    use crate::money::{Currency, Money};

    fn cart() -> Cart {
        Cart::new(
            CartId::new("cart_1"),
            CartRegion {
                id: RegionId::new("reg_pl"),
                name: "Polska".to_string(),
                currency: Currency::PLN,
            },
        )
    }

    fn with_item(mut cart: Cart) -> Cart {
        cart.items.push(
            LineItem::new(
                LineItemId::new("item_1"),
                VariantId::new("variant_rose"),
                "Rose candle",
                1,
                Money::new(3900, Currency::PLN),
            )
            .unwrap(),
        );
        cart
    }

    fn with_shipping(mut cart: Cart) -> Cart {
        cart.shipping_methods.push(ShippingMethod {
            id: ShippingMethodId::new("sm_1"),
            shipping_option_id: ShippingOptionId::new("so_1"),
            name: "Kurier".to_string(),
            amount: Money::new(1500, Currency::PLN),
        });
        cart
    }

    fn with_addresses(mut cart: Cart) -> Cart {
        let addr = Address::new("Ola", "Wiśniewska", "Rynek 1", "Wrocław", "pl", "50-101");
        cart.shipping_address = Some(addr.clone());
        cart.billing_address = Some(addr);
        cart
    }

    fn with_payment(mut cart: Cart) -> Cart {
        cart.payment_sessions.push(PaymentSession {
            id: PaymentSessionId::new("ps_1"),
            provider_id: PaymentProviderId::new("pp_system_default"),
            is_selected: true,
            is_initiated: true,
            status: PaymentSessionStatus::Pending,
            amount: Money::new(5400, Currency::PLN),
            data: serde_json::Value::Null,
        });
        cart
    }

    #[test]
    fn test_no_cart_is_building() {
        assert_eq!(CheckoutStage::evaluate(None), CheckoutStage::Building);
    }

    #[test]
    fn test_stages_progress_in_order() {
        let c = with_item(cart());
        assert_eq!(CheckoutStage::evaluate(Some(&c)), CheckoutStage::Building);
        let c = with_shipping(c);
        assert_eq!(
            CheckoutStage::evaluate(Some(&c)),
            CheckoutStage::ShippingSelected
        );
        let c = with_addresses(c);
        assert_eq!(CheckoutStage::evaluate(Some(&c)), CheckoutStage::AddressesSet);
        let c = with_payment(c);
        assert_eq!(
            CheckoutStage::evaluate(Some(&c)),
            CheckoutStage::ReadyToComplete
        );
    }

    #[test]
    fn test_emptied_cart_stops_short_of_ready() {
        let c = with_payment(with_addresses(with_shipping(cart())));
        assert_eq!(
            CheckoutStage::evaluate(Some(&c)),
            CheckoutStage::PaymentSelected
        );
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(CheckoutStage::ReadyToComplete.progress_percent(), 100);
        assert_eq!(CheckoutStage::Building.progress_percent(), 20);
    }
}
