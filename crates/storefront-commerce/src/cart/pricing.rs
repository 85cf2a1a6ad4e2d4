//! Backend-computed cart totals and their display form.

use serde::{Deserialize, Serialize};

use crate::ids::CartId;
use crate::money::{Currency, Money};

/// Totals as reported by the commerce backend.
///
/// These are read through, never recomputed by the storefront.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartTotals {
    /// Sum of line item subtotals.
    pub subtotal: Money,
    pub shipping_total: Money,
    pub tax_total: Money,
    pub discount_total: Money,
    pub gift_card_total: Money,
    /// Amount the customer will be charged.
    pub total: Money,
}

impl CartTotals {
    /// All-zero totals for an empty cart.
    pub fn zero(currency: Currency) -> Self {
        Self {
            subtotal: Money::zero(currency),
            shipping_total: Money::zero(currency),
            tax_total: Money::zero(currency),
            discount_total: Money::zero(currency),
            gift_card_total: Money::zero(currency),
            total: Money::zero(currency),
        }
    }

    /// Discounts plus gift cards.
    pub fn savings(&self) -> Option<Money> {
        self.discount_total.try_add(&self.gift_card_total)
    }

    pub fn has_discounts(&self) -> bool {
        self.discount_total.amount_minor > 0 || self.gift_card_total.amount_minor > 0
    }
}

/// Formatted view of a cart, ready for a checkout sidebar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub id: CartId,
    pub items_count: u64,
    pub subtotal: String,
    pub shipping_total: String,
    pub tax_total: String,
    pub discount_total: String,
    pub gift_card_total: String,
    pub total: String,
    pub currency: Currency,
    pub has_shipping: bool,
    pub has_payment: bool,
    pub can_complete: bool,
}
