//! Shipping option and method types.

use serde::{Deserialize, Serialize};

use crate::ids::{ShippingMethodId, ShippingOptionId};
use crate::money::Money;

/// How a shipping option is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    #[default]
    FlatRate,
    Calculated,
}

/// A fulfillment option the backend offers for a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    /// Display name (e.g., "Paczkomat InPost").
    pub name: String,
    pub price_type: PriceType,
    /// Price for flat-rate options; calculated options report their
    /// price only once attached to a cart.
    pub amount: Option<Money>,
}

impl ShippingOption {
    pub fn is_free(&self) -> bool {
        self.amount.map(|a| a.is_zero()).unwrap_or(false)
    }
}

/// A shipping option bound to a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingMethod {
    pub id: ShippingMethodId,
    /// The option this method was created from.
    pub shipping_option_id: ShippingOptionId,
    pub name: String,
    /// Charged amount.
    pub amount: Money,
}

impl ShippingMethod {
    /// Bind an option to a cart, charging `amount`.
    pub fn from_option(option: &ShippingOption, amount: Money) -> Self {
        Self {
            id: ShippingMethodId::generate(),
            shipping_option_id: option.id.clone(),
            name: option.name.clone(),
            amount,
        }
    }
}
