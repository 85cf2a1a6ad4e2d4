//! Discount codes and gift cards applied to a cart.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// How a discount rule reduces the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Fixed amount off, in minor units.
    Fixed,
    /// Whole-number percentage off.
    Percentage,
    /// Shipping is free.
    FreeShipping,
}

/// A discount code accepted by the backend for this cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedDiscount {
    /// Code as entered by the customer (e.g. "WOSK10").
    pub code: String,
    pub kind: DiscountKind,
    /// Percentage for `Percentage`, minor units for `Fixed`, unused otherwise.
    pub value: i64,
}

impl AppliedDiscount {
    /// Amount this discount takes off `subtotal`, never more than the
    /// subtotal itself.
    pub fn amount_off(&self, subtotal: &Money) -> Money {
        let amount = match self.kind {
            DiscountKind::Fixed => self.value,
            DiscountKind::Percentage => subtotal
                .amount_minor
                .saturating_mul(self.value.clamp(0, 100))
                / 100,
            DiscountKind::FreeShipping => 0,
        };
        Money::new(amount.clamp(0, subtotal.amount_minor.max(0)), subtotal.currency)
    }

    /// Codes compare case-insensitively.
    pub fn matches(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code)
    }
}

/// A gift card redeemed against this cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedGiftCard {
    pub code: String,
    /// Remaining balance on the card.
    pub balance: Money,
}

impl AppliedGiftCard {
    /// Portion of `due` this card covers.
    pub fn applied_amount(&self, due: &Money) -> Money {
        let amount = self.balance.amount_minor.min(due.amount_minor).max(0);
        Money::new(amount, due.currency)
    }

    pub fn matches(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn discount(kind: DiscountKind, value: i64) -> AppliedDiscount {
        AppliedDiscount {
            code: "WOSK10".to_string(),
            kind,
            value,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let subtotal = Money::new(10000, Currency::PLN);
        let off = discount(DiscountKind::Percentage, 10).amount_off(&subtotal);
        assert_eq!(off.amount_minor, 1000);
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let subtotal = Money::new(500, Currency::PLN);
        let off = discount(DiscountKind::Fixed, 2000).amount_off(&subtotal);
        assert_eq!(off.amount_minor, 500);
    }

    #[test]
    fn test_free_shipping_takes_nothing_off_items() {
        let subtotal = Money::new(500, Currency::PLN);
        assert!(discount(DiscountKind::FreeShipping, 0)
            .amount_off(&subtotal)
            .is_zero());
    }

    #[test]
    fn test_gift_card_covers_up_to_balance() {
        let card = AppliedGiftCard {
            code: "GIFT-1".to_string(),
            balance: Money::new(3000, Currency::PLN),
        };
        assert_eq!(
            card.applied_amount(&Money::new(5000, Currency::PLN)).amount_minor,
            3000
        );
        assert_eq!(
            card.applied_amount(&Money::new(1000, Currency::PLN)).amount_minor,
            1000
        );
        assert!(card.matches("gift-1"));
    }
}
