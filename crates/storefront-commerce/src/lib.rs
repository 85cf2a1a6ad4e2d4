//! Commerce domain types for the candle storefront.
//!
//! Everything here describes what the commerce backend reports back:
//!
//! - **Cart**: snapshot, line items, totals, discounts and gift cards
//! - **Checkout**: addresses, shipping, payment sessions, orders, and the
//!   derived checkout stage
//! - **Customer**: account records and the saved address book
//!
//! Derived values (item counts, `can_complete`, the checkout stage) are
//! computed from a snapshot on demand and never stored.
//!
//! # Example
//!
//! ```rust
//! use storefront_commerce::prelude::*;
//!
//! let region = CartRegion {
//!     id: RegionId::new("reg_pl"),
//!     name: "Polska".to_string(),
//!     currency: Currency::PLN,
//! };
//! let cart = Cart::new(CartId::new("cart_01"), region);
//!
//! assert!(cart.is_empty());
//! assert_eq!(CheckoutStage::evaluate(Some(&cart)), CheckoutStage::Building);
//! assert_eq!(cart.totals.total.display(), "0,00 z\u{0142}");
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod checkout;
pub mod customer;

pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

pub use cart::{
    AppliedDiscount, AppliedGiftCard, Cart, CartRegion, CartSummary, CartTotals, DiscountKind,
    LineItem, MAX_QUANTITY_PER_ITEM,
};
pub use checkout::{
    Address, CheckoutRequirement, CheckoutStage, FulfillmentStatus, Order, OrderLineItem,
    OrderStatus, PaymentSession, PaymentSessionStatus, PaymentStatus, PriceType, ShippingMethod,
    ShippingOption,
};
pub use customer::Customer;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Cart
    pub use crate::cart::{
        AppliedDiscount, AppliedGiftCard, Cart, CartRegion, CartSummary, CartTotals,
        DiscountKind, LineItem, MAX_QUANTITY_PER_ITEM,
    };

    // Checkout
    pub use crate::checkout::{
        Address, CheckoutRequirement, CheckoutStage, FulfillmentStatus, Order, OrderLineItem,
        OrderStatus, PaymentSession, PaymentSessionStatus, PaymentStatus, PriceType,
        ShippingMethod, ShippingOption,
    };

    // Customer
    pub use crate::customer::Customer;
}
