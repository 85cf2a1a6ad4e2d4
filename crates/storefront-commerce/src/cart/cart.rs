//! Cart snapshot and line item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::{AppliedDiscount, AppliedGiftCard, CartSummary, CartTotals};
use crate::checkout::{Address, CheckoutRequirement, PaymentSession, ShippingMethod};
use crate::error::CommerceError;
use crate::ids::{CartId, CustomerId, LineItemId, ProductId, RegionId, VariantId};
use crate::money::{Currency, Money};

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: u32 = 9999;

/// Region a cart is priced in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartRegion {
    pub id: RegionId,
    pub name: String,
    pub currency: Currency,
}

/// The backend's authoritative view of a shopping cart.
///
/// Snapshots are replaced wholesale after each confirmed mutation; nothing in
/// this type is patched in place by the storefront.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Backend-issued cart identifier.
    pub id: CartId,
    /// Pricing region.
    pub region: CartRegion,
    /// Customer email, required by most backends before completion.
    pub email: Option<String>,
    /// Associated customer for signed-in sessions.
    pub customer_id: Option<CustomerId>,
    /// Line items, in backend order.
    pub items: Vec<LineItem>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    /// Applied discount codes.
    pub discounts: Vec<AppliedDiscount>,
    /// Applied gift card codes.
    pub gift_cards: Vec<AppliedGiftCard>,
    /// Selected shipping methods (the backend keeps at most one per profile).
    pub shipping_methods: Vec<ShippingMethod>,
    /// Payment sessions, one per initiated provider.
    pub payment_sessions: Vec<PaymentSession>,
    /// Backend-computed totals.
    pub totals: CartTotals,
    /// Set once the backend has turned this cart into an order.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Create an empty cart in a region.
    pub fn new(id: CartId, region: CartRegion) -> Self {
        let currency = region.currency;
        Self {
            id,
            region,
            email: None,
            customer_id: None,
            items: Vec::new(),
            shipping_address: None,
            billing_address: None,
            discounts: Vec::new(),
            gift_cards: Vec::new(),
            shipping_methods: Vec::new(),
            payment_sessions: Vec::new(),
            totals: CartTotals::zero(currency),
            completed_at: None,
        }
    }

    /// Cart currency (the region's currency).
    pub fn currency(&self) -> Currency {
        self.region.currency
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Get number of distinct line items.
    pub fn unique_item_count(&self) -> usize {
        self.items.len()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Get an item by ID.
    pub fn line_item(&self, line_item_id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.id == line_item_id)
    }

    /// Get the line item holding a variant, if any.
    pub fn line_item_for_variant(&self, variant_id: &VariantId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.variant_id == variant_id)
    }

    pub fn has_shipping_method(&self) -> bool {
        !self.shipping_methods.is_empty()
    }

    pub fn has_payment_session(&self) -> bool {
        !self.payment_sessions.is_empty()
    }

    /// The payment session currently marked as selected.
    pub fn selected_payment_session(&self) -> Option<&PaymentSession> {
        self.payment_sessions.iter().find(|s| s.is_selected)
    }

    /// Everything still standing between this cart and completion, in
    /// checkout order.
    pub fn missing_requirements(&self) -> Vec<CheckoutRequirement> {
        let mut missing = Vec::new();
        if self.items.is_empty() {
            missing.push(CheckoutRequirement::Items);
        }
        if !self.has_shipping_method() {
            missing.push(CheckoutRequirement::ShippingMethod);
        }
        if self.shipping_address.is_none() {
            missing.push(CheckoutRequirement::ShippingAddress);
        }
        if self.billing_address.is_none() {
            missing.push(CheckoutRequirement::BillingAddress);
        }
        if self.selected_payment_session().is_none() {
            missing.push(CheckoutRequirement::PaymentSession);
        }
        missing
    }

    /// True iff the cart has items, both addresses, a shipping method and a
    /// selected payment session.
    pub fn can_complete(&self) -> bool {
        self.missing_requirements().is_empty()
    }

    /// Display-ready summary of this cart.
    pub fn summary(&self) -> CartSummary {
        CartSummary {
            id: self.id.clone(),
            items_count: self.item_count(),
            subtotal: self.totals.subtotal.display(),
            shipping_total: self.totals.shipping_total.display(),
            tax_total: self.totals.tax_total.display(),
            discount_total: self.totals.discount_total.display(),
            gift_card_total: self.totals.gift_card_total.display(),
            total: self.totals.total.display(),
            currency: self.currency(),
            has_shipping: self.has_shipping_method(),
            has_payment: self.has_payment_session(),
            can_complete: self.can_complete(),
        }
    }
}

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    /// Backend-assigned line item identifier.
    pub id: LineItemId,
    /// Variant being purchased.
    pub variant_id: VariantId,
    pub product_id: Option<ProductId>,
    /// Product title (denormalized for display).
    pub title: String,
    /// Variant title (e.g., "Lavender / 200 g").
    pub variant_title: Option<String>,
    pub thumbnail: Option<String>,
    /// Always at least 1.
    pub quantity: u32,
    pub unit_price: Money,
    /// unit_price * quantity, before adjustments.
    pub subtotal: Money,
    /// Subtotal after discounts and taxes, as computed by the backend.
    pub total: Money,
}

impl LineItem {
    /// Create a new line item priced at `unit_price`.
    pub fn new(
        id: LineItemId,
        variant_id: VariantId,
        title: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, CommerceError> {
        Self::check_quantity(quantity)?;
        let subtotal = unit_price
            .try_multiply(i64::from(quantity))
            .ok_or(CommerceError::Overflow)?;
        Ok(Self {
            id,
            variant_id,
            product_id: None,
            title: title.into(),
            variant_title: None,
            thumbnail: None,
            quantity,
            unit_price,
            subtotal,
            total: subtotal,
        })
    }

    /// Change the quantity and recompute the undiscounted subtotal.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), CommerceError> {
        Self::check_quantity(quantity)?;
        self.subtotal = self
            .unit_price
            .try_multiply(i64::from(quantity))
            .ok_or(CommerceError::Overflow)?;
        self.total = self.subtotal;
        self.quantity = quantity;
        Ok(())
    }

    /// Reject zero and over-limit quantities.
    pub fn check_quantity(quantity: u32) -> Result<(), CommerceError> {
        if quantity == 0 {
            return Err(CommerceError::InvalidQuantity(0));
        }
        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                i64::from(quantity),
                i64::from(MAX_QUANTITY_PER_ITEM),
            ));
        }
        Ok(())
    }
}
