//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::CartTotals;
use crate::checkout::{Address, ShippingMethod};
use crate::ids::{CartId, CustomerId, LineItemId, OrderId, VariantId};
use crate::money::{Currency, Money};

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, awaiting processing.
    #[default]
    Pending,
    Completed,
    Archived,
    Canceled,
    RequiresAction,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Archived => "archived",
            OrderStatus::Canceled => "canceled",
            OrderStatus::RequiresAction => "requires_action",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Completed => "Completed",
            OrderStatus::Archived => "Archived",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::RequiresAction => "Requires action",
        }
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Archived | OrderStatus::Canceled
        )
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    Awaiting,
    Authorized,
    Captured,
    PartiallyRefunded,
    Refunded,
    Canceled,
    RequiresAction,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::NotPaid => "not_paid",
            PaymentStatus::Awaiting => "awaiting",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Captured => "captured",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::RequiresAction => "requires_action",
        }
    }
}

/// Fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    /// Nothing fulfilled yet.
    #[default]
    NotFulfilled,
    PartiallyFulfilled,
    Fulfilled,
    PartiallyShipped,
    Shipped,
    Returned,
    Canceled,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::NotFulfilled => "not_fulfilled",
            FulfillmentStatus::PartiallyFulfilled => "partially_fulfilled",
            FulfillmentStatus::Fulfilled => "fulfilled",
            FulfillmentStatus::PartiallyShipped => "partially_shipped",
            FulfillmentStatus::Shipped => "shipped",
            FulfillmentStatus::Returned => "returned",
            FulfillmentStatus::Canceled => "canceled",
        }
    }
}

/// An order created from a completed cart. Immutable from the storefront's
/// point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing sequential number.
    pub display_id: u64,
    /// Cart the order was created from.
    pub cart_id: Option<CartId>,
    /// Customer (None for guest checkout).
    pub customer_id: Option<CustomerId>,
    pub email: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub items: Vec<OrderLineItem>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub shipping_methods: Vec<ShippingMethod>,
    pub currency: Currency,
    pub totals: CartTotals,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Order number as shown to customers (e.g., "#1042").
    pub fn display_number(&self) -> String {
        format!("#{}", self.display_id)
    }

    /// Get total item count.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Check if order is paid.
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status,
            PaymentStatus::Captured | PaymentStatus::PartiallyRefunded
        )
    }

    /// Check if order is fully fulfilled.
    pub fn is_fulfilled(&self) -> bool {
        matches!(
            self.fulfillment_status,
            FulfillmentStatus::Fulfilled | FulfillmentStatus::Shipped
        )
    }
}

/// A line item in an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    pub id: LineItemId,
    pub variant_id: Option<VariantId>,
    /// Product title at time of order.
    pub title: String,
    pub variant_title: Option<String>,
    pub quantity: u32,
    /// Unit price at time of order.
    pub unit_price: Money,
    pub total: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(payment_status: PaymentStatus) -> Order {
        Order {
            id: OrderId::new("order_1"),
            display_id: 1042,
            cart_id: Some(CartId::new("cart_1")),
            customer_id: None,
            email: Some("klient@example.com".to_string()),
            status: OrderStatus::Pending,
            payment_status,
            fulfillment_status: FulfillmentStatus::NotFulfilled,
            items: vec![OrderLineItem {
                id: LineItemId::new("item_1"),
                variant_id: Some(VariantId::new("variant_rose")),
                title: "Rose candle".to_string(),
                variant_title: None,
                quantity: 3,
                unit_price: Money::new(3900, Currency::PLN),
                total: Money::new(11700, Currency::PLN),
            }],
            shipping_address: None,
            billing_address: None,
            shipping_methods: Vec::new(),
            currency: Currency::PLN,
            totals: CartTotals::zero(Currency::PLN),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_number_and_count() {
        let o = order(PaymentStatus::Awaiting);
        assert_eq!(o.display_number(), "#1042");
        assert_eq!(o.item_count(), 3);
        assert!(!o.is_paid());
        assert!(order(PaymentStatus::Captured).is_paid());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert_eq!(PaymentStatus::RequiresAction.as_str(), "requires_action");
    }
}
