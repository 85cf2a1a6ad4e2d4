//! The commerce backend seam.
//!
//! Every remote operation the storefront performs goes through one of these
//! traits. [`MedusaBackend`] talks to a Medusa store API over HTTP and
//! [`InMemoryBackend`] is an authoritative in-process fake used in tests and
//! demos. Either can be plugged into the managers without changing them.

mod medusa;
mod memory;

pub use medusa::{MedusaBackend, PUBLISHABLE_KEY_HEADER};
pub use memory::{BackendOp, CompletionBehavior, InMemoryBackend};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storefront_commerce::{
    Address, AddressId, Cart, CartId, Currency, Customer, CustomerId, LineItemId, Order, OrderId,
    OrderStatus, PaymentProviderId, RegionId, ShippingOption, ShippingOptionId, VariantId,
};

use crate::error::BackendResult;

/// A line to seed a new cart with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Input for cart creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateCart {
    /// Falls back to the manager's configured region when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<RegionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<NewLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
}

impl CreateCart {
    pub fn in_region(region_id: impl Into<RegionId>) -> Self {
        Self {
            region_id: Some(region_id.into()),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_customer(mut self, customer_id: impl Into<CustomerId>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_item(mut self, variant_id: impl Into<VariantId>, quantity: u32) -> Self {
        self.items.push(NewLineItem {
            variant_id: variant_id.into(),
            quantity,
        });
        self
    }
}

/// Partial cart update. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<RegionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
}

impl CartUpdate {
    pub fn region(region_id: RegionId) -> Self {
        Self {
            region_id: Some(region_id),
            ..Self::default()
        }
    }

    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Self::default()
        }
    }

    pub fn shipping_address(address: Address) -> Self {
        Self {
            shipping_address: Some(address),
            ..Self::default()
        }
    }

    pub fn billing_address(address: Address) -> Self {
        Self {
            billing_address: Some(address),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Result of a completion request.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResult {
    /// The cart became an order.
    Order(Order),
    /// The cart is still a cart, e.g. the payment needs another step.
    Cart {
        cart: Cart,
        message: Option<String>,
    },
}

/// Customer profile changes. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Order list filter and page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderQuery {
    pub limit: u32,
    pub offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            status: None,
        }
    }
}

impl OrderQuery {
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// The query for the page after this one.
    pub fn next_page(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            ..self.clone()
        }
    }
}

/// One page of orders.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    /// Total number of orders matching the query.
    pub count: u32,
    pub offset: u32,
    pub limit: u32,
}

/// Cart operations of the commerce backend.
///
/// Every mutation returns the backend's full, authoritative cart.
#[async_trait]
pub trait CartBackend: Send + Sync {
    async fn create_cart(&self, input: CreateCart) -> BackendResult<Cart>;

    /// Fails with `NotFound` when the cart does not exist.
    async fn retrieve_cart(&self, cart_id: &CartId) -> BackendResult<Cart>;

    async fn update_cart(&self, cart_id: &CartId, update: CartUpdate) -> BackendResult<Cart>;

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> BackendResult<Cart>;

    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> BackendResult<Cart>;

    async fn delete_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
    ) -> BackendResult<Cart>;

    /// Options available to the cart, priced in `currency` (the cart's own;
    /// the store API leaves it out).
    async fn list_shipping_options(
        &self,
        cart_id: &CartId,
        currency: Currency,
    ) -> BackendResult<Vec<ShippingOption>>;

    async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> BackendResult<Cart>;

    async fn add_discount(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart>;

    async fn remove_discount(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart>;

    async fn add_gift_card(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart>;

    async fn remove_gift_card(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart>;

    /// Create (or attach) a payment session for one provider.
    async fn initiate_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> BackendResult<Cart>;

    async fn update_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
        data: serde_json::Value,
    ) -> BackendResult<Cart>;

    async fn refresh_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> BackendResult<Cart>;

    /// Mark one session selected; the backend deselects the rest.
    async fn select_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> BackendResult<Cart>;

    /// Not idempotent: every call is a distinct completion attempt.
    async fn complete_cart(&self, cart_id: &CartId) -> BackendResult<CompletionResult>;
}

/// Authenticated customer operations.
#[async_trait]
pub trait CustomerBackend: Send + Sync {
    async fn retrieve_customer(&self, token: &str) -> BackendResult<Customer>;

    async fn update_customer(&self, token: &str, update: CustomerUpdate)
        -> BackendResult<Customer>;

    async fn create_address(&self, token: &str, address: Address) -> BackendResult<Customer>;

    async fn update_address(
        &self,
        token: &str,
        address_id: &AddressId,
        address: Address,
    ) -> BackendResult<Customer>;

    async fn delete_address(&self, token: &str, address_id: &AddressId)
        -> BackendResult<Customer>;
}

/// Order lookups.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn retrieve_order(&self, order_id: &OrderId, token: Option<&str>)
        -> BackendResult<Order>;

    async fn list_orders(&self, token: &str, query: &OrderQuery) -> BackendResult<OrderPage>;
}

/// A backend implementing the whole surface.
pub trait CommerceBackend: CartBackend + CustomerBackend + OrderBackend {}

impl<T> CommerceBackend for T where T: CartBackend + CustomerBackend + OrderBackend {}
