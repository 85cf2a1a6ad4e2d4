//! Medusa store API payloads.
//!
//! Responses are decoded into these structs first and only then converted
//! into domain types. Conversion is where malformed payloads are rejected:
//! unknown currencies, non-positive quantities, or a completion result that
//! is neither an order nor a cart never reach the managers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_commerce::{
    Address, AddressId, AppliedDiscount, AppliedGiftCard, Cart, CartId, CartRegion, CartTotals,
    Currency, Customer, CustomerId, DiscountKind, FulfillmentStatus, LineItem, LineItemId, Money,
    Order, OrderId, OrderLineItem, OrderStatus, PaymentProviderId, PaymentSession,
    PaymentSessionId, PaymentSessionStatus, PaymentStatus, PriceType, ProductId, RegionId,
    ShippingMethod, ShippingMethodId, ShippingOption, ShippingOptionId, VariantId,
};

use crate::backend::{CompletionResult, OrderPage};
use crate::error::{BackendError, BackendResult};

fn invalid(message: impl Into<String>) -> BackendError {
    BackendError::invalid_response(message)
}

fn currency(code: &str) -> BackendResult<Currency> {
    Currency::parse(code).map_err(|e| invalid(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartEnvelope {
    pub cart: CartDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderEnvelope {
    pub order: OrderDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomerEnvelope {
    pub customer: CustomerDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShippingOptionsEnvelope {
    pub shipping_options: Vec<ShippingOptionDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderListEnvelope {
    pub orders: Vec<OrderDto>,
    pub count: u32,
    #[serde(default)]
    pub offset: u32,
    pub limit: u32,
}

impl OrderListEnvelope {
    pub fn into_page(self) -> BackendResult<OrderPage> {
        Ok(OrderPage {
            orders: self
                .orders
                .into_iter()
                .map(OrderDto::into_order)
                .collect::<BackendResult<_>>()?,
            count: self.count,
            offset: self.offset,
            limit: self.limit,
        })
    }
}

/// Result of `POST /store/carts/{id}/complete`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum CompletionDto {
    Order {
        #[serde(alias = "data")]
        order: OrderDto,
    },
    Cart {
        #[serde(alias = "data")]
        cart: CartDto,
        #[serde(default)]
        error: Option<CompletionErrorDto>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CompletionErrorDto {
    Text(String),
    Detailed { message: String },
}

impl CompletionDto {
    pub fn into_result(self) -> BackendResult<CompletionResult> {
        match self {
            CompletionDto::Order { order } => Ok(CompletionResult::Order(order.into_order()?)),
            CompletionDto::Cart { cart, error } => Ok(CompletionResult::Cart {
                cart: cart.into_cart()?,
                message: error.map(|e| match e {
                    CompletionErrorDto::Text(message) => message,
                    CompletionErrorDto::Detailed { message } => message,
                }),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegionDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub currency_code: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartDto {
    pub id: String,
    pub region: RegionDto,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItemDto>,
    #[serde(default)]
    pub shipping_address: Option<AddressDto>,
    #[serde(default)]
    pub billing_address: Option<AddressDto>,
    #[serde(default)]
    pub discounts: Vec<DiscountDto>,
    #[serde(default)]
    pub gift_cards: Vec<GiftCardDto>,
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethodDto>,
    #[serde(default)]
    pub payment_sessions: Vec<PaymentSessionDto>,
    #[serde(flatten)]
    pub totals: TotalsDto,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CartDto {
    pub fn into_cart(self) -> BackendResult<Cart> {
        let currency = currency(&self.region.currency_code)?;
        let region = CartRegion {
            id: RegionId::new(self.region.id),
            name: self.region.name,
            currency,
        };
        let mut cart = Cart::new(CartId::new(self.id), region);
        cart.email = self.email.filter(|e| !e.is_empty());
        cart.customer_id = self.customer_id.map(CustomerId::new);
        cart.items = self
            .items
            .into_iter()
            .map(|i| i.into_line_item(currency))
            .collect::<BackendResult<_>>()?;
        cart.shipping_address = self.shipping_address.and_then(AddressDto::into_address);
        cart.billing_address = self.billing_address.and_then(AddressDto::into_address);
        cart.discounts = self.discounts.into_iter().map(DiscountDto::into_discount).collect();
        cart.gift_cards = self
            .gift_cards
            .into_iter()
            .map(|g| AppliedGiftCard {
                code: g.code,
                balance: Money::new(g.balance, currency),
            })
            .collect();
        cart.shipping_methods = self
            .shipping_methods
            .into_iter()
            .map(|m| m.into_method(currency))
            .collect();
        cart.payment_sessions = self
            .payment_sessions
            .into_iter()
            .map(|s| s.into_session(currency))
            .collect();
        cart.totals = self.totals.into_totals(currency);
        cart.completed_at = self.completed_at;
        Ok(cart)
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TotalsDto {
    #[serde(default)]
    pub subtotal: i64,
    #[serde(default)]
    pub shipping_total: i64,
    #[serde(default)]
    pub tax_total: i64,
    #[serde(default)]
    pub discount_total: i64,
    #[serde(default)]
    pub gift_card_total: i64,
    #[serde(default)]
    pub total: i64,
}

impl TotalsDto {
    fn into_totals(self, currency: Currency) -> CartTotals {
        CartTotals {
            subtotal: Money::new(self.subtotal, currency),
            shipping_total: Money::new(self.shipping_total, currency),
            tax_total: Money::new(self.tax_total, currency),
            discount_total: Money::new(self.discount_total, currency),
            gift_card_total: Money::new(self.gift_card_total, currency),
            total: Money::new(self.total, currency),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VariantRefDto {
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LineItemDto {
    pub id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub title: String,
    /// Medusa puts the variant title in `description`.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub quantity: i64,
    pub unit_price: i64,
    #[serde(default)]
    pub subtotal: Option<i64>,
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default)]
    pub variant: Option<VariantRefDto>,
}

impl LineItemDto {
    fn into_line_item(self, currency: Currency) -> BackendResult<LineItem> {
        let variant_id = self
            .variant_id
            .ok_or_else(|| invalid(format!("line item {} has no variant", self.id)))?;
        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| {
                invalid(format!(
                    "line item {} has invalid quantity {}",
                    self.id, self.quantity
                ))
            })?;
        let subtotal = self
            .subtotal
            .unwrap_or_else(|| self.unit_price.saturating_mul(self.quantity));
        Ok(LineItem {
            id: LineItemId::new(self.id),
            variant_id: VariantId::new(variant_id),
            product_id: self
                .variant
                .and_then(|v| v.product_id)
                .map(ProductId::new),
            title: self.title,
            variant_title: self.description.filter(|d| !d.is_empty()),
            thumbnail: self.thumbnail,
            quantity,
            unit_price: Money::new(self.unit_price, currency),
            subtotal: Money::new(subtotal, currency),
            total: Money::new(self.total.unwrap_or(subtotal), currency),
        })
    }
}

/// Medusa address; every field is nullable on the wire.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct AddressDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address_1: Option<String>,
    #[serde(default)]
    pub address_2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl AddressDto {
    /// Medusa creates empty address rows on new carts; those read as no
    /// address at all.
    fn into_address(self) -> Option<Address> {
        let address_1 = self.address_1.filter(|a| !a.trim().is_empty())?;
        Some(Address {
            id: self.id.map(AddressId::new),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            company: self.company,
            address_1,
            address_2: self.address_2,
            city: self.city.unwrap_or_default(),
            province: self.province,
            postal_code: self.postal_code.unwrap_or_default(),
            country_code: self.country_code.unwrap_or_default().to_ascii_lowercase(),
            phone: self.phone,
        })
    }
}

impl From<&Address> for AddressDto {
    fn from(address: &Address) -> Self {
        Self {
            id: None,
            first_name: Some(address.first_name.clone()),
            last_name: Some(address.last_name.clone()),
            company: address.company.clone(),
            address_1: Some(address.address_1.clone()),
            address_2: address.address_2.clone(),
            city: Some(address.city.clone()),
            province: address.province.clone(),
            postal_code: Some(address.postal_code.clone()),
            country_code: Some(address.country_code.clone()),
            phone: address.phone.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiscountRuleDto {
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    #[serde(default)]
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiscountDto {
    pub code: String,
    pub rule: DiscountRuleDto,
}

impl DiscountDto {
    fn into_discount(self) -> AppliedDiscount {
        AppliedDiscount {
            code: self.code,
            kind: self.rule.kind,
            value: self.rule.value,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GiftCardDto {
    pub code: String,
    #[serde(default)]
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShippingOptionRefDto {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShippingMethodDto {
    pub id: String,
    pub shipping_option_id: String,
    #[serde(default)]
    pub shipping_option: Option<ShippingOptionRefDto>,
    #[serde(default, alias = "amount")]
    pub price: i64,
}

impl ShippingMethodDto {
    fn into_method(self, currency: Currency) -> ShippingMethod {
        ShippingMethod {
            id: ShippingMethodId::new(self.id),
            shipping_option_id: ShippingOptionId::new(self.shipping_option_id),
            name: self.shipping_option.map(|o| o.name).unwrap_or_default(),
            amount: Money::new(self.price, currency),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShippingOptionDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price_type: PriceType,
    #[serde(default)]
    pub amount: Option<i64>,
}

impl ShippingOptionDto {
    pub fn into_option(self, currency: Currency) -> ShippingOption {
        ShippingOption {
            id: ShippingOptionId::new(self.id),
            name: self.name,
            price_type: self.price_type,
            amount: self.amount.map(|a| Money::new(a, currency)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentSessionDto {
    pub id: String,
    pub provider_id: String,
    #[serde(default)]
    pub is_selected: Option<bool>,
    #[serde(default)]
    pub is_initiated: bool,
    #[serde(default)]
    pub status: PaymentSessionStatus,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PaymentSessionDto {
    fn into_session(self, currency: Currency) -> PaymentSession {
        PaymentSession {
            id: PaymentSessionId::new(self.id),
            provider_id: PaymentProviderId::new(self.provider_id),
            is_selected: self.is_selected.unwrap_or(false),
            is_initiated: self.is_initiated,
            status: self.status,
            amount: Money::new(self.amount, currency),
            data: self.data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderDto {
    pub id: String,
    pub display_id: u64,
    #[serde(default)]
    pub cart_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub fulfillment_status: FulfillmentStatus,
    #[serde(default)]
    pub items: Vec<LineItemDto>,
    #[serde(default)]
    pub shipping_address: Option<AddressDto>,
    #[serde(default)]
    pub billing_address: Option<AddressDto>,
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethodDto>,
    pub currency_code: String,
    #[serde(flatten)]
    pub totals: TotalsDto,
    pub created_at: DateTime<Utc>,
}

impl OrderDto {
    pub fn into_order(self) -> BackendResult<Order> {
        let currency = currency(&self.currency_code)?;
        let items = self
            .items
            .into_iter()
            .map(|i| {
                let item = i.into_line_item(currency)?;
                Ok(OrderLineItem {
                    id: item.id,
                    variant_id: Some(item.variant_id),
                    title: item.title,
                    variant_title: item.variant_title,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total: item.total,
                })
            })
            .collect::<BackendResult<_>>()?;
        Ok(Order {
            id: OrderId::new(self.id),
            display_id: self.display_id,
            cart_id: self.cart_id.map(CartId::new),
            customer_id: self.customer_id.map(CustomerId::new),
            email: self.email,
            status: self.status,
            payment_status: self.payment_status,
            fulfillment_status: self.fulfillment_status,
            items,
            shipping_address: self.shipping_address.and_then(AddressDto::into_address),
            billing_address: self.billing_address.and_then(AddressDto::into_address),
            shipping_methods: self
                .shipping_methods
                .into_iter()
                .map(|m| m.into_method(currency))
                .collect(),
            currency,
            totals: self.totals.into_totals(currency),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomerDto {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub has_account: bool,
    #[serde(default, alias = "shipping_addresses")]
    pub addresses: Vec<AddressDto>,
}

impl CustomerDto {
    pub fn into_customer(self) -> Customer {
        Customer {
            id: CustomerId::new(self.id),
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            has_account: self.has_account,
            addresses: self
                .addresses
                .into_iter()
                .filter_map(AddressDto::into_address)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cart_json() -> serde_json::Value {
        json!({
            "id": "cart_01",
            "region": { "id": "reg_pl", "name": "Polska", "currency_code": "pln" },
            "email": "ola@example.com",
            "items": [{
                "id": "item_01",
                "variant_id": "variant_lavender",
                "title": "Świeca lawendowa",
                "description": "200 g",
                "quantity": 2,
                "unit_price": 4999,
                "subtotal": 9998,
                "total": 9998,
                "variant": { "product_id": "prod_lavender" }
            }],
            "shipping_address": {
                "first_name": "Ola", "last_name": "Nowak", "address_1": "Długa 1",
                "city": "Kraków", "postal_code": "30-001", "country_code": "PL"
            },
            "billing_address": { "id": "addr_empty", "address_1": null },
            "discounts": [{ "code": "WOSK10", "rule": { "type": "percentage", "value": 10 } }],
            "shipping_methods": [{
                "id": "sm_01", "shipping_option_id": "so_inpost",
                "shipping_option": { "name": "Paczkomat InPost" }, "price": 1499
            }],
            "payment_sessions": [{
                "id": "ps_01", "provider_id": "pp_stripe_stripe",
                "is_selected": true, "is_initiated": true, "status": "pending",
                "amount": 10498, "data": { "client_secret": "pi_secret" }
            }],
            "subtotal": 9998,
            "shipping_total": 1499,
            "discount_total": 999,
            "tax_total": 0,
            "gift_card_total": 0,
            "total": 10498
        })
    }

    #[test]
    fn test_cart_decodes_into_domain() {
        let dto: CartDto = serde_json::from_value(cart_json()).unwrap();
        let cart = dto.into_cart().unwrap();

        assert_eq!(cart.currency(), Currency::PLN);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.items[0].variant_title.as_deref(), Some("200 g"));
        assert_eq!(cart.items[0].product_id, Some(ProductId::new("prod_lavender")));
        assert_eq!(cart.shipping_address.as_ref().unwrap().country_code, "pl");
        // Empty address rows read as absent.
        assert!(cart.billing_address.is_none());
        assert_eq!(cart.discounts[0].kind, DiscountKind::Percentage);
        assert_eq!(cart.shipping_methods[0].name, "Paczkomat InPost");
        assert!(cart.selected_payment_session().is_some());
        assert_eq!(cart.totals.total.amount_minor, 10498);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut raw = cart_json();
        raw["items"][0]["quantity"] = json!(0);
        let dto: CartDto = serde_json::from_value(raw).unwrap();
        let err = dto.into_cart().unwrap_err();
        assert_eq!(err.kind, crate::error::BackendErrorKind::InvalidResponse);
    }

    #[test]
    fn test_unknown_currency_rejected() {
        let mut raw = cart_json();
        raw["region"]["currency_code"] = json!("xyz");
        let dto: CartDto = serde_json::from_value(raw).unwrap();
        assert!(dto.into_cart().is_err());
    }

    #[test]
    fn test_completion_cart_variant_keeps_message() {
        let raw = json!({
            "type": "cart",
            "cart": cart_json(),
            "error": { "message": "Payment requires more information" }
        });
        let dto: CompletionDto = serde_json::from_value(raw).unwrap();
        match dto.into_result().unwrap() {
            CompletionResult::Cart { cart, message } => {
                assert_eq!(cart.id, CartId::new("cart_01"));
                assert_eq!(message.as_deref(), Some("Payment requires more information"));
            }
            other => panic!("expected cart result, got {:?}", other),
        }
    }

    #[test]
    fn test_completion_order_variant() {
        let raw = json!({
            "type": "order",
            "data": {
                "id": "order_01",
                "display_id": 1042,
                "cart_id": "cart_01",
                "email": "ola@example.com",
                "status": "pending",
                "payment_status": "awaiting",
                "fulfillment_status": "not_fulfilled",
                "currency_code": "pln",
                "items": [],
                "total": 10498,
                "created_at": "2026-03-01T12:00:00Z"
            }
        });
        let dto: CompletionDto = serde_json::from_value(raw).unwrap();
        let CompletionResult::Order(order) = dto.into_result().unwrap() else {
            panic!("expected order");
        };
        assert_eq!(order.display_id, 1042);
        assert_eq!(order.payment_status, PaymentStatus::Awaiting);
        assert_eq!(order.totals.total.amount_minor, 10498);
    }

    #[test]
    fn test_completion_unknown_type_fails_to_decode() {
        let raw = json!({ "type": "swap", "data": {} });
        assert!(serde_json::from_value::<CompletionDto>(raw).is_err());
    }

    #[test]
    fn test_customer_reads_shipping_addresses() {
        let raw = json!({
            "id": "cus_01",
            "email": "ola@example.com",
            "has_account": true,
            "shipping_addresses": [{
                "id": "addr_01", "first_name": "Ola", "last_name": "Nowak",
                "address_1": "Długa 1", "city": "Kraków",
                "postal_code": "30-001", "country_code": "pl"
            }]
        });
        let customer = serde_json::from_value::<CustomerDto>(raw)
            .unwrap()
            .into_customer();
        assert_eq!(customer.addresses.len(), 1);
        assert!(customer.address(&AddressId::new("addr_01")).is_some());
    }
}
