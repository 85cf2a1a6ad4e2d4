//! In-process commerce backend.
//!
//! Behaves like the real store API closely enough to drive the managers end
//! to end: carts are authoritative here, every mutation returns the full
//! recomputed cart, unknown sub-resource ids answer with stale-reference
//! errors. It also records per-operation call counts and lets tests inject
//! failures and latency.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use storefront_commerce::{
    Address, AddressId, AppliedDiscount, AppliedGiftCard, Cart, CartId, CartRegion, Currency,
    Customer, DiscountKind, FulfillmentStatus, LineItem, LineItemId, Money, Order, OrderId,
    OrderLineItem, OrderStatus, PaymentProviderId, PaymentSession, PaymentSessionId,
    PaymentSessionStatus, PaymentStatus, PriceType, ProductId, RegionId, ShippingMethod,
    ShippingOption, ShippingOptionId, VariantId,
};

use super::{
    CartBackend, CartUpdate, CompletionResult, CreateCart, CustomerBackend, CustomerUpdate,
    OrderBackend, OrderPage, OrderQuery,
};
use crate::error::{BackendError, BackendResult};

/// Backend operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    CreateCart,
    RetrieveCart,
    UpdateCart,
    AddLineItem,
    UpdateLineItem,
    DeleteLineItem,
    ListShippingOptions,
    AddShippingMethod,
    AddDiscount,
    RemoveDiscount,
    AddGiftCard,
    RemoveGiftCard,
    InitiatePaymentSession,
    UpdatePaymentSession,
    RefreshPaymentSession,
    SelectPaymentSession,
    CompleteCart,
    RetrieveCustomer,
    UpdateCustomer,
    CreateAddress,
    UpdateAddress,
    DeleteAddress,
    RetrieveOrder,
    ListOrders,
}

/// What `complete_cart` does once the cart passes validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompletionBehavior {
    /// Turn the cart into an order.
    #[default]
    PlaceOrder,
    /// Keep the cart, flag the selected session as needing more, and
    /// return this message.
    RequireAction(String),
}

#[derive(Debug, Clone)]
struct CatalogVariant {
    title: String,
    product_id: Option<ProductId>,
    unit_price: i64,
}

#[derive(Debug, Clone)]
struct CatalogShippingOption {
    id: ShippingOptionId,
    name: String,
    amount: i64,
}

#[derive(Debug, Clone, Copy)]
struct CatalogDiscount {
    kind: DiscountKind,
    value: i64,
}

#[derive(Debug)]
struct State {
    regions: HashMap<RegionId, CartRegion>,
    variants: HashMap<VariantId, CatalogVariant>,
    shipping_options: Vec<CatalogShippingOption>,
    discounts: HashMap<String, CatalogDiscount>,
    gift_cards: HashMap<String, i64>,
    providers: Vec<PaymentProviderId>,
    carts: HashMap<CartId, Cart>,
    orders: Vec<Order>,
    customers: HashMap<String, Customer>,
    next_display_id: u64,
    completion: CompletionBehavior,
    failures: HashMap<BackendOp, VecDeque<BackendError>>,
    latencies: VecDeque<Duration>,
    base_latency: Duration,
    calls: HashMap<BackendOp, usize>,
}

/// In-memory commerce backend.
#[derive(Debug)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// A backend with a Polish region (`reg_pl`, PLN), two shipping options
    /// and the stripe, paypal and manual payment providers. No variants are
    /// registered.
    pub fn new() -> Self {
        let region = CartRegion {
            id: RegionId::new("reg_pl"),
            name: "Polska".to_string(),
            currency: Currency::PLN,
        };
        let state = State {
            regions: HashMap::from([(region.id.clone(), region)]),
            variants: HashMap::new(),
            shipping_options: vec![
                CatalogShippingOption {
                    id: ShippingOptionId::new("so_inpost"),
                    name: "Paczkomat InPost".to_string(),
                    amount: 1499,
                },
                CatalogShippingOption {
                    id: ShippingOptionId::new("so_pickup"),
                    name: "Odbiór osobisty".to_string(),
                    amount: 0,
                },
            ],
            discounts: HashMap::new(),
            gift_cards: HashMap::new(),
            providers: vec![
                PaymentProviderId::new("pp_stripe_stripe"),
                PaymentProviderId::new("pp_paypal_paypal"),
                PaymentProviderId::new("pp_system_default"),
            ],
            carts: HashMap::new(),
            orders: Vec::new(),
            customers: HashMap::new(),
            next_display_id: 1001,
            completion: CompletionBehavior::default(),
            failures: HashMap::new(),
            latencies: VecDeque::new(),
            base_latency: Duration::ZERO,
            calls: HashMap::new(),
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_region(self, id: impl Into<RegionId>, name: &str, currency: Currency) -> Self {
        let id = id.into();
        self.lock().regions.insert(
            id.clone(),
            CartRegion {
                id,
                name: name.to_string(),
                currency,
            },
        );
        self
    }

    /// Register a purchasable variant priced in minor units.
    pub fn with_variant(self, id: impl Into<VariantId>, title: &str, unit_price: i64) -> Self {
        self.lock().variants.insert(
            id.into(),
            CatalogVariant {
                title: title.to_string(),
                product_id: None,
                unit_price,
            },
        );
        self
    }

    pub fn with_shipping_option(self, id: impl Into<ShippingOptionId>, name: &str, amount: i64) -> Self {
        self.lock().shipping_options.push(CatalogShippingOption {
            id: id.into(),
            name: name.to_string(),
            amount,
        });
        self
    }

    pub fn with_discount(self, code: &str, kind: DiscountKind, value: i64) -> Self {
        self.lock()
            .discounts
            .insert(code.to_ascii_uppercase(), CatalogDiscount { kind, value });
        self
    }

    pub fn with_gift_card(self, code: &str, balance: i64) -> Self {
        self.lock()
            .gift_cards
            .insert(code.to_ascii_uppercase(), balance);
        self
    }

    /// Register a customer reachable with `token`.
    pub fn with_customer(self, token: &str, customer: Customer) -> Self {
        self.lock().customers.insert(token.to_string(), customer);
        self
    }

    /// Seed an existing order.
    pub fn with_order(self, order: Order) -> Self {
        {
            let mut state = self.lock();
            state.next_display_id = state.next_display_id.max(order.display_id + 1);
            state.orders.push(order);
        }
        self
    }

    /// Delay applied to every call without a queued latency.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().base_latency = latency;
        self
    }

    /// Delay for the next call only; queued delays are consumed in call
    /// order.
    pub fn push_latency(&self, latency: Duration) {
        self.lock().latencies.push_back(latency);
    }

    /// Make the next call to `op` fail with `error`.
    pub fn fail_next(&self, op: BackendOp, error: BackendError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    pub fn set_completion(&self, behavior: CompletionBehavior) {
        self.lock().completion = behavior;
    }

    /// Number of calls made to `op`.
    pub fn calls(&self, op: BackendOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    /// Authoritative copy of a cart, without counting a call.
    pub fn stored_cart(&self, cart_id: &CartId) -> Option<Cart> {
        self.lock().carts.get(cart_id).cloned()
    }

    /// Drop a cart, as if it expired server-side.
    pub fn forget_cart(&self, cart_id: &CartId) {
        self.lock().carts.remove(cart_id);
    }

    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.clone()
    }

    /// Count the call, wait out any latency, then surface injected
    /// failures.
    async fn enter(&self, op: BackendOp) -> BackendResult<()> {
        let delay = {
            let mut state = self.lock();
            *state.calls.entry(op).or_default() += 1;
            state.latencies.pop_front().unwrap_or(state.base_latency)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.lock().failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Apply `change` to a copy of the cart; the stored cart is only
    /// replaced when the change succeeds.
    fn mutate_cart<F>(&self, cart_id: &CartId, change: F) -> BackendResult<Cart>
    where
        F: FnOnce(&State, &mut Cart) -> BackendResult<()>,
    {
        let mut state = self.lock();
        let mut cart = open_cart(&state, cart_id)?.clone();
        change(&state, &mut cart)?;
        recompute(&mut cart);
        state.carts.insert(cart.id.clone(), cart.clone());
        Ok(cart)
    }

    fn customer_mut<'a>(state: &'a mut State, token: &str) -> BackendResult<&'a mut Customer> {
        state
            .customers
            .get_mut(token)
            .ok_or_else(|| BackendError::unauthorized("Unauthorized"))
    }
}

fn open_cart<'a>(state: &'a State, cart_id: &CartId) -> BackendResult<&'a Cart> {
    let cart = state
        .carts
        .get(cart_id)
        .ok_or_else(|| BackendError::not_found(format!("Cart with id: {} was not found", cart_id)))?;
    if cart.completed_at.is_some() {
        return Err(BackendError::conflict(format!(
            "Cart {} has already been completed",
            cart_id
        )));
    }
    Ok(cart)
}

fn new_line_item(
    state: &State,
    variant_id: &VariantId,
    quantity: u32,
    currency: Currency,
) -> BackendResult<LineItem> {
    let variant = state.variants.get(variant_id).ok_or_else(|| {
        BackendError::invalid_request(format!("Variant with id: {} was not found", variant_id))
    })?;
    let mut item = LineItem::new(
        LineItemId::generate(),
        variant_id.clone(),
        variant.title.clone(),
        quantity,
        Money::new(variant.unit_price, currency),
    )
    .map_err(|e| BackendError::invalid_request(e.to_string()))?;
    item.product_id = variant.product_id.clone();
    Ok(item)
}

fn payment_session_mut<'a>(
    cart: &'a mut Cart,
    provider_id: &PaymentProviderId,
) -> BackendResult<&'a mut PaymentSession> {
    cart.payment_sessions
        .iter_mut()
        .find(|s| &s.provider_id == provider_id)
        .ok_or_else(|| {
            BackendError::stale(format!(
                "Payment session for provider {} not found",
                provider_id
            ))
        })
}

/// Recompute line and cart totals the way the store API does. Prices are
/// tax-inclusive, so no separate tax is added.
fn recompute(cart: &mut Cart) {
    let currency = cart.region.currency;
    for item in &mut cart.items {
        item.unit_price = Money::new(item.unit_price.amount_minor, currency);
        let subtotal = item
            .unit_price
            .amount_minor
            .saturating_mul(i64::from(item.quantity));
        item.subtotal = Money::new(subtotal, currency);
        item.total = item.subtotal;
    }
    for method in &mut cart.shipping_methods {
        method.amount = Money::new(method.amount.amount_minor, currency);
    }

    let subtotal: i64 = cart.items.iter().map(|i| i.subtotal.amount_minor).sum();
    let shipping: i64 = cart
        .shipping_methods
        .iter()
        .map(|m| m.amount.amount_minor)
        .sum();

    let subtotal_money = Money::new(subtotal, currency);
    let mut discount: i64 = 0;
    for applied in &cart.discounts {
        discount += match applied.kind {
            DiscountKind::FreeShipping => shipping,
            _ => applied.amount_off(&subtotal_money).amount_minor,
        };
    }
    let discount = discount.min(subtotal + shipping);

    let mut due = Money::new(subtotal + shipping - discount, currency);
    let mut gift_card = 0;
    for card in &mut cart.gift_cards {
        card.balance = Money::new(card.balance.amount_minor, currency);
        let applied = card.applied_amount(&due).amount_minor;
        gift_card += applied;
        due = Money::new(due.amount_minor - applied, currency);
    }

    let totals = &mut cart.totals;
    totals.subtotal = subtotal_money;
    totals.shipping_total = Money::new(shipping, currency);
    totals.tax_total = Money::zero(currency);
    totals.discount_total = Money::new(discount, currency);
    totals.gift_card_total = Money::new(gift_card, currency);
    totals.total = due;

    for session in &mut cart.payment_sessions {
        session.amount = due;
    }
}

fn order_from_cart(cart: &Cart, display_id: u64) -> Order {
    Order {
        id: OrderId::generate(),
        display_id,
        cart_id: Some(cart.id.clone()),
        customer_id: cart.customer_id.clone(),
        email: cart.email.clone(),
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Authorized,
        fulfillment_status: FulfillmentStatus::NotFulfilled,
        items: cart
            .items
            .iter()
            .map(|i| OrderLineItem {
                id: i.id.clone(),
                variant_id: Some(i.variant_id.clone()),
                title: i.title.clone(),
                variant_title: i.variant_title.clone(),
                quantity: i.quantity,
                unit_price: i.unit_price,
                total: i.total,
            })
            .collect(),
        shipping_address: cart.shipping_address.clone(),
        billing_address: cart.billing_address.clone(),
        shipping_methods: cart.shipping_methods.clone(),
        currency: cart.currency(),
        totals: cart.totals.clone(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl CartBackend for InMemoryBackend {
    async fn create_cart(&self, input: CreateCart) -> BackendResult<Cart> {
        self.enter(BackendOp::CreateCart).await?;
        let mut state = self.lock();

        let region_id = input
            .region_id
            .ok_or_else(|| BackendError::invalid_request("region_id is required"))?;
        let region = state.regions.get(&region_id).cloned().ok_or_else(|| {
            BackendError::invalid_request(format!("Region with id: {} was not found", region_id))
        })?;

        let mut cart = Cart::new(CartId::generate(), region);
        cart.email = input.email;
        cart.customer_id = input.customer_id;
        cart.shipping_address = input.shipping_address;
        cart.billing_address = input.billing_address;
        for line in &input.items {
            let item = new_line_item(&state, &line.variant_id, line.quantity, cart.currency())?;
            cart.items.push(item);
        }
        recompute(&mut cart);

        state.carts.insert(cart.id.clone(), cart.clone());
        Ok(cart)
    }

    async fn retrieve_cart(&self, cart_id: &CartId) -> BackendResult<Cart> {
        self.enter(BackendOp::RetrieveCart).await?;
        self.lock()
            .carts
            .get(cart_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found(format!("Cart with id: {} was not found", cart_id)))
    }

    async fn update_cart(&self, cart_id: &CartId, update: CartUpdate) -> BackendResult<Cart> {
        self.enter(BackendOp::UpdateCart).await?;
        self.mutate_cart(cart_id, |state, cart| {
            if let Some(region_id) = update.region_id {
                let region = state.regions.get(&region_id).cloned().ok_or_else(|| {
                    BackendError::invalid_request(format!(
                        "Region with id: {} was not found",
                        region_id
                    ))
                })?;
                cart.region = region;
            }
            if let Some(email) = update.email {
                cart.email = Some(email);
            }
            if let Some(customer_id) = update.customer_id {
                cart.customer_id = Some(customer_id);
            }
            if let Some(address) = update.shipping_address {
                cart.shipping_address = Some(address);
            }
            if let Some(address) = update.billing_address {
                cart.billing_address = Some(address);
            }
            Ok(())
        })
    }

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> BackendResult<Cart> {
        self.enter(BackendOp::AddLineItem).await?;
        self.mutate_cart(cart_id, |state, cart| {
            // The store API merges lines for the same variant.
            if let Some(existing) = cart.items.iter_mut().find(|i| &i.variant_id == variant_id) {
                let merged = existing.quantity.saturating_add(quantity);
                return existing
                    .set_quantity(merged)
                    .map_err(|e| BackendError::invalid_request(e.to_string()));
            }
            let item = new_line_item(state, variant_id, quantity, cart.currency())?;
            cart.items.push(item);
            Ok(())
        })
    }

    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> BackendResult<Cart> {
        self.enter(BackendOp::UpdateLineItem).await?;
        self.mutate_cart(cart_id, |_, cart| {
            let item = cart
                .items
                .iter_mut()
                .find(|i| &i.id == line_item_id)
                .ok_or_else(|| {
                    BackendError::stale(format!("Line item with id: {} was not found", line_item_id))
                })?;
            item.set_quantity(quantity)
                .map_err(|e| BackendError::invalid_request(e.to_string()))
        })
    }

    async fn delete_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
    ) -> BackendResult<Cart> {
        self.enter(BackendOp::DeleteLineItem).await?;
        self.mutate_cart(cart_id, |_, cart| {
            let before = cart.items.len();
            cart.items.retain(|i| &i.id != line_item_id);
            if cart.items.len() == before {
                return Err(BackendError::stale(format!(
                    "Line item with id: {} was not found",
                    line_item_id
                )));
            }
            Ok(())
        })
    }

    async fn list_shipping_options(
        &self,
        cart_id: &CartId,
        currency: Currency,
    ) -> BackendResult<Vec<ShippingOption>> {
        self.enter(BackendOp::ListShippingOptions).await?;
        let state = self.lock();
        open_cart(&state, cart_id)?;
        Ok(state
            .shipping_options
            .iter()
            .map(|o| ShippingOption {
                id: o.id.clone(),
                name: o.name.clone(),
                price_type: PriceType::FlatRate,
                amount: Some(Money::new(o.amount, currency)),
            })
            .collect())
    }

    async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> BackendResult<Cart> {
        self.enter(BackendOp::AddShippingMethod).await?;
        self.mutate_cart(cart_id, |state, cart| {
            let option = state
                .shipping_options
                .iter()
                .find(|o| &o.id == option_id)
                .ok_or_else(|| {
                    BackendError::invalid_request(format!(
                        "Shipping option with id: {} was not found",
                        option_id
                    ))
                })?;
            let amount = Money::new(option.amount, cart.currency());
            let offered = ShippingOption {
                id: option.id.clone(),
                name: option.name.clone(),
                price_type: PriceType::FlatRate,
                amount: Some(amount),
            };
            cart.shipping_methods = vec![ShippingMethod::from_option(&offered, amount)];
            Ok(())
        })
    }

    async fn add_discount(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart> {
        self.enter(BackendOp::AddDiscount).await?;
        self.mutate_cart(cart_id, |state, cart| {
            let key = code.trim().to_ascii_uppercase();
            let discount = state.discounts.get(&key).ok_or_else(|| {
                BackendError::invalid_request(format!("Discount with code {} not found", code))
            })?;
            if !cart.discounts.iter().any(|d| d.matches(&key)) {
                cart.discounts.push(AppliedDiscount {
                    code: key,
                    kind: discount.kind,
                    value: discount.value,
                });
            }
            Ok(())
        })
    }

    async fn remove_discount(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart> {
        self.enter(BackendOp::RemoveDiscount).await?;
        self.mutate_cart(cart_id, |_, cart| {
            let before = cart.discounts.len();
            cart.discounts.retain(|d| !d.matches(code.trim()));
            if cart.discounts.len() == before {
                return Err(BackendError::stale(format!(
                    "Discount {} is not applied to this cart",
                    code
                )));
            }
            Ok(())
        })
    }

    async fn add_gift_card(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart> {
        self.enter(BackendOp::AddGiftCard).await?;
        self.mutate_cart(cart_id, |state, cart| {
            let key = code.trim().to_ascii_uppercase();
            let balance = state.gift_cards.get(&key).copied().ok_or_else(|| {
                BackendError::invalid_request(format!("Gift card with code {} not found", code))
            })?;
            if !cart.gift_cards.iter().any(|g| g.matches(&key)) {
                cart.gift_cards.push(AppliedGiftCard {
                    code: key,
                    balance: Money::new(balance, cart.currency()),
                });
            }
            Ok(())
        })
    }

    async fn remove_gift_card(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart> {
        self.enter(BackendOp::RemoveGiftCard).await?;
        self.mutate_cart(cart_id, |_, cart| {
            let before = cart.gift_cards.len();
            cart.gift_cards.retain(|g| !g.matches(code.trim()));
            if cart.gift_cards.len() == before {
                return Err(BackendError::stale(format!(
                    "Gift card {} is not applied to this cart",
                    code
                )));
            }
            Ok(())
        })
    }

    async fn initiate_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> BackendResult<Cart> {
        self.enter(BackendOp::InitiatePaymentSession).await?;
        self.mutate_cart(cart_id, |state, cart| {
            if !state.providers.contains(provider_id) {
                return Err(BackendError::invalid_request(format!(
                    "Payment provider {} is not enabled in this region",
                    provider_id
                )));
            }
            if !cart.payment_sessions.iter().any(|s| &s.provider_id == provider_id) {
                cart.payment_sessions.push(PaymentSession {
                    id: PaymentSessionId::generate(),
                    provider_id: provider_id.clone(),
                    is_selected: false,
                    is_initiated: true,
                    status: PaymentSessionStatus::Pending,
                    amount: cart.totals.total,
                    data: serde_json::json!({}),
                });
            }
            Ok(())
        })
    }

    async fn update_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
        data: serde_json::Value,
    ) -> BackendResult<Cart> {
        self.enter(BackendOp::UpdatePaymentSession).await?;
        self.mutate_cart(cart_id, |_, cart| {
            payment_session_mut(cart, provider_id)?.data = data;
            Ok(())
        })
    }

    async fn refresh_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> BackendResult<Cart> {
        self.enter(BackendOp::RefreshPaymentSession).await?;
        self.mutate_cart(cart_id, |_, cart| {
            let session = payment_session_mut(cart, provider_id)?;
            session.id = PaymentSessionId::generate();
            session.status = PaymentSessionStatus::Pending;
            Ok(())
        })
    }

    async fn select_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> BackendResult<Cart> {
        self.enter(BackendOp::SelectPaymentSession).await?;
        self.mutate_cart(cart_id, |_, cart| {
            payment_session_mut(cart, provider_id)?;
            for session in &mut cart.payment_sessions {
                session.is_selected = &session.provider_id == provider_id;
            }
            Ok(())
        })
    }

    async fn complete_cart(&self, cart_id: &CartId) -> BackendResult<CompletionResult> {
        self.enter(BackendOp::CompleteCart).await?;
        let mut state = self.lock();
        let mut cart = open_cart(&state, cart_id)?.clone();

        if let Some(missing) = cart.missing_requirements().first() {
            return Err(BackendError::invalid_request(format!(
                "Cart cannot be completed: missing {}",
                missing
            )));
        }

        match state.completion.clone() {
            CompletionBehavior::RequireAction(message) => {
                for session in cart.payment_sessions.iter_mut().filter(|s| s.is_selected) {
                    session.status = PaymentSessionStatus::RequiresMore;
                }
                state.carts.insert(cart.id.clone(), cart.clone());
                Ok(CompletionResult::Cart {
                    cart,
                    message: Some(message),
                })
            }
            CompletionBehavior::PlaceOrder => {
                for session in cart.payment_sessions.iter_mut().filter(|s| s.is_selected) {
                    session.status = PaymentSessionStatus::Authorized;
                }
                cart.completed_at = Some(Utc::now());
                let display_id = state.next_display_id;
                state.next_display_id += 1;
                let order = order_from_cart(&cart, display_id);
                state.carts.insert(cart.id.clone(), cart);
                state.orders.push(order.clone());
                Ok(CompletionResult::Order(order))
            }
        }
    }
}

#[async_trait]
impl CustomerBackend for InMemoryBackend {
    async fn retrieve_customer(&self, token: &str) -> BackendResult<Customer> {
        self.enter(BackendOp::RetrieveCustomer).await?;
        let mut state = self.lock();
        Self::customer_mut(&mut state, token).map(|c| c.clone())
    }

    async fn update_customer(
        &self,
        token: &str,
        update: CustomerUpdate,
    ) -> BackendResult<Customer> {
        self.enter(BackendOp::UpdateCustomer).await?;
        let mut state = self.lock();
        let customer = Self::customer_mut(&mut state, token)?;
        if let Some(first_name) = update.first_name {
            customer.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            customer.last_name = Some(last_name);
        }
        if let Some(phone) = update.phone {
            customer.phone = Some(phone);
        }
        Ok(customer.clone())
    }

    async fn create_address(&self, token: &str, mut address: Address) -> BackendResult<Customer> {
        self.enter(BackendOp::CreateAddress).await?;
        let mut state = self.lock();
        let customer = Self::customer_mut(&mut state, token)?;
        address.id = Some(AddressId::generate());
        customer.addresses.push(address);
        Ok(customer.clone())
    }

    async fn update_address(
        &self,
        token: &str,
        address_id: &AddressId,
        mut address: Address,
    ) -> BackendResult<Customer> {
        self.enter(BackendOp::UpdateAddress).await?;
        let mut state = self.lock();
        let customer = Self::customer_mut(&mut state, token)?;
        let slot = customer
            .addresses
            .iter_mut()
            .find(|a| a.id.as_ref() == Some(address_id))
            .ok_or_else(|| BackendError::stale(format!("Address {} not found", address_id)))?;
        address.id = Some(address_id.clone());
        *slot = address;
        Ok(customer.clone())
    }

    async fn delete_address(&self, token: &str, address_id: &AddressId) -> BackendResult<Customer> {
        self.enter(BackendOp::DeleteAddress).await?;
        let mut state = self.lock();
        let customer = Self::customer_mut(&mut state, token)?;
        let before = customer.addresses.len();
        customer
            .addresses
            .retain(|a| a.id.as_ref() != Some(address_id));
        if customer.addresses.len() == before {
            return Err(BackendError::stale(format!("Address {} not found", address_id)));
        }
        Ok(customer.clone())
    }
}

#[async_trait]
impl OrderBackend for InMemoryBackend {
    async fn retrieve_order(&self, order_id: &OrderId, _token: Option<&str>) -> BackendResult<Order> {
        self.enter(BackendOp::RetrieveOrder).await?;
        self.lock()
            .orders
            .iter()
            .find(|o| &o.id == order_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found(format!("Order with id {} was not found", order_id)))
    }

    async fn list_orders(&self, token: &str, query: &OrderQuery) -> BackendResult<OrderPage> {
        self.enter(BackendOp::ListOrders).await?;
        let mut state = self.lock();
        let customer_id = Self::customer_mut(&mut state, token)?.id.clone();

        let mut matching: Vec<&Order> = state
            .orders
            .iter()
            .filter(|o| o.customer_id.as_ref() == Some(&customer_id))
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .collect();
        matching.sort_by(|a, b| b.display_id.cmp(&a.display_id));

        let count = u32::try_from(matching.len()).unwrap_or(u32::MAX);
        let orders = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(OrderPage {
            orders,
            count,
            offset: query.offset,
            limit: query.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new()
            .with_variant("variant_lavender", "Świeca lawendowa", 4999)
            .with_variant("variant_cedar", "Świeca cedrowa", 5999)
            .with_discount("WOSK10", DiscountKind::Percentage, 10)
            .with_gift_card("GIFT50", 5000)
    }

    #[tokio::test]
    async fn test_totals_follow_discounts_and_gift_cards() {
        let backend = backend();
        let cart = backend
            .create_cart(CreateCart::in_region("reg_pl").with_item("variant_lavender", 2))
            .await
            .unwrap();
        let cart = backend
            .add_shipping_method(&cart.id, &ShippingOptionId::new("so_inpost"))
            .await
            .unwrap();
        assert_eq!(cart.totals.subtotal.amount_minor, 9998);
        assert_eq!(cart.totals.shipping_total.amount_minor, 1499);
        assert_eq!(cart.totals.total.amount_minor, 11497);

        let cart = backend.add_discount(&cart.id, "wosk10").await.unwrap();
        assert_eq!(cart.totals.discount_total.amount_minor, 999);
        assert_eq!(cart.totals.total.amount_minor, 10498);

        let cart = backend.add_gift_card(&cart.id, "GIFT50").await.unwrap();
        assert_eq!(cart.totals.gift_card_total.amount_minor, 5000);
        assert_eq!(cart.totals.total.amount_minor, 5498);
    }

    #[tokio::test]
    async fn test_add_line_item_merges_same_variant() {
        let backend = backend();
        let cart = backend.create_cart(CreateCart::in_region("reg_pl")).await.unwrap();
        let variant = VariantId::new("variant_cedar");
        backend.add_line_item(&cart.id, &variant, 1).await.unwrap();
        let cart = backend.add_line_item(&cart.id, &variant, 2).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_failed_change_leaves_stored_cart() {
        let backend = backend();
        let cart = backend
            .create_cart(CreateCart::in_region("reg_pl").with_item("variant_cedar", 1))
            .await
            .unwrap();
        let err = backend
            .delete_line_item(&cart.id, &LineItemId::new("item_missing"))
            .await
            .unwrap_err();
        assert!(err.is_stale());
        assert_eq!(backend.stored_cart(&cart.id).unwrap(), cart);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let backend = backend();
        backend.fail_next(BackendOp::CreateCart, BackendError::server("boom"));
        assert!(backend.create_cart(CreateCart::in_region("reg_pl")).await.is_err());
        assert!(backend.create_cart(CreateCart::in_region("reg_pl")).await.is_ok());
        assert_eq!(backend.calls(BackendOp::CreateCart), 2);
    }

    #[tokio::test]
    async fn test_unknown_region_rejected() {
        let err = backend()
            .create_cart(CreateCart::in_region("reg_mars"))
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(400));
    }
}
