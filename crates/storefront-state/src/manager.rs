//! Cart state manager.
//!
//! [`CartManager`] is the single handle to the session's cart. Every mutation
//! goes through it and follows the same contract:
//!
//! 1. wait for its turn in the manager's FIFO queue,
//! 2. validate local preconditions,
//! 3. issue exactly one backend request,
//! 4. replace the snapshot with the backend's cart, or leave it untouched
//!    on failure.
//!
//! Queued calls run strictly in submission order, so two rapid increments
//! both land, whatever order the network would have answered in.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use storefront_cache::Cookie;
use storefront_commerce::{
    Address, Cart, CartId, CartSummary, CartTotals, CheckoutRequirement, CheckoutStage,
    CommerceError, CustomerId, LineItem, LineItemId, PaymentProviderId, PaymentSession, RegionId,
    ShippingOption, ShippingOptionId, VariantId, MAX_QUANTITY_PER_ITEM,
};
use tokio::sync::{watch, Mutex};

use crate::backend::{CartBackend, CartUpdate, CompletionResult, CreateCart};
use crate::error::{BackendResult, CartError, CartResult};
use crate::messages::{self, Locale};
use crate::status::{Operation, OperationGroup, OperationStatus, StatusBoard, StatusSnapshot};

/// The session's cart, mediated.
pub struct CartManager<B> {
    backend: Arc<B>,
    region_id: RegionId,
    locale: Locale,
    cookie: Option<Cookie<CartId>>,
    queue: Mutex<()>,
    snapshot: watch::Sender<Option<Cart>>,
    shipping_options: RwLock<Vec<ShippingOption>>,
    status: Arc<StatusBoard>,
}

impl<B> std::fmt::Debug for CartManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("region_id", &self.region_id)
            .field("locale", &self.locale)
            .field("cart_id", &self.snapshot.borrow().as_ref().map(|c| c.id.clone()))
            .finish_non_exhaustive()
    }
}

impl<B: CartBackend> CartManager<B> {
    /// A manager with no cart, creating carts in `region_id`.
    pub fn new(backend: Arc<B>, region_id: impl Into<RegionId>) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            backend,
            region_id: region_id.into(),
            locale: Locale::default(),
            cookie: None,
            queue: Mutex::new(()),
            snapshot,
            shipping_options: RwLock::new(Vec::new()),
            status: Arc::new(StatusBoard::new()),
        }
    }

    /// Persist the cart id in `cookie`.
    pub fn with_cookie(mut self, cookie: Cookie<CartId>) -> Self {
        self.cookie = Some(cookie);
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Report into a shared status board.
    pub fn with_status_board(mut self, status: Arc<StatusBoard>) -> Self {
        self.status = status;
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn region_id(&self) -> &RegionId {
        &self.region_id
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    // ----------------------------------------------------------------------
    // Reads
    // ----------------------------------------------------------------------

    /// The last confirmed cart.
    pub fn cart(&self) -> Option<Cart> {
        self.snapshot.borrow().clone()
    }

    pub fn cart_id(&self) -> Option<CartId> {
        self.snapshot.borrow().as_ref().map(|c| c.id.clone())
    }

    pub fn items(&self) -> Vec<LineItem> {
        self.read(|c| c.items.clone()).unwrap_or_default()
    }

    /// Sum of quantities over all line items.
    pub fn item_count(&self) -> u64 {
        self.read(Cart::item_count).unwrap_or(0)
    }

    /// True when there is no cart or it has no items.
    pub fn is_empty(&self) -> bool {
        self.read(Cart::is_empty).unwrap_or(true)
    }

    pub fn totals(&self) -> Option<CartTotals> {
        self.read(|c| c.totals.clone())
    }

    pub fn has_shipping_method(&self) -> bool {
        self.read(Cart::has_shipping_method).unwrap_or(false)
    }

    pub fn has_payment_session(&self) -> bool {
        self.read(Cart::has_payment_session).unwrap_or(false)
    }

    pub fn selected_payment_session(&self) -> Option<PaymentSession> {
        self.read(|c| c.selected_payment_session().cloned()).flatten()
    }

    /// Whether the cart may be completed right now.
    pub fn can_complete(&self) -> bool {
        self.read(Cart::can_complete).unwrap_or(false)
    }

    /// Unmet completion preconditions; everything is missing without a cart.
    pub fn missing_requirements(&self) -> Vec<CheckoutRequirement> {
        self.read(Cart::missing_requirements).unwrap_or_else(|| {
            vec![
                CheckoutRequirement::Items,
                CheckoutRequirement::ShippingMethod,
                CheckoutRequirement::ShippingAddress,
                CheckoutRequirement::BillingAddress,
                CheckoutRequirement::PaymentSession,
            ]
        })
    }

    pub fn stage(&self) -> CheckoutStage {
        CheckoutStage::evaluate(self.snapshot.borrow().as_ref())
    }

    pub fn line_item_for_variant(&self, variant_id: &VariantId) -> Option<LineItem> {
        self.read(|c| c.line_item_for_variant(variant_id).cloned())
            .flatten()
    }

    /// Display-ready totals and flags.
    pub fn summary(&self) -> Option<CartSummary> {
        self.read(Cart::summary)
    }

    /// Options from the last [`list_shipping_options`](Self::list_shipping_options).
    pub fn shipping_options(&self) -> Vec<ShippingOption> {
        self.shipping_options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receiver yielding every newly confirmed snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<Cart>> {
        self.snapshot.subscribe()
    }

    pub fn status(&self, group: OperationGroup) -> OperationStatus {
        self.status.get(group)
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }

    pub fn clear_error(&self, group: OperationGroup) {
        self.status.clear_error(group);
    }

    pub fn status_board(&self) -> &Arc<StatusBoard> {
        &self.status
    }

    fn read<T>(&self, f: impl FnOnce(&Cart) -> T) -> Option<T> {
        self.snapshot.borrow().as_ref().map(f)
    }

    // ----------------------------------------------------------------------
    // Lifecycle
    // ----------------------------------------------------------------------

    /// Restore the persisted cart at session start.
    ///
    /// A cart the backend no longer knows (or has already completed) drops
    /// the persisted id. Any other failure is recorded on the status board
    /// and the session starts without a cart.
    pub async fn initialize(&self) -> CartResult<Option<Cart>> {
        let op = Operation::InitializeCart;
        let flight = self.status.begin(op);
        let _turn = self.queue.lock().await;

        let Some(cart_id) = self.persisted_id() else {
            return Ok(None);
        };

        let retrieved = match self.backend.retrieve_cart(&cart_id).await {
            Ok(cart) => cart,
            Err(e) if e.is_not_found() => {
                tracing::warn!(%cart_id, "persisted cart no longer exists");
                self.discard();
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(%cart_id, error = %e, "failed to restore cart");
                flight.fail(messages::describe(&CartError::Backend(e), op, self.locale));
                return Ok(None);
            }
        };

        if retrieved.completed_at.is_some() {
            tracing::info!(%cart_id, "persisted cart was already completed");
            self.discard();
            return Ok(None);
        }

        match self.align_region(retrieved).await {
            Ok(cart) => {
                self.adopt(cart.clone());
                Ok(Some(cart))
            }
            Err(e) => {
                tracing::warn!(%cart_id, error = %e, "failed to move cart to the store region");
                flight.fail(messages::describe(&CartError::Backend(e), op, self.locale));
                Ok(None)
            }
        }
    }

    /// Create a new cart, replacing any current one. The configured region
    /// is used when `input` names none.
    pub async fn create_cart(&self, mut input: CreateCart) -> CartResult<Cart> {
        if input.region_id.is_none() {
            input.region_id = Some(self.region_id.clone());
        }
        self.run(Operation::CreateCart, || async move {
            let cart = self.backend.create_cart(input).await?;
            self.clear_shipping_options();
            self.adopt(cart.clone());
            tracing::info!(cart_id = %cart.id, "cart created");
            Ok(cart)
        })
        .await
    }

    /// The current cart, created first if there is none.
    pub async fn ensure_cart(&self) -> CartResult<Cart> {
        self.run(Operation::CreateCart, || self.ensure_locked()).await
    }

    /// Re-read the cart from the backend. A cart the backend no longer
    /// knows is dropped along with its persisted id.
    pub async fn retrieve_cart(&self) -> CartResult<Cart> {
        self.run(Operation::RetrieveCart, || async move {
            let cart_id = self.require_cart_id()?;
            let cart = match self.backend.retrieve_cart(&cart_id).await {
                Ok(cart) => cart,
                Err(e) if e.is_not_found() => {
                    tracing::warn!(%cart_id, "cart no longer exists");
                    self.discard();
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            };
            let cart = self.align_region(cart).await?;
            self.adopt(cart.clone());
            Ok(cart)
        })
        .await
    }

    /// Alias for [`retrieve_cart`](Self::retrieve_cart).
    pub async fn refresh(&self) -> CartResult<Cart> {
        self.retrieve_cart().await
    }

    /// Forget the cart locally. The remote cart is left alone.
    pub async fn clear_cart(&self) -> CartResult<()> {
        self.run(Operation::ClearCart, || async move {
            if let Some(cart_id) = self.cart_id() {
                tracing::info!(%cart_id, "cart cleared");
            }
            self.discard();
            Ok(())
        })
        .await
    }

    // ----------------------------------------------------------------------
    // Items
    // ----------------------------------------------------------------------

    /// Add `quantity` of a variant, creating the cart if needed. An existing
    /// line for the variant has its quantity raised instead.
    pub async fn add_or_update_item(&self, variant_id: &VariantId, quantity: u32) -> CartResult<Cart> {
        self.checked(Operation::AddItem, check_quantity(quantity))?;
        self.run(Operation::AddItem, || async move {
            let cart = self.ensure_locked().await?;
            let updated = match cart.line_item_for_variant(variant_id) {
                Some(line) => {
                    let total = line.quantity.saturating_add(quantity);
                    check_quantity(total)?;
                    self.backend
                        .update_line_item(&cart.id, &line.id, total)
                        .await?
                }
                None => {
                    self.backend
                        .add_line_item(&cart.id, variant_id, quantity)
                        .await?
                }
            };
            self.adopt(updated.clone());
            Ok(updated)
        })
        .await
    }

    /// Set a variant's quantity. Zero removes its line (and is a no-op when
    /// there is none); a positive quantity for an absent variant adds it.
    pub async fn set_item_quantity(&self, variant_id: &VariantId, quantity: u32) -> CartResult<Cart> {
        if quantity > 0 {
            self.checked(Operation::UpdateItem, check_quantity(quantity))?;
        }
        self.run(Operation::UpdateItem, || async move {
            if quantity == 0 {
                let cart = self.require_cart()?;
                let Some(line) = cart.line_item_for_variant(variant_id) else {
                    return Ok(cart);
                };
                let updated = self.backend.delete_line_item(&cart.id, &line.id).await?;
                self.adopt(updated.clone());
                return Ok(updated);
            }

            let cart = self.ensure_locked().await?;
            let updated = match cart.line_item_for_variant(variant_id) {
                Some(line) if line.quantity == quantity => return Ok(cart),
                Some(line) => {
                    self.backend
                        .update_line_item(&cart.id, &line.id, quantity)
                        .await?
                }
                None => {
                    self.backend
                        .add_line_item(&cart.id, variant_id, quantity)
                        .await?
                }
            };
            self.adopt(updated.clone());
            Ok(updated)
        })
        .await
    }

    /// Set a line's quantity by line id. Zero removes the line.
    pub async fn update_item(&self, line_item_id: &LineItemId, quantity: u32) -> CartResult<Cart> {
        if quantity == 0 {
            return self.remove_item(line_item_id).await;
        }
        self.checked(Operation::UpdateItem, check_quantity(quantity))?;
        self.mutate(Operation::UpdateItem, |backend, cart_id| async move {
            backend
                .update_line_item(&cart_id, line_item_id, quantity)
                .await
        })
        .await
    }

    /// Remove a line. A line the backend no longer has fails with a
    /// stale-reference error.
    pub async fn remove_item(&self, line_item_id: &LineItemId) -> CartResult<Cart> {
        self.mutate(Operation::RemoveItem, |backend, cart_id| async move {
            backend.delete_line_item(&cart_id, line_item_id).await
        })
        .await
    }

    /// Add one more of a variant.
    pub async fn increment_item(&self, variant_id: &VariantId) -> CartResult<Cart> {
        self.add_or_update_item(variant_id, 1).await
    }

    /// Take one away from a variant's line; the last one removes the line.
    /// A variant not in the cart is left alone.
    pub async fn decrement_item(&self, variant_id: &VariantId) -> CartResult<Cart> {
        self.run(Operation::UpdateItem, || async move {
            let cart = self.require_cart()?;
            let Some(line) = cart.line_item_for_variant(variant_id) else {
                return Ok(cart);
            };
            let updated = if line.quantity <= 1 {
                self.backend.delete_line_item(&cart.id, &line.id).await?
            } else {
                self.backend
                    .update_line_item(&cart.id, &line.id, line.quantity - 1)
                    .await?
            };
            self.adopt(updated.clone());
            Ok(updated)
        })
        .await
    }

    // ----------------------------------------------------------------------
    // Cart fields
    // ----------------------------------------------------------------------

    /// Apply a partial update. An empty update returns the current cart
    /// without a request.
    pub async fn update_cart(&self, update: CartUpdate) -> CartResult<Cart> {
        if update.is_empty() {
            return self
                .run(Operation::UpdateCart, || async move { self.require_cart() })
                .await;
        }
        self.mutate(Operation::UpdateCart, |backend, cart_id| async move {
            backend.update_cart(&cart_id, update).await
        })
        .await
    }

    pub async fn update_shipping_address(&self, address: Address) -> CartResult<Cart> {
        self.update_cart(CartUpdate::shipping_address(address)).await
    }

    pub async fn update_billing_address(&self, address: Address) -> CartResult<Cart> {
        self.update_cart(CartUpdate::billing_address(address)).await
    }

    pub async fn set_customer_email(&self, email: &str) -> CartResult<Cart> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            let err = CartError::from(CommerceError::ValidationError(format!(
                "invalid email: {:?}",
                email
            )));
            return self.checked(Operation::UpdateCart, Err(err));
        }
        self.update_cart(CartUpdate::email(email)).await
    }

    /// Bind the cart to a signed-in customer.
    pub async fn assign_customer(&self, customer_id: CustomerId) -> CartResult<Cart> {
        self.update_cart(CartUpdate::customer(customer_id)).await
    }

    // ----------------------------------------------------------------------
    // Shipping
    // ----------------------------------------------------------------------

    /// Fetch the options the backend offers for this cart. The snapshot is
    /// not touched.
    pub async fn list_shipping_options(&self) -> CartResult<Vec<ShippingOption>> {
        self.run(Operation::ListShippingOptions, || async move {
            let cart = self.require_cart()?;
            let options = self
                .backend
                .list_shipping_options(&cart.id, cart.currency())
                .await?;
            *self
                .shipping_options
                .write()
                .unwrap_or_else(PoisonError::into_inner) = options.clone();
            Ok(options)
        })
        .await
    }

    /// Select a shipping option, replacing any previous selection.
    pub async fn set_shipping_method(&self, option_id: &ShippingOptionId) -> CartResult<Cart> {
        self.mutate(Operation::AddShippingMethod, |backend, cart_id| async move {
            backend.add_shipping_method(&cart_id, option_id).await
        })
        .await
    }

    // ----------------------------------------------------------------------
    // Promotions
    // ----------------------------------------------------------------------

    pub async fn add_discount(&self, code: &str) -> CartResult<Cart> {
        let code = self.checked(Operation::AddDiscount, promo_code(code))?;
        self.mutate(Operation::AddDiscount, |backend, cart_id| async move {
            backend.add_discount(&cart_id, code).await
        })
        .await
    }

    pub async fn remove_discount(&self, code: &str) -> CartResult<Cart> {
        let code = self.checked(Operation::RemoveDiscount, promo_code(code))?;
        self.mutate(Operation::RemoveDiscount, |backend, cart_id| async move {
            backend.remove_discount(&cart_id, code).await
        })
        .await
    }

    pub async fn add_gift_card(&self, code: &str) -> CartResult<Cart> {
        let code = self.checked(Operation::AddGiftCard, promo_code(code))?;
        self.mutate(Operation::AddGiftCard, |backend, cart_id| async move {
            backend.add_gift_card(&cart_id, code).await
        })
        .await
    }

    pub async fn remove_gift_card(&self, code: &str) -> CartResult<Cart> {
        let code = self.checked(Operation::RemoveGiftCard, promo_code(code))?;
        self.mutate(Operation::RemoveGiftCard, |backend, cart_id| async move {
            backend.remove_gift_card(&cart_id, code).await
        })
        .await
    }

    // ----------------------------------------------------------------------
    // Payment
    // ----------------------------------------------------------------------

    pub async fn initiate_payment_session(&self, provider_id: &PaymentProviderId) -> CartResult<Cart> {
        self.mutate(Operation::InitiatePaymentSession, |backend, cart_id| async move {
            backend.initiate_payment_session(&cart_id, provider_id).await
        })
        .await
    }

    pub async fn update_payment_session(
        &self,
        provider_id: &PaymentProviderId,
        data: serde_json::Value,
    ) -> CartResult<Cart> {
        self.mutate(Operation::UpdatePaymentSession, |backend, cart_id| async move {
            backend
                .update_payment_session(&cart_id, provider_id, data)
                .await
        })
        .await
    }

    /// Re-sync a session with its provider, e.g. after a redirect.
    pub async fn refresh_payment_session(&self, provider_id: &PaymentProviderId) -> CartResult<Cart> {
        self.mutate(Operation::RefreshPaymentSession, |backend, cart_id| async move {
            backend.refresh_payment_session(&cart_id, provider_id).await
        })
        .await
    }

    /// Select one session; the backend deselects the others.
    pub async fn set_payment_session(&self, provider_id: &PaymentProviderId) -> CartResult<Cart> {
        self.mutate(Operation::SelectPaymentSession, |backend, cart_id| async move {
            backend.select_payment_session(&cart_id, provider_id).await
        })
        .await
    }

    // ----------------------------------------------------------------------
    // Completion
    // ----------------------------------------------------------------------

    /// Complete the cart. Readiness is checked in the queue, right before
    /// the request; an unready cart fails with [`CartError::NotReady`]
    /// without reaching the backend. An order drops the cart; a cart result
    /// is adopted as the new snapshot.
    pub(crate) async fn complete(&self) -> CartResult<CompletionResult> {
        self.run(Operation::CompleteCart, || async move {
            let cart = self.require_cart()?;
            let missing = cart.missing_requirements();
            if !missing.is_empty() {
                return Err(CartError::NotReady { missing });
            }

            let result = self.backend.complete_cart(&cart.id).await?;
            match &result {
                CompletionResult::Order(order) => {
                    tracing::info!(cart_id = %cart.id, order_id = %order.id, "cart completed");
                    self.discard();
                }
                CompletionResult::Cart { cart: returned, message } => {
                    tracing::info!(
                        cart_id = %returned.id,
                        message = message.as_deref().unwrap_or_default(),
                        "completion needs further action"
                    );
                    self.adopt(returned.clone());
                }
            }
            Ok(result)
        })
        .await
    }

    // ----------------------------------------------------------------------
    // Internals
    // ----------------------------------------------------------------------

    /// Mark the group loading, wait for the queue, run `f`, and record a
    /// localized message if it fails.
    async fn run<T, F, Fut>(&self, op: Operation, f: F) -> CartResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CartResult<T>>,
    {
        let flight = self.status.begin(op);
        let _turn = self.queue.lock().await;
        tracing::debug!(operation = %op, cart_id = ?self.cart_id(), "cart operation");

        let result = f().await;
        if let Err(e) = &result {
            tracing::warn!(operation = %op, error = %e, "cart operation failed");
            flight.fail(messages::describe(e, op, self.locale));
        }
        result
    }

    /// Record a failed local check on the operation's group, as a failed
    /// backend call would be.
    fn checked<T>(&self, op: Operation, result: CartResult<T>) -> CartResult<T> {
        if let Err(e) = &result {
            self.status
                .begin(op)
                .fail(messages::describe(e, op, self.locale));
        }
        result
    }

    /// A single backend mutation against the current cart.
    async fn mutate<F, Fut>(&self, op: Operation, call: F) -> CartResult<Cart>
    where
        F: FnOnce(Arc<B>, CartId) -> Fut,
        Fut: Future<Output = BackendResult<Cart>>,
    {
        self.run(op, || async move {
            let cart_id = self.require_cart_id()?;
            let cart = call(Arc::clone(&self.backend), cart_id).await?;
            self.adopt(cart.clone());
            Ok(cart)
        })
        .await
    }

    /// Caller holds the queue.
    async fn ensure_locked(&self) -> CartResult<Cart> {
        if let Some(cart) = self.cart() {
            return Ok(cart);
        }
        let cart = self
            .backend
            .create_cart(CreateCart::in_region(self.region_id.clone()))
            .await?;
        self.clear_shipping_options();
        self.adopt(cart.clone());
        tracing::info!(cart_id = %cart.id, "cart created");
        Ok(cart)
    }

    async fn align_region(&self, cart: Cart) -> BackendResult<Cart> {
        if cart.region.id == self.region_id {
            return Ok(cart);
        }
        tracing::info!(
            cart_id = %cart.id,
            from = %cart.region.id,
            to = %self.region_id,
            "moving cart to store region"
        );
        self.backend
            .update_cart(&cart.id, CartUpdate::region(self.region_id.clone()))
            .await
    }

    fn require_cart(&self) -> CartResult<Cart> {
        self.cart().ok_or(CartError::NoActiveCart)
    }

    fn require_cart_id(&self) -> CartResult<CartId> {
        self.cart_id().ok_or(CartError::NoActiveCart)
    }

    /// Replace the snapshot and persist its id.
    fn adopt(&self, cart: Cart) {
        self.persist(&cart.id);
        self.snapshot.send_replace(Some(cart));
    }

    /// Drop the snapshot, the shipping options and the persisted id.
    fn discard(&self) {
        self.snapshot.send_replace(None);
        self.clear_shipping_options();
        if let Some(cookie) = &self.cookie {
            if let Err(e) = cookie.clear() {
                tracing::warn!(cookie = cookie.name(), error = %e, "failed to clear cart cookie");
            }
        }
    }

    fn clear_shipping_options(&self) {
        self.shipping_options
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn persist(&self, cart_id: &CartId) {
        if let Some(cookie) = &self.cookie {
            if let Err(e) = cookie.set(cart_id) {
                tracing::warn!(%cart_id, error = %e, "failed to persist cart id");
            }
        }
    }

    fn persisted_id(&self) -> Option<CartId> {
        let cookie = self.cookie.as_ref()?;
        match cookie.get() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(cookie = cookie.name(), error = %e, "failed to read cart cookie");
                None
            }
        }
    }
}

fn check_quantity(quantity: u32) -> CartResult<()> {
    if quantity == 0 || quantity > MAX_QUANTITY_PER_ITEM {
        return Err(CartError::InvalidQuantity(i64::from(quantity)));
    }
    Ok(())
}

fn promo_code(code: &str) -> CartResult<&str> {
    let code = code.trim();
    if code.is_empty() {
        return Err(CommerceError::ValidationError("code is empty".into()).into());
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    fn manager() -> CartManager<InMemoryBackend> {
        let backend = InMemoryBackend::new().with_variant("variant_lavender", "Lawenda", 4999);
        CartManager::new(Arc::new(backend), "reg_pl")
    }

    #[test]
    fn test_reads_without_cart() {
        let m = manager();
        assert!(m.cart().is_none());
        assert!(m.is_empty());
        assert_eq!(m.item_count(), 0);
        assert!(!m.can_complete());
        assert_eq!(m.missing_requirements().len(), 5);
        assert_eq!(m.stage(), CheckoutStage::Building);
        assert!(m.summary().is_none());
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(check_quantity(1).is_ok());
        assert!(check_quantity(MAX_QUANTITY_PER_ITEM).is_ok());
        assert!(matches!(check_quantity(0), Err(CartError::InvalidQuantity(0))));
        assert!(check_quantity(MAX_QUANTITY_PER_ITEM + 1).is_err());
    }

    #[test]
    fn test_promo_code_is_trimmed() {
        assert_eq!(promo_code("  WOSK10 ").unwrap(), "WOSK10");
        assert!(promo_code("   ").is_err());
    }

    #[tokio::test]
    async fn test_zero_quantity_add_never_reaches_backend() {
        let m = manager();
        let err = m
            .add_or_update_item(&VariantId::new("variant_lavender"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(0)));
        assert_eq!(m.backend().total_calls(), 0);
        assert!(m.cart().is_none());
    }

    #[tokio::test]
    async fn test_mutation_without_cart_is_no_active_cart() {
        let m = manager();
        let err = m
            .set_shipping_method(&ShippingOptionId::new("so_inpost"))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::NoActiveCart));
        assert_eq!(
            m.status(OperationGroup::Shipping).error.as_deref(),
            Some("Brak aktywnego koszyka")
        );
        assert!(!m.status(OperationGroup::Shipping).is_loading());
    }
}
