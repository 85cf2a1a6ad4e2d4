//! Checkout orchestration.
//!
//! The checkout stage is derived from the cart on every read; the only
//! state kept here is the phase of the latest completion attempt.

use std::sync::Arc;

use serde::Serialize;
use storefront_commerce::{
    Address, Cart, CheckoutRequirement, CheckoutStage, Order, OrderId, PaymentProviderId,
    ShippingOption, ShippingOptionId,
};
use tokio::sync::watch;

use crate::backend::{CartBackend, CartUpdate, CompletionResult};
use crate::error::{CartError, CartResult};
use crate::manager::CartManager;
use crate::messages;
use crate::status::Operation;

/// Where the latest completion attempt stands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", content = "detail", rename_all = "snake_case")]
pub enum CheckoutPhase {
    /// No attempt in progress; the stage alone describes the checkout.
    #[default]
    Idle,
    /// The completion request is in flight.
    Completing,
    /// The order was placed.
    Completed(OrderId),
    /// The backend refused or could not complete; the cart is intact and
    /// the attempt may be repeated.
    Failed(String),
}

impl CheckoutPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutPhase::Completed(_))
    }
}

/// Outcome of a completion request that reached the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// The cart became this order and has been dropped locally.
    Placed(Order),
    /// The backend kept the cart, typically because the payment needs
    /// another step. `cart` is the adopted snapshot.
    ActionRequired { cart: Cart, message: String },
}

/// Sequences checkout steps over a [`CartManager`].
pub struct Checkout<B> {
    cart: Arc<CartManager<B>>,
    phase: watch::Sender<CheckoutPhase>,
}

impl<B: CartBackend> Checkout<B> {
    pub fn new(cart: Arc<CartManager<B>>) -> Self {
        let (phase, _) = watch::channel(CheckoutPhase::Idle);
        Self { cart, phase }
    }

    pub fn cart(&self) -> &Arc<CartManager<B>> {
        &self.cart
    }

    /// Stage derived from the current cart.
    pub fn stage(&self) -> CheckoutStage {
        self.cart.stage()
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.phase.borrow().clone()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<CheckoutPhase> {
        self.phase.subscribe()
    }

    pub fn can_complete(&self) -> bool {
        self.cart.can_complete()
    }

    pub fn missing_requirements(&self) -> Vec<CheckoutRequirement> {
        self.cart.missing_requirements()
    }

    /// Back to `Idle`, e.g. when a new cart is started after an order.
    pub fn reset(&self) {
        self.phase.send_replace(CheckoutPhase::Idle);
    }

    pub async fn list_shipping_options(&self) -> CartResult<Vec<ShippingOption>> {
        self.cart.list_shipping_options().await
    }

    pub async fn set_shipping_method(&self, option_id: &ShippingOptionId) -> CartResult<Cart> {
        self.cart.set_shipping_method(option_id).await
    }

    /// Set both addresses in one request. Without a billing address the
    /// shipping address is used for both.
    pub async fn set_addresses(&self, shipping: Address, billing: Option<Address>) -> CartResult<Cart> {
        let billing = billing.unwrap_or_else(|| shipping.clone());
        self.cart
            .update_cart(CartUpdate {
                shipping_address: Some(shipping),
                billing_address: Some(billing),
                ..CartUpdate::default()
            })
            .await
    }

    pub async fn set_email(&self, email: &str) -> CartResult<Cart> {
        self.cart.set_customer_email(email).await
    }

    pub async fn initiate_payment_session(&self, provider_id: &PaymentProviderId) -> CartResult<Cart> {
        self.cart.initiate_payment_session(provider_id).await
    }

    pub async fn refresh_payment_session(&self, provider_id: &PaymentProviderId) -> CartResult<Cart> {
        self.cart.refresh_payment_session(provider_id).await
    }

    pub async fn set_payment_session(&self, provider_id: &PaymentProviderId) -> CartResult<Cart> {
        self.cart.set_payment_session(provider_id).await
    }

    pub async fn update_payment_session(
        &self,
        provider_id: &PaymentProviderId,
        data: serde_json::Value,
    ) -> CartResult<Cart> {
        self.cart.update_payment_session(provider_id, data).await
    }

    /// Initiate a session for `provider_id` unless one exists, then select
    /// it.
    pub async fn choose_payment_provider(&self, provider_id: &PaymentProviderId) -> CartResult<Cart> {
        let initiated = self
            .cart
            .cart()
            .is_some_and(|c| c.payment_sessions.iter().any(|s| &s.provider_id == provider_id));
        if !initiated {
            self.cart.initiate_payment_session(provider_id).await?;
        }
        self.cart.set_payment_session(provider_id).await
    }

    /// Complete the order.
    ///
    /// Fails with [`CartError::NotReady`] without contacting the backend
    /// when the cart cannot be completed. Each call is a distinct
    /// completion request and is never retried automatically.
    pub async fn complete_order(&self) -> CartResult<CheckoutOutcome> {
        let previous = self.phase.send_replace(CheckoutPhase::Completing);
        let locale = self.cart.locale();

        match self.cart.complete().await {
            Ok(CompletionResult::Order(order)) => {
                self.phase
                    .send_replace(CheckoutPhase::Completed(order.id.clone()));
                Ok(CheckoutOutcome::Placed(order))
            }
            Ok(CompletionResult::Cart { cart, message }) => {
                let message =
                    message.unwrap_or_else(|| messages::action_required(locale).to_string());
                self.phase.send_replace(CheckoutPhase::Failed(message.clone()));
                Ok(CheckoutOutcome::ActionRequired { cart, message })
            }
            Err(e @ (CartError::NotReady { .. } | CartError::NoActiveCart)) => {
                self.phase.send_replace(previous);
                Err(e)
            }
            Err(e) => {
                self.phase.send_replace(CheckoutPhase::Failed(messages::describe(
                    &e,
                    Operation::CompleteCart,
                    locale,
                )));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendOp, InMemoryBackend};

    #[tokio::test]
    async fn test_not_ready_restores_phase() {
        let backend = Arc::new(InMemoryBackend::new().with_variant("variant_cedar", "Cedr", 5999));
        let cart = Arc::new(CartManager::new(backend.clone(), "reg_pl"));
        let checkout = Checkout::new(cart.clone());

        cart.add_or_update_item(&"variant_cedar".into(), 1).await.unwrap();
        let err = checkout.complete_order().await.unwrap_err();

        assert!(matches!(err, CartError::NotReady { .. }));
        assert_eq!(checkout.phase(), CheckoutPhase::Idle);
        assert_eq!(backend.calls(BackendOp::CompleteCart), 0);
    }

    #[test]
    fn test_phase_serializes_tagged() {
        let json = serde_json::to_value(CheckoutPhase::Failed("odmowa".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "phase": "failed", "detail": "odmowa" }));
        assert!(CheckoutPhase::Completed(OrderId::new("order_1")).is_terminal());
    }
}
