use std::sync::Arc;

use storefront_cache::Cache;
use storefront_state::backend::{BackendOp, CompletionBehavior};
use storefront_state::prelude::*;

const CEDAR: &str = "variant_cedar";

fn address() -> Address {
    Address::new("Ola", "Nowak", "ul. Długa 1", "Kraków", "PL", "30-001")
}

fn session(backend: &Arc<InMemoryBackend>) -> Checkout<InMemoryBackend> {
    Checkout::new(Arc::new(CartManager::new(Arc::clone(backend), "reg_pl")))
}

fn backend() -> Arc<InMemoryBackend> {
    Arc::new(InMemoryBackend::new().with_variant(CEDAR, "Świeca cedrowa", 5999))
}

/// Items, shipping and both addresses; no payment session selected.
async fn prepared(checkout: &Checkout<InMemoryBackend>) {
    checkout
        .cart()
        .add_or_update_item(&VariantId::new(CEDAR), 1)
        .await
        .unwrap();
    checkout.set_email("ola@example.com").await.unwrap();
    let options = checkout.list_shipping_options().await.unwrap();
    checkout.set_shipping_method(&options[0].id).await.unwrap();
    checkout.set_addresses(address(), None).await.unwrap();
}

#[tokio::test]
async fn test_selecting_payment_makes_cart_completable() {
    let backend = backend();
    let checkout = session(&backend);
    prepared(&checkout).await;

    assert!(!checkout.can_complete());
    assert_eq!(
        checkout.missing_requirements(),
        vec![CheckoutRequirement::PaymentSession]
    );
    assert_eq!(checkout.stage(), CheckoutStage::AddressesSet);

    checkout
        .choose_payment_provider(&PaymentProviderId::new("pp_stripe_stripe"))
        .await
        .unwrap();

    assert!(checkout.can_complete());
    assert_eq!(checkout.stage(), CheckoutStage::ReadyToComplete);
}

#[tokio::test]
async fn test_switching_provider_keeps_one_selected_session() {
    let backend = backend();
    let checkout = session(&backend);
    prepared(&checkout).await;

    let stripe = PaymentProviderId::new("pp_stripe_stripe");
    let paypal = PaymentProviderId::new("pp_paypal_paypal");
    checkout.choose_payment_provider(&stripe).await.unwrap();
    checkout.choose_payment_provider(&paypal).await.unwrap();

    let cart = checkout.cart().cart().unwrap();
    assert_eq!(cart.payment_sessions.len(), 2);
    let selected: Vec<_> = cart
        .payment_sessions
        .iter()
        .filter(|s| s.is_selected)
        .collect();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].provider_id, paypal);

    // Going back reuses the existing session.
    checkout.choose_payment_provider(&stripe).await.unwrap();
    assert_eq!(backend.calls(BackendOp::InitiatePaymentSession), 2);
    let cart = checkout.cart().cart().unwrap();
    assert_eq!(cart.selected_payment_session().unwrap().provider_id, stripe);
    assert_eq!(cart.payment_sessions.iter().filter(|s| s.is_selected).count(), 1);
}

#[tokio::test]
async fn test_refreshed_session_stays_selected() {
    let backend = backend();
    let checkout = session(&backend);
    prepared(&checkout).await;

    let stripe = PaymentProviderId::new("pp_stripe_stripe");
    checkout.choose_payment_provider(&stripe).await.unwrap();
    let cart = checkout.cart().cart().unwrap();
    let before = cart.selected_payment_session().unwrap().id.clone();

    checkout.refresh_payment_session(&stripe).await.unwrap();

    let cart = checkout.cart().cart().unwrap();
    let selected = cart.selected_payment_session().unwrap();
    assert_eq!(selected.provider_id, stripe);
    assert_ne!(selected.id, before);
    assert!(checkout.can_complete());
    assert_eq!(backend.calls(BackendOp::RefreshPaymentSession), 1);
}

#[tokio::test]
async fn test_update_payment_session_stores_provider_data() {
    let backend = backend();
    let checkout = session(&backend);
    prepared(&checkout).await;

    let stripe = PaymentProviderId::new("pp_stripe_stripe");
    checkout.choose_payment_provider(&stripe).await.unwrap();
    checkout
        .update_payment_session(&stripe, serde_json::json!({ "save_card": true }))
        .await
        .unwrap();

    let cart = checkout.cart().cart().unwrap();
    let selected = cart.selected_payment_session().unwrap();
    assert_eq!(selected.data, serde_json::json!({ "save_card": true }));
    assert!(checkout.can_complete());
}

#[tokio::test]
async fn test_second_shipping_option_replaces_first() {
    let backend = backend();
    let checkout = session(&backend);
    prepared(&checkout).await;

    let pickup = ShippingOptionId::new("so_pickup");
    checkout.set_shipping_method(&pickup).await.unwrap();

    let cart = checkout.cart().cart().unwrap();
    assert_eq!(cart.shipping_methods.len(), 1);
    assert_eq!(cart.shipping_methods[0].shipping_option_id, pickup);
    assert_eq!(cart.totals.shipping_total.amount_minor, 0);
}

#[tokio::test]
async fn test_every_requirement_blocks_completion() {
    let backend = backend();
    let checkout = session(&backend);
    assert_eq!(checkout.missing_requirements().len(), 5);

    checkout
        .cart()
        .add_or_update_item(&VariantId::new(CEDAR), 1)
        .await
        .unwrap();
    assert!(!checkout.can_complete());

    checkout.set_shipping_method(&ShippingOptionId::new("so_pickup")).await.unwrap();
    checkout.cart().update_shipping_address(address()).await.unwrap();
    assert_eq!(
        checkout.missing_requirements(),
        vec![
            CheckoutRequirement::BillingAddress,
            CheckoutRequirement::PaymentSession
        ]
    );
    assert!(!checkout.can_complete());
}

#[tokio::test]
async fn test_unready_completion_never_reaches_backend() {
    let backend = backend();
    let checkout = session(&backend);
    prepared(&checkout).await;

    let err = checkout.complete_order().await.unwrap_err();
    match err {
        CartError::NotReady { missing } => {
            assert_eq!(missing, vec![CheckoutRequirement::PaymentSession])
        }
        other => panic!("expected NotReady, got {other:?}"),
    }
    assert_eq!(backend.calls(BackendOp::CompleteCart), 0);
    assert_eq!(
        checkout.cart().status(OperationGroup::Checkout).error.as_deref(),
        Some("Koszyk nie jest gotowy do finalizacji")
    );
}

#[tokio::test]
async fn test_placed_order_drops_cart() {
    let backend = backend();
    let checkout = session(&backend);
    prepared(&checkout).await;
    checkout
        .choose_payment_provider(&PaymentProviderId::new("pp_system_default"))
        .await
        .unwrap();
    let cart_id = checkout.cart().cart_id().unwrap();

    let outcome = checkout.complete_order().await.unwrap();

    let CheckoutOutcome::Placed(order) = outcome else {
        panic!("expected an order, got {outcome:?}");
    };
    assert_eq!(order.cart_id, Some(cart_id.clone()));
    assert_eq!(order.display_id, 1001);
    assert_eq!(order.totals.total.amount_minor, 5999 + 1499);
    assert_eq!(checkout.phase(), CheckoutPhase::Completed(order.id.clone()));

    assert!(checkout.cart().cart_id().is_none());
    assert!(checkout.cart().items().is_empty());
    assert_eq!(checkout.stage(), CheckoutStage::Building);
    assert!(backend.stored_cart(&cart_id).unwrap().completed_at.is_some());
}

#[tokio::test]
async fn test_action_required_keeps_cart_and_allows_retry() {
    let backend = backend();
    backend.set_completion(CompletionBehavior::RequireAction(
        "3-D Secure authentication required".to_string(),
    ));
    let checkout = session(&backend);
    prepared(&checkout).await;
    checkout
        .choose_payment_provider(&PaymentProviderId::new("pp_stripe_stripe"))
        .await
        .unwrap();

    let outcome = checkout.complete_order().await.unwrap();
    let CheckoutOutcome::ActionRequired { cart, message } = outcome else {
        panic!("expected the cart back, got {outcome:?}");
    };
    assert_eq!(message, "3-D Secure authentication required");
    assert_eq!(
        cart.selected_payment_session().map(|s| s.status),
        Some(PaymentSessionStatus::RequiresMore)
    );
    assert_eq!(checkout.cart().cart(), Some(cart));
    assert_eq!(checkout.phase(), CheckoutPhase::Failed(message));

    backend.set_completion(CompletionBehavior::PlaceOrder);
    let retried = checkout.complete_order().await.unwrap();
    assert!(matches!(retried, CheckoutOutcome::Placed(_)));
    assert_eq!(backend.calls(BackendOp::CompleteCart), 2);
    assert!(checkout.phase().is_terminal());
}

#[tokio::test]
async fn test_backend_refusal_marks_phase_failed() {
    let backend = backend();
    let checkout = session(&backend);
    prepared(&checkout).await;
    checkout
        .choose_payment_provider(&PaymentProviderId::new("pp_paypal_paypal"))
        .await
        .unwrap();
    let before = checkout.cart().cart();

    backend.fail_next(
        BackendOp::CompleteCart,
        BackendError::from_status(402, "Payment was declined"),
    );
    let err = checkout.complete_order().await.unwrap_err();

    assert!(err.is_backend_kind(BackendErrorKind::PaymentRequired));
    assert_eq!(
        checkout.phase(),
        CheckoutPhase::Failed("Payment was declined".to_string())
    );
    assert_eq!(checkout.cart().cart(), before);
    assert!(!checkout.phase().is_terminal());
}

#[tokio::test]
async fn test_billing_address_can_differ() {
    let backend = backend();
    let checkout = session(&backend);
    checkout.cart().ensure_cart().await.unwrap();

    let billing = Address::new("Firma", "Sp. z o.o.", "Rynek 5", "Wrocław", "pl", "50-101");
    let cart = checkout
        .set_addresses(address(), Some(billing.clone()))
        .await
        .unwrap();

    assert_eq!(cart.shipping_address, Some(address()));
    assert_eq!(cart.billing_address, Some(billing));
    assert_eq!(backend.calls(BackendOp::UpdateCart), 1);
}

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let backend = backend();
    let checkout = session(&backend);
    checkout.cart().ensure_cart().await.unwrap();

    assert!(checkout.set_email("not-an-email").await.is_err());
    assert_eq!(backend.calls(BackendOp::UpdateCart), 0);
}

#[tokio::test]
async fn test_storefront_session_places_customer_order() {
    let customer = Customer {
        id: CustomerId::new("cus_ola"),
        email: "ola@example.com".to_string(),
        first_name: Some("Ola".to_string()),
        last_name: Some("Nowak".to_string()),
        phone: None,
        has_account: true,
        addresses: Vec::new(),
    };
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_variant(CEDAR, "Świeca cedrowa", 5999)
            .with_customer("jwt_ola", customer),
    );
    let store = Storefront::new(
        Arc::clone(&backend),
        &StorefrontConfig::default(),
        Cache::in_memory(),
    )
    .unwrap();

    assert!(matches!(
        store.orders.list(OrderQuery::default()).await,
        Err(CartError::NotAuthenticated)
    ));
    assert_eq!(
        store.status().get(OperationGroup::Orders).error.as_deref(),
        Some("Musisz się zalogować")
    );

    store.customer.token().set("jwt_ola");
    for _ in 0..3 {
        prepared(&store.checkout).await;
        store.attach_customer().await.unwrap();
        store
            .checkout
            .choose_payment_provider(&PaymentProviderId::new("pp_system_default"))
            .await
            .unwrap();
        store.checkout.complete_order().await.unwrap();
    }

    let first = store
        .orders
        .list(OrderQuery::default().with_limit(2))
        .await
        .unwrap();
    assert_eq!(
        first.iter().map(|o| o.display_id).collect::<Vec<_>>(),
        vec![1003, 1002]
    );
    assert!(store.orders.has_more().await);

    let more = store.orders.load_more().await.unwrap();
    assert_eq!(more.len(), 1);
    assert_eq!(store.orders.orders().await.len(), 3);
    assert!(!store.orders.has_more().await);
    assert!(store.orders.load_more().await.unwrap().is_empty());
    assert_eq!(backend.calls(BackendOp::ListOrders), 2);

    let order = store.orders.retrieve(&more[0].id).await.unwrap();
    assert_eq!(order.display_id, 1001);
}
