use std::sync::Arc;
use std::time::Duration;

use storefront_cache::{Cache, Cookie, CookieOptions};
use storefront_state::backend::BackendOp;
use storefront_state::prelude::*;

const LAVENDER: &str = "variant_lavender";
const CEDAR: &str = "variant_cedar";

fn backend() -> Arc<InMemoryBackend> {
    Arc::new(
        InMemoryBackend::new()
            .with_variant(LAVENDER, "Świeca lawendowa", 4999)
            .with_variant(CEDAR, "Świeca cedrowa", 5999),
    )
}

fn manager(backend: &Arc<InMemoryBackend>) -> CartManager<InMemoryBackend> {
    CartManager::new(Arc::clone(backend), "reg_pl")
}

fn variant(id: &str) -> VariantId {
    VariantId::new(id)
}

#[tokio::test]
async fn test_first_add_creates_cart_with_one_line() {
    let backend = backend();
    let cart = manager(&backend);
    assert!(cart.is_empty());

    cart.add_or_update_item(&variant(LAVENDER), 2).await.unwrap();

    let items = cart.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);
    assert_eq!(cart.item_count(), 2);
    assert_eq!(backend.calls(BackendOp::CreateCart), 1);
}

#[tokio::test]
async fn test_repeated_adds_sum_into_one_line() {
    let backend = backend();
    let cart = manager(&backend);

    for quantity in [2, 3, 1] {
        cart.add_or_update_item(&variant(LAVENDER), quantity).await.unwrap();
    }

    let items = cart.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 6);
    assert_eq!(cart.totals().unwrap().subtotal.amount_minor, 6 * 4999);
}

#[tokio::test]
async fn test_decrement_last_unit_removes_line() {
    let backend = backend();
    let cart = manager(&backend);

    cart.add_or_update_item(&variant(LAVENDER), 1).await.unwrap();
    cart.decrement_item(&variant(LAVENDER)).await.unwrap();

    assert!(cart.line_item_for_variant(&variant(LAVENDER)).is_none());
    assert!(cart.is_empty());
    assert!(cart.cart_id().is_some());
}

#[tokio::test]
async fn test_decrement_and_increment_step_by_one() {
    let backend = backend();
    let cart = manager(&backend);

    cart.add_or_update_item(&variant(CEDAR), 3).await.unwrap();
    cart.decrement_item(&variant(CEDAR)).await.unwrap();
    assert_eq!(cart.line_item_for_variant(&variant(CEDAR)).unwrap().quantity, 2);

    cart.increment_item(&variant(CEDAR)).await.unwrap();
    assert_eq!(cart.line_item_for_variant(&variant(CEDAR)).unwrap().quantity, 3);
}

#[tokio::test]
async fn test_set_quantity_zero_matches_remove() {
    let backend = backend();
    let by_set = manager(&backend);
    let by_remove = manager(&backend);

    for cart in [&by_set, &by_remove] {
        cart.add_or_update_item(&variant(LAVENDER), 2).await.unwrap();
        cart.add_or_update_item(&variant(CEDAR), 1).await.unwrap();
    }

    by_set.set_item_quantity(&variant(LAVENDER), 0).await.unwrap();
    let line = by_remove.line_item_for_variant(&variant(LAVENDER)).unwrap();
    by_remove.remove_item(&line.id).await.unwrap();

    let remaining = |cart: &CartManager<InMemoryBackend>| {
        cart.items()
            .into_iter()
            .map(|i| (i.variant_id, i.quantity))
            .collect::<Vec<_>>()
    };
    assert_eq!(remaining(&by_set), remaining(&by_remove));
    assert_eq!(remaining(&by_set), vec![(variant(CEDAR), 1)]);
}

#[tokio::test]
async fn test_set_quantity_adds_missing_variant_and_skips_noop() {
    let backend = backend();
    let cart = manager(&backend);

    cart.set_item_quantity(&variant(CEDAR), 4).await.unwrap();
    assert_eq!(cart.item_count(), 4);

    backend.reset_calls();
    cart.set_item_quantity(&variant(CEDAR), 4).await.unwrap();
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_out_of_range_quantity_is_rejected_locally() {
    let backend = backend();
    let cart = manager(&backend);

    let err = cart.add_or_update_item(&variant(LAVENDER), 0).await.unwrap_err();
    assert!(matches!(err, CartError::InvalidQuantity(0)));
    assert_eq!(backend.total_calls(), 0);
    assert!(cart.cart_id().is_none());
}

#[tokio::test]
async fn test_local_rejections_are_reported_on_status() {
    let backend = backend();
    let cart = manager(&backend);

    cart.add_or_update_item(&variant(LAVENDER), 0).await.unwrap_err();
    let items = cart.status(OperationGroup::Items);
    assert_eq!(
        items.error.as_deref(),
        Some("Błąd podczas dodawania produktu do koszyka")
    );
    assert!(!items.is_loading());

    cart.set_item_quantity(&variant(LAVENDER), 10_000).await.unwrap_err();
    assert_eq!(
        cart.status(OperationGroup::Items).error.as_deref(),
        Some("Błąd podczas aktualizacji produktu w koszyku")
    );

    cart.add_discount("   ").await.unwrap_err();
    let promotions = cart.status(OperationGroup::Promotions);
    assert_eq!(
        promotions.error.as_deref(),
        Some("Błąd podczas dodawania kodu rabatowego")
    );
    assert!(!promotions.is_loading());

    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_clear_then_ensure_yields_new_cart() {
    let backend = backend();
    let cart = manager(&backend);

    let first = cart.ensure_cart().await.unwrap().id;
    cart.clear_cart().await.unwrap();
    assert!(cart.cart_id().is_none());

    let second = cart.ensure_cart().await.unwrap().id;
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_mutation_without_cart_is_no_active_cart() {
    let backend = backend();
    let cart = manager(&backend);

    let err = cart.add_discount("WOSK10").await.unwrap_err();
    assert!(matches!(err, CartError::NoActiveCart));
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_increments_both_land() {
    let backend = backend();
    let cart = Arc::new(manager(&backend));
    cart.add_or_update_item(&variant(LAVENDER), 1).await.unwrap();

    // The first request is slower than the second; both must still apply.
    backend.push_latency(Duration::from_millis(40));
    backend.push_latency(Duration::from_millis(1));

    let first = tokio::spawn({
        let cart = Arc::clone(&cart);
        async move { cart.increment_item(&VariantId::new(LAVENDER)).await }
    });
    tokio::task::yield_now().await;
    let second = tokio::spawn({
        let cart = Arc::clone(&cart);
        async move { cart.increment_item(&VariantId::new(LAVENDER)).await }
    });

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(cart.line_item_for_variant(&variant(LAVENDER)).unwrap().quantity, 3);
    let stored = backend.stored_cart(&cart.cart_id().unwrap()).unwrap();
    assert_eq!(stored.items[0].quantity, 3);
}

#[tokio::test]
async fn test_joined_mutations_apply_in_submission_order() {
    let backend = backend();
    let cart = manager(&backend);
    cart.add_or_update_item(&variant(CEDAR), 1).await.unwrap();

    backend.push_latency(Duration::from_millis(30));
    let cedar = variant(CEDAR);
    let (a, b) = futures::join!(
        cart.set_item_quantity(&cedar, 5),
        cart.set_item_quantity(&cedar, 2),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(cart.line_item_for_variant(&variant(CEDAR)).unwrap().quantity, 2);
}

#[tokio::test]
async fn test_failed_mutation_keeps_snapshot_and_reports() {
    let backend = backend();
    let cart = manager(&backend);
    let before = cart.add_or_update_item(&variant(LAVENDER), 2).await.unwrap();

    backend.fail_next(
        BackendOp::UpdateLineItem,
        BackendError::server("Internal error"),
    );
    let err = cart.increment_item(&variant(LAVENDER)).await.unwrap_err();
    assert!(err.is_backend_kind(BackendErrorKind::Server));

    assert_eq!(cart.cart(), Some(before));
    let status = cart.status(OperationGroup::Items);
    assert!(!status.is_loading());
    assert_eq!(status.error.as_deref(), Some("Internal error"));

    // The same action may be retried right away.
    cart.increment_item(&variant(LAVENDER)).await.unwrap();
    assert_eq!(cart.item_count(), 3);
    assert!(cart.status(OperationGroup::Items).error.is_none());
}

#[tokio::test]
async fn test_loading_flag_covers_queued_calls() {
    let backend = backend();
    let cart = manager(&backend);
    cart.ensure_cart().await.unwrap();

    backend.push_latency(Duration::from_millis(30));
    let mut status = cart.subscribe_status();
    let cedar = variant(CEDAR);
    let add = cart.add_or_update_item(&cedar, 1);
    let observe = async {
        status
            .wait_for(|s| s.get(&OperationGroup::Items).is_some_and(|g| g.is_loading()))
            .await
            .map(|_| ())
    };
    let (added, observed) = futures::join!(add, observe);
    added.unwrap();
    observed.unwrap();

    assert!(!cart.status(OperationGroup::Items).is_loading());
}

#[tokio::test]
async fn test_removing_stale_line_is_stale_reference() {
    let backend = backend();
    let cart = manager(&backend);
    cart.add_or_update_item(&variant(LAVENDER), 1).await.unwrap();
    let line = cart.line_item_for_variant(&variant(LAVENDER)).unwrap();

    cart.remove_item(&line.id).await.unwrap();
    let err = cart.remove_item(&line.id).await.unwrap_err();

    assert!(err.is_backend_kind(BackendErrorKind::StaleReference));
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_discount_and_gift_card_codes() {
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_variant(CEDAR, "Świeca cedrowa", 5000)
            .with_discount("WOSK10", DiscountKind::Percentage, 10)
            .with_gift_card("PREZENT", 2000),
    );
    let cart = manager(&backend);
    cart.add_or_update_item(&variant(CEDAR), 2).await.unwrap();

    cart.add_discount("  wosk10 ").await.unwrap();
    assert_eq!(cart.totals().unwrap().discount_total.amount_minor, 1000);

    cart.add_gift_card("PREZENT").await.unwrap();
    assert_eq!(cart.totals().unwrap().total.amount_minor, 7000);

    cart.remove_discount("WOSK10").await.unwrap();
    cart.remove_gift_card("PREZENT").await.unwrap();
    assert_eq!(cart.totals().unwrap().total.amount_minor, 10000);

    let err = cart.add_discount("NIEMA").await.unwrap_err();
    assert!(err.is_backend_kind(BackendErrorKind::InvalidRequest));
    assert!(cart.status(OperationGroup::Promotions).error.is_some());
}

#[tokio::test]
async fn test_cart_id_is_persisted_and_restored() {
    let backend = backend();
    let cache = Cache::in_memory();
    let cookie = || Cookie::new(cache.clone(), "cart_id", CookieOptions::days(30)).unwrap();

    let first = manager(&backend).with_cookie(cookie());
    let cart_id = first.ensure_cart().await.unwrap().id;
    first.add_or_update_item(&variant(CEDAR), 1).await.unwrap();

    let restored = manager(&backend).with_cookie(cookie());
    let cart = restored.initialize().await.unwrap().unwrap();
    assert_eq!(cart.id, cart_id);
    assert_eq!(restored.item_count(), 1);
}

#[tokio::test]
async fn test_unwritable_cookie_does_not_fail_mutation() {
    let backend = backend();
    let cookie: Cookie<CartId> =
        Cookie::new(Cache::in_memory(), "cart_id", CookieOptions::days(100_000_000)).unwrap();
    let cart = manager(&backend).with_cookie(cookie.clone());

    cart.add_or_update_item(&variant(CEDAR), 1).await.unwrap();
    assert_eq!(cart.item_count(), 1);
    assert!(cookie.get().unwrap().is_none());
}

#[tokio::test]
async fn test_initialize_drops_unknown_cart() {
    let backend = backend();
    let cache = Cache::in_memory();
    let cookie: Cookie<CartId> = Cookie::new(cache, "cart_id", CookieOptions::days(30)).unwrap();
    cookie.set(&CartId::new("cart_gone")).unwrap();

    let cart = manager(&backend).with_cookie(cookie.clone());
    assert_eq!(cart.initialize().await.unwrap(), None);

    assert!(cookie.get().unwrap().is_none());
    assert!(cart.status(OperationGroup::Cart).error.is_none());
}

#[tokio::test]
async fn test_initialize_keeps_cookie_on_transport_failure() {
    let backend = backend();
    let cache = Cache::in_memory();
    let cookie: Cookie<CartId> = Cookie::new(cache, "cart_id", CookieOptions::days(30)).unwrap();
    let cart_id = manager(&backend).ensure_cart().await.unwrap().id;
    cookie.set(&cart_id).unwrap();

    backend.fail_next(BackendOp::RetrieveCart, BackendError::transport("connection reset"));
    let cart = manager(&backend).with_cookie(cookie.clone());
    assert_eq!(cart.initialize().await.unwrap(), None);

    assert_eq!(cookie.get().unwrap(), Some(cart_id));
    assert!(cart.status(OperationGroup::Cart).error.is_some());
}

#[tokio::test]
async fn test_initialize_moves_cart_to_store_region() {
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_region("reg_eu", "Europa", Currency::EUR)
            .with_variant(CEDAR, "Świeca cedrowa", 5999),
    );
    let cache = Cache::in_memory();
    let cookie = || Cookie::new(cache.clone(), "cart_id", CookieOptions::days(30)).unwrap();

    CartManager::new(Arc::clone(&backend), "reg_eu")
        .with_cookie(cookie())
        .ensure_cart()
        .await
        .unwrap();

    let cart = manager(&backend).with_cookie(cookie());
    let restored = cart.initialize().await.unwrap().unwrap();
    assert_eq!(restored.region.id, RegionId::new("reg_pl"));
    assert_eq!(restored.currency(), Currency::PLN);
    assert_eq!(backend.calls(BackendOp::UpdateCart), 1);
}

#[tokio::test]
async fn test_retrieve_of_vanished_cart_discards_it() {
    let backend = backend();
    let cart = manager(&backend);
    let cart_id = cart.ensure_cart().await.unwrap().id;
    backend.forget_cart(&cart_id);

    let err = cart.retrieve_cart().await.unwrap_err();
    assert!(err.is_backend_kind(BackendErrorKind::NotFound));
    assert!(cart.cart_id().is_none());
}

#[tokio::test]
async fn test_subscribers_see_each_confirmed_snapshot() {
    let backend = backend();
    let cart = manager(&backend);
    let mut rx = cart.subscribe();
    assert!(rx.borrow_and_update().is_none());

    cart.add_or_update_item(&variant(LAVENDER), 1).await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().as_ref().map(|c| c.item_count()), Some(1));
}
