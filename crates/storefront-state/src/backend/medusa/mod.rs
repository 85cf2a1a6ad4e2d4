//! Medusa store API backend.
//!
//! Talks to `/store/*` over [`FetchClient`]. The publishable key travels as
//! a default header; customer calls add a bearer token. Only `GET`s are ever
//! retried, which the client enforces.

mod wire;

use std::borrow::Cow;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use storefront_commerce::{
    Address, AddressId, Cart, CartId, Currency, Customer, LineItemId, Order, OrderId,
    PaymentProviderId, ShippingOption, ShippingOptionId, VariantId,
};
use storefront_data::{ClientRequestBuilder, FetchClient, FetchError, RetryPolicy};

use self::wire::{
    AddressDto, CartEnvelope, CompletionDto, CustomerEnvelope, OrderEnvelope, OrderListEnvelope,
    ShippingOptionsEnvelope,
};
use super::{
    CartBackend, CartUpdate, CompletionResult, CreateCart, CustomerBackend, CustomerUpdate,
    OrderBackend, OrderPage, OrderQuery,
};
use crate::error::{BackendError, BackendResult};

/// Header carrying the store's publishable API key.
pub const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";

/// What a 404 means for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// The addressed cart, order or customer itself.
    Resource,
    /// A line item, session, code or address inside it.
    SubResource,
}

/// Commerce backend over the Medusa store API.
#[derive(Debug, Clone)]
pub struct MedusaBackend {
    client: FetchClient,
}

impl MedusaBackend {
    /// Backend for `base_url` with the default retry policy.
    pub fn new(base_url: impl Into<String>, publishable_key: Option<&str>) -> Self {
        let mut client = FetchClient::new()
            .with_base_url(base_url)
            .with_retry(RetryPolicy::default());
        if let Some(key) = publishable_key {
            client = client.with_default_header(PUBLISHABLE_KEY_HEADER, key);
        }
        Self { client }
    }

    /// Backend over a preconfigured client.
    pub fn from_client(client: FetchClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: ClientRequestBuilder,
        target: Target,
    ) -> BackendResult<T> {
        let method = request.as_request().method();
        let url = request.as_request().url().to_string();

        let response = request.send().await.map_err(fetch_error)?;
        if !response.is_success() {
            let error = BackendError::from_status(response.status, response.error_message());
            tracing::debug!(%method, %url, status = response.status, kind = %error.kind, "store api error");
            return Err(match target {
                Target::Resource => error,
                Target::SubResource => error.into_stale(),
            });
        }
        response
            .json::<T>()
            .map_err(|e| BackendError::invalid_response(e.to_string()))
    }

    async fn send_cart(&self, request: ClientRequestBuilder, target: Target) -> BackendResult<Cart> {
        self.send::<CartEnvelope>(request, target)
            .await?
            .cart
            .into_cart()
    }

    async fn send_customer(
        &self,
        request: ClientRequestBuilder,
        target: Target,
    ) -> BackendResult<Customer> {
        Ok(self
            .send::<CustomerEnvelope>(request, target)
            .await?
            .customer
            .into_customer())
    }
}

fn fetch_error(err: FetchError) -> BackendError {
    match err {
        FetchError::HttpError { status, message } => BackendError::from_status(status, message),
        FetchError::ParseError(message) | FetchError::JsonError(message) => {
            BackendError::invalid_response(message)
        }
        FetchError::InvalidUrl(message) => BackendError::invalid_request(message),
        other => BackendError::transport(other.to_string()),
    }
}

fn with_body<T: Serialize>(
    request: ClientRequestBuilder,
    body: &T,
) -> BackendResult<ClientRequestBuilder> {
    request
        .json(body)
        .map_err(|e| BackendError::invalid_request(e.to_string()))
}

fn segment(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

fn cart_path(cart_id: &CartId, rest: &str) -> String {
    format!("/store/carts/{}{}", segment(cart_id.as_str()), rest)
}

#[async_trait]
impl CartBackend for MedusaBackend {
    async fn create_cart(&self, input: CreateCart) -> BackendResult<Cart> {
        let request = with_body(self.client.post("/store/carts"), &input)?;
        let cart = self.send_cart(request, Target::Resource).await?;
        tracing::info!(cart_id = %cart.id, region = %cart.region.id, "cart created");
        Ok(cart)
    }

    async fn retrieve_cart(&self, cart_id: &CartId) -> BackendResult<Cart> {
        self.send_cart(self.client.get(cart_path(cart_id, "")), Target::Resource)
            .await
    }

    async fn update_cart(&self, cart_id: &CartId, update: CartUpdate) -> BackendResult<Cart> {
        let request = with_body(self.client.post(cart_path(cart_id, "")), &update)?;
        self.send_cart(request, Target::Resource).await
    }

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> BackendResult<Cart> {
        let request = with_body(
            self.client.post(cart_path(cart_id, "/line-items")),
            &json!({ "variant_id": variant_id, "quantity": quantity }),
        )?;
        self.send_cart(request, Target::Resource).await
    }

    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> BackendResult<Cart> {
        let path = cart_path(
            cart_id,
            &format!("/line-items/{}", segment(line_item_id.as_str())),
        );
        let request = with_body(self.client.post(path), &json!({ "quantity": quantity }))?;
        self.send_cart(request, Target::SubResource).await
    }

    async fn delete_line_item(
        &self,
        cart_id: &CartId,
        line_item_id: &LineItemId,
    ) -> BackendResult<Cart> {
        let path = cart_path(
            cart_id,
            &format!("/line-items/{}", segment(line_item_id.as_str())),
        );
        self.send_cart(self.client.delete(path), Target::SubResource)
            .await
    }

    async fn list_shipping_options(
        &self,
        cart_id: &CartId,
        currency: Currency,
    ) -> BackendResult<Vec<ShippingOption>> {
        let request = self
            .client
            .get("/store/shipping-options")
            .query("cart_id", cart_id.as_str());
        let envelope: ShippingOptionsEnvelope = self.send(request, Target::Resource).await?;
        Ok(envelope
            .shipping_options
            .into_iter()
            .map(|o| o.into_option(currency))
            .collect())
    }

    async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> BackendResult<Cart> {
        let request = with_body(
            self.client.post(cart_path(cart_id, "/shipping-methods")),
            &json!({ "option_id": option_id }),
        )?;
        self.send_cart(request, Target::Resource).await
    }

    async fn add_discount(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart> {
        let request = with_body(
            self.client.post(cart_path(cart_id, "")),
            &json!({ "discounts": [{ "code": code }] }),
        )?;
        self.send_cart(request, Target::Resource).await
    }

    async fn remove_discount(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart> {
        let path = cart_path(cart_id, &format!("/discounts/{}", segment(code)));
        self.send_cart(self.client.delete(path), Target::SubResource)
            .await
    }

    async fn add_gift_card(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart> {
        let request = with_body(
            self.client.post(cart_path(cart_id, "")),
            &json!({ "gift_cards": [{ "code": code }] }),
        )?;
        self.send_cart(request, Target::Resource).await
    }

    async fn remove_gift_card(&self, cart_id: &CartId, code: &str) -> BackendResult<Cart> {
        let path = cart_path(cart_id, &format!("/gift-cards/{}", segment(code)));
        self.send_cart(self.client.delete(path), Target::SubResource)
            .await
    }

    async fn initiate_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> BackendResult<Cart> {
        let request = with_body(
            self.client.post(cart_path(cart_id, "/payment-sessions")),
            &json!({ "provider_id": provider_id }),
        )?;
        self.send_cart(request, Target::Resource).await
    }

    async fn update_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
        data: serde_json::Value,
    ) -> BackendResult<Cart> {
        let path = cart_path(
            cart_id,
            &format!("/payment-sessions/{}", segment(provider_id.as_str())),
        );
        let request = with_body(self.client.post(path), &json!({ "data": data }))?;
        self.send_cart(request, Target::SubResource).await
    }

    async fn refresh_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> BackendResult<Cart> {
        let path = cart_path(
            cart_id,
            &format!("/payment-sessions/{}/refresh", segment(provider_id.as_str())),
        );
        self.send_cart(self.client.post(path), Target::SubResource)
            .await
    }

    async fn select_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &PaymentProviderId,
    ) -> BackendResult<Cart> {
        let request = with_body(
            self.client.post(cart_path(cart_id, "/payment-session")),
            &json!({ "provider_id": provider_id }),
        )?;
        self.send_cart(request, Target::SubResource).await
    }

    async fn complete_cart(&self, cart_id: &CartId) -> BackendResult<CompletionResult> {
        let request = self.client.post(cart_path(cart_id, "/complete"));
        let result = self
            .send::<CompletionDto>(request, Target::Resource)
            .await?
            .into_result()?;
        if let CompletionResult::Order(order) = &result {
            tracing::info!(%cart_id, order_id = %order.id, display_id = order.display_id, "order placed");
        }
        Ok(result)
    }
}

#[async_trait]
impl CustomerBackend for MedusaBackend {
    async fn retrieve_customer(&self, token: &str) -> BackendResult<Customer> {
        let request = self.client.get("/store/customers/me").bearer_auth(token);
        self.send_customer(request, Target::Resource).await
    }

    async fn update_customer(
        &self,
        token: &str,
        update: CustomerUpdate,
    ) -> BackendResult<Customer> {
        let request = with_body(
            self.client.post("/store/customers/me").bearer_auth(token),
            &update,
        )?;
        self.send_customer(request, Target::Resource).await
    }

    async fn create_address(&self, token: &str, address: Address) -> BackendResult<Customer> {
        let request = with_body(
            self.client
                .post("/store/customers/me/addresses")
                .bearer_auth(token),
            &json!({ "address": AddressDto::from(&address) }),
        )?;
        self.send_customer(request, Target::Resource).await
    }

    async fn update_address(
        &self,
        token: &str,
        address_id: &AddressId,
        address: Address,
    ) -> BackendResult<Customer> {
        let path = format!(
            "/store/customers/me/addresses/{}",
            segment(address_id.as_str())
        );
        let request = with_body(
            self.client.post(path).bearer_auth(token),
            &AddressDto::from(&address),
        )?;
        self.send_customer(request, Target::SubResource).await
    }

    async fn delete_address(&self, token: &str, address_id: &AddressId) -> BackendResult<Customer> {
        let path = format!(
            "/store/customers/me/addresses/{}",
            segment(address_id.as_str())
        );
        self.send_customer(self.client.delete(path).bearer_auth(token), Target::SubResource)
            .await
    }
}

#[async_trait]
impl OrderBackend for MedusaBackend {
    async fn retrieve_order(&self, order_id: &OrderId, token: Option<&str>) -> BackendResult<Order> {
        let mut request = self
            .client
            .get(format!("/store/orders/{}", segment(order_id.as_str())));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        self.send::<OrderEnvelope>(request, Target::Resource)
            .await?
            .order
            .into_order()
    }

    async fn list_orders(&self, token: &str, query: &OrderQuery) -> BackendResult<OrderPage> {
        let mut request = self
            .client
            .get("/store/orders")
            .bearer_auth(token)
            .query("limit", query.limit)
            .query("offset", query.offset);
        if let Some(status) = query.status {
            request = request.query("status", status.as_str());
        }
        self.send::<OrderListEnvelope>(request, Target::Resource)
            .await?
            .into_page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendErrorKind;

    #[test]
    fn test_path_segments_are_encoded() {
        let path = cart_path(&CartId::new("cart_01"), &format!("/discounts/{}", segment("LATO 20%")));
        assert_eq!(path, "/store/carts/cart_01/discounts/LATO%2020%25");
    }

    #[test]
    fn test_fetch_errors_map_to_backend_kinds() {
        let err = fetch_error(FetchError::HttpError {
            status: 402,
            message: "Payment required".to_string(),
        });
        assert_eq!(err.kind, BackendErrorKind::PaymentRequired);
        assert_eq!(err.message.as_deref(), Some("Payment required"));

        assert_eq!(fetch_error(FetchError::Timeout).kind, BackendErrorKind::Transport);
        assert_eq!(
            fetch_error(FetchError::ConnectionError("refused".into())).kind,
            BackendErrorKind::Transport
        );
        assert_eq!(
            fetch_error(FetchError::ParseError("bad".into())).kind,
            BackendErrorKind::InvalidResponse
        );
    }

    #[test]
    fn test_publishable_key_is_a_default_header() {
        let backend = MedusaBackend::new("http://localhost:9000", Some("pk_test"));
        let request = backend.client().get("/store/carts/cart_01");
        assert_eq!(
            request.as_request().header_value(PUBLISHABLE_KEY_HEADER),
            Some("pk_test")
        );
        assert_eq!(
            request.as_request().url(),
            "http://localhost:9000/store/carts/cart_01"
        );
    }
}
