//! Signed-in customer account.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use storefront_cache::Cookie;
use storefront_commerce::{Address, AddressId, Customer};

use crate::backend::{CustomerBackend, CustomerUpdate};
use crate::error::{BackendErrorKind, BackendResult, CartError, CartResult};
use crate::messages::{self, Locale};
use crate::status::{Operation, StatusBoard};

/// Reads the bearer token from the auth cookie. Issuing and refreshing the
/// token is up to the authentication flow.
#[derive(Debug, Clone)]
pub struct AuthToken {
    cookie: Cookie<String>,
}

impl AuthToken {
    pub fn new(cookie: Cookie<String>) -> Self {
        Self { cookie }
    }

    /// The current token; unreadable cookies count as signed out.
    pub fn get(&self) -> Option<String> {
        match self.cookie.get() {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(cookie = self.cookie.name(), error = %e, "failed to read auth cookie");
                None
            }
        }
    }

    pub fn require(&self) -> CartResult<String> {
        self.get().ok_or(CartError::NotAuthenticated)
    }

    pub fn set(&self, token: &str) {
        if let Err(e) = self.cookie.set(&token.to_string()) {
            tracing::warn!(cookie = self.cookie.name(), error = %e, "failed to store auth token");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.cookie.clear() {
            tracing::warn!(cookie = self.cookie.name(), error = %e, "failed to clear auth token");
        }
    }
}

/// Customer profile and address book.
pub struct CustomerAccount<B> {
    backend: Arc<B>,
    token: AuthToken,
    locale: Locale,
    customer: RwLock<Option<Customer>>,
    status: Arc<StatusBoard>,
}

impl<B: CustomerBackend> CustomerAccount<B> {
    pub fn new(backend: Arc<B>, token: AuthToken) -> Self {
        Self {
            backend,
            token,
            locale: Locale::default(),
            customer: RwLock::new(None),
            status: Arc::new(StatusBoard::new()),
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_status_board(mut self, status: Arc<StatusBoard>) -> Self {
        self.status = status;
        self
    }

    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.get().is_some()
    }

    /// The last customer record fetched or returned by an update.
    pub fn customer(&self) -> Option<Customer> {
        self.customer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn retrieve(&self) -> CartResult<Customer> {
        self.call(Operation::RetrieveCustomer, |backend, token| async move {
            backend.retrieve_customer(&token).await
        })
        .await
    }

    pub async fn update(&self, update: CustomerUpdate) -> CartResult<Customer> {
        self.call(Operation::UpdateCustomer, |backend, token| async move {
            backend.update_customer(&token, update).await
        })
        .await
    }

    pub async fn create_address(&self, address: Address) -> CartResult<Customer> {
        self.call(Operation::SaveAddress, |backend, token| async move {
            backend.create_address(&token, address).await
        })
        .await
    }

    pub async fn update_address(&self, address_id: &AddressId, address: Address) -> CartResult<Customer> {
        self.call(Operation::SaveAddress, |backend, token| async move {
            backend.update_address(&token, address_id, address).await
        })
        .await
    }

    pub async fn delete_address(&self, address_id: &AddressId) -> CartResult<Customer> {
        self.call(Operation::DeleteAddress, |backend, token| async move {
            backend.delete_address(&token, address_id).await
        })
        .await
    }

    /// Drop the cached customer and the token.
    pub fn sign_out(&self) {
        self.token.clear();
        self.set_customer(None);
    }

    async fn call<F, Fut>(&self, op: Operation, f: F) -> CartResult<Customer>
    where
        F: FnOnce(Arc<B>, String) -> Fut,
        Fut: Future<Output = BackendResult<Customer>>,
    {
        let flight = self.status.begin(op);
        let result = match self.token.require() {
            Ok(token) => f(Arc::clone(&self.backend), token).await.map_err(CartError::from),
            Err(e) => Err(e),
        };

        match &result {
            Ok(customer) => self.set_customer(Some(customer.clone())),
            Err(e) => {
                // A rejected token is useless from here on.
                if e.is_backend_kind(BackendErrorKind::Unauthorized) {
                    tracing::info!("auth token rejected, signing out");
                    self.sign_out();
                }
                tracing::warn!(operation = %op, error = %e, "customer operation failed");
                flight.fail(messages::describe(e, op, self.locale));
            }
        }
        result
    }

    fn set_customer(&self, customer: Option<Customer>) {
        *self.customer.write().unwrap_or_else(PoisonError::into_inner) = customer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendOp, InMemoryBackend};
    use crate::status::OperationGroup;
    use storefront_cache::{Cache, CookieOptions};
    use storefront_commerce::CustomerId;

    fn customer() -> Customer {
        Customer {
            id: CustomerId::new("cus_01"),
            email: "ola@example.com".to_string(),
            first_name: Some("Ola".to_string()),
            last_name: None,
            phone: None,
            has_account: true,
            addresses: Vec::new(),
        }
    }

    fn account(token: Option<&str>) -> (Arc<InMemoryBackend>, CustomerAccount<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new().with_customer("jwt_ola", customer()));
        let cookie = Cookie::new(Cache::in_memory(), "medusa_jwt", CookieOptions::days(7)).unwrap();
        let token_slot = AuthToken::new(cookie);
        if let Some(token) = token {
            token_slot.set(token);
        }
        (backend.clone(), CustomerAccount::new(backend, token_slot))
    }

    #[tokio::test]
    async fn test_signed_out_never_calls_backend() {
        let (backend, account) = account(None);
        let err = account.retrieve().await.unwrap_err();
        assert!(matches!(err, CartError::NotAuthenticated));
        assert_eq!(backend.total_calls(), 0);
        assert_eq!(
            account.status.get(OperationGroup::Customer).error.as_deref(),
            Some("Musisz się zalogować")
        );
    }

    #[tokio::test]
    async fn test_address_book_round_trip() {
        let (backend, account) = account(Some("jwt_ola"));
        let address = Address::new("Ola", "Nowak", "Długa 1", "Kraków", "PL", "30-001");

        let customer = account.create_address(address).await.unwrap();
        let address_id = customer.addresses[0].id.clone().unwrap();
        assert_eq!(customer.addresses[0].country_code, "pl");

        let customer = account.delete_address(&address_id).await.unwrap();
        assert!(customer.addresses.is_empty());
        assert_eq!(account.customer(), Some(customer));
        assert_eq!(backend.calls(BackendOp::CreateAddress), 1);
    }

    #[tokio::test]
    async fn test_rejected_token_signs_out() {
        let (_backend, account) = account(Some("jwt_expired"));
        let err = account.retrieve().await.unwrap_err();
        assert!(err.is_backend_kind(BackendErrorKind::Unauthorized));
        assert!(!account.is_authenticated());
    }
}
