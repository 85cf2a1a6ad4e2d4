//! Cart state and checkout orchestration for the candle storefront.
//!
//! The commerce backend owns the cart. This crate keeps a local snapshot of
//! it, serializes every mutation through a per-session queue, and exposes
//! derived views (item count, totals, checkout stage) plus loading and error
//! flags per operation group.
//!
//! - [`CartManager`]: the cart snapshot and every cart mutation
//! - [`Checkout`]: checkout sequencing and order completion
//! - [`CustomerAccount`] and [`OrderHistory`]: signed-in customer data
//! - [`backend`]: the backend seam with a Medusa client and an in-memory fake
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use storefront_state::prelude::*;
//!
//! # tokio_test_block(async {
//! let backend = Arc::new(InMemoryBackend::new().with_variant("variant_cedar", "Cedr i wanilia", 4999));
//! let cart = CartManager::new(backend, "reg_pl");
//!
//! cart.add_or_update_item(&VariantId::new("variant_cedar"), 2).await.unwrap();
//!
//! assert_eq!(cart.item_count(), 2);
//! assert_eq!(cart.stage(), CheckoutStage::Building);
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

pub mod backend;
pub mod checkout;
pub mod config;
pub mod customer;
pub mod error;
pub mod manager;
pub mod messages;
pub mod orders;
pub mod status;

use std::sync::Arc;

use storefront_cache::{Cache, Cookie};
use storefront_commerce::{Cart, Customer};

pub use backend::{CommerceBackend, InMemoryBackend, MedusaBackend};
pub use checkout::{Checkout, CheckoutOutcome, CheckoutPhase};
pub use config::{ConfigError, StorefrontConfig};
pub use customer::{AuthToken, CustomerAccount};
pub use error::{BackendError, BackendErrorKind, BackendResult, CartError, CartResult};
pub use manager::CartManager;
pub use messages::Locale;
pub use orders::OrderHistory;
pub use status::{Operation, OperationGroup, OperationStatus, StatusBoard, StatusSnapshot};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::backend::{
        CartBackend, CartUpdate, CommerceBackend, CompletionResult, CreateCart, CustomerBackend,
        CustomerUpdate, InMemoryBackend, MedusaBackend, OrderBackend, OrderQuery,
    };
    pub use crate::checkout::{Checkout, CheckoutOutcome, CheckoutPhase};
    pub use crate::config::StorefrontConfig;
    pub use crate::customer::{AuthToken, CustomerAccount};
    pub use crate::error::{BackendError, BackendErrorKind, CartError, CartResult};
    pub use crate::manager::CartManager;
    pub use crate::messages::Locale;
    pub use crate::orders::OrderHistory;
    pub use crate::status::{OperationGroup, StatusBoard};
    pub use crate::Storefront;
    pub use storefront_commerce::prelude::*;
}

/// Everything one storefront session needs, sharing one backend, one
/// status board and one persistence store.
pub struct Storefront<B> {
    pub cart: Arc<CartManager<B>>,
    pub checkout: Checkout<B>,
    pub customer: CustomerAccount<B>,
    pub orders: OrderHistory<B>,
    status: Arc<StatusBoard>,
}

impl<B: CommerceBackend> Storefront<B> {
    /// Wire a session over `backend`, persisting identifiers in `cache`.
    pub fn new(backend: Arc<B>, config: &StorefrontConfig, cache: Cache) -> Result<Self, ConfigError> {
        let cookies = &config.cookies;
        let cart_cookie = Cookie::new(cache.clone(), cookies.cart_cookie.as_str(), cookies.cart_options())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let auth_cookie = Cookie::new(cache, cookies.auth_cookie.as_str(), cookies.auth_options())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let token = AuthToken::new(auth_cookie);
        let locale = config.store.locale;
        let status = Arc::new(StatusBoard::new());

        let cart = Arc::new(
            CartManager::new(Arc::clone(&backend), config.region_id())
                .with_cookie(cart_cookie)
                .with_locale(locale)
                .with_status_board(Arc::clone(&status)),
        );
        let checkout = Checkout::new(Arc::clone(&cart));
        let customer = CustomerAccount::new(Arc::clone(&backend), token.clone())
            .with_locale(locale)
            .with_status_board(Arc::clone(&status));
        let orders = OrderHistory::new(backend, token)
            .with_locale(locale)
            .with_status_board(Arc::clone(&status));

        Ok(Self {
            cart,
            checkout,
            customer,
            orders,
            status,
        })
    }

    pub fn status(&self) -> &Arc<StatusBoard> {
        &self.status
    }

    /// Restore the persisted cart, if any.
    pub async fn initialize(&self) -> CartResult<Option<Cart>> {
        self.cart.initialize().await
    }

    /// Load the signed-in customer and link the current cart to them.
    pub async fn attach_customer(&self) -> CartResult<Customer> {
        let customer = self.customer.retrieve().await?;
        if self.cart.cart().is_some_and(|c| c.customer_id.as_ref() != Some(&customer.id)) {
            self.cart.assign_customer(customer.id.clone()).await?;
        }
        Ok(customer)
    }
}

impl Storefront<MedusaBackend> {
    /// Validate `config` and connect to its Medusa backend.
    pub fn connect(config: &StorefrontConfig, cache: Cache) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::debug!(url = %config.backend.url, region = %config.store.region_id, "connecting storefront");
        Self::new(Arc::new(config.medusa_backend()), config, cache)
    }
}
