//! Order history of the signed-in customer.

use std::sync::Arc;

use storefront_commerce::{Order, OrderId};
use tokio::sync::Mutex;

use crate::backend::{OrderBackend, OrderQuery};
use crate::customer::AuthToken;
use crate::error::{CartError, CartResult};
use crate::messages::{self, Locale};
use crate::status::{Operation, StatusBoard};

#[derive(Debug, Default)]
struct Listing {
    query: OrderQuery,
    orders: Vec<Order>,
    count: u32,
}

/// Paged order list with "load more".
pub struct OrderHistory<B> {
    backend: Arc<B>,
    token: AuthToken,
    locale: Locale,
    listing: Mutex<Listing>,
    status: Arc<StatusBoard>,
}

impl<B: OrderBackend> OrderHistory<B> {
    pub fn new(backend: Arc<B>, token: AuthToken) -> Self {
        Self {
            backend,
            token,
            locale: Locale::default(),
            listing: Mutex::new(Listing::default()),
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

    /// Orders loaded so far.
    pub async fn orders(&self) -> Vec<Order> {
        self.listing.lock().await.orders.clone()
    }

    /// Total number of orders matching the current query.
    pub async fn count(&self) -> u32 {
        self.listing.lock().await.count
    }

    pub async fn has_more(&self) -> bool {
        let listing = self.listing.lock().await;
        (listing.orders.len() as u64) < u64::from(listing.count)
    }

    /// Fetch one order. Guest orders are looked up without a token.
    pub async fn retrieve(&self, order_id: &OrderId) -> CartResult<Order> {
        let op = Operation::RetrieveOrder;
        let flight = self.status.begin(op);
        let token = self.token.get();
        let result = self
            .backend
            .retrieve_order(order_id, token.as_deref())
            .await
            .map_err(CartError::from);
        if let Err(e) = &result {
            tracing::warn!(%order_id, error = %e, "failed to load order");
            flight.fail(messages::describe(e, op, self.locale));
        }
        result
    }

    /// Load the first page of `query`, replacing the held list.
    pub async fn list(&self, query: OrderQuery) -> CartResult<Vec<Order>> {
        let mut listing = self.listing.lock().await;
        let page = self.fetch(&query).await?;
        *listing = Listing {
            query,
            count: page.count,
            orders: page.orders,
        };
        Ok(listing.orders.clone())
    }

    /// Append the next page. Returns the newly loaded orders; empty once
    /// everything has been loaded.
    pub async fn load_more(&self) -> CartResult<Vec<Order>> {
        let mut listing = self.listing.lock().await;
        if listing.orders.len() as u64 >= u64::from(listing.count) {
            return Ok(Vec::new());
        }
        let next = listing.query.next_page();
        let page = self.fetch(&next).await?;
        listing.query = next;
        listing.count = page.count;
        listing.orders.extend(page.orders.iter().cloned());
        Ok(page.orders)
    }

    async fn fetch(&self, query: &OrderQuery) -> CartResult<crate::backend::OrderPage> {
        let op = Operation::ListOrders;
        let flight = self.status.begin(op);
        let result = match self.token.require() {
            Ok(token) => self
                .backend
                .list_orders(&token, query)
                .await
                .map_err(CartError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::warn!(offset = query.offset, error = %e, "failed to list orders");
            flight.fail(messages::describe(e, op, self.locale));
        }
        result
    }
}
