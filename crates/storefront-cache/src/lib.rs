//! Typed key-value persistence for the storefront.
//!
//! The storefront only persists small identifiers between sessions: the cart
//! id and the customer's auth token. This crate provides the store seam
//! ([`KeyValueStore`]), a JSON-typed wrapper over it ([`Cache`]), and
//! expiring cookie slots ([`Cookie`]) built on top.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use storefront_cache::{Cache, Cookie, CookieOptions, MemoryStore};
//!
//! let cache = Cache::new(Arc::new(MemoryStore::new()));
//! let cart_cookie: Cookie<String> =
//!     Cookie::new(cache, "cart_id", CookieOptions::days(30)).unwrap();
//!
//! cart_cookie.set(&"cart_01".to_string()).unwrap();
//! assert_eq!(cart_cookie.get().unwrap().as_deref(), Some("cart_01"));
//!
//! cart_cookie.clear().unwrap();
//! assert!(cart_cookie.get().unwrap().is_none());
//! ```

mod cookie;
mod error;
mod kv;

pub use cookie::{Cookie, CookieOptions, SameSite};
pub use error::CacheError;
pub use kv::{Cache, FileStore, KeyValueStore, MemoryStore};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Cache, CacheError, Cookie, CookieOptions, KeyValueStore, MemoryStore};
}
