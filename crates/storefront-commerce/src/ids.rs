//! Newtype IDs for type-safe identifiers.
//!
//! Using newtypes prevents accidentally mixing up different ID types,
//! e.g., passing a LineItemId where a VariantId is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate newtype ID structs.
///
/// The prefix is only used by `generate()`; IDs issued by the backend are
/// accepted verbatim.
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        /// A unique identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new unique ID.
            pub fn generate() -> Self {
                Self(generate_id($prefix))
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(CartId, "cart");
define_id!(LineItemId, "item");
define_id!(VariantId, "variant");
define_id!(ProductId, "prod");
define_id!(RegionId, "reg");
define_id!(CustomerId, "cus");
define_id!(AddressId, "addr");
define_id!(ShippingOptionId, "so");
define_id!(ShippingMethodId, "sm");
define_id!(PaymentProviderId, "pp");
define_id!(PaymentSessionId, "ps");
define_id!(OrderId, "order");

/// Generate a prefixed, URL-safe random ID (e.g. `cart_01hv3k...`).
fn generate_id(prefix: &str) -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(26)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{}_{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let id = CartId::new("cart_123");
        assert_eq!(id.as_str(), "cart_123");
    }

    #[test]
    fn test_id_generation_is_prefixed_and_unique() {
        let id1 = CartId::generate();
        let id2 = CartId::generate();
        assert!(id1.as_str().starts_with("cart_"));
        assert_eq!(id1.as_str().len(), "cart_".len() + 26);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_id_from_string() {
        let id: VariantId = "variant_wax_rose".into();
        assert_eq!(id.as_str(), "variant_wax_rose");
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = LineItemId::new("item_1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""item_1""#);
        let back: LineItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
