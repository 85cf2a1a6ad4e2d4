//! Payment session types.

use serde::{Deserialize, Serialize};

use crate::ids::{PaymentProviderId, PaymentSessionId};
use crate::money::Money;

/// Provider-side state of a payment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSessionStatus {
    Authorized,
    #[default]
    Pending,
    /// The provider needs the customer to act (3-D Secure, redirect).
    RequiresMore,
    Error,
    Canceled,
}

impl PaymentSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSessionStatus::Authorized => "authorized",
            PaymentSessionStatus::Pending => "pending",
            PaymentSessionStatus::RequiresMore => "requires_more",
            PaymentSessionStatus::Error => "error",
            PaymentSessionStatus::Canceled => "canceled",
        }
    }
}

/// One provider's payment authorization context on a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentSession {
    pub id: PaymentSessionId,
    /// Provider (e.g., "pp_stripe_stripe").
    pub provider_id: PaymentProviderId,
    /// At most one session per cart is selected.
    pub is_selected: bool,
    pub is_initiated: bool,
    pub status: PaymentSessionStatus,
    /// Amount the session was created for.
    pub amount: Money,
    /// Opaque provider data (client secrets, redirect urls).
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PaymentSession {
    pub fn is_authorized(&self) -> bool {
        self.status == PaymentSessionStatus::Authorized
    }

    /// Whether the customer must do something before the session can be
    /// authorized.
    pub fn requires_action(&self) -> bool {
        self.status == PaymentSessionStatus::RequiresMore
    }
}
