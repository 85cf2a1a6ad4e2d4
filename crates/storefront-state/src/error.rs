//! Error types for cart state, checkout and the backend seam.

use std::fmt;

use http::StatusCode;
use storefront_commerce::{CheckoutRequirement, CommerceError};
use thiserror::Error;

/// Result type for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Result type for manager and service operations.
pub type CartResult<T> = Result<T, CartError>;

/// Classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    /// The addressed cart, order or customer does not exist.
    NotFound,
    /// A line item, address, discount or payment session id is no longer
    /// present on the backend's current cart.
    StaleReference,
    InvalidRequest,
    Unauthorized,
    PaymentRequired,
    Conflict,
    Server,
    /// No response was received.
    Transport,
    /// The response did not match the expected schema.
    InvalidResponse,
}

impl BackendErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::StaleReference => "stale_reference",
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::PaymentRequired => "payment_required",
            Self::Conflict => "conflict",
            Self::Server => "server",
            Self::Transport => "transport",
            Self::InvalidResponse => "invalid_response",
        }
    }

    /// Classify an HTTP status. 404 maps to [`NotFound`](Self::NotFound);
    /// callers addressing a sub-resource narrow it to `StaleReference`.
    pub fn from_status(status: u16) -> Self {
        match StatusCode::from_u16(status) {
            Ok(StatusCode::NOT_FOUND) => Self::NotFound,
            Ok(StatusCode::UNAUTHORIZED) | Ok(StatusCode::FORBIDDEN) => Self::Unauthorized,
            Ok(StatusCode::PAYMENT_REQUIRED) => Self::PaymentRequired,
            Ok(StatusCode::CONFLICT) => Self::Conflict,
            Ok(code) if code.is_server_error() => Self::Server,
            _ => Self::InvalidRequest,
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call to the commerce backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    /// HTTP status, when the backend answered.
    pub status: Option<u16>,
    /// The backend's own message, surfaced verbatim.
    pub message: Option<String>,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind) -> Self {
        Self {
            kind,
            status: None,
            message: None,
        }
    }

    /// Error for a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::from_status(status))
            .with_status(status)
            .with_message(message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::NotFound)
            .with_status(404)
            .with_message(message)
    }

    pub fn stale(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::StaleReference)
            .with_status(404)
            .with_message(message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidRequest)
            .with_status(400)
            .with_message(message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unauthorized)
            .with_status(401)
            .with_message(message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Conflict)
            .with_status(409)
            .with_message(message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Server)
            .with_status(500)
            .with_message(message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transport).with_message(message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidResponse).with_message(message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = (!message.trim().is_empty()).then_some(message);
        self
    }

    /// Reclassify a 404 on a sub-resource as a stale reference.
    pub fn into_stale(mut self) -> Self {
        if self.kind == BackendErrorKind::NotFound {
            self.kind = BackendErrorKind::StaleReference;
        }
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == BackendErrorKind::NotFound
    }

    pub fn is_stale(&self) -> bool {
        self.kind == BackendErrorKind::StaleReference
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend error ({})", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " [{}]", status)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for BackendError {}

/// Errors surfaced by the cart manager, checkout and account services.
#[derive(Debug, Clone, Error)]
pub enum CartError {
    /// A mutation was attempted with no cart id present.
    #[error("no active cart")]
    NoActiveCart,

    /// Completion attempted while preconditions are unmet. No backend call
    /// was made.
    #[error("checkout is not ready, missing: {}", format_missing(.missing))]
    NotReady { missing: Vec<CheckoutRequirement> },

    /// Quantity rejected before reaching the backend.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Customer operation attempted without an auth token.
    #[error("not authenticated")]
    NotAuthenticated,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Commerce(#[from] CommerceError),
}

impl CartError {
    /// The backend failure, if this error came from the backend.
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            CartError::Backend(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_backend_kind(&self, kind: BackendErrorKind) -> bool {
        self.backend().is_some_and(|e| e.kind == kind)
    }
}

fn format_missing(missing: &[CheckoutRequirement]) -> String {
    missing
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(BackendErrorKind::from_status(404), BackendErrorKind::NotFound);
        assert_eq!(BackendErrorKind::from_status(400), BackendErrorKind::InvalidRequest);
        assert_eq!(BackendErrorKind::from_status(422), BackendErrorKind::InvalidRequest);
        assert_eq!(BackendErrorKind::from_status(401), BackendErrorKind::Unauthorized);
        assert_eq!(BackendErrorKind::from_status(403), BackendErrorKind::Unauthorized);
        assert_eq!(BackendErrorKind::from_status(402), BackendErrorKind::PaymentRequired);
        assert_eq!(BackendErrorKind::from_status(409), BackendErrorKind::Conflict);
        assert_eq!(BackendErrorKind::from_status(503), BackendErrorKind::Server);
    }

    #[test]
    fn test_into_stale_only_narrows_not_found() {
        assert!(BackendError::not_found("gone").into_stale().is_stale());
        let conflict = BackendError::conflict("busy").into_stale();
        assert_eq!(conflict.kind, BackendErrorKind::Conflict);
    }

    #[test]
    fn test_blank_message_is_dropped() {
        let err = BackendError::from_status(500, "   ");
        assert_eq!(err.message, None);
        assert_eq!(err.to_string(), "backend error (server) [500]");
    }

    #[test]
    fn test_not_ready_lists_missing() {
        let err = CartError::NotReady {
            missing: vec![
                CheckoutRequirement::ShippingMethod,
                CheckoutRequirement::PaymentSession,
            ],
        };
        assert_eq!(
            err.to_string(),
            "checkout is not ready, missing: shipping method, payment session"
        );
    }
}
