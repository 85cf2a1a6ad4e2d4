//! Localized user-facing messages.
//!
//! The backend's own message is shown verbatim when present. These strings
//! are the fallback when the backend gave none, or when the failure was
//! local (no cart, checkout not ready).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CartError;
use crate::status::Operation;

/// UI language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Pl,
    En,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::Pl => "pl",
            Locale::En => "en",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s.split(['-', '_']).next().unwrap_or_default();
        match lang.to_ascii_lowercase().as_str() {
            "pl" => Ok(Locale::Pl),
            "en" => Ok(Locale::En),
            _ => Err(format!("unsupported locale: {}", s)),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Fallback message for a failed operation.
pub fn fallback(operation: Operation, locale: Locale) -> &'static str {
    use Operation::*;
    match locale {
        Locale::Pl => match operation {
            InitializeCart | RetrieveCart => "Błąd podczas pobierania koszyka",
            CreateCart => "Błąd podczas tworzenia koszyka",
            UpdateCart => "Błąd podczas aktualizacji koszyka",
            ClearCart => "Błąd podczas czyszczenia koszyka",
            AddItem => "Błąd podczas dodawania produktu do koszyka",
            UpdateItem => "Błąd podczas aktualizacji produktu w koszyku",
            RemoveItem => "Błąd podczas usuwania produktu z koszyka",
            AddDiscount => "Błąd podczas dodawania kodu rabatowego",
            RemoveDiscount => "Błąd podczas usuwania kodu rabatowego",
            AddGiftCard => "Błąd podczas dodawania karty podarunkowej",
            RemoveGiftCard => "Błąd podczas usuwania karty podarunkowej",
            ListShippingOptions => "Błąd podczas pobierania opcji wysyłki",
            AddShippingMethod => "Błąd podczas dodawania metody wysyłki",
            InitiatePaymentSession => "Błąd podczas inicjowania sesji płatności",
            UpdatePaymentSession => "Błąd podczas aktualizacji sesji płatności",
            SelectPaymentSession => "Błąd podczas wyboru sesji płatności",
            RefreshPaymentSession => "Błąd podczas odświeżania sesji płatności",
            CompleteCart => "Błąd podczas finalizacji koszyka",
            RetrieveCustomer => "Błąd podczas pobierania danych klienta",
            UpdateCustomer => "Błąd podczas aktualizacji danych klienta",
            SaveAddress => "Błąd podczas zapisywania adresu",
            DeleteAddress => "Błąd podczas usuwania adresu",
            ListOrders => "Błąd podczas pobierania zamówień",
            RetrieveOrder => "Błąd podczas pobierania zamówienia",
        },
        Locale::En => match operation {
            InitializeCart | RetrieveCart => "Could not load the cart",
            CreateCart => "Could not create a cart",
            UpdateCart => "Could not update the cart",
            ClearCart => "Could not clear the cart",
            AddItem => "Could not add the product to the cart",
            UpdateItem => "Could not update the product in the cart",
            RemoveItem => "Could not remove the product from the cart",
            AddDiscount => "Could not apply the discount code",
            RemoveDiscount => "Could not remove the discount code",
            AddGiftCard => "Could not apply the gift card",
            RemoveGiftCard => "Could not remove the gift card",
            ListShippingOptions => "Could not load shipping options",
            AddShippingMethod => "Could not set the shipping method",
            InitiatePaymentSession => "Could not start the payment session",
            UpdatePaymentSession => "Could not update the payment session",
            SelectPaymentSession => "Could not select the payment method",
            RefreshPaymentSession => "Could not refresh the payment session",
            CompleteCart => "Could not complete the order",
            RetrieveCustomer => "Could not load your account",
            UpdateCustomer => "Could not update your account",
            SaveAddress => "Could not save the address",
            DeleteAddress => "Could not delete the address",
            ListOrders => "Could not load orders",
            RetrieveOrder => "Could not load the order",
        },
    }
}

fn no_active_cart(locale: Locale) -> &'static str {
    match locale {
        Locale::Pl => "Brak aktywnego koszyka",
        Locale::En => "There is no active cart",
    }
}

fn not_ready(locale: Locale) -> &'static str {
    match locale {
        Locale::Pl => "Koszyk nie jest gotowy do finalizacji",
        Locale::En => "The cart is not ready for checkout",
    }
}

fn not_authenticated(locale: Locale) -> &'static str {
    match locale {
        Locale::Pl => "Musisz się zalogować",
        Locale::En => "Please sign in first",
    }
}

/// Message shown when completion returned the cart instead of an order.
pub fn action_required(locale: Locale) -> &'static str {
    match locale {
        Locale::Pl => "Płatność wymaga dodatkowej autoryzacji",
        Locale::En => "The payment requires additional authorization",
    }
}

/// Human-readable message for a failed operation.
pub fn describe(error: &CartError, operation: Operation, locale: Locale) -> String {
    match error {
        CartError::NoActiveCart => no_active_cart(locale).to_string(),
        CartError::NotReady { .. } => not_ready(locale).to_string(),
        CartError::NotAuthenticated => not_authenticated(locale).to_string(),
        CartError::Backend(e) => e
            .message
            .clone()
            .unwrap_or_else(|| fallback(operation, locale).to_string()),
        CartError::InvalidQuantity(_) | CartError::Commerce(_) => {
            fallback(operation, locale).to_string()
        }
    }
}
