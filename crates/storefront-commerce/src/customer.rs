//! Customer account types.

use serde::{Deserialize, Serialize};

use crate::checkout::Address;
use crate::ids::{AddressId, CustomerId};

/// A registered customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    /// False for guest records created by checkout.
    pub has_account: bool,
    /// Saved address book.
    pub addresses: Vec<Address>,
}

impl Customer {
    /// "First Last", falling back to the email.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self.email.clone(),
        }
    }

    pub fn address(&self, id: &AddressId) -> Option<&Address> {
        self.addresses.iter().find(|a| a.id.as_ref() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut customer = Customer {
            id: CustomerId::new("cus_1"),
            email: "ewa@example.com".to_string(),
            first_name: None,
            last_name: None,
            phone: None,
            has_account: true,
            addresses: Vec::new(),
        };
        assert_eq!(customer.display_name(), "ewa@example.com");
        customer.first_name = Some("Ewa".to_string());
        customer.last_name = Some("Zając".to_string());
        assert_eq!(customer.display_name(), "Ewa Zając");
    }
}
