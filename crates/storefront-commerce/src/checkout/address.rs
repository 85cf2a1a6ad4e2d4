//! Address types.

use serde::{Deserialize, Serialize};

use crate::ids::AddressId;

/// A postal address as the commerce backend stores it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    /// Address ID (None for addresses not saved to a customer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AddressId>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Street and number.
    pub address_1: String,
    /// Apartment, suite, etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2, lowercase (e.g., "pl").
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Address {
    /// Create a new address with the required fields.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        address_1: impl Into<String>,
        city: impl Into<String>,
        country_code: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            address_1: address_1.into(),
            city: city.into(),
            country_code: country_code.into().to_ascii_lowercase(),
            postal_code: postal_code.into(),
            ..Self::default()
        }
    }

    /// Get full name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Format as single line.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.address_1.clone()];
        if let Some(ref addr2) = self.address_2 {
            parts.push(addr2.clone());
        }
        parts.push(format!("{} {}", self.postal_code, self.city));
        if let Some(ref province) = self.province {
            parts.push(province.clone());
        }
        parts.push(self.country_code.to_ascii_uppercase());
        parts.join(", ")
    }

    /// Format as multi-line, postal code before city.
    pub fn multi_line(&self) -> String {
        let mut lines = vec![self.full_name()];
        if let Some(ref company) = self.company {
            lines.push(company.clone());
        }
        lines.push(self.address_1.clone());
        if let Some(ref addr2) = self.address_2 {
            lines.push(addr2.clone());
        }
        lines.push(format!("{} {}", self.postal_code, self.city));
        lines.push(self.country_code.to_ascii_uppercase());
        lines.join("\n")
    }

    /// Check that every field a carrier needs is filled in.
    pub fn is_complete(&self) -> bool {
        !self.first_name.trim().is_empty()
            && !self.last_name.trim().is_empty()
            && !self.address_1.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.country_code.trim().is_empty()
            && !self.postal_code.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Address {
        Address::new("Jan", "Kowalski", "ul. Mariacka 12", "Kraków", "PL", "31-042")
    }

    #[test]
    fn test_address_creation() {
        let addr = sample();
        assert_eq!(addr.full_name(), "Jan Kowalski");
        assert_eq!(addr.country_code, "pl");
        assert!(addr.is_complete());
    }

    #[test]
    fn test_address_formatting() {
        let mut addr = sample();
        addr.address_2 = Some("m. 4".to_string());
        assert_eq!(addr.one_line(), "ul. Mariacka 12, m. 4, 31-042 Kraków, PL");
        assert!(addr.multi_line().starts_with("Jan Kowalski\n"));
    }

    #[test]
    fn test_blank_fields_are_incomplete() {
        let mut addr = sample();
        addr.postal_code = "  ".to_string();
        assert!(!addr.is_complete());
    }
}
