//! Postal address used for shipping and billing.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default country pre-filled at checkout.
pub const DEFAULT_COUNTRY: &str = "France";

/// A required address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressField {
    Name,
    Street,
    City,
    PostalCode,
    Country,
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Street => "street",
            Self::City => "city",
            Self::PostalCode => "postal_code",
            Self::Country => "country",
        })
    }
}

/// Address validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// A required field is empty or whitespace.
    #[error("address field `{0}` is required")]
    MissingField(AddressField),
}

/// A shipping or billing address, stored as JSON on the order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Create an address with every field set.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            street: street.into(),
            city: city.into(),
            postal_code: postal_code.into(),
            country: country.into(),
        }
    }

    /// Check that every field is filled in.
    ///
    /// # Errors
    ///
    /// Returns the first empty field, in form order.
    pub fn validate(&self) -> Result<(), AddressError> {
        let fields = [
            (AddressField::Name, &self.name),
            (AddressField::Street, &self.street),
            (AddressField::City, &self.city),
            (AddressField::PostalCode, &self.postal_code),
            (AddressField::Country, &self.country),
        ];

        match fields.into_iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(AddressError::MissingField(field)),
            None => Ok(()),
        }
    }
}

impl Default for Address {
    fn default() -> Self {
        Self {
            name: String::new(),
            street: String::new(),
            city: String::new(),
            postal_code: String::new(),
            country: DEFAULT_COUNTRY.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_address_is_valid() {
        let address = Address::new("SARL Dupont", "12 rue Volta", "Lyon", "69003", "France");
        assert_eq!(address.validate(), Ok(()));
    }

    #[test]
    fn test_default_prefills_country_only() {
        let address = Address::default();
        assert_eq!(address.country, "France");
        assert_eq!(
            address.validate(),
            Err(AddressError::MissingField(AddressField::Name))
        );
    }

    #[test]
    fn test_whitespace_counts_as_missing() {
        let address = Address::new("SARL Dupont", "12 rue Volta", "  ", "69003", "France");
        assert_eq!(
            address.validate(),
            Err(AddressError::MissingField(AddressField::City))
        );
    }
}
