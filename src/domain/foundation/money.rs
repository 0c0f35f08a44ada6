//! Money value object in integer minor units.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// ISO currency supported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Brl,
    Usd,
    Eur,
}

impl Currency {
    /// Parse a currency from its ISO code (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.to_uppercase().as_str() {
            "BRL" => Ok(Currency::Brl),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(ValidationError::invalid_format(
                "currency",
                format!("unknown currency code: {}", other),
            )),
        }
    }

    /// Returns the ISO code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Brl => "BRL",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A positive monetary amount in minor units (cents / centavos).
///
/// Payments and withdrawals always carry positive amounts; signed values
/// only appear in balance adjustments, which use raw `i64` minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates a monetary amount, rejecting zero and negative values.
    pub fn new(amount_minor: i64, currency: Currency) -> Result<Self, ValidationError> {
        if amount_minor <= 0 {
            return Err(ValidationError::not_positive("amount", amount_minor));
        }
        Ok(Self {
            amount_minor,
            currency,
        })
    }

    /// Returns the amount in minor units.
    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount_minor, self.currency)
    }
}
