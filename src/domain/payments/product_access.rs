//! Product access entitlement.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CustomerId, PaymentId, ProductId, Timestamp};

/// Whether an entitlement is currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    Active,
    Inactive,
}

impl AccessStatus {
    /// Parse a status from its stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccessStatus::Active),
            "inactive" => Some(AccessStatus::Inactive),
            _ => None,
        }
    }

    /// Returns the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessStatus::Active => "active",
            AccessStatus::Inactive => "inactive",
        }
    }
}

/// A buyer's entitlement to a product, granted on payment completion and
/// revoked on refund or lost dispute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAccess {
    pub user_ref: CustomerId,
    pub product_ref: ProductId,
    pub payment_ref: PaymentId,
    pub status: AccessStatus,
    pub granted_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProductAccess {
    /// Creates an active entitlement for a completed payment.
    pub fn granted(user_ref: CustomerId, product_ref: ProductId, payment_ref: PaymentId) -> Self {
        let now = Timestamp::now();
        Self {
            user_ref,
            product_ref,
            payment_ref,
            status: AccessStatus::Active,
            granted_at: now,
            updated_at: now,
        }
    }
}
