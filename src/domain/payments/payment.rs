//! Payment aggregate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CustomerId, Money, PaymentId, ProductId, SellerId, Timestamp};

use super::event::Provider;
use super::status::PaymentStatus;

/// One attempted or completed monetary transaction.
///
/// Created in `pending` by the checkout flow; mutated only by the state
/// transition engine in response to normalized provider events; never
/// hard-deleted (terminal states are retained for audit). Exactly one
/// payment exists per `(provider, provider_payment_ref)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Internal immutable identifier.
    pub id: PaymentId,

    /// Which provider processes this payment.
    pub provider: Provider,

    /// The provider's identifier, unique per provider.
    pub provider_payment_ref: String,

    /// Charged amount.
    pub amount: Money,

    /// Current lifecycle status.
    pub status: PaymentStatus,

    /// The buying customer.
    pub customer_ref: CustomerId,

    /// The purchased product.
    pub product_ref: ProductId,

    /// The seller credited on completion.
    pub seller_ref: SellerId,

    /// Denormalized customer/product/offer fields needed for notifications
    /// (e.g. `customer_email`, `seller_email`, `product_name`).
    pub metadata: HashMap<String, String>,

    pub created_at: Timestamp,

    /// Monotonically non-decreasing; bumped on every applied transition.
    pub updated_at: Timestamp,
}

impl Payment {
    /// Creates a new pending payment, as the checkout flow would.
    #[allow(clippy::too_many_arguments)]
    pub fn new_pending(
        provider: Provider,
        provider_payment_ref: impl Into<String>,
        amount: Money,
        customer_ref: CustomerId,
        product_ref: ProductId,
        seller_ref: SellerId,
        metadata: HashMap<String, String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: PaymentId::new(),
            provider,
            provider_payment_ref: provider_payment_ref.into(),
            amount,
            status: PaymentStatus::Pending,
            customer_ref,
            product_ref,
            seller_ref,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Looks up a metadata field.
    pub fn metadata_field(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Notification recipient for the buyer, falling back to the customer
    /// reference when no email was denormalized.
    pub fn buyer_recipient(&self) -> String {
        self.metadata_field("customer_email")
            .unwrap_or(self.customer_ref.as_str())
            .to_string()
    }

    /// Notification recipient for the seller, falling back to the seller
    /// reference when no email was denormalized.
    pub fn seller_recipient(&self) -> String {
        self.metadata_field("seller_email")
            .unwrap_or(self.seller_ref.as_str())
            .to_string()
    }
}

/// Fields written by a state transition.
#[derive(Debug, Clone)]
pub struct PaymentPatch {
    pub status: PaymentStatus,
    pub updated_at: Timestamp,
}
