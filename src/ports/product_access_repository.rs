//! ProductAccessRepository port - Buyer entitlements.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId};
use crate::domain::payments::ProductAccess;

/// Port for granting and revoking product entitlements.
///
/// Both mutations are idempotent per payment: the dispatcher may re-run
/// them after a partial failure.
#[async_trait]
pub trait ProductAccessRepository: Send + Sync {
    /// Grants (or re-activates) the entitlement for a payment.
    async fn grant(&self, access: &ProductAccess) -> Result<(), DomainError>;

    /// Sets the entitlement for a payment to inactive. A payment with no
    /// entitlement is a no-op.
    async fn revoke_by_payment(&self, payment_id: &PaymentId) -> Result<(), DomainError>;

    /// Looks up the entitlement created by a payment.
    async fn find_by_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<ProductAccess>, DomainError>;
}
