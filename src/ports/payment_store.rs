//! PaymentStore port - Durable repository of payment records.
//!
//! The payment row is the unit of mutual exclusion: updates are
//! conditional on the expected prior status (optimistic concurrency),
//! never a long-held lock. Concurrent appliers of the same transition
//! cannot both succeed against the same prior state.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId, SellerId};
use crate::domain::payments::{Payment, PaymentPatch, PaymentStatus, Provider};

/// Result of a conditional update.
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// The guard matched; the returned record reflects the patch.
    Updated(Payment),
    /// The persisted status no longer matched the expected status.
    Conflict,
}

/// Port for storing and retrieving payments.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a new payment record.
    ///
    /// Exactly one payment may exist per `(provider, provider_payment_ref)`;
    /// implementations enforce this with a unique constraint.
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Looks up a payment by its provider reference.
    async fn find_by_provider_ref(
        &self,
        provider: Provider,
        provider_ref: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Applies a patch only if the persisted status still equals
    /// `expected_status`.
    ///
    /// Returns `UpdateOutcome::Conflict` when another applier won the
    /// race; callers reload and retry once, then treat the event as
    /// stale.
    async fn conditional_update(
        &self,
        id: &PaymentId,
        expected_status: PaymentStatus,
        patch: PaymentPatch,
    ) -> Result<UpdateOutcome, DomainError>;

    /// All payments for a seller, used by the balance recomputation audit.
    async fn list_by_seller(&self, seller: &SellerId) -> Result<Vec<Payment>, DomainError>;
}
