//! BalanceLedger port - Incremental seller balance maintenance.
//!
//! Credits and debits are applied as idempotent keyed increments, not as
//! read-balance-then-write sequences, so concurrent appliers cannot lose
//! updates. The key is `(payment_ref, kind)`; re-applying an existing key
//! reports `AlreadyApplied` and changes nothing.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SellerId};
use crate::domain::payments::AdjustmentKind;

/// Result of applying a keyed adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentOutcome {
    /// The adjustment was recorded.
    Applied,
    /// An adjustment with the same `(payment_ref, kind)` already exists.
    AlreadyApplied,
}

/// Port for the seller balance ledger.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Applies a signed adjustment, keyed on `(payment_ref, kind)`.
    async fn apply_adjustment(
        &self,
        seller_ref: &SellerId,
        payment_ref: &str,
        kind: AdjustmentKind,
        amount_minor: i64,
    ) -> Result<AdjustmentOutcome, DomainError>;

    /// The seller's available balance in minor units: the sum of
    /// availability-relevant adjustments minus pending and completed
    /// withdrawals.
    async fn available_balance(&self, seller_ref: &SellerId) -> Result<i64, DomainError>;

    /// Total paid out to the seller, from the payout ledger.
    async fn withdrawn_total(&self, seller_ref: &SellerId) -> Result<i64, DomainError>;
}
