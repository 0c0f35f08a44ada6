//! WithdrawalRepository port - Seller withdrawal requests.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SellerId, WithdrawalId};
use crate::domain::payments::{Withdrawal, WithdrawalStatus};

/// Port for persisting withdrawal requests.
#[async_trait]
pub trait WithdrawalRepository: Send + Sync {
    /// Inserts a new withdrawal request.
    async fn insert(&self, withdrawal: &Withdrawal) -> Result<(), DomainError>;

    /// Looks up a withdrawal by id.
    async fn find_by_id(&self, id: &WithdrawalId) -> Result<Option<Withdrawal>, DomainError>;

    /// All withdrawals for a seller, used by the balance recomputation
    /// audit and the availability calculation.
    async fn list_by_seller(&self, seller: &SellerId) -> Result<Vec<Withdrawal>, DomainError>;

    /// Transitions a withdrawal, guarded on the expected current status.
    ///
    /// Returns `WithdrawalTerminal` when the stored status does not match
    /// `expected`; terminal withdrawals never transition.
    async fn update_status(
        &self,
        id: &WithdrawalId,
        expected: WithdrawalStatus,
        target: WithdrawalStatus,
    ) -> Result<(), DomainError>;
}
