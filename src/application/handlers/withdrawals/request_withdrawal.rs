//! RequestWithdrawalHandler - Command handler for seller withdrawal
//! requests.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, Money, SellerId};
use crate::domain::payments::Withdrawal;
use crate::ports::{BalanceLedger, WithdrawalRepository};

/// Command to request a withdrawal of available balance.
#[derive(Debug, Clone)]
pub struct RequestWithdrawalCommand {
    pub seller_ref: SellerId,
    pub amount: Money,
    /// Bank account or PIX key details, kept opaque.
    pub payout_info: serde_json::Value,
}

/// Handler for creating withdrawal requests.
///
/// Validates the requested amount against the seller's available balance
/// at request time; the balance is computed, never stored on the
/// withdrawal.
pub struct RequestWithdrawalHandler {
    ledger: Arc<dyn BalanceLedger>,
    withdrawals: Arc<dyn WithdrawalRepository>,
}

impl RequestWithdrawalHandler {
    pub fn new(
        ledger: Arc<dyn BalanceLedger>,
        withdrawals: Arc<dyn WithdrawalRepository>,
    ) -> Self {
        Self {
            ledger,
            withdrawals,
        }
    }

    pub async fn handle(
        &self,
        cmd: RequestWithdrawalCommand,
    ) -> Result<Withdrawal, DomainError> {
        let available = self.ledger.available_balance(&cmd.seller_ref).await?;

        if cmd.amount.amount_minor() > available {
            return Err(DomainError::new(
                ErrorCode::InsufficientBalance,
                format!(
                    "requested {} exceeds available balance {}",
                    cmd.amount.amount_minor(),
                    available
                ),
            )
            .with_detail("seller_ref", cmd.seller_ref.to_string()));
        }

        let withdrawal = Withdrawal::new_pending(cmd.seller_ref, cmd.amount, cmd.payout_info);
        self.withdrawals.insert(&withdrawal).await?;

        tracing::info!(
            withdrawal_id = %withdrawal.id,
            seller_ref = %withdrawal.seller_ref,
            amount = withdrawal.amount.amount_minor(),
            "withdrawal requested"
        );

        Ok(withdrawal)
    }
}
