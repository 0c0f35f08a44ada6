//! Withdrawal aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, SellerId, StateMachine, Timestamp, WithdrawalId};

/// Status of a seller withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    /// Parse a status from its stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WithdrawalStatus::Pending),
            "completed" => Some(WithdrawalStatus::Completed),
            "rejected" => Some(WithdrawalStatus::Rejected),
            _ => None,
        }
    }

    /// Returns the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }
}

impl StateMachine for WithdrawalStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use WithdrawalStatus::*;
        matches!((self, target), (Pending, Completed) | (Pending, Rejected))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use WithdrawalStatus::*;
        match self {
            Pending => vec![Completed, Rejected],
            Completed | Rejected => vec![],
        }
    }
}

/// A seller's request to move available balance out.
///
/// The amount is validated against the available balance at request time;
/// the balance itself is computed, not stored on the withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub seller_ref: SellerId,
    pub amount: Money,
    pub status: WithdrawalStatus,

    /// Bank account or PIX key details, kept opaque.
    pub payout_info: serde_json::Value,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Withdrawal {
    /// Creates a new pending withdrawal request.
    pub fn new_pending(seller_ref: SellerId, amount: Money, payout_info: serde_json::Value) -> Self {
        let now = Timestamp::now();
        Self {
            id: WithdrawalId::new(),
            seller_ref,
            amount,
            status: WithdrawalStatus::Pending,
            payout_info,
            created_at: now,
            updated_at: now,
        }
    }
}
