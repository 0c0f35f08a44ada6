//! Payment lifecycle status.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Status of a payment through its lifecycle.
///
/// `completed` is terminal for the normal flow but can re-enter via the
/// dispute cycle: a dispute holds it at `disputed`, and resolution moves
/// it back to `completed` (won) or to `refunded` (lost).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment attempt initiated, awaiting provider confirmation.
    Pending,
    /// Provider acknowledged and is processing.
    Processing,
    /// Funds captured.
    Completed,
    /// Provider reported failure.
    Failed,
    /// Canceled before capture.
    Canceled,
    /// Funds returned to the buyer.
    Refunded,
    /// Buyer opened a chargeback; funds held.
    Disputed,
}

impl PaymentStatus {
    /// Parse a status from its stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "processing" => Some(PaymentStatus::Processing),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "canceled" => Some(PaymentStatus::Canceled),
            "refunded" => Some(PaymentStatus::Refunded),
            "disputed" => Some(PaymentStatus::Disputed),
            _ => None,
        }
    }

    /// Returns the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Disputed => "disputed",
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Failed)
                | (Pending, Canceled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Canceled)
                | (Completed, Refunded)
                | (Completed, Disputed)
                | (Disputed, Completed)
                | (Disputed, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Processing, Completed, Failed, Canceled],
            Processing => vec![Completed, Failed, Canceled],
            Completed => vec![Refunded, Disputed],
            Disputed => vec![Completed, Refunded],
            Failed | Canceled | Refunded => vec![],
        }
    }
}
