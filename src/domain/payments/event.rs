//! Canonical webhook event model.
//!
//! Provider payloads arrive in incompatible vocabularies; the normalizer
//! maps them into this closed set of canonical kinds so a single
//! transition table can drive behavior for every provider.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SellerId, Timestamp};

use super::errors::WebhookError;

/// Payment provider that originated an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Card processor (Stripe-shaped events).
    Card,
    /// PIX / local processor.
    Pix,
}

impl Provider {
    /// Returns the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Card => "card",
            Provider::Pix => "pix",
        }
    }

    /// Parse a provider from its stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "card" => Some(Provider::Card),
            "pix" => Some(Provider::Pix),
            _ => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical event kinds shared by all providers.
///
/// Unknown provider type strings are preserved verbatim in `Unhandled`
/// so they can be logged for later taxonomy extension, never silently
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PaymentProcessing,
    PaymentSucceeded,
    PaymentFailed,
    PaymentCanceled,
    Refunded,
    DisputeOpened,
    DisputeWon,
    DisputeLost,
    PayoutPaid,
    Unhandled(String),
}

impl EventKind {
    /// Short label for logging.
    pub fn label(&self) -> &str {
        match self {
            EventKind::PaymentProcessing => "payment_processing",
            EventKind::PaymentSucceeded => "payment_succeeded",
            EventKind::PaymentFailed => "payment_failed",
            EventKind::PaymentCanceled => "payment_canceled",
            EventKind::Refunded => "refunded",
            EventKind::DisputeOpened => "dispute_opened",
            EventKind::DisputeWon => "dispute_won",
            EventKind::DisputeLost => "dispute_lost",
            EventKind::PayoutPaid => "payout_paid",
            EventKind::Unhandled(_) => "unhandled",
        }
    }
}

/// A provider webhook mapped into the canonical vocabulary.
///
/// Ephemeral: it lives for one processing pass; only the webhook log
/// retains the raw payload.
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub provider: Provider,
    pub kind: EventKind,

    /// Provider event instance id (or payload hash when absent), the
    /// idempotency ledger key.
    pub event_id: String,

    /// The provider's payment reference, used to correlate with the
    /// persisted payment. Carries the payout reference for payout events.
    pub provider_payment_ref: String,

    pub occurred_at: Timestamp,

    /// The untouched provider payload.
    pub raw_payload: serde_json::Value,
}

impl NormalizedEvent {
    /// Provider error message for failed payments, when present.
    pub fn failure_message(&self) -> Option<String> {
        match self.provider {
            Provider::Card => self.raw_payload["data"]["object"]["last_payment_error"]["message"]
                .as_str()
                .map(String::from),
            Provider::Pix => self.raw_payload["data"]["status_detail"]
                .as_str()
                .map(String::from),
        }
    }

    /// Seller reference and amount for a payout event.
    ///
    /// The normalizer guarantees presence for `PayoutPaid` events; this
    /// re-extracts them for the engine.
    pub fn payout_details(&self) -> Result<(SellerId, i64), WebhookError> {
        let object = &self.raw_payload["data"]["object"];
        let seller = object["metadata"]["seller_id"]
            .as_str()
            .ok_or(WebhookError::MissingField("metadata.seller_id"))?;
        let amount = object["amount"]
            .as_i64()
            .ok_or(WebhookError::MissingField("amount"))?;
        let seller = SellerId::new(seller)
            .map_err(|_| WebhookError::MissingField("metadata.seller_id"))?;
        Ok((seller, amount))
    }
}
