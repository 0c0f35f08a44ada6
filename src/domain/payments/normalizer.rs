//! Event normalizer.
//!
//! Maps each provider's native webhook payload into a [`NormalizedEvent`]
//! carrying one canonical [`EventKind`]. Pure function, no I/O: the HTTP
//! layer verifies authenticity before calling in, and the idempotency
//! ledger runs after.

use chrono::DateTime;
use sha2::{Digest, Sha256};

use crate::domain::foundation::Timestamp;

use super::errors::WebhookError;
use super::event::{EventKind, NormalizedEvent, Provider};

/// Normalizes a verified provider payload into the canonical vocabulary.
///
/// Unknown event-type strings surface as `EventKind::Unhandled` with the
/// original string preserved; a payload missing its payment correlation
/// reference is a normalization error so the HTTP layer returns a client
/// error and the provider retries.
pub fn normalize(
    provider: Provider,
    payload: &serde_json::Value,
) -> Result<NormalizedEvent, WebhookError> {
    match provider {
        Provider::Card => normalize_card(payload),
        Provider::Pix => normalize_pix(payload),
    }
}

fn normalize_card(payload: &serde_json::Value) -> Result<NormalizedEvent, WebhookError> {
    let event_type = payload["type"]
        .as_str()
        .ok_or(WebhookError::MissingField("type"))?;
    let object = &payload["data"]["object"];

    let kind = match event_type {
        "payment_intent.succeeded" => EventKind::PaymentSucceeded,
        "payment_intent.payment_failed" => EventKind::PaymentFailed,
        "payment_intent.canceled" => EventKind::PaymentCanceled,
        "payment_intent.processing" => EventKind::PaymentProcessing,
        "charge.refunded" => EventKind::Refunded,
        "charge.dispute.created" => EventKind::DisputeOpened,
        "charge.dispute.closed" => {
            // Binary won/lost mapping; any non-won closure counts as lost.
            if object["status"].as_str() == Some("won") {
                EventKind::DisputeWon
            } else {
                EventKind::DisputeLost
            }
        }
        "payout.paid" => EventKind::PayoutPaid,
        other => EventKind::Unhandled(other.to_string()),
    };

    let provider_payment_ref = match kind {
        // Intent events carry the reference as the object id.
        EventKind::PaymentSucceeded
        | EventKind::PaymentFailed
        | EventKind::PaymentCanceled
        | EventKind::PaymentProcessing => object["id"]
            .as_str()
            .ok_or(WebhookError::MissingField("data.object.id"))?
            .to_string(),

        // Charge-level events reference their parent intent.
        EventKind::Refunded
        | EventKind::DisputeOpened
        | EventKind::DisputeWon
        | EventKind::DisputeLost => object["payment_intent"]
            .as_str()
            .ok_or(WebhookError::MissingField("data.object.payment_intent"))?
            .to_string(),

        EventKind::PayoutPaid => {
            // Payouts correlate to the seller, not a payment; require the
            // fields the balance update needs.
            object["metadata"]["seller_id"]
                .as_str()
                .ok_or(WebhookError::MissingField("metadata.seller_id"))?;
            object["amount"]
                .as_i64()
                .ok_or(WebhookError::MissingField("amount"))?;
            object["id"]
                .as_str()
                .ok_or(WebhookError::MissingField("data.object.id"))?
                .to_string()
        }

        EventKind::Unhandled(_) => object["id"].as_str().unwrap_or_default().to_string(),
    };

    let occurred_at = payload["created"]
        .as_i64()
        .map(Timestamp::from_unix_secs)
        .unwrap_or_else(Timestamp::now);

    Ok(NormalizedEvent {
        provider: Provider::Card,
        kind,
        event_id: event_id_or_hash(payload),
        provider_payment_ref,
        occurred_at,
        raw_payload: payload.clone(),
    })
}

fn normalize_pix(payload: &serde_json::Value) -> Result<NormalizedEvent, WebhookError> {
    let event_type = payload["event"]
        .as_str()
        .ok_or(WebhookError::MissingField("event"))?;
    let data = &payload["data"];

    let kind = match event_type {
        "payment.created" => EventKind::PaymentProcessing,
        "payment.updated" => match data["status"].as_str() {
            Some("paid") | Some("approved") => EventKind::PaymentSucceeded,
            Some("failed") | Some("declined") | Some("rejected") => EventKind::PaymentFailed,
            Some(other) => EventKind::Unhandled(format!("payment.updated:{}", other)),
            None => return Err(WebhookError::MissingField("data.status")),
        },
        "payment.refunded" => EventKind::Refunded,
        "chargebacks.created" => EventKind::DisputeOpened,
        "chargebacks.resolved" => {
            if data["outcome"].as_str() == Some("won") {
                EventKind::DisputeWon
            } else {
                EventKind::DisputeLost
            }
        }
        other => EventKind::Unhandled(other.to_string()),
    };

    let provider_payment_ref = match kind {
        EventKind::Unhandled(_) => data["payment_id"].as_str().unwrap_or_default().to_string(),
        _ => data["payment_id"]
            .as_str()
            .ok_or(WebhookError::MissingField("data.payment_id"))?
            .to_string(),
    };

    let occurred_at = pix_occurred_at(payload);

    Ok(NormalizedEvent {
        provider: Provider::Pix,
        kind,
        event_id: event_id_or_hash(payload),
        provider_payment_ref,
        occurred_at,
        raw_payload: payload.clone(),
    })
}

/// The PIX processor sends `created_at` either as Unix seconds or as an
/// RFC 3339 string depending on API version.
fn pix_occurred_at(payload: &serde_json::Value) -> Timestamp {
    if let Some(secs) = payload["created_at"].as_i64() {
        return Timestamp::from_unix_secs(secs);
    }
    if let Some(s) = payload["created_at"].as_str() {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Timestamp::from_datetime(dt.into());
        }
    }
    Timestamp::now()
}

/// Ledger key: the provider's event instance id, or a payload hash when
/// the provider omits one.
fn event_id_or_hash(payload: &serde_json::Value) -> String {
    if let Some(id) = payload["id"].as_str() {
        return id.to_string();
    }
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
