//! WebhookEventRepository port - The idempotency ledger.
//!
//! Providers deliver at-least-once: the same event id may arrive many
//! times, concurrently, and out of order. This port records every raw
//! event keyed on `(provider, event_id)` so duplicates can be discarded
//! and failed events replayed.
//!
//! ## Atomicity
//!
//! `record_if_new` must be atomic: under concurrent delivery of the same
//! event id, exactly one caller observes `RecordOutcome::New`.
//! Implementations use an insert with a unique constraint and interpret
//! the constraint violation as "already seen".

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::payments::Provider;

/// Processing status of a logged webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    /// Recorded; processing not yet finished.
    Received,
    /// Transition applied (or acknowledged as a no-op).
    Processed,
    /// Processing failed; eligible for redelivery or replay.
    Failed,
}

impl LogStatus {
    /// Returns the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Received => "received",
            LogStatus::Processed => "processed",
            LogStatus::Failed => "failed",
        }
    }

    /// Parse a status from its stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(LogStatus::Received),
            "processed" => Some(LogStatus::Processed),
            "failed" => Some(LogStatus::Failed),
            _ => None,
        }
    }
}

/// Durable record of a received webhook event.
#[derive(Debug, Clone)]
pub struct WebhookLogEntry {
    pub provider: Provider,
    pub event_id: String,
    pub received_at: Timestamp,
    pub status: LogStatus,
    pub error_message: Option<String>,
    pub payload: serde_json::Value,
}

/// Result of attempting to record an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First time seeing this event; recorded as `received`.
    New,
    /// The event id was already recorded, with the given status.
    AlreadySeen { status: LogStatus },
}

/// Port for the idempotency ledger.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Atomically records the event if its id is unseen.
    async fn record_if_new(
        &self,
        provider: Provider,
        event_id: &str,
        payload: &serde_json::Value,
    ) -> Result<RecordOutcome, DomainError>;

    /// Marks the entry as fully processed.
    async fn mark_processed(&self, provider: Provider, event_id: &str)
        -> Result<(), DomainError>;

    /// Marks the entry as failed with the error that stopped it.
    async fn mark_failed(
        &self,
        provider: Provider,
        event_id: &str,
        error: &str,
    ) -> Result<(), DomainError>;

    /// Looks up a logged event for audit or replay.
    async fn find(
        &self,
        provider: Provider,
        event_id: &str,
    ) -> Result<Option<WebhookLogEntry>, DomainError>;
}
