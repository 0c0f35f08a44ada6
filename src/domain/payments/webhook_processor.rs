//! Webhook processor - Orchestrates idempotent webhook event handling.
//!
//! The coordination layer between verified, normalized provider events
//! and the transition engine, ensuring each event is applied exactly
//! once.
//!
//! ## Design
//!
//! 1. Record the event in the idempotency ledger (atomic insert)
//! 2. Apply the transition through the engine
//! 3. Dispatch the emitted side effects with per-effect isolation
//! 4. Mark the ledger entry processed (or failed)
//!
//! ## Race Condition Handling
//!
//! When multiple deliveries of the same event id arrive simultaneously,
//! the ledger's unique constraint lets exactly one caller observe
//! `RecordOutcome::New`. The others see an existing entry: a `processed`
//! entry is acknowledged as a duplicate no-op, while `received` and
//! `failed` entries are re-processed. The engine's stale no-op rule and
//! the keyed balance adjustments make re-processing safe, which is what
//! lets provider retries provide durability after a crash mid-flight.

use std::sync::Arc;

use crate::ports::{LogStatus, RecordOutcome, WebhookEventRepository};

use super::dispatcher::{EffectOutcome, SideEffectDispatcher};
use super::engine::{TransitionEngine, TransitionOutcome};
use super::errors::WebhookError;
use super::event::NormalizedEvent;

/// Result of processing one webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A transition (or balance update) was applied.
    Processed,
    /// The event id was already fully processed; nothing re-ran.
    Duplicate,
    /// Acknowledged without changes (stale, conflicting, or unhandled).
    Noop,
}

/// Processes normalized events with idempotency guarantees.
pub struct WebhookProcessor {
    ledger: Arc<dyn WebhookEventRepository>,
    engine: TransitionEngine,
    dispatcher: SideEffectDispatcher,
}

impl WebhookProcessor {
    /// Creates a processor over the given ledger, engine, and dispatcher.
    pub fn new(
        ledger: Arc<dyn WebhookEventRepository>,
        engine: TransitionEngine,
        dispatcher: SideEffectDispatcher,
    ) -> Self {
        Self {
            ledger,
            engine,
            dispatcher,
        }
    }

    /// Processes one event exactly once.
    ///
    /// Every `Ok` outcome is acknowledged to the provider with a success
    /// response; errors map to non-2xx statuses so the provider
    /// redelivers.
    pub async fn process(&self, event: NormalizedEvent) -> Result<ProcessOutcome, WebhookError> {
        match self
            .ledger
            .record_if_new(event.provider, &event.event_id, &event.raw_payload)
            .await?
        {
            RecordOutcome::New => {}
            RecordOutcome::AlreadySeen {
                status: LogStatus::Processed,
            } => {
                tracing::info!(
                    provider = %event.provider,
                    event_id = %event.event_id,
                    "duplicate delivery, acknowledging as no-op"
                );
                return Ok(ProcessOutcome::Duplicate);
            }
            RecordOutcome::AlreadySeen { status } => {
                tracing::info!(
                    provider = %event.provider,
                    event_id = %event.event_id,
                    prior_status = status.as_str(),
                    "redelivery of unfinished event, re-processing"
                );
            }
        }

        let outcome = match self.engine.apply(&event).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(mark_err) = self
                    .ledger
                    .mark_failed(event.provider, &event.event_id, &err.to_string())
                    .await
                {
                    tracing::warn!(
                        event_id = %event.event_id,
                        error = %mark_err,
                        "failed to record webhook failure"
                    );
                }
                return Err(err);
            }
        };

        let result = match outcome {
            TransitionOutcome::Applied { effects, .. }
            | TransitionOutcome::BalanceOnly { effects } => {
                let outcomes = self.dispatcher.dispatch(effects).await;
                let failed = outcomes
                    .iter()
                    .filter(|o| matches!(o, EffectOutcome::Failed { .. }))
                    .count();
                if failed > 0 {
                    // The transition stays committed; failed effects are
                    // replayable from the webhook log.
                    tracing::warn!(
                        provider = %event.provider,
                        event_id = %event.event_id,
                        failed_effects = failed,
                        "some side effects failed"
                    );
                }
                ProcessOutcome::Processed
            }
            TransitionOutcome::Noop(_) => ProcessOutcome::Noop,
        };

        self.ledger
            .mark_processed(event.provider, &event.event_id)
            .await?;

        Ok(result)
    }
}
