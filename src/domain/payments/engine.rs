//! State transition engine.
//!
//! Given a normalized event and the persisted payment state, computes the
//! next valid state, applies it as a single conditional update, and emits
//! the side-effect intents for the transition.
//!
//! ## Out-of-order and duplicate delivery
//!
//! A transition whose source state does not match the current persisted
//! state is not an error: it is a stale, reordered, or duplicate delivery
//! and is acknowledged as a success no-op. State never regresses and side
//! effects never re-run for it.
//!
//! ## Concurrency
//!
//! The conditional update only succeeds while the persisted status still
//! equals the status the engine read. Losing the race triggers exactly
//! one reload-and-retry; a second conflict is treated as stale.

use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::ports::{PaymentStore, UpdateOutcome};

use super::balance::AdjustmentKind;
use super::errors::WebhookError;
use super::event::{EventKind, NormalizedEvent};
use super::payment::{Payment, PaymentPatch};
use super::side_effect::{effects_for, SideEffect};
use super::status::PaymentStatus;

/// Why an event produced no transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoopReason {
    /// Source state did not match the persisted state.
    Stale,
    /// Lost the optimistic-concurrency race twice.
    Conflict,
    /// The canonical kind has no transition (unhandled taxonomy entry).
    Unhandled,
}

/// Result of applying a normalized event.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// A transition was applied; `payment` is the post-update record.
    Applied {
        payment: Payment,
        effects: Vec<SideEffect>,
    },
    /// No payment state involved (payout events); only ledger effects.
    BalanceOnly { effects: Vec<SideEffect> },
    /// Acknowledged without changes.
    Noop(NoopReason),
}

/// Allowed source states and target for each canonical kind.
///
/// `PayoutPaid` and `Unhandled` have no entry: the former is a seller
/// balance event, the latter never mutates state.
fn transition_for(kind: &EventKind) -> Option<(&'static [PaymentStatus], PaymentStatus)> {
    use PaymentStatus::*;
    match kind {
        EventKind::PaymentProcessing => Some((&[Pending], Processing)),
        EventKind::PaymentSucceeded => Some((&[Pending, Processing], Completed)),
        EventKind::PaymentFailed => Some((&[Pending, Processing], Failed)),
        EventKind::PaymentCanceled => Some((&[Pending, Processing], Canceled)),
        EventKind::Refunded => Some((&[Completed, Disputed], Refunded)),
        EventKind::DisputeOpened => Some((&[Completed], Disputed)),
        EventKind::DisputeWon => Some((&[Disputed], Completed)),
        EventKind::DisputeLost => Some((&[Disputed], Refunded)),
        EventKind::PayoutPaid | EventKind::Unhandled(_) => None,
    }
}

/// The state transition engine.
pub struct TransitionEngine {
    store: Arc<dyn PaymentStore>,
}

impl TransitionEngine {
    /// Creates an engine over the given payment store.
    pub fn new(store: Arc<dyn PaymentStore>) -> Self {
        Self { store }
    }

    /// Applies one normalized event.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` - no payment exists for the provider reference
    ///   (retryable: the checkout flow may not have committed yet)
    /// - `Database` - the store failed
    pub async fn apply(&self, event: &NormalizedEvent) -> Result<TransitionOutcome, WebhookError> {
        match &event.kind {
            EventKind::Unhandled(raw_kind) => {
                tracing::info!(
                    provider = %event.provider,
                    event_id = %event.event_id,
                    raw_kind = %raw_kind,
                    "unhandled event kind, acknowledging without transition"
                );
                Ok(TransitionOutcome::Noop(NoopReason::Unhandled))
            }

            EventKind::PayoutPaid => {
                let (seller_ref, amount_minor) = event.payout_details()?;
                let effects = vec![SideEffect::AdjustBalance {
                    seller_ref,
                    payment_ref: event.provider_payment_ref.clone(),
                    kind: AdjustmentKind::PayoutPaid,
                    amount_minor,
                }];
                Ok(TransitionOutcome::BalanceOnly { effects })
            }

            kind => self.apply_payment_transition(event, kind).await,
        }
    }

    async fn apply_payment_transition(
        &self,
        event: &NormalizedEvent,
        kind: &EventKind,
    ) -> Result<TransitionOutcome, WebhookError> {
        let Some((sources, target)) = transition_for(kind) else {
            return Ok(TransitionOutcome::Noop(NoopReason::Unhandled));
        };

        // First pass plus one reload after a lost race.
        for attempt in 0..2 {
            let payment = self
                .store
                .find_by_provider_ref(event.provider, &event.provider_payment_ref)
                .await?
                .ok_or_else(|| {
                    WebhookError::PaymentNotFound(event.provider_payment_ref.clone())
                })?;

            if !sources.contains(&payment.status) {
                tracing::info!(
                    provider = %event.provider,
                    payment_ref = %event.provider_payment_ref,
                    kind = %event.kind.label(),
                    current_status = %payment.status.as_str(),
                    "stale or out-of-order event, acknowledging as no-op"
                );
                return Ok(TransitionOutcome::Noop(NoopReason::Stale));
            }

            let patch = PaymentPatch {
                status: target,
                updated_at: Timestamp::now(),
            };

            match self
                .store
                .conditional_update(&payment.id, payment.status, patch)
                .await?
            {
                UpdateOutcome::Updated(updated) => {
                    let effects = effects_for(&updated, event);
                    tracing::info!(
                        provider = %event.provider,
                        payment_ref = %event.provider_payment_ref,
                        kind = %event.kind.label(),
                        status = %updated.status.as_str(),
                        effects = effects.len(),
                        "payment transition applied"
                    );
                    return Ok(TransitionOutcome::Applied {
                        payment: updated,
                        effects,
                    });
                }
                UpdateOutcome::Conflict if attempt == 0 => continue,
                UpdateOutcome::Conflict => break,
            }
        }

        tracing::info!(
            provider = %event.provider,
            payment_ref = %event.provider_payment_ref,
            kind = %event.kind.label(),
            "conditional update conflicted twice, treating as stale"
        );
        Ok(TransitionOutcome::Noop(NoopReason::Conflict))
    }
}
