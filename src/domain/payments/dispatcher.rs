//! Side-effect dispatcher.
//!
//! Executes the intents emitted by the transition engine. Every effect
//! runs independently under its own timeout: one failing notification
//! neither blocks the other effects nor re-triggers the state transition.
//! Financial effects go through the idempotent balance ledger and the
//! access repository, so the dispatcher is safe to re-run after a partial
//! failure (process crash after state commit but before dispatch
//! completed).

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::domain::foundation::DomainError;
use crate::ports::{
    AdjustmentOutcome, AnalyticsForwarder, BalanceLedger, Notifier, ProductAccessRepository,
};

use super::product_access::ProductAccess;
use super::side_effect::SideEffect;

/// Default per-effect timeout.
const DEFAULT_EFFECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of executing one effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectOutcome {
    /// The effect ran.
    Ok,
    /// A keyed financial effect was already applied; skipped.
    AlreadyApplied,
    /// The effect failed or timed out; logged, not retried inline.
    Failed {
        effect: &'static str,
        reason: String,
    },
}

/// Executes side-effect intents against the outbound collaborators.
pub struct SideEffectDispatcher {
    notifier: Arc<dyn Notifier>,
    balance: Arc<dyn BalanceLedger>,
    access: Arc<dyn ProductAccessRepository>,
    analytics: Arc<dyn AnalyticsForwarder>,
    effect_timeout: Duration,
}

impl SideEffectDispatcher {
    /// Creates a dispatcher over the given collaborators.
    pub fn new(
        notifier: Arc<dyn Notifier>,
        balance: Arc<dyn BalanceLedger>,
        access: Arc<dyn ProductAccessRepository>,
        analytics: Arc<dyn AnalyticsForwarder>,
    ) -> Self {
        Self {
            notifier,
            balance,
            access,
            analytics,
            effect_timeout: DEFAULT_EFFECT_TIMEOUT,
        }
    }

    /// Overrides the per-effect timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.effect_timeout = timeout;
        self
    }

    /// Executes all effects concurrently, each isolated from the others.
    pub async fn dispatch(&self, effects: Vec<SideEffect>) -> Vec<EffectOutcome> {
        join_all(effects.into_iter().map(|e| self.run_effect(e))).await
    }

    async fn run_effect(&self, effect: SideEffect) -> EffectOutcome {
        let label = effect.label();
        let payment_ref = effect.payment_ref();

        match tokio::time::timeout(self.effect_timeout, self.execute(effect)).await {
            Ok(Ok(outcome)) => {
                if outcome == EffectOutcome::AlreadyApplied {
                    tracing::info!(
                        effect = label,
                        payment_ref = %payment_ref,
                        "effect already applied, skipping"
                    );
                }
                outcome
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    effect = label,
                    payment_ref = %payment_ref,
                    error = %err,
                    "side effect failed"
                );
                EffectOutcome::Failed {
                    effect: label,
                    reason: err.to_string(),
                }
            }
            Err(_) => {
                tracing::warn!(
                    effect = label,
                    payment_ref = %payment_ref,
                    timeout_secs = self.effect_timeout.as_secs(),
                    "side effect timed out"
                );
                EffectOutcome::Failed {
                    effect: label,
                    reason: "timed out".to_string(),
                }
            }
        }
    }

    async fn execute(&self, effect: SideEffect) -> Result<EffectOutcome, DomainError> {
        match effect {
            SideEffect::Notify {
                kind,
                recipient,
                template,
                ..
            } => {
                self.notifier.send(kind, &recipient, &template).await?;
                Ok(EffectOutcome::Ok)
            }

            SideEffect::GrantAccess {
                user_ref,
                product_ref,
                payment_id,
            } => {
                let access = ProductAccess::granted(user_ref, product_ref, payment_id);
                self.access.grant(&access).await?;
                Ok(EffectOutcome::Ok)
            }

            SideEffect::RevokeAccess { payment_id } => {
                self.access.revoke_by_payment(&payment_id).await?;
                Ok(EffectOutcome::Ok)
            }

            SideEffect::AdjustBalance {
                seller_ref,
                payment_ref,
                kind,
                amount_minor,
            } => {
                let outcome = self
                    .balance
                    .apply_adjustment(&seller_ref, &payment_ref, kind, amount_minor)
                    .await?;
                Ok(match outcome {
                    AdjustmentOutcome::Applied => EffectOutcome::Ok,
                    AdjustmentOutcome::AlreadyApplied => EffectOutcome::AlreadyApplied,
                })
            }

            SideEffect::ForwardAnalytics { payment } => {
                self.analytics.forward(&payment).await?;
                Ok(EffectOutcome::Ok)
            }
        }
    }
}
