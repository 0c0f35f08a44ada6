//! Side-effect intents emitted by the state transition engine.
//!
//! Effects are queued, never executed inline with the transition: the
//! dispatcher runs them afterwards with per-effect failure isolation, so
//! one failing notification can never roll back a committed status change.

use std::collections::HashMap;

use crate::domain::foundation::{CustomerId, PaymentId, ProductId, SellerId};

use super::balance::AdjustmentKind;
use super::event::{EventKind, NormalizedEvent};
use super::payment::Payment;

/// Notification templates the notifier can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Confirmation,
    Failure,
    Refund,
    DisputeOpened,
    DisputeClosed,
}

impl NotificationKind {
    /// Template identifier used by the notifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Confirmation => "payment-confirmation",
            NotificationKind::Failure => "payment-failure",
            NotificationKind::Refund => "payment-refund",
            NotificationKind::DisputeOpened => "dispute-opened",
            NotificationKind::DisputeClosed => "dispute-closed",
        }
    }
}

/// An intent to mutate the outside world, produced by an applied
/// transition.
#[derive(Debug, Clone)]
pub enum SideEffect {
    /// Send a templated notification.
    Notify {
        kind: NotificationKind,
        recipient: String,
        payment_ref: String,
        template: HashMap<String, String>,
    },

    /// Grant the buyer access to the purchased product.
    GrantAccess {
        user_ref: CustomerId,
        product_ref: ProductId,
        payment_id: PaymentId,
    },

    /// Revoke access granted for this payment.
    RevokeAccess { payment_id: PaymentId },

    /// Apply a signed, idempotent keyed balance adjustment.
    AdjustBalance {
        seller_ref: SellerId,
        payment_ref: String,
        kind: AdjustmentKind,
        amount_minor: i64,
    },

    /// Forward the payment record to third-party conversion tracking.
    ForwardAnalytics { payment: Box<Payment> },
}

impl SideEffect {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            SideEffect::Notify { .. } => "notify",
            SideEffect::GrantAccess { .. } => "grant_access",
            SideEffect::RevokeAccess { .. } => "revoke_access",
            SideEffect::AdjustBalance { .. } => "adjust_balance",
            SideEffect::ForwardAnalytics { .. } => "forward_analytics",
        }
    }

    /// The payment reference the effect belongs to, for logging.
    pub fn payment_ref(&self) -> String {
        match self {
            SideEffect::Notify { payment_ref, .. } => payment_ref.clone(),
            SideEffect::GrantAccess { payment_id, .. } => payment_id.to_string(),
            SideEffect::RevokeAccess { payment_id } => payment_id.to_string(),
            SideEffect::AdjustBalance { payment_ref, .. } => payment_ref.clone(),
            SideEffect::ForwardAnalytics { payment } => payment.provider_payment_ref.clone(),
        }
    }
}

/// Computes the side effects for an applied transition.
///
/// `payment` is the post-update record; `event` carries the kind that
/// drove the transition (needed to distinguish a dispute-won completion
/// from a normal one) and the provider failure detail when present.
pub fn effects_for(payment: &Payment, event: &NormalizedEvent) -> Vec<SideEffect> {
    match &event.kind {
        EventKind::PaymentSucceeded => vec![
            notify(payment, NotificationKind::Confirmation, payment.buyer_recipient(), None),
            SideEffect::GrantAccess {
                user_ref: payment.customer_ref.clone(),
                product_ref: payment.product_ref.clone(),
                payment_id: payment.id,
            },
            adjust(payment, AdjustmentKind::SaleCredit, payment.amount.amount_minor()),
            SideEffect::ForwardAnalytics {
                payment: Box::new(payment.clone()),
            },
        ],

        EventKind::PaymentFailed => vec![notify(
            payment,
            NotificationKind::Failure,
            payment.buyer_recipient(),
            event.failure_message(),
        )],

        EventKind::Refunded => vec![
            SideEffect::RevokeAccess {
                payment_id: payment.id,
            },
            notify(payment, NotificationKind::Refund, payment.buyer_recipient(), None),
            adjust(payment, AdjustmentKind::SaleReversal, -payment.amount.amount_minor()),
        ],

        EventKind::DisputeOpened => vec![
            notify(payment, NotificationKind::DisputeOpened, payment.seller_recipient(), None),
            adjust(payment, AdjustmentKind::SaleReversal, -payment.amount.amount_minor()),
        ],

        EventKind::DisputeWon => vec![
            adjust(payment, AdjustmentKind::DisputeRelease, payment.amount.amount_minor()),
            notify(payment, NotificationKind::DisputeClosed, payment.seller_recipient(), None),
        ],

        EventKind::DisputeLost => vec![
            SideEffect::RevokeAccess {
                payment_id: payment.id,
            },
            notify(payment, NotificationKind::Refund, payment.buyer_recipient(), None),
            notify(payment, NotificationKind::DisputeClosed, payment.seller_recipient(), None),
            // The dispute already debited under the same key; re-applying
            // is a skip.
            adjust(payment, AdjustmentKind::SaleReversal, -payment.amount.amount_minor()),
        ],

        // No status change, no effects.
        EventKind::PaymentProcessing | EventKind::PaymentCanceled => vec![],

        // Handled before the engine reaches effects_for.
        EventKind::PayoutPaid | EventKind::Unhandled(_) => vec![],
    }
}

fn notify(
    payment: &Payment,
    kind: NotificationKind,
    recipient: String,
    failure_reason: Option<String>,
) -> SideEffect {
    let mut template = HashMap::new();
    template.insert(
        "amount".to_string(),
        payment.amount.amount_minor().to_string(),
    );
    template.insert(
        "currency".to_string(),
        payment.amount.currency().as_str().to_string(),
    );
    if let Some(name) = payment.metadata_field("product_name") {
        template.insert("product_name".to_string(), name.to_string());
    }
    if let Some(reason) = failure_reason {
        template.insert("failure_reason".to_string(), reason);
    }

    SideEffect::Notify {
        kind,
        recipient,
        payment_ref: payment.provider_payment_ref.clone(),
        template,
    }
}

fn adjust(payment: &Payment, kind: AdjustmentKind, amount_minor: i64) -> SideEffect {
    SideEffect::AdjustBalance {
        seller_ref: payment.seller_ref.clone(),
        payment_ref: payment.provider_payment_ref.clone(),
        kind,
        amount_minor,
    }
}
