//! AnalyticsForwarder port - Third-party conversion tracking.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::payments::Payment;

/// Port for forwarding completed payments to conversion tracking.
///
/// Strictly best-effort: failures are logged by the dispatcher and never
/// affect the payment state or the webhook response.
#[async_trait]
pub trait AnalyticsForwarder: Send + Sync {
    /// Forwards one payment record.
    async fn forward(&self, payment: &Payment) -> Result<(), DomainError>;
}
