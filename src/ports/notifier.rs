//! Notifier port - Outbound buyer/seller notifications.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::payments::NotificationKind;

/// Port for sending templated notifications.
///
/// The delivery mechanism (email API, SMS gateway) lives behind this
/// trait; the dispatcher only sees send success or failure and applies
/// its own timeout.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one notification of the given kind to the recipient.
    async fn send(
        &self,
        kind: NotificationKind,
        recipient: &str,
        template: &HashMap<String, String>,
    ) -> Result<(), DomainError>;
}
