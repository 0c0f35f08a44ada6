//! Resend-backed notifier.
//!
//! Sends templated transactional emails through the Resend HTTP API. The
//! dispatcher layers its own timeout on top; the client here carries one
//! as well so a wedged connection cannot outlive the request budget.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::NotificationConfig;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::payments::NotificationKind;
use crate::ports::Notifier;

/// Notifier adapter for the Resend email API.
pub struct ResendNotifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl ResendNotifier {
    /// Creates a notifier from the notification configuration.
    pub fn new(config: &NotificationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            from: config.from_header(),
        }
    }

    fn subject(kind: NotificationKind, template: &HashMap<String, String>) -> String {
        let product = template
            .get("product_name")
            .map(String::as_str)
            .unwrap_or("your purchase");
        match kind {
            NotificationKind::Confirmation => format!("Payment confirmed for {}", product),
            NotificationKind::Failure => format!("Payment failed for {}", product),
            NotificationKind::Refund => format!("Refund issued for {}", product),
            NotificationKind::DisputeOpened => format!("A dispute was opened for {}", product),
            NotificationKind::DisputeClosed => format!("Dispute resolved for {}", product),
        }
    }

    fn body(kind: NotificationKind, template: &HashMap<String, String>) -> String {
        let mut lines = vec![format!("Notification: {}", kind.as_str())];
        let mut keys: Vec<&String> = template.keys().collect();
        keys.sort();
        for key in keys {
            lines.push(format!("{}: {}", key, template[key]));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send(
        &self,
        kind: NotificationKind,
        recipient: &str,
        template: &HashMap<String, String>,
    ) -> Result<(), DomainError> {
        let payload = json!({
            "from": self.from,
            "to": [recipient],
            "subject": Self::subject(kind, template),
            "text": Self::body(kind, template),
            "tags": [{"name": "template", "value": kind.as_str()}],
        });

        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::NotificationError,
                    format!("Notification request failed: {}", e),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "notification send rejected");
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                format!("Notification send rejected with status {}", status),
            ));
        }

        Ok(())
    }
}
