//! HTTP conversion-tracking forwarder.
//!
//! Posts completed payments to a third-party tracking endpoint. Strictly
//! best-effort: when forwarding is disabled or fails, the payment flow is
//! unaffected and the failure is only logged by the dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::AnalyticsConfig;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::payments::Payment;
use crate::ports::AnalyticsForwarder;

/// Analytics adapter posting conversion events over HTTP.
pub struct TrackingForwarder {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_token: Option<String>,
}

impl TrackingForwarder {
    /// Creates a forwarder from the analytics configuration.
    ///
    /// A disabled configuration produces a forwarder that treats every
    /// call as a no-op success.
    pub fn new(config: &AnalyticsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: config.enabled.then(|| config.endpoint.clone()).flatten(),
            api_token: config.api_token.clone(),
        }
    }
}

#[async_trait]
impl AnalyticsForwarder for TrackingForwarder {
    async fn forward(&self, payment: &Payment) -> Result<(), DomainError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };

        let event = json!({
            "event": "purchase",
            "payment_ref": payment.provider_payment_ref,
            "provider": payment.provider.as_str(),
            "amount_minor": payment.amount.amount_minor(),
            "currency": payment.amount.currency().as_str(),
            "product_ref": payment.product_ref.as_str(),
            "occurred_at": payment.updated_at.to_string(),
        });

        let mut request = self.client.post(endpoint).json(&event);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            DomainError::new(
                ErrorCode::AnalyticsError,
                format!("Analytics request failed: {}", e),
            )
        })?;

        if !response.status().is_success() {
            return Err(DomainError::new(
                ErrorCode::AnalyticsError,
                format!("Analytics endpoint returned {}", response.status()),
            ));
        }

        Ok(())
    }
}
