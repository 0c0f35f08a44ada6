//! IngestWebhookHandler - Command handler for inbound provider webhooks.
//!
//! Runs the full pipeline for one delivery: authenticity verification,
//! payload parsing, normalization, then idempotent processing through
//! the webhook processor.

use crate::domain::payments::{
    normalize, CardWebhookVerifier, PixWebhookVerifier, ProcessOutcome, Provider, WebhookError,
    WebhookProcessor,
};

/// Command to ingest one webhook delivery.
#[derive(Debug, Clone)]
pub struct IngestWebhookCommand {
    /// Which provider endpoint received the delivery.
    pub provider: Provider,
    /// Raw request body, exactly as received on the wire.
    pub payload: Vec<u8>,
    /// The provider's authenticity header value, if present.
    pub auth_header: Option<String>,
}

/// Handler for webhook ingestion.
pub struct IngestWebhookHandler {
    card_verifier: CardWebhookVerifier,
    pix_verifier: PixWebhookVerifier,
    processor: WebhookProcessor,
}

impl IngestWebhookHandler {
    pub fn new(
        card_verifier: CardWebhookVerifier,
        pix_verifier: PixWebhookVerifier,
        processor: WebhookProcessor,
    ) -> Self {
        Self {
            card_verifier,
            pix_verifier,
            processor,
        }
    }

    /// Verifies, normalizes, and processes one delivery.
    ///
    /// Duplicate and stale deliveries resolve to `Ok` outcomes: the
    /// provider must receive a success response for them so it stops
    /// retrying.
    pub async fn handle(
        &self,
        cmd: IngestWebhookCommand,
    ) -> Result<ProcessOutcome, WebhookError> {
        let header = cmd.auth_header.as_deref().unwrap_or_default();

        let verified = match cmd.provider {
            Provider::Card => self.card_verifier.verify(&cmd.payload, header),
            Provider::Pix => self.pix_verifier.verify(header),
        };
        if let Err(err) = verified {
            tracing::warn!(
                provider = %cmd.provider,
                error = %err,
                "webhook authenticity check failed"
            );
            return Err(err);
        }

        let payload: serde_json::Value = serde_json::from_slice(&cmd.payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let event = match normalize(cmd.provider, &payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(
                    provider = %cmd.provider,
                    error = %err,
                    "webhook payload failed normalization"
                );
                return Err(err);
            }
        };

        self.processor.process(event).await
    }
}
