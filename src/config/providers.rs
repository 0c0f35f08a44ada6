//! Payment provider configuration
//!
//! Secrets for authenticating inbound webhooks from the card processor
//! and the PIX processor. Held as `SecretString` so they never appear in
//! debug output or logs.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Card processor webhook configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CardProviderConfig {
    /// Webhook signing secret (whsec_ prefix)
    pub webhook_secret: SecretString,
}

impl CardProviderConfig {
    /// Validate card provider configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let secret = self.webhook_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("CARD_WEBHOOK_SECRET"));
        }
        if !secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidCardWebhookSecret);
        }
        Ok(())
    }
}

/// PIX processor webhook configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PixProviderConfig {
    /// Shared token expected in the X-Webhook-Token header
    pub webhook_token: SecretString,
}

impl PixProviderConfig {
    /// Validate PIX provider configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.webhook_token.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PIX_WEBHOOK_TOKEN"));
        }
        Ok(())
    }
}

/// Configuration for both inbound webhook providers
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Card processor settings
    pub card: CardProviderConfig,

    /// PIX processor settings
    pub pix: PixProviderConfig,
}

impl ProvidersConfig {
    /// Validate provider configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.card.validate()?;
        self.pix.validate()?;
        Ok(())
    }
}
