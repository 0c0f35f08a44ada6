//! Webhook error types.
//!
//! Defines all error conditions that can occur during webhook processing,
//! with HTTP status code mapping and retryability semantics. Everything
//! that should cause the provider to redeliver maps to a non-2xx status;
//! business-level "nothing to do" outcomes are not errors at all.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature or shared token verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is outside the acceptable window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the payload or the signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required correlation field missing from the payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// No payment exists yet for the provider reference. The checkout
    /// flow may not have committed; redelivery is expected to succeed.
    #[error("Payment not found for provider ref {0}")]
    PaymentNotFound(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the provider should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_) | WebhookError::PaymentNotFound(_)
        )
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// Status codes determine provider retry behavior:
    /// - 2xx: Event acknowledged, no retry
    /// - 4xx: Client error, provider retries per its own policy
    /// - 5xx: Server error, provider retries
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failures
            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }

            // Malformed input
            WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            // Server-side failures; redelivery provides durability
            WebhookError::PaymentNotFound(_) | WebhookError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}
