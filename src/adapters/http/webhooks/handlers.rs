//! HTTP handlers for the inbound webhook endpoints.
//!
//! One endpoint per provider. Bodies are taken as raw `Bytes` so the
//! signature verifiers see the exact wire payload; parsing happens only
//! after authenticity is established.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

use crate::application::handlers::webhooks::{IngestWebhookCommand, IngestWebhookHandler};
use crate::domain::payments::{Provider, WebhookError};

use super::dto::{ErrorResponse, WebhookAck};

/// Header carrying the card processor's HMAC signature.
pub const CARD_SIGNATURE_HEADER: &str = "Card-Signature";

/// Header carrying the PIX processor's shared token.
pub const PIX_TOKEN_HEADER: &str = "X-Webhook-Token";

/// Shared state for the webhook endpoints.
#[derive(Clone)]
pub struct WebhookAppState {
    pub ingest: Arc<IngestWebhookHandler>,
}

/// POST /webhooks/card - Card processor deliveries
pub async fn handle_card_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let cmd = IngestWebhookCommand {
        provider: Provider::Card,
        payload: body.to_vec(),
        auth_header: header_value(&headers, CARD_SIGNATURE_HEADER),
    };

    state.ingest.handle(cmd).await?;

    Ok(Json(WebhookAck::received()))
}

/// POST /webhooks/pix - PIX processor deliveries
pub async fn handle_pix_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let cmd = IngestWebhookCommand {
        provider: Provider::Pix,
        payload: body.to_vec(),
        auth_header: header_value(&headers, PIX_TOKEN_HEADER),
    };

    state.ingest.handle(cmd).await?;

    Ok(Json(WebhookAck::received()))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// API error wrapper mapping `WebhookError` to HTTP responses.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let code = match &self.0 {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            WebhookError::InvalidTimestamp => "INVALID_TIMESTAMP",
            WebhookError::ParseError(_) => "PARSE_ERROR",
            WebhookError::MissingField(_) => "MISSING_FIELD",
            WebhookError::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            WebhookError::Database(_) => "INTERNAL_ERROR",
        };
        let status = self.0.status_code();
        let body = ErrorResponse::new(code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}
