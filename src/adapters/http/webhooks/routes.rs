//! Route definitions for the webhook endpoints.

use axum::routing::post;
use axum::Router;

use super::handlers::{handle_card_webhook, handle_pix_webhook, WebhookAppState};

/// Builds the webhook router.
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new()
        .route("/webhooks/card", post(handle_card_webhook))
        .route("/webhooks/pix", post(handle_pix_webhook))
}
