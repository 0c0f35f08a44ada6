//! HTTP adapters.

pub mod webhooks;

use axum::routing::get;
use axum::Json;
use axum::Router;

use webhooks::{webhook_routes, WebhookAppState};

/// GET /health - Liveness probe
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Assembles the application router.
pub fn app_router(state: WebhookAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(webhook_routes())
        .with_state(state)
}
