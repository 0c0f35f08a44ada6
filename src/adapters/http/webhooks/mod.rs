//! Webhook HTTP surface.

mod dto;
mod handlers;
mod routes;

pub use handlers::{WebhookAppState, CARD_SIGNATURE_HEADER, PIX_TOKEN_HEADER};
pub use routes::webhook_routes;
