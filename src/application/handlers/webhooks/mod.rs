//! Webhook ingestion handlers.

mod ingest_webhook;

pub use ingest_webhook::{IngestWebhookCommand, IngestWebhookHandler};
