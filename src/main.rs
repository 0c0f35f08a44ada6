//! Vendaflow server binary.
//!
//! Loads configuration, wires the adapters into the reconciliation core,
//! and serves the webhook endpoints.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use vendaflow::adapters::analytics::TrackingForwarder;
use vendaflow::adapters::http::webhooks::WebhookAppState;
use vendaflow::adapters::http::app_router;
use vendaflow::adapters::notifier::ResendNotifier;
use vendaflow::adapters::postgres::{
    PostgresBalanceLedger, PostgresPaymentStore, PostgresProductAccessRepository,
    PostgresWebhookEventRepository,
};
use vendaflow::application::handlers::webhooks::IngestWebhookHandler;
use vendaflow::config::AppConfig;
use vendaflow::domain::payments::{
    CardWebhookVerifier, PixWebhookVerifier, SideEffectDispatcher, TransitionEngine,
    WebhookProcessor,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");
    }

    // Repositories
    let payment_store = Arc::new(PostgresPaymentStore::new(pool.clone()));
    let webhook_events = Arc::new(PostgresWebhookEventRepository::new(pool.clone()));
    let balance_ledger = Arc::new(PostgresBalanceLedger::new(pool.clone()));
    let product_access = Arc::new(PostgresProductAccessRepository::new(pool.clone()));

    // Outbound collaborators
    let notifier = Arc::new(ResendNotifier::new(&config.notification));
    let analytics = Arc::new(TrackingForwarder::new(&config.analytics));

    // Reconciliation core
    let engine = TransitionEngine::new(payment_store);
    let dispatcher =
        SideEffectDispatcher::new(notifier, balance_ledger, product_access, analytics);
    let processor = WebhookProcessor::new(webhook_events, engine, dispatcher);

    let ingest = Arc::new(IngestWebhookHandler::new(
        CardWebhookVerifier::new(config.providers.card.webhook_secret.clone()),
        PixWebhookVerifier::new(config.providers.pix.webhook_token.clone()),
        processor,
    ));

    let app = app_router(WebhookAppState { ingest })
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "vendaflow listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.server.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown signal handler");
    }
    tracing::info!("shutdown signal received");
}
