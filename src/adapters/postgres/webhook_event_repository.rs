//! PostgreSQL implementation of the idempotency ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::payments::Provider;
use crate::ports::{LogStatus, RecordOutcome, WebhookEventRepository, WebhookLogEntry};

/// PostgreSQL implementation of the WebhookEventRepository port.
///
/// The primary key on `(provider, event_id)` carries the atomicity
/// contract: under concurrent delivery of the same event id, exactly one
/// insert succeeds and the losers read the winner's row.
pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    provider: String,
    event_id: String,
    received_at: DateTime<Utc>,
    status: String,
    error_message: Option<String>,
    payload: serde_json::Value,
}

impl TryFrom<WebhookEventRow> for WebhookLogEntry {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        let provider = Provider::parse(&row.provider).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid provider value: {}", row.provider),
            )
        })?;
        let status = LogStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid log status value: {}", row.status),
            )
        })?;

        Ok(WebhookLogEntry {
            provider,
            event_id: row.event_id,
            received_at: Timestamp::from_datetime(row.received_at),
            status,
            error_message: row.error_message,
            payload: row.payload,
        })
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn record_if_new(
        &self,
        provider: Provider,
        event_id: &str,
        payload: &serde_json::Value,
    ) -> Result<RecordOutcome, DomainError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO webhook_events (provider, event_id, received_at, status, payload)
            VALUES ($1, $2, NOW(), 'received', $3)
            ON CONFLICT (provider, event_id) DO NOTHING
            "#,
        )
        .bind(provider.as_str())
        .bind(event_id)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record webhook event: {}", e),
            )
        })?;

        if inserted.rows_affected() == 1 {
            return Ok(RecordOutcome::New);
        }

        // Lost the insert race or a redelivery: report the winner's status.
        let status: Option<(String,)> = sqlx::query_as(
            "SELECT status FROM webhook_events WHERE provider = $1 AND event_id = $2",
        )
        .bind(provider.as_str())
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to read webhook event status: {}", e),
            )
        })?;

        let status = status
            .and_then(|(s,)| LogStatus::parse(&s))
            .unwrap_or(LogStatus::Received);

        Ok(RecordOutcome::AlreadySeen { status })
    }

    async fn mark_processed(
        &self,
        provider: Provider,
        event_id: &str,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'processed', error_message = NULL
            WHERE provider = $1 AND event_id = $2
            "#,
        )
        .bind(provider.as_str())
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark webhook event processed: {}", e),
            )
        })?;

        Ok(())
    }

    async fn mark_failed(
        &self,
        provider: Provider,
        event_id: &str,
        error: &str,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'failed', error_message = $3
            WHERE provider = $1 AND event_id = $2
            "#,
        )
        .bind(provider.as_str())
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark webhook event failed: {}", e),
            )
        })?;

        Ok(())
    }

    async fn find(
        &self,
        provider: Provider,
        event_id: &str,
    ) -> Result<Option<WebhookLogEntry>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT provider, event_id, received_at, status, error_message, payload
            FROM webhook_events
            WHERE provider = $1 AND event_id = $2
            "#,
        )
        .bind(provider.as_str())
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find webhook event: {}", e),
            )
        })?;

        row.map(WebhookLogEntry::try_from).transpose()
    }
}
