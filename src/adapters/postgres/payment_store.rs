//! PostgreSQL implementation of PaymentStore.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, CustomerId, DomainError, ErrorCode, Money, PaymentId, ProductId, SellerId,
    Timestamp,
};
use crate::domain::payments::{Payment, PaymentPatch, PaymentStatus, Provider};
use crate::ports::{PaymentStore, UpdateOutcome};

/// PostgreSQL implementation of the PaymentStore port.
///
/// The status-guarded UPDATE provides the optimistic concurrency the
/// transition engine relies on; the unique constraint on
/// `(provider, provider_payment_ref)` enforces the one-payment-per-ref
/// invariant.
pub struct PostgresPaymentStore {
    pool: PgPool,
}

impl PostgresPaymentStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    provider: String,
    provider_payment_ref: String,
    amount_minor: i64,
    currency: String,
    status: String,
    customer_ref: String,
    product_ref: String,
    seller_ref: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let provider = Provider::parse(&row.provider).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid provider value: {}", row.provider),
            )
        })?;
        let status = PaymentStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid status value: {}", row.status),
            )
        })?;
        let currency = Currency::parse(&row.currency).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid currency: {}", e))
        })?;
        let amount = Money::new(row.amount_minor, currency).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid amount: {}", e))
        })?;
        let metadata: HashMap<String, String> =
            serde_json::from_value(row.metadata).unwrap_or_default();

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            provider,
            provider_payment_ref: row.provider_payment_ref,
            amount,
            status,
            customer_ref: CustomerId::new(row.customer_ref).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid customer_ref: {}", e))
            })?,
            product_ref: ProductId::new(row.product_ref).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid product_ref: {}", e))
            })?,
            seller_ref: SellerId::new(row.seller_ref).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid seller_ref: {}", e))
            })?,
            metadata,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl PaymentStore for PostgresPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, provider, provider_payment_ref, amount_minor, currency, status,
                customer_ref, product_ref, seller_ref, metadata, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.provider.as_str())
        .bind(&payment.provider_payment_ref)
        .bind(payment.amount.amount_minor())
        .bind(payment.amount.currency().as_str())
        .bind(payment.status.as_str())
        .bind(payment.customer_ref.as_str())
        .bind(payment.product_ref.as_str())
        .bind(payment.seller_ref.as_str())
        .bind(serde_json::to_value(&payment.metadata).unwrap_or_default())
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("payments_provider_ref_key") {
                    return DomainError::new(
                        ErrorCode::DuplicateRecord,
                        "Payment already exists for this provider reference",
                    );
                }
            }
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to insert payment: {}", e))
        })?;

        Ok(())
    }

    async fn find_by_provider_ref(
        &self,
        provider: Provider,
        provider_ref: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, provider, provider_payment_ref, amount_minor, currency, status,
                   customer_ref, product_ref, seller_ref, metadata, created_at, updated_at
            FROM payments
            WHERE provider = $1 AND provider_payment_ref = $2
            "#,
        )
        .bind(provider.as_str())
        .bind(provider_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find payment: {}", e))
        })?;

        row.map(Payment::try_from).transpose()
    }

    async fn conditional_update(
        &self,
        id: &PaymentId,
        expected_status: PaymentStatus,
        patch: PaymentPatch,
    ) -> Result<UpdateOutcome, DomainError> {
        // GREATEST keeps updated_at monotonic under clock skew.
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            UPDATE payments
            SET status = $3, updated_at = GREATEST(updated_at, $4)
            WHERE id = $1 AND status = $2
            RETURNING id, provider, provider_payment_ref, amount_minor, currency, status,
                      customer_ref, product_ref, seller_ref, metadata, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected_status.as_str())
        .bind(patch.status.as_str())
        .bind(patch.updated_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update payment: {}", e))
        })?;

        match row {
            Some(row) => Ok(UpdateOutcome::Updated(Payment::try_from(row)?)),
            None => Ok(UpdateOutcome::Conflict),
        }
    }

    async fn list_by_seller(&self, seller: &SellerId) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, provider, provider_payment_ref, amount_minor, currency, status,
                   customer_ref, product_ref, seller_ref, metadata, created_at, updated_at
            FROM payments
            WHERE seller_ref = $1
            ORDER BY created_at
            "#,
        )
        .bind(seller.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to list payments: {}", e))
        })?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}
