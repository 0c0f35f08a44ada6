//! PostgreSQL implementation of ProductAccessRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    CustomerId, DomainError, ErrorCode, PaymentId, ProductId, Timestamp,
};
use crate::domain::payments::{AccessStatus, ProductAccess};
use crate::ports::ProductAccessRepository;

/// PostgreSQL implementation of the ProductAccessRepository port.
///
/// One entitlement row per payment; granting upserts back to `active`,
/// which keeps the grant idempotent under dispatcher retries.
pub struct PostgresProductAccessRepository {
    pool: PgPool,
}

impl PostgresProductAccessRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductAccessRow {
    user_ref: String,
    product_ref: String,
    payment_id: Uuid,
    status: String,
    granted_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductAccessRow> for ProductAccess {
    type Error = DomainError;

    fn try_from(row: ProductAccessRow) -> Result<Self, Self::Error> {
        let status = AccessStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid access status value: {}", row.status),
            )
        })?;

        Ok(ProductAccess {
            user_ref: CustomerId::new(row.user_ref).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_ref: {}", e))
            })?,
            product_ref: ProductId::new(row.product_ref).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid product_ref: {}", e))
            })?,
            payment_ref: PaymentId::from_uuid(row.payment_id),
            status,
            granted_at: Timestamp::from_datetime(row.granted_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl ProductAccessRepository for PostgresProductAccessRepository {
    async fn grant(&self, access: &ProductAccess) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO product_access (user_ref, product_ref, payment_id, status, granted_at, updated_at)
            VALUES ($1, $2, $3, 'active', $4, $4)
            ON CONFLICT (payment_id)
            DO UPDATE SET status = 'active', updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(access.user_ref.as_str())
        .bind(access.product_ref.as_str())
        .bind(access.payment_ref.as_uuid())
        .bind(access.granted_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to grant access: {}", e))
        })?;

        Ok(())
    }

    async fn revoke_by_payment(&self, payment_id: &PaymentId) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE product_access
            SET status = 'inactive', updated_at = NOW()
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to revoke access: {}", e))
        })?;

        Ok(())
    }

    async fn find_by_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<ProductAccess>, DomainError> {
        let row: Option<ProductAccessRow> = sqlx::query_as(
            r#"
            SELECT user_ref, product_ref, payment_id, status, granted_at, updated_at
            FROM product_access
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find access: {}", e))
        })?;

        row.map(ProductAccess::try_from).transpose()
    }
}
