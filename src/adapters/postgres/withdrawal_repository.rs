//! PostgreSQL implementation of WithdrawalRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, Money, SellerId, Timestamp, WithdrawalId,
};
use crate::domain::payments::{Withdrawal, WithdrawalStatus};
use crate::ports::WithdrawalRepository;

/// PostgreSQL implementation of the WithdrawalRepository port.
pub struct PostgresWithdrawalRepository {
    pool: PgPool,
}

impl PostgresWithdrawalRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WithdrawalRow {
    id: Uuid,
    seller_ref: String,
    amount_minor: i64,
    currency: String,
    status: String,
    payout_info: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WithdrawalRow> for Withdrawal {
    type Error = DomainError;

    fn try_from(row: WithdrawalRow) -> Result<Self, Self::Error> {
        let status = WithdrawalStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid withdrawal status value: {}", row.status),
            )
        })?;
        let currency = Currency::parse(&row.currency).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid currency: {}", e))
        })?;
        let amount = Money::new(row.amount_minor, currency).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid amount: {}", e))
        })?;

        Ok(Withdrawal {
            id: WithdrawalId::from_uuid(row.id),
            seller_ref: SellerId::new(row.seller_ref).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid seller_ref: {}", e))
            })?,
            amount,
            status,
            payout_info: row.payout_info,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl WithdrawalRepository for PostgresWithdrawalRepository {
    async fn insert(&self, withdrawal: &Withdrawal) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO withdrawals (
                id, seller_ref, amount_minor, currency, status, payout_info, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(withdrawal.id.as_uuid())
        .bind(withdrawal.seller_ref.as_str())
        .bind(withdrawal.amount.amount_minor())
        .bind(withdrawal.amount.currency().as_str())
        .bind(withdrawal.status.as_str())
        .bind(&withdrawal.payout_info)
        .bind(withdrawal.created_at.as_datetime())
        .bind(withdrawal.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert withdrawal: {}", e),
            )
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &WithdrawalId) -> Result<Option<Withdrawal>, DomainError> {
        let row: Option<WithdrawalRow> = sqlx::query_as(
            r#"
            SELECT id, seller_ref, amount_minor, currency, status, payout_info, created_at, updated_at
            FROM withdrawals
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find withdrawal: {}", e),
            )
        })?;

        row.map(Withdrawal::try_from).transpose()
    }

    async fn list_by_seller(&self, seller: &SellerId) -> Result<Vec<Withdrawal>, DomainError> {
        let rows: Vec<WithdrawalRow> = sqlx::query_as(
            r#"
            SELECT id, seller_ref, amount_minor, currency, status, payout_info, created_at, updated_at
            FROM withdrawals
            WHERE seller_ref = $1
            ORDER BY created_at
            "#,
        )
        .bind(seller.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to list withdrawals: {}", e),
            )
        })?;

        rows.into_iter().map(Withdrawal::try_from).collect()
    }

    async fn update_status(
        &self,
        id: &WithdrawalId,
        expected: WithdrawalStatus,
        target: WithdrawalStatus,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE withdrawals
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(target.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update withdrawal: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::WithdrawalTerminal,
                format!("Withdrawal {} is not in status {}", id, expected.as_str()),
            ));
        }

        Ok(())
    }
}
