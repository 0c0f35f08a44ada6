//! PostgreSQL implementation of BalanceLedger.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, SellerId};
use crate::domain::payments::AdjustmentKind;
use crate::ports::{AdjustmentOutcome, BalanceLedger};

/// PostgreSQL implementation of the BalanceLedger port.
///
/// Adjustments are rows keyed `(payment_ref, kind)`; `ON CONFLICT DO
/// NOTHING` makes `apply_adjustment` an idempotent keyed increment, and
/// the availability query sums rows rather than maintaining a mutable
/// balance column, so concurrent appliers cannot lose updates.
pub struct PostgresBalanceLedger {
    pool: PgPool,
}

impl PostgresBalanceLedger {
    /// Creates a new ledger with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BalanceLedger for PostgresBalanceLedger {
    async fn apply_adjustment(
        &self,
        seller_ref: &SellerId,
        payment_ref: &str,
        kind: AdjustmentKind,
        amount_minor: i64,
    ) -> Result<AdjustmentOutcome, DomainError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO balance_adjustments (payment_ref, kind, seller_ref, amount_minor, applied_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (payment_ref, kind) DO NOTHING
            "#,
        )
        .bind(payment_ref)
        .bind(kind.as_str())
        .bind(seller_ref.as_str())
        .bind(amount_minor)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to apply balance adjustment: {}", e),
            )
        })?;

        if inserted.rows_affected() == 1 {
            Ok(AdjustmentOutcome::Applied)
        } else {
            Ok(AdjustmentOutcome::AlreadyApplied)
        }
    }

    async fn available_balance(&self, seller_ref: &SellerId) -> Result<i64, DomainError> {
        let (balance,): (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE((
                SELECT SUM(amount_minor) FROM balance_adjustments
                WHERE seller_ref = $1 AND kind <> 'payout_paid'
            ), 0) - COALESCE((
                SELECT SUM(amount_minor) FROM withdrawals
                WHERE seller_ref = $1 AND status IN ('pending', 'completed')
            ), 0)
            "#,
        )
        .bind(seller_ref.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to compute available balance: {}", e),
            )
        })?;

        Ok(balance)
    }

    async fn withdrawn_total(&self, seller_ref: &SellerId) -> Result<i64, DomainError> {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount_minor), 0) FROM balance_adjustments
            WHERE seller_ref = $1 AND kind = 'payout_paid'
            "#,
        )
        .bind(seller_ref.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to compute withdrawn total: {}", e),
            )
        })?;

        Ok(total)
    }
}
