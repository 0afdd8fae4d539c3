use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    models::{
        earnings::{CreditLevel, EarningsCredit},
        user::UserId,
    },
    repositories::{DbResult, EarningsStore, StoreResult},
};

#[derive(Clone, Debug)]
pub struct EarningsRepository {
    pool: PgPool,
}
impl EarningsRepository {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn find_all_by_user(&self, user_id: UserId) -> DbResult<Vec<EarningsCredit>> {
        let credits =
            sqlx::query_as::<_, EarningsCredit>("SELECT * FROM earnings WHERE user_id = $1 ORDER BY created_at ASC")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(credits)
    }
}

#[async_trait]
impl EarningsStore for EarningsRepository {
    async fn credit(&self, credit: EarningsCredit) -> StoreResult<()> {
        let inserted = sqlx::query(
            r#"
        INSERT INTO earnings (user_id, related_referral_id, amount, level)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, related_referral_id, level) DO NOTHING
        "#,
        )
        .bind(credit.user_id)
        .bind(credit.related_referral_id)
        .bind(credit.amount)
        .bind(credit.level.as_i16())
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            tracing::debug!(
                "Credit for user {} on referral {} already exists, skipping",
                credit.user_id,
                credit.related_referral_id
            );
        }

        Ok(())
    }

    async fn total_referral_earnings(&self, user_id: UserId) -> StoreResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM earnings WHERE user_id = $1 AND level = $2",
        )
        .bind(user_id)
        .bind(CreditLevel::Referrer.as_i16())
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}
