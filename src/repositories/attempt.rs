use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    models::{attempt::ReferralAttempt, user::UserId},
    repositories::{AttemptMirror, DbResult, StoreResult},
};

/// Server-side copy of every attempt, for cross-device analytics.
#[derive(Clone, Debug)]
pub struct AttemptRepository {
    pool: PgPool,
}
impl AttemptRepository {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn find_recent_by_user(&self, user_id: UserId, limit: i64) -> DbResult<Vec<ReferralAttempt>> {
        let attempts = sqlx::query_as::<_, ReferralAttempt>(
            "SELECT * FROM referral_attempts WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(attempts)
    }
}

#[async_trait]
impl AttemptMirror for AttemptRepository {
    async fn send(&self, attempt: ReferralAttempt) -> StoreResult<()> {
        sqlx::query(
            r#"
        INSERT INTO referral_attempts (id, user_id, code, status, reason, referrer_username, created_at, probe)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO NOTHING
        "#,
        )
        .bind(attempt.id)
        .bind(attempt.user_id)
        .bind(&attempt.code)
        .bind(attempt.status.as_str())
        .bind(&attempt.reason)
        .bind(&attempt.referrer_username)
        .bind(attempt.timestamp)
        .bind(attempt.probe)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
