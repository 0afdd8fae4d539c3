use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    models::{
        referrals::{ReferralEdge, ReferralId, ReferredUser},
        user::UserId,
    },
    repositories::{DbResult, ReferralEdgeStore, StoreError, StoreResult},
};

#[derive(Clone, Debug)]
pub struct ReferralRepository {
    pool: PgPool,
}
impl ReferralRepository {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub async fn find_by_referred(&self, referred_id: UserId) -> DbResult<Option<ReferralEdge>> {
        let edge = sqlx::query_as::<_, ReferralEdge>("SELECT * FROM referrals WHERE referred_id = $1")
            .bind(referred_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(edge)
    }
}

#[async_trait]
impl ReferralEdgeStore for ReferralRepository {
    async fn exists(&self, referrer_id: UserId, referred_id: UserId) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM referrals WHERE referrer_id = $1 AND referred_id = $2)",
        )
        .bind(referrer_id)
        .bind(referred_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert(&self, referrer_id: UserId, referred_id: UserId) -> StoreResult<ReferralId> {
        let created_id = sqlx::query_scalar::<_, ReferralId>(
            "
        INSERT INTO referrals (referrer_id, referred_id)
        VALUES ($1, $2)
        RETURNING id
        ",
        )
        .bind(referrer_id)
        .bind(referred_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::DuplicateEdge,
            _ => StoreError::from(err),
        })?;

        Ok(created_id)
    }

    async fn list_by_referrer(&self, referrer_id: UserId) -> StoreResult<Vec<ReferredUser>> {
        let referred = sqlx::query_as::<_, ReferredUser>(
            r#"
        SELECT u.id AS user_id, u.username, u.points, r.created_at AS referred_at
        FROM referrals r
        JOIN users u ON u.id = r.referred_id
        WHERE r.referrer_id = $1
        ORDER BY u.points DESC, r.created_at ASC
        "#,
        )
        .bind(referrer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(referred)
    }
}
