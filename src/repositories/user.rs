use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    models::user::{UserId, UserSummary},
    repositories::{DbResult, StoreError, StoreResult, UserStore},
};

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: PgPool,
}
impl UserRepository {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Users are owned by the host app; this is for seeding and tests.
    pub async fn create(&self, user_id: UserId, username: &str) -> DbResult<UserId> {
        let created_id = sqlx::query_scalar::<_, UserId>(
            "
        INSERT INTO users (id, username)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username
        RETURNING id
        ",
        )
        .bind(user_id)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(created_id)
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn get_referrer_id(&self, user_id: UserId) -> StoreResult<Option<UserId>> {
        let referrer_id = sqlx::query_scalar::<_, Option<UserId>>("SELECT referrer_id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(referrer_id.flatten())
    }

    async fn set_referrer_id(&self, user_id: UserId, referrer_id: UserId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET referrer_id = $2 WHERE id = $1 AND referrer_id IS NULL")
            .bind(user_id)
            .bind(referrer_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.find_by_id(user_id).await? {
            Some(_) => Err(StoreError::ReferrerAlreadySet(user_id)),
            None => Err(StoreError::UserNotFound(user_id)),
        }
    }

    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<UserSummary>> {
        let user = sqlx::query_as::<_, UserSummary>("SELECT id, username FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn increment_direct_referral_count(&self, user_id: UserId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET direct_referrals = direct_referrals + 1 WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound(user_id));
        }

        Ok(())
    }

    async fn get_direct_referral_count(&self, user_id: UserId) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i32>("SELECT direct_referrals FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(count.unwrap_or(0) as i64)
    }

    async fn get_referral_code(&self, user_id: UserId) -> StoreResult<Option<String>> {
        let code = sqlx::query_scalar::<_, Option<String>>("SELECT referral_code FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(code.flatten())
    }

    async fn save_referral_code_if_absent(&self, user_id: UserId, code: String) -> StoreResult<String> {
        let stored = sqlx::query_scalar::<_, Option<String>>(
            r#"
        UPDATE users
        SET referral_code = COALESCE(referral_code, $2)
        WHERE id = $1
        RETURNING referral_code
        "#,
        )
        .bind(user_id)
        .bind(&code)
        .fetch_optional(&self.pool)
        .await?;

        stored.flatten().ok_or(StoreError::UserNotFound(user_id))
    }
}
