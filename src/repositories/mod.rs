//! Persistence boundary of the referral engine.
//!
//! The service layer only talks to these traits. Results are decoded into
//! typed values here, so nothing above inspects raw rows.

use async_trait::async_trait;

use crate::{
    db_persistence::DbError,
    models::{
        attempt::ReferralAttempt,
        earnings::EarningsCredit,
        referrals::{ReferralId, ReferredUser},
        user::{UserId, UserSummary},
    },
};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Referral relationship already exists")]
    DuplicateEdge,
    #[error("Referrer already set for user {0}")]
    ReferrerAlreadySet(UserId),
    #[error("User not found: {0}")]
    UserNotFound(UserId),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_referrer_id(&self, user_id: UserId) -> StoreResult<Option<UserId>>;

    /// Sets the referrer only if none is recorded yet. Fails with
    /// [`StoreError::ReferrerAlreadySet`] otherwise.
    async fn set_referrer_id(&self, user_id: UserId, referrer_id: UserId) -> StoreResult<()>;

    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<UserSummary>>;

    async fn increment_direct_referral_count(&self, user_id: UserId) -> StoreResult<()>;

    async fn get_direct_referral_count(&self, user_id: UserId) -> StoreResult<i64>;

    async fn get_referral_code(&self, user_id: UserId) -> StoreResult<Option<String>>;

    /// Persists `code` unless the user already has one; returns the stored code.
    async fn save_referral_code_if_absent(&self, user_id: UserId, code: String) -> StoreResult<String>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferralEdgeStore: Send + Sync {
    async fn exists(&self, referrer_id: UserId, referred_id: UserId) -> StoreResult<bool>;

    /// Fails with [`StoreError::DuplicateEdge`] when a uniqueness constraint
    /// rejects the row.
    async fn insert(&self, referrer_id: UserId, referred_id: UserId) -> StoreResult<ReferralId>;

    async fn list_by_referrer(&self, referrer_id: UserId) -> StoreResult<Vec<ReferredUser>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EarningsStore: Send + Sync {
    /// Idempotent on `(user_id, related_referral_id, level)`.
    async fn credit(&self, credit: EarningsCredit) -> StoreResult<()>;

    async fn total_referral_earnings(&self, user_id: UserId) -> StoreResult<i64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttemptMirror: Send + Sync {
    async fn send(&self, attempt: ReferralAttempt) -> StoreResult<()>;
}

pub mod attempt;
pub mod earnings;
pub mod referral;
pub mod user;
