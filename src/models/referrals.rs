use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

use crate::models::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct ReferralId(pub i64);

impl std::fmt::Display for ReferralId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical (uppercase) shareable referral code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct ReferralCode(pub String);
impl ReferralCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directed `referrer -> referred` relationship. At most one per ordered pair,
/// never self-referencing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReferralEdge {
    pub id: ReferralId,
    pub referrer_id: UserId,
    pub referred_id: UserId,
    pub created_at: DateTime<Utc>,
}
impl<'r> FromRow<'r, PgRow> for ReferralEdge {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let referrer_id = row.try_get("referrer_id")?;
        let referred_id = row.try_get("referred_id")?;
        let created_at = row.try_get("created_at")?;

        Ok(ReferralEdge {
            id,
            referrer_id,
            referred_id,
            created_at,
        })
    }
}

/// Display projection of a referred user, enriched with the mining points
/// signal used for UI ranking.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReferredUser {
    pub user_id: UserId,
    pub username: String,
    pub points: i64,
    pub referred_at: DateTime<Utc>,
}
impl<'r> FromRow<'r, PgRow> for ReferredUser {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let user_id = row.try_get("user_id")?;
        let username = row.try_get("username")?;
        let points = row.try_get("points")?;
        let referred_at = row.try_get("referred_at")?;

        Ok(ReferredUser {
            user_id,
            username,
            points,
            referred_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReferralCodeInput {
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionStartInput {
    pub start_param: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionStartResponse {
    pub processed: bool,
    pub attempt: Option<crate::models::attempt::ReferralAttempt>,
}

#[derive(Debug, Serialize)]
pub struct MyReferralCodeResponse {
    pub code: ReferralCode,
}
