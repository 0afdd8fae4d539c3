use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

use crate::models::{ModelError, ModelResult};

/// Stable integer identity of a participant. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "i64", into = "i64")]
#[sqlx(transparent)]
pub struct UserId(i64);
impl UserId {
    pub fn new(value: i64) -> ModelResult<Self> {
        if value <= 0 {
            return Err(ModelError::InvalidUserId(value));
        }

        Ok(UserId(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        UserId::new(value)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<i64>().map_err(|_| ModelError::InvalidUserId(0))?;
        UserId::new(value)
    }
}

/// The slice of a user record the referral engine is allowed to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
}
impl<'r> FromRow<'r, PgRow> for UserSummary {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let username = row.try_get("username")?;

        Ok(UserSummary { id, username })
    }
}
