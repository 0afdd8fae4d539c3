use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

use crate::models::{referrals::ReferralId, user::UserId, ModelError};

/// Which side of a referral a credit rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum CreditLevel {
    /// Welcome bonus for the referred user.
    Welcome,
    /// Bonus for the referrer.
    Referrer,
}

impl CreditLevel {
    pub fn as_i16(self) -> i16 {
        match self {
            CreditLevel::Welcome => 0,
            CreditLevel::Referrer => 1,
        }
    }
}

impl TryFrom<i16> for CreditLevel {
    type Error = ModelError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CreditLevel::Welcome),
            1 => Ok(CreditLevel::Referrer),
            other => Err(ModelError::InvalidCreditLevel(other)),
        }
    }
}

impl From<CreditLevel> for i16 {
    fn from(level: CreditLevel) -> Self {
        level.as_i16()
    }
}

/// A bonus ledger entry. Unique per `(user_id, related_referral_id, level)`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EarningsCredit {
    pub user_id: UserId,
    pub related_referral_id: ReferralId,
    pub amount: i64,
    pub level: CreditLevel,
    pub created_at: Option<DateTime<Utc>>,
}
impl EarningsCredit {
    pub fn welcome(user_id: UserId, related_referral_id: ReferralId, amount: i64) -> Self {
        Self {
            user_id,
            related_referral_id,
            amount,
            level: CreditLevel::Welcome,
            created_at: None,
        }
    }

    pub fn referrer(user_id: UserId, related_referral_id: ReferralId, amount: i64) -> Self {
        Self {
            user_id,
            related_referral_id,
            amount,
            level: CreditLevel::Referrer,
            created_at: None,
        }
    }

    pub fn key(&self) -> (UserId, ReferralId, CreditLevel) {
        (self.user_id, self.related_referral_id, self.level)
    }
}
impl<'r> FromRow<'r, PgRow> for EarningsCredit {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let user_id = row.try_get("user_id")?;
        let related_referral_id = row.try_get("related_referral_id")?;
        let amount = row.try_get("amount")?;
        let level: i16 = row.try_get("level")?;
        let level = CreditLevel::try_from(level).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let created_at = row.try_get("created_at")?;

        Ok(EarningsCredit {
            user_id,
            related_referral_id,
            amount,
            level,
            created_at,
        })
    }
}
