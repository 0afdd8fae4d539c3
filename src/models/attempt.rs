use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

use crate::models::{user::UserId, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttemptStatus {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "invalid")]
    Invalid,
    #[serde(rename = "duplicate")]
    Duplicate,
    #[serde(rename = "self_referral")]
    SelfReferral,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Success => "success",
            AttemptStatus::Failed => "failed",
            AttemptStatus::Invalid => "invalid",
            AttemptStatus::Duplicate => "duplicate",
            AttemptStatus::SelfReferral => "self_referral",
        }
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttemptStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(AttemptStatus::Success),
            "failed" => Ok(AttemptStatus::Failed),
            "invalid" => Ok(AttemptStatus::Invalid),
            "duplicate" => Ok(AttemptStatus::Duplicate),
            "self_referral" => Ok(AttemptStatus::SelfReferral),
            _ => Err(ModelError::InvalidStatus(s.to_string())),
        }
    }
}

/// One processed code submission. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralAttempt {
    pub id: Uuid,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub code: String,
    pub status: AttemptStatus,
    pub reason: String,
    pub referrer_username: Option<String>,
    /// Set on "is this code valid" checks, which never create an edge.
    #[serde(default)]
    pub probe: bool,
}
impl ReferralAttempt {
    pub fn new(user_id: UserId, code: &str, status: AttemptStatus, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            timestamp: Utc::now(),
            code: code.trim().to_uppercase(),
            status,
            reason: reason.into(),
            referrer_username: None,
            probe: false,
        }
    }

    pub fn succeeded(user_id: UserId, code: &str, reason: impl Into<String>, referrer_username: String) -> Self {
        let mut attempt = Self::new(user_id, code, AttemptStatus::Success, reason);
        attempt.referrer_username = Some(referrer_username);
        attempt
    }

    pub fn into_probe(mut self) -> Self {
        self.probe = true;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == AttemptStatus::Success
    }

    /// A success that actually committed a referral.
    pub fn is_referral(&self) -> bool {
        self.is_success() && !self.probe
    }
}
impl<'r> FromRow<'r, PgRow> for ReferralAttempt {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let user_id = row.try_get("user_id")?;
        let timestamp = row.try_get("created_at")?;
        let code = row.try_get("code")?;
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<AttemptStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let reason = row.try_get("reason")?;
        let referrer_username = row.try_get("referrer_username")?;
        let probe = row.try_get("probe")?;

        Ok(ReferralAttempt {
            id,
            user_id,
            timestamp,
            code,
            status,
            reason,
            referrer_username,
            probe,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AttemptHistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&AttemptStatus::SelfReferral).unwrap(),
            "\"self_referral\""
        );
        assert_eq!("DUPLICATE".parse::<AttemptStatus>().unwrap(), AttemptStatus::Duplicate);
        assert!("maybe".parse::<AttemptStatus>().is_err());
    }

    #[test]
    fn test_attempt_canonicalizes_code() {
        let user = UserId::new(1).unwrap();
        let attempt = ReferralAttempt::new(user, "  divine001001abcd ", AttemptStatus::Invalid, "nope");

        assert_eq!(attempt.code, "DIVINE001001ABCD");
        assert!(attempt.referrer_username.is_none());
        assert!(!attempt.is_success());
    }

    #[test]
    fn test_succeeded_carries_username() {
        let user = UserId::new(2002).unwrap();
        let attempt = ReferralAttempt::succeeded(user, "DIVINE001001ABCD", "ok", "alice".to_string());

        assert!(attempt.is_success());
        assert!(attempt.is_referral());
        assert_eq!(attempt.referrer_username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_probe_success_is_not_a_referral() {
        let user = UserId::new(2002).unwrap();
        let attempt = ReferralAttempt::succeeded(user, "DIVINE001001ABCD", "ok", "alice".to_string()).into_probe();

        assert!(attempt.is_success());
        assert!(!attempt.is_referral());
    }

    #[test]
    fn test_records_without_probe_flag_still_deserialize() {
        let raw = r#"{"id":"6f1c2b1e-8a8e-4d8e-9a57-3b1f6b7c2d10","user_id":1,"timestamp":"2025-06-01T00:00:00Z","code":"DIVINE001001ABCD","status":"invalid","reason":"nope","referrer_username":null}"#;

        let attempt: ReferralAttempt = serde_json::from_str(raw).unwrap();
        assert!(!attempt.probe);
    }
}
