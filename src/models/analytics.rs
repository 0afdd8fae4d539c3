use serde::{Deserialize, Serialize};

use crate::models::attempt::{AttemptStatus, ReferralAttempt};

/// Aggregate view over a user's attempt ledger. Derived, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferralAnalytics {
    pub total_attempts: usize,
    pub successful_referrals: usize,
    pub failed_attempts: usize,
    /// Percentage in `0.0..=100.0`.
    pub conversion_rate: f64,
}
impl ReferralAnalytics {
    pub fn from_attempts(attempts: &[ReferralAttempt]) -> Self {
        let total_attempts = attempts.len();
        let successful_referrals = attempts
            .iter()
            .filter(|a| a.is_referral())
            .count();
        let failed_attempts = attempts
            .iter()
            .filter(|a| matches!(a.status, AttemptStatus::Failed | AttemptStatus::Invalid))
            .count();

        let conversion_rate = successful_referrals as f64 / total_attempts.max(1) as f64 * 100.0;

        Self {
            total_attempts,
            successful_referrals,
            failed_attempts,
            conversion_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralStats {
    pub direct_referrals: i64,
    pub total_referral_earnings: i64,
    pub analytics: ReferralAnalytics,
}
