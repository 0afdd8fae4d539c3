//! Bridge between session entry points and the referral transaction.
//!
//! Every code that reaches the adapter ends up as exactly one recorded
//! [`ReferralAttempt`]; infrastructure failures are turned into `failed`
//! attempts here and never reach the caller as errors.

use std::sync::Arc;

use crate::{
    metrics,
    models::{
        analytics::{ReferralAnalytics, ReferralStats},
        attempt::{AttemptStatus, ReferralAttempt},
        referrals::{ReferralCode, ReferredUser},
        user::UserId,
    },
    repositories::StoreError,
    services::{
        alert_service::AlertService,
        attempt_ledger::AttemptLedger,
        local_cache::{get_json, set_json, CacheError, CacheKey, CacheResult, LocalCache},
        referral_service::{ReferralError, ReferralService, ReferralSource},
    },
    utils::referral_code::CodecError,
};

const PROCESSED_START_PARAMS_NAMESPACE: &str = "processed_start_params";

pub const PROBE_VALID_REASON: &str = "Referral code is valid";

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

#[derive(Clone)]
pub struct ReferralAdapter {
    service: ReferralService,
    ledger: AttemptLedger,
    markers: Arc<dyn LocalCache>,
    alerts: AlertService,
}

impl ReferralAdapter {
    pub fn new(
        service: ReferralService,
        ledger: AttemptLedger,
        markers: Arc<dyn LocalCache>,
        alerts: AlertService,
    ) -> Self {
        Self {
            service,
            ledger,
            markers,
            alerts,
        }
    }

    /// Runs the code handed over at session start, once per `(user, code)`.
    ///
    /// Returns `None` when there was nothing to do: no parameter, a blank one,
    /// or a code this user already went through.
    pub async fn process_start_parameter(
        &self,
        user_id: UserId,
        start_param: Option<&str>,
    ) -> Option<ReferralAttempt> {
        let code = start_param.map(str::trim).filter(|code| !code.is_empty())?;
        let canonical = code.to_uppercase();

        let key = CacheKey::scoped(user_id, PROCESSED_START_PARAMS_NAMESPACE);
        // None when the markers could not be read; they are then left untouched.
        let processed = match get_json::<Vec<String>>(self.markers.as_ref(), &key).await {
            Ok(processed) => Some(processed.unwrap_or_default()),
            Err(e) => {
                tracing::warn!("Failed to read start parameter markers for {}: {}", user_id, e);
                None
            }
        };

        if processed.as_ref().is_some_and(|processed| processed.contains(&canonical)) {
            tracing::debug!("Start parameter {} already processed for user {}", canonical, user_id);
            return None;
        }

        let attempt = self.run_transaction(user_id, code, ReferralSource::StartParam).await;

        if let Some(mut processed) = processed {
            processed.push(canonical);
            if let Err(e) = set_json(self.markers.as_ref(), &key, &processed).await {
                tracing::warn!("Failed to mark start parameter processed for {}: {}", user_id, e);
            }
        }

        Some(attempt)
    }

    pub async fn process_referral_code_manually(&self, user_id: UserId, code: &str) -> ReferralAttempt {
        self.run_transaction(user_id, code, ReferralSource::Manual).await
    }

    /// Format check plus referrer lookup. Never mutates referral state; the
    /// probe is still recorded in the ledger.
    pub async fn test_referral_code(&self, user_id: UserId, code: &str) -> ReferralAttempt {
        let attempt = match self.service.validator().validate(code, user_id) {
            Err(e) => ReferralAttempt::new(user_id, code, AttemptStatus::Invalid, e.to_string()),
            Ok(referrer_id) => match self.service.users().find_by_id(referrer_id).await {
                Ok(Some(referrer)) => ReferralAttempt::succeeded(user_id, code, PROBE_VALID_REASON, referrer.username),
                Ok(None) => ReferralAttempt::new(
                    user_id,
                    code,
                    AttemptStatus::Failed,
                    ReferralError::ReferrerNotFound.to_string(),
                ),
                Err(e) => {
                    tracing::error!("Referrer lookup for probe by {} failed: {}", user_id, e);
                    let err = ReferralError::StoreUnavailable(e);
                    ReferralAttempt::new(user_id, code, err.status(), err.to_string())
                }
            },
        };

        let attempt = attempt.into_probe();

        metrics::track_referral_attempt(ReferralSource::Probe.as_str(), attempt.status.as_str());
        self.record(user_id, &attempt).await;
        attempt
    }

    /// The user's own code, generated once and then read back from the store.
    pub async fn my_referral_code(&self, user_id: UserId) -> AdapterResult<ReferralCode> {
        if let Some(code) = self.service.users().get_referral_code(user_id).await? {
            return Ok(ReferralCode(code));
        }

        let encoded = self.service.validator().codec().encode(user_id)?;
        let stored = self
            .service
            .users()
            .save_referral_code_if_absent(user_id, encoded.0)
            .await?;

        Ok(ReferralCode(stored))
    }

    pub async fn attempt_history(&self, user_id: UserId, limit: usize) -> CacheResult<Vec<ReferralAttempt>> {
        self.ledger.list(user_id, limit).await
    }

    pub async fn clear_attempt_history(&self, user_id: UserId) -> CacheResult<()> {
        self.ledger.clear(user_id).await?;
        tracing::info!("Cleared referral attempt history for user {}", user_id);
        Ok(())
    }

    pub async fn referral_stats(&self, user_id: UserId) -> AdapterResult<ReferralStats> {
        let direct_referrals = self.service.users().get_direct_referral_count(user_id).await?;
        let total_referral_earnings = self.service.earnings().total_referral_earnings(user_id).await?;
        let attempts = self.ledger.list(user_id, self.ledger.cap()).await?;

        Ok(ReferralStats {
            direct_referrals,
            total_referral_earnings,
            analytics: ReferralAnalytics::from_attempts(&attempts),
        })
    }

    /// Referred users with their points, highest first.
    pub async fn list_referrals(&self, user_id: UserId) -> AdapterResult<Vec<ReferredUser>> {
        Ok(self.service.referrals().list_by_referrer(user_id).await?)
    }

    async fn run_transaction(&self, user_id: UserId, code: &str, source: ReferralSource) -> ReferralAttempt {
        let outcome = self.service.process(user_id, code, source).await;

        self.record(user_id, &outcome.attempt).await;

        if matches!(outcome.result, Err(ReferralError::CircularReferral)) {
            self.raise_circular_alert(user_id, code);
        }

        outcome.attempt
    }

    /// Sent in the background; the webhook never holds up the response.
    fn raise_circular_alert(&self, user_id: UserId, code: &str) {
        let Ok(referrer_id) = self.service.validator().codec().decode(code) else {
            return;
        };

        let alerts = self.alerts.clone();
        let code = code.trim().to_uppercase();

        tokio::spawn(async move {
            if let Err(e) = alerts.send_circular_referral_alert(user_id, referrer_id, &code).await {
                tracing::warn!("Failed to send circular referral alert: {}", e);
                metrics::track_best_effort_failure("circular_referral_alert");
            }
        });
    }

    async fn record(&self, user_id: UserId, attempt: &ReferralAttempt) {
        if let Err(e) = self.ledger.record(user_id, attempt.clone()).await {
            tracing::warn!("Failed to record referral attempt {} for {}: {}", attempt.id, user_id, e);
        }
    }
}
