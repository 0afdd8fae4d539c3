//! The referral transaction.
//!
//! [`ReferralService`] is the only writer of referral edges, `referrer_id`
//! and earnings credits. Every submission runs the same ordered checks and
//! ends in exactly one [`ReferralAttempt`]:
//!
//! 1. format (via [`ReferralValidator`])
//! 2. referred user already has a referrer
//! 3. edge `(referrer, referred)` already exists
//! 4. self-referral against the authoritative ids
//! 5. referrer exists
//! 6. reverse edge `(referred, referrer)` exists (single-hop circularity)
//! 7. commit: edge, `referrer_id`, counter (best effort), welcome credit,
//!    referrer credit
//!
//! Steps run strictly in order and each short-circuits. Uniqueness across
//! concurrent transactions is left to the store's constraints.

use std::{sync::Arc, time::Instant};

use crate::{
    config::ReferralConfig,
    metrics,
    models::{
        attempt::{AttemptStatus, ReferralAttempt},
        earnings::EarningsCredit,
        referrals::ReferralId,
        user::{UserId, UserSummary},
    },
    repositories::{EarningsStore, ReferralEdgeStore, StoreError, UserStore},
    services::referral_validator::{ReferralValidator, ValidationError},
};

pub const SUCCESS_REASON: &str = "Referral processed successfully";

#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("User already has a referrer")]
    AlreadyReferred,
    #[error("Referral relationship already exists")]
    DuplicateEdge,
    #[error("Cannot refer yourself")]
    SelfReferral,
    #[error("Referrer not found")]
    ReferrerNotFound,
    #[error("Circular referral not allowed")]
    CircularReferral,
    #[error("Failed to process referral, please try again")]
    StoreUnavailable(#[source] StoreError),
}

impl ReferralError {
    pub fn status(&self) -> AttemptStatus {
        match self {
            ReferralError::Validation(_) => AttemptStatus::Invalid,
            ReferralError::AlreadyReferred => AttemptStatus::Duplicate,
            ReferralError::DuplicateEdge => AttemptStatus::Duplicate,
            ReferralError::SelfReferral => AttemptStatus::Invalid,
            ReferralError::ReferrerNotFound => AttemptStatus::Failed,
            ReferralError::CircularReferral => AttemptStatus::Invalid,
            ReferralError::StoreUnavailable(_) => AttemptStatus::Failed,
        }
    }
}

impl From<StoreError> for ReferralError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEdge => ReferralError::DuplicateEdge,
            StoreError::ReferrerAlreadySet(_) => ReferralError::AlreadyReferred,
            other => ReferralError::StoreUnavailable(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralSource {
    StartParam,
    Manual,
    Probe,
}

impl ReferralSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralSource::StartParam => "start_param",
            ReferralSource::Manual => "manual",
            ReferralSource::Probe => "probe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardAmounts {
    pub welcome_bonus: i64,
    pub referrer_bonus: i64,
}

impl From<&ReferralConfig> for RewardAmounts {
    fn from(config: &ReferralConfig) -> Self {
        Self {
            welcome_bonus: config.welcome_bonus,
            referrer_bonus: config.referrer_bonus,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommittedReferral {
    pub referral_id: ReferralId,
    pub referrer: UserSummary,
}

/// The attempt plus the typed reason behind it, so callers can react to
/// specific outcomes without parsing messages.
#[derive(Debug)]
pub struct ReferralOutcome {
    pub attempt: ReferralAttempt,
    pub result: Result<CommittedReferral, ReferralError>,
}

#[derive(Clone)]
pub struct ReferralService {
    users: Arc<dyn UserStore>,
    referrals: Arc<dyn ReferralEdgeStore>,
    earnings: Arc<dyn EarningsStore>,
    validator: ReferralValidator,
    rewards: RewardAmounts,
}

impl ReferralService {
    pub fn new(
        users: Arc<dyn UserStore>,
        referrals: Arc<dyn ReferralEdgeStore>,
        earnings: Arc<dyn EarningsStore>,
        validator: ReferralValidator,
        rewards: RewardAmounts,
    ) -> Self {
        Self {
            users,
            referrals,
            earnings,
            validator,
            rewards,
        }
    }

    pub fn validator(&self) -> &ReferralValidator {
        &self.validator
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    pub fn referrals(&self) -> &Arc<dyn ReferralEdgeStore> {
        &self.referrals
    }

    pub fn earnings(&self) -> &Arc<dyn EarningsStore> {
        &self.earnings
    }

    pub async fn process(&self, referred_id: UserId, code: &str, source: ReferralSource) -> ReferralOutcome {
        let started = Instant::now();
        let result = self.run(referred_id, code).await;

        let attempt = match &result {
            Ok(committed) => ReferralAttempt::succeeded(
                referred_id,
                code,
                SUCCESS_REASON,
                committed.referrer.username.clone(),
            ),
            Err(err) => ReferralAttempt::new(referred_id, code, err.status(), err.to_string()),
        };

        match &result {
            Ok(committed) => tracing::info!(
                "Referral {} committed: {} -> {} via {}",
                committed.referral_id,
                committed.referrer.id,
                referred_id,
                source.as_str()
            ),
            Err(ReferralError::StoreUnavailable(e)) => tracing::error!(
                "Referral for user {} with code {} failed on store: {}",
                referred_id,
                attempt.code,
                e
            ),
            Err(e) => tracing::info!(
                "Referral for user {} with code {} ended as {}: {}",
                referred_id,
                attempt.code,
                attempt.status,
                e
            ),
        }

        metrics::track_referral_transaction(attempt.status.as_str(), started);
        metrics::track_referral_attempt(source.as_str(), attempt.status.as_str());

        ReferralOutcome { attempt, result }
    }

    async fn run(&self, referred_id: UserId, code: &str) -> Result<CommittedReferral, ReferralError> {
        let referrer_id = self.validator.validate(code, referred_id)?;

        if self.users.get_referrer_id(referred_id).await?.is_some() {
            return Err(ReferralError::AlreadyReferred);
        }

        if self.referrals.exists(referrer_id, referred_id).await? {
            return Err(ReferralError::DuplicateEdge);
        }

        if referrer_id == referred_id {
            return Err(ReferralError::SelfReferral);
        }

        let referrer = self
            .users
            .find_by_id(referrer_id)
            .await?
            .ok_or(ReferralError::ReferrerNotFound)?;

        if self.referrals.exists(referred_id, referrer_id).await? {
            tracing::warn!(
                "Circular referral attempt: user {} tried to claim {} who they referred",
                referred_id,
                referrer_id
            );
            return Err(ReferralError::CircularReferral);
        }

        let referral_id = self.commit(referrer_id, referred_id).await?;

        Ok(CommittedReferral { referral_id, referrer })
    }

    async fn commit(&self, referrer_id: UserId, referred_id: UserId) -> Result<ReferralId, ReferralError> {
        let referral_id = self.referrals.insert(referrer_id, referred_id).await?;

        self.users.set_referrer_id(referred_id, referrer_id).await?;

        // display aggregate only, the edge is the source of truth
        if let Err(e) = self.users.increment_direct_referral_count(referrer_id).await {
            tracing::warn!("Failed to increment direct referral count for {}: {}", referrer_id, e);
            metrics::track_best_effort_failure("increment_direct_referral_count");
        }

        self.earnings
            .credit(EarningsCredit::welcome(
                referred_id,
                referral_id,
                self.rewards.welcome_bonus,
            ))
            .await?;

        self.earnings
            .credit(EarningsCredit::referrer(
                referrer_id,
                referral_id,
                self.rewards.referrer_bonus,
            ))
            .await?;

        Ok(referral_id)
    }
}
