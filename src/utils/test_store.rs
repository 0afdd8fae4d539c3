//! In-memory stand-in for the Postgres repositories. Enforces the same
//! uniqueness constraints as the schema so transaction tests exercise the
//! race-safety paths.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    models::{
        attempt::ReferralAttempt,
        earnings::{CreditLevel, EarningsCredit},
        referrals::{ReferralEdge, ReferralId, ReferredUser},
        user::{UserId, UserSummary},
    },
    repositories::{AttemptMirror, EarningsStore, ReferralEdgeStore, StoreError, StoreResult, UserStore},
};

#[derive(Debug, Clone)]
struct UserRow {
    username: String,
    referrer_id: Option<UserId>,
    direct_referrals: i64,
    points: i64,
    referral_code: Option<String>,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, UserRow>,
    edges: Vec<ReferralEdge>,
    credits: Vec<EarningsCredit>,
    attempts: Vec<ReferralAttempt>,
    next_edge_id: i64,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user_id: UserId, username: &str) {
        let mut tables = self.tables.lock().unwrap();
        tables.users.insert(
            user_id,
            UserRow {
                username: username.to_string(),
                referrer_id: None,
                direct_referrals: 0,
                points: 0,
                referral_code: None,
            },
        );
    }

    pub fn set_points(&self, user_id: UserId, points: i64) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(row) = tables.users.get_mut(&user_id) {
            row.points = points;
        }
    }

    /// Bypasses the constraints, for setting up partially committed state.
    pub fn insert_raw_edge(&self, referrer_id: UserId, referred_id: UserId) -> ReferralId {
        let mut tables = self.tables.lock().unwrap();
        tables.next_edge_id += 1;
        let id = ReferralId(tables.next_edge_id);
        tables.edges.push(ReferralEdge {
            id,
            referrer_id,
            referred_id,
            created_at: Utc::now(),
        });
        id
    }

    pub fn edges(&self) -> Vec<ReferralEdge> {
        self.tables.lock().unwrap().edges.clone()
    }

    pub fn has_edge(&self, referrer_id: UserId, referred_id: UserId) -> bool {
        self.tables
            .lock()
            .unwrap()
            .edges
            .iter()
            .any(|e| e.referrer_id == referrer_id && e.referred_id == referred_id)
    }

    pub fn referrer_of(&self, user_id: UserId) -> Option<UserId> {
        self.tables
            .lock()
            .unwrap()
            .users
            .get(&user_id)
            .and_then(|row| row.referrer_id)
    }

    pub fn direct_referrals(&self, user_id: UserId) -> i64 {
        self.tables
            .lock()
            .unwrap()
            .users
            .get(&user_id)
            .map(|row| row.direct_referrals)
            .unwrap_or(0)
    }

    pub fn credits(&self) -> Vec<EarningsCredit> {
        self.tables.lock().unwrap().credits.clone()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_referrer_id(&self, user_id: UserId) -> StoreResult<Option<UserId>> {
        Ok(self.referrer_of(user_id))
    }

    async fn set_referrer_id(&self, user_id: UserId, referrer_id: UserId) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let row = tables.users.get_mut(&user_id).ok_or(StoreError::UserNotFound(user_id))?;
        if row.referrer_id.is_some() {
            return Err(StoreError::ReferrerAlreadySet(user_id));
        }
        row.referrer_id = Some(referrer_id);
        Ok(())
    }

    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<UserSummary>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.get(&user_id).map(|row| UserSummary {
            id: user_id,
            username: row.username.clone(),
        }))
    }

    async fn increment_direct_referral_count(&self, user_id: UserId) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let row = tables.users.get_mut(&user_id).ok_or(StoreError::UserNotFound(user_id))?;
        row.direct_referrals += 1;
        Ok(())
    }

    async fn get_direct_referral_count(&self, user_id: UserId) -> StoreResult<i64> {
        Ok(self.direct_referrals(user_id))
    }

    async fn get_referral_code(&self, user_id: UserId) -> StoreResult<Option<String>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.get(&user_id).and_then(|row| row.referral_code.clone()))
    }

    async fn save_referral_code_if_absent(&self, user_id: UserId, code: String) -> StoreResult<String> {
        let mut tables = self.tables.lock().unwrap();
        let row = tables.users.get_mut(&user_id).ok_or(StoreError::UserNotFound(user_id))?;
        Ok(row.referral_code.get_or_insert(code).clone())
    }
}

#[async_trait]
impl ReferralEdgeStore for InMemoryStore {
    async fn exists(&self, referrer_id: UserId, referred_id: UserId) -> StoreResult<bool> {
        Ok(self.has_edge(referrer_id, referred_id))
    }

    async fn insert(&self, referrer_id: UserId, referred_id: UserId) -> StoreResult<ReferralId> {
        {
            let tables = self.tables.lock().unwrap();
            let taken = tables.edges.iter().any(|e| {
                e.referred_id == referred_id || (e.referrer_id == referred_id && e.referred_id == referrer_id)
            });
            if taken {
                return Err(StoreError::DuplicateEdge);
            }
        }
        Ok(self.insert_raw_edge(referrer_id, referred_id))
    }

    async fn list_by_referrer(&self, referrer_id: UserId) -> StoreResult<Vec<ReferredUser>> {
        let tables = self.tables.lock().unwrap();
        let mut referred: Vec<ReferredUser> = tables
            .edges
            .iter()
            .filter(|e| e.referrer_id == referrer_id)
            .filter_map(|e| {
                tables.users.get(&e.referred_id).map(|row| ReferredUser {
                    user_id: e.referred_id,
                    username: row.username.clone(),
                    points: row.points,
                    referred_at: e.created_at,
                })
            })
            .collect();
        referred.sort_by(|a, b| b.points.cmp(&a.points));
        Ok(referred)
    }
}

#[async_trait]
impl EarningsStore for InMemoryStore {
    async fn credit(&self, credit: EarningsCredit) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if tables.credits.iter().all(|c| c.key() != credit.key()) {
            tables.credits.push(credit);
        }
        Ok(())
    }

    async fn total_referral_earnings(&self, user_id: UserId) -> StoreResult<i64> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .credits
            .iter()
            .filter(|c| c.user_id == user_id && c.level == CreditLevel::Referrer)
            .map(|c| c.amount)
            .sum())
    }
}

#[async_trait]
impl AttemptMirror for InMemoryStore {
    async fn send(&self, attempt: ReferralAttempt) -> StoreResult<()> {
        self.tables.lock().unwrap().attempts.push(attempt);
        Ok(())
    }
}
