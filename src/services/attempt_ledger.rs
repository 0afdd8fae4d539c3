use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    models::{attempt::ReferralAttempt, user::UserId},
    repositories::AttemptMirror,
    services::local_cache::{get_json, set_json, CacheKey, CacheResult, LocalCache},
};

pub const DEFAULT_ATTEMPT_LEDGER_CAP: usize = 50;

const ATTEMPTS_NAMESPACE: &str = "referral_attempts";

/// Append-only, size-bounded log of referral attempts, one list per user.
///
/// Entries are stored oldest first; once the list grows past `cap` the oldest
/// ones are evicted. Each recorded attempt is also forwarded to the
/// [`AttemptMirror`] in the background. A failed forward is logged and never
/// affects the local record.
///
/// Writers hold `write_lock` across the load and the store of a list, so
/// concurrent requests from one session never drop each other's entries.
#[derive(Clone)]
pub struct AttemptLedger {
    cache: Arc<dyn LocalCache>,
    mirror: Arc<dyn AttemptMirror>,
    cap: usize,
    write_lock: Arc<Mutex<()>>,
}

impl AttemptLedger {
    pub fn new(cache: Arc<dyn LocalCache>, mirror: Arc<dyn AttemptMirror>, cap: usize) -> Self {
        Self {
            cache,
            mirror,
            cap: cap.max(1),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub async fn record(&self, user_id: UserId, attempt: ReferralAttempt) -> CacheResult<()> {
        self.forward_to_mirror(attempt.clone());

        let key = CacheKey::scoped(user_id, ATTEMPTS_NAMESPACE);
        let _guard = self.write_lock.lock().await;
        let mut attempts = self.load(&key).await?;
        attempts.push(attempt);

        if attempts.len() > self.cap {
            let overflow = attempts.len() - self.cap;
            attempts.drain(..overflow);
        }

        set_json(self.cache.as_ref(), &key, &attempts).await
    }

    /// Most recent first, at most `limit` entries.
    pub async fn list(&self, user_id: UserId, limit: usize) -> CacheResult<Vec<ReferralAttempt>> {
        let key = CacheKey::scoped(user_id, ATTEMPTS_NAMESPACE);
        let attempts = self.load(&key).await?;

        Ok(attempts.into_iter().rev().take(limit).collect())
    }

    pub async fn clear(&self, user_id: UserId) -> CacheResult<()> {
        let key = CacheKey::scoped(user_id, ATTEMPTS_NAMESPACE);
        let _guard = self.write_lock.lock().await;
        self.cache.remove(&key).await
    }

    async fn load(&self, key: &CacheKey) -> CacheResult<Vec<ReferralAttempt>> {
        Ok(get_json::<Vec<ReferralAttempt>>(self.cache.as_ref(), key)
            .await?
            .unwrap_or_default())
    }

    fn forward_to_mirror(&self, attempt: ReferralAttempt) {
        let mirror = self.mirror.clone();

        tokio::spawn(async move {
            let attempt_id = attempt.id;
            if let Err(e) = mirror.send(attempt).await {
                tracing::warn!("Failed to mirror referral attempt {}: {}", attempt_id, e);
            }
        });
    }
}
