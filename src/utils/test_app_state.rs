use std::sync::Arc;

use jsonwebtoken::{encode, EncodingKey, Header};

use crate::{
    http_server::AppState,
    metrics::Metrics,
    models::auth::{OperatorClaims, TokenClaims},
    services::{
        alert_service::AlertService,
        attempt_ledger::AttemptLedger,
        local_cache::MemoryCache,
        referral_adapter::ReferralAdapter,
        referral_service::{ReferralService, RewardAmounts},
        referral_validator::ReferralValidator,
    },
    utils::{referral_code::ReferralCodec, test_store::InMemoryStore},
    Config,
};

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
}

/// App state over the in-memory store and a session-only cache.
pub fn create_test_app_state() -> TestApp {
    let config = Config::load_test_env().expect("Failed to load test configuration");
    let store = Arc::new(InMemoryStore::new());

    let codec = ReferralCodec::new(&config.referral.code_prefix).expect("Invalid test code prefix");
    let service = ReferralService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        ReferralValidator::new(codec),
        RewardAmounts::from(&config.referral),
    );
    let ledger = AttemptLedger::new(
        Arc::new(MemoryCache::new()),
        store.clone(),
        config.referral.attempt_ledger_cap,
    );
    let adapter = ReferralAdapter::new(
        service,
        ledger,
        Arc::new(MemoryCache::new()),
        AlertService::new(config.alert.webhook_url.clone()),
    );

    let state = AppState {
        adapter: Arc::new(adapter),
        users: store.clone(),
        metrics: Arc::new(Metrics::new()),
        config: Arc::new(config),
    };

    TestApp { state, store }
}

pub fn generate_test_token(secret: &str, user_id: &str) -> String {
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat: 1,          // Just a valid past timestamp
        exp: 9999999999, // Far future timestamp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token")
}

pub fn generate_operator_token(secret: &str, operator: &str) -> String {
    let claims = OperatorClaims {
        sub: operator.to_string(),
        iat: 1,
        exp: 9999999999,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token")
}
