pub mod alert_service;
pub mod attempt_ledger;
pub mod local_cache;
pub mod referral_adapter;
pub mod referral_service;
pub mod referral_validator;
