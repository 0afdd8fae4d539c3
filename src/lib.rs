//! # Divine Referrals
//!
//! Referral network integrity engine for the Divine mining mini-app. Turns
//! referral codes into at-most-once referral edges with welcome and referrer
//! bonuses, keeps a bounded per-user attempt ledger and serves it all over
//! an authenticated HTTP API.

pub mod args;
pub mod config;
pub mod db_persistence;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use db_persistence::DbPersistence;
pub use http_server::AppState;
pub use services::{
    referral_adapter::ReferralAdapter,
    referral_service::{ReferralOutcome, ReferralService},
    referral_validator::ReferralValidator,
};
pub use utils::referral_code::ReferralCodec;

// Re-export errors
pub use db_persistence::DbError;
pub use errors::{AppError, AppResult};
pub use http_server::HttpServerError;
pub use repositories::StoreError;
pub use services::referral_service::ReferralError;
pub use utils::referral_code::CodecError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}

/// Get the library name
pub fn name() -> &'static str {
    NAME
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(name(), "divine-referrals");
    }
}
