#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("User id must be a positive integer, got {0}")]
    InvalidUserId(i64),
    #[error("Invalid attempt status: {0}")]
    InvalidStatus(String),
    #[error("Invalid credit level: {0}")]
    InvalidCreditLevel(i16),
}

pub type ModelResult<T> = Result<T, ModelError>;

pub mod analytics;
pub mod attempt;
pub mod auth;
pub mod earnings;
pub mod referrals;
pub mod user;
