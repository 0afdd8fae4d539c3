use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::{
    db_persistence::DbError,
    handlers::HandlerError,
    models::ModelError,
    repositories::StoreError,
    services::{local_cache::CacheError, referral_adapter::AdapterError},
    utils::referral_code::CodecError,
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("{0}")]
    Codec(#[from] CodecError),
    #[error("{0}")]
    Adapter(#[from] AdapterError),
    #[error("{0}")]
    Model(#[from] ModelError),
    #[error("{0}")]
    Handler(#[from] HandlerError),
    #[error("Server error: {0}")]
    Server(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match &self {
            AppError::Handler(HandlerError::QueryParams(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Handler(HandlerError::InvalidUserId(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Model(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::Codec(err) | AppError::Adapter(AdapterError::Codec(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Store(StoreError::UserNotFound(id))
            | AppError::Adapter(AdapterError::Store(StoreError::UserNotFound(id))) => {
                (StatusCode::NOT_FOUND, format!("User not found: {}", id))
            }
            AppError::Config(_)
            | AppError::Database(_)
            | AppError::Store(_)
            | AppError::Cache(_)
            | AppError::Adapter(_)
            | AppError::Server(_) => {
                tracing::error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    String::from("Internal server error."),
                )
            }
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}
