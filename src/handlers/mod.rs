use axum::Json;
use serde::Serialize;

pub mod admin;
pub mod referral;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    QueryParams(String),
    #[error("{0}")]
    InvalidUserId(String),
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    data: T,
}
impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Json<Self> {
        Json(Self { data })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}
