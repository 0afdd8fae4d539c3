use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension,
};

use crate::{
    handlers::HandlerError,
    http_server::AppState,
    models::{auth::Operator, user::UserId},
    AppError,
};

pub async fn handle_clear_attempts(
    State(state): State<AppState>,
    Extension(operator): Extension<Operator>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let user_id = UserId::new(user_id).map_err(|e| AppError::Handler(HandlerError::InvalidUserId(e.to_string())))?;

    tracing::info!("Operator {} is clearing attempt history of user {}", operator.name, user_id);
    state.adapter.clear_attempt_history(user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
