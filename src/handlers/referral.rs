use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::{
    handlers::{HandlerError, SuccessResponse},
    http_server::AppState,
    models::{
        analytics::ReferralStats,
        attempt::{AttemptHistoryQuery, ReferralAttempt},
        referrals::{MyReferralCodeResponse, ReferralCodeInput, ReferredUser, SessionStartInput, SessionStartResponse},
        user::UserSummary,
    },
    AppError,
};

pub async fn handle_session_start(
    State(state): State<AppState>,
    Extension(user): Extension<UserSummary>,
    Json(input): Json<SessionStartInput>,
) -> Result<Json<SuccessResponse<SessionStartResponse>>, AppError> {
    let attempt = state
        .adapter
        .process_start_parameter(user.id, input.start_param.as_deref())
        .await;

    Ok(SuccessResponse::new(SessionStartResponse {
        processed: attempt.is_some(),
        attempt,
    }))
}

pub async fn handle_manual_code(
    State(state): State<AppState>,
    Extension(user): Extension<UserSummary>,
    Json(input): Json<ReferralCodeInput>,
) -> Result<Json<SuccessResponse<ReferralAttempt>>, AppError> {
    let attempt = state
        .adapter
        .process_referral_code_manually(user.id, &input.code)
        .await;

    Ok(SuccessResponse::new(attempt))
}

pub async fn handle_test_code(
    State(state): State<AppState>,
    Extension(user): Extension<UserSummary>,
    Json(input): Json<ReferralCodeInput>,
) -> Result<Json<SuccessResponse<ReferralAttempt>>, AppError> {
    let attempt = state.adapter.test_referral_code(user.id, &input.code).await;

    Ok(SuccessResponse::new(attempt))
}

pub async fn handle_my_code(
    State(state): State<AppState>,
    Extension(user): Extension<UserSummary>,
) -> Result<Json<SuccessResponse<MyReferralCodeResponse>>, AppError> {
    let code = state.adapter.my_referral_code(user.id).await?;

    Ok(SuccessResponse::new(MyReferralCodeResponse { code }))
}

pub async fn handle_attempt_history(
    State(state): State<AppState>,
    Extension(user): Extension<UserSummary>,
    Query(query): Query<AttemptHistoryQuery>,
) -> Result<Json<SuccessResponse<Vec<ReferralAttempt>>>, AppError> {
    if query.limit == 0 {
        return Err(AppError::Handler(HandlerError::QueryParams(
            "limit must be greater than 0".to_string(),
        )));
    }

    let attempts = state.adapter.attempt_history(user.id, query.limit).await?;

    Ok(SuccessResponse::new(attempts))
}

pub async fn handle_referral_stats(
    State(state): State<AppState>,
    Extension(user): Extension<UserSummary>,
) -> Result<Json<SuccessResponse<ReferralStats>>, AppError> {
    let stats = state.adapter.referral_stats(user.id).await?;

    Ok(SuccessResponse::new(stats))
}

pub async fn handle_list_referrals(
    State(state): State<AppState>,
    Extension(user): Extension<UserSummary>,
) -> Result<Json<SuccessResponse<Vec<ReferredUser>>>, AppError> {
    let referred = state.adapter.list_referrals(user.id).await?;

    Ok(SuccessResponse::new(referred))
}
