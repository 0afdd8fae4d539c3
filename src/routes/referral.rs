use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    handlers::referral::{
        handle_attempt_history, handle_list_referrals, handle_manual_code, handle_my_code, handle_referral_stats,
        handle_session_start, handle_test_code,
    },
    http_server::AppState,
    middlewares::jwt_auth,
};

pub fn referral_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/referrals", get(handle_list_referrals))
        .route("/referrals/session-start", post(handle_session_start))
        .route("/referrals/manual", post(handle_manual_code))
        .route("/referrals/test", post(handle_test_code))
        .route("/referrals/code", get(handle_my_code))
        .route("/referrals/history", get(handle_attempt_history))
        .route("/referrals/stats", get(handle_referral_stats))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth::jwt_auth))
}
