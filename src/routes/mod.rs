use axum::Router;

use crate::{
    http_server::AppState,
    routes::{admin::admin_routes, referral::referral_routes},
};

pub mod admin;
pub mod referral;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(referral_routes(state.clone()))
        .merge(admin_routes(state))
}
