use axum::{middleware, routing::delete, Router};

use crate::{handlers::admin::handle_clear_attempts, http_server::AppState, middlewares::jwt_auth};

pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/referrals/attempts/:user_id", delete(handle_clear_attempts))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth::jwt_admin_auth))
}
