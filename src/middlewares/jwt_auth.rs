use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    Json,
};

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    handlers::ErrorResponse,
    http_server::AppState,
    models::{
        auth::{Operator, OperatorClaims, TokenClaims},
        user::UserId,
    },
    utils::jwt::extract_jwt_token_from_request,
};

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    let json_error = ErrorResponse {
        status: "fail",
        message: message.to_string(),
    };
    (StatusCode::UNAUTHORIZED, Json(json_error))
}

/// Resolves the session user from the bearer token and inserts its
/// [`UserSummary`](crate::models::user::UserSummary) as an extension.
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let token = extract_jwt_token_from_request(&req)?;

    let claims = decode::<TokenClaims>(
        &token,
        &DecodingKey::from_secret(state.config.jwt.secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| unauthorized("Invalid token"))?
    .claims;

    let user_id: UserId = claims.sub.parse().map_err(|_| unauthorized("Invalid token"))?;

    let user = state.users.find_by_id(user_id).await.map_err(|e| {
        tracing::error!("Error fetching user {} for token: {}", user_id, e);
        let json_error = ErrorResponse {
            status: "fail",
            message: "Error fetching user from database".to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json_error))
    })?;

    let user = user.ok_or_else(|| unauthorized("The user belonging to this token not exists"))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn jwt_admin_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let token = extract_jwt_token_from_request(&req)?;

    let claims = decode::<OperatorClaims>(
        &token,
        &DecodingKey::from_secret(state.config.jwt.admin_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| unauthorized("Invalid token"))?
    .claims;

    if claims.sub.trim().is_empty() {
        return Err(unauthorized("Invalid token"));
    }

    req.extensions_mut().insert(Operator { name: claims.sub });
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::UserSummary,
        utils::test_app_state::{create_test_app_state, generate_operator_token, generate_test_token},
    };
    use axum::{
        body::Body,
        http::{self, Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tower::ServiceExt;

    async fn protected_handler(Extension(user): Extension<UserSummary>) -> impl IntoResponse {
        format!("Welcome {}", user.username)
    }

    async fn protected_admin_handler(Extension(operator): Extension<Operator>) -> impl IntoResponse {
        format!("Welcome Operator {}", operator.name)
    }

    fn user_router(state: AppState) -> Router {
        Router::new()
            .route("/protected", get(protected_handler))
            .layer(from_fn_with_state(state.clone(), jwt_auth))
            .with_state(state)
    }

    fn admin_router(state: AppState) -> Router {
        Router::new()
            .route("/admin/protected", get(protected_admin_handler))
            .layer(from_fn_with_state(state.clone(), jwt_admin_auth))
            .with_state(state)
    }

    fn get_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(http::header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_jwt_auth_success() {
        let app = create_test_app_state();
        app.store.add_user(UserId::new(2002).unwrap(), "bob");
        let token = generate_test_token(&app.state.config.jwt.secret, "2002");

        let response = user_router(app.state.clone())
            .oneshot(get_with_token("/protected", &token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(String::from_utf8(body_bytes.to_vec()).unwrap(), "Welcome bob");
    }

    #[tokio::test]
    async fn test_jwt_auth_fails_invalid_token() {
        let app = create_test_app_state();

        let response = user_router(app.state.clone())
            .oneshot(get_with_token("/protected", "invalid_token_string"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_jwt_auth_fails_non_numeric_subject() {
        let app = create_test_app_state();
        let token = generate_test_token(&app.state.config.jwt.secret, "not-a-number");

        let response = user_router(app.state.clone())
            .oneshot(get_with_token("/protected", &token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], "Invalid token");
    }

    #[tokio::test]
    async fn test_jwt_auth_fails_user_not_found() {
        let app = create_test_app_state();
        let token = generate_test_token(&app.state.config.jwt.secret, "4242");

        let response = user_router(app.state.clone())
            .oneshot(get_with_token("/protected", &token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await["message"],
            "The user belonging to this token not exists"
        );
    }

    #[tokio::test]
    async fn test_jwt_auth_fails_expired_token() {
        let app = create_test_app_state();
        app.store.add_user(UserId::new(2002).unwrap(), "bob");

        let claims = TokenClaims {
            sub: "2002".to_string(),
            iat: (Utc::now() - Duration::hours(3)).timestamp() as usize,
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(app.state.config.jwt.secret.as_bytes()),
        )
        .unwrap();

        let response = user_router(app.state.clone())
            .oneshot(get_with_token("/protected", &token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_jwt_auth_fails_missing_header() {
        let app = create_test_app_state();

        let response = user_router(app.state.clone())
            .oneshot(Request::builder().uri("/protected").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await["message"],
            "You are not logged in, please provide token"
        );
    }

    #[tokio::test]
    async fn test_jwt_admin_auth_success() {
        let app = create_test_app_state();
        let token = generate_operator_token(&app.state.config.jwt.admin_secret, "ops");

        let response = admin_router(app.state.clone())
            .oneshot(get_with_token("/admin/protected", &token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_jwt_admin_auth_fails_wrong_secret() {
        let app = create_test_app_state();
        let token = generate_operator_token(&app.state.config.jwt.secret, "ops");

        let response = admin_router(app.state.clone())
            .oneshot(get_with_token("/admin/protected", &token))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
