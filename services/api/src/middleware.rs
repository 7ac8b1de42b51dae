//! Authentication middleware: API keys for parking routes, JWT for admin routes

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::{error, warn};

use crate::{
    error::ApiError,
    models::{AuthUser, UserIdentity},
    state::AppState,
};

/// Header carrying the API key on parking routes
pub const API_KEY_HEADER: &str = "x-api-key";

/// Require a usable API key in `X-API-Key`
pub async fn api_key_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing API key".to_string()))?;

    let record = state.api_keys.verify(key).await?;

    req.extensions_mut().insert(AuthUser {
        id: record.user_id,
        api_key_id: Some(record.id),
    });

    Ok(next.run(req).await)
}

/// Require a session token belonging to an administrator
pub async fn admin_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(ApiError::unauthorized)?;
    let user = identity_from_jwt(&state, bearer.token()).await?;

    if !user.is_admin() {
        warn!("User {} ({}) denied admin access", user.id, user.email);
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        api_key_id: None,
    });

    Ok(next.run(req).await)
}

async fn identity_from_jwt(state: &AppState, token: &str) -> Result<UserIdentity, ApiError> {
    let claims = state.jwt_service.validate_token(token).map_err(|e| {
        warn!("Rejected session token: {}", e);
        ApiError::unauthorized()
    })?;

    state
        .user_repository
        .find_identity(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to load user {}: {}", claims.sub, e);
            ApiError::InternalServerError
        })?
        .ok_or_else(ApiError::unauthorized)
}

/// Resolve a bearer token that may be either an API key or a session token
pub async fn resolve_token(state: &AppState, token: &str) -> Result<AuthUser, ApiError> {
    if state.api_keys.looks_like_api_key(token) {
        let record = state.api_keys.verify(token).await?;
        return Ok(AuthUser {
            id: record.user_id,
            api_key_id: Some(record.id),
        });
    }

    let user = identity_from_jwt(state, token).await?;
    Ok(AuthUser {
        id: user.id,
        api_key_id: None,
    })
}

#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::{repositories::UserRepository, routes::tests::test_state};

    #[tokio::test]
    async fn test_resolve_api_key() {
        let state = test_state();
        let issued = state.api_keys.issue(4, None, None).await.unwrap();

        let user = resolve_token(&state, &issued.secret).await.unwrap();

        assert_eq!(user.id, 4);
        assert_eq!(user.api_key_id, Some(issued.record.id));
    }

    #[tokio::test]
    async fn test_resolve_revoked_api_key_is_forbidden() {
        let state = test_state();
        let issued = state.api_keys.issue(4, None, None).await.unwrap();
        state.api_keys.revoke(issued.record.id).await.unwrap();

        let err = resolve_token(&state, &issued.secret).await.unwrap_err();

        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_resolve_unknown_api_key_is_unauthorized() {
        let state = test_state();

        let err = resolve_token(&state, "tk_live_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_resolve_garbage_session_token_is_unauthorized() {
        let err = resolve_token(&test_state(), "not.a.jwt").await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    /// Needs `DATABASE_URL` to look up the token's user
    #[tokio::test]
    async fn test_resolve_session_token_of_deleted_user_is_unauthorized() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let pool = PgPoolOptions::new().connect(&url).await.unwrap();
        common::database::run_migrations(&pool).await.unwrap();
        let mut state = test_state();
        state.user_repository = UserRepository::new(pool);

        let token = state
            .jwt_service
            .generate_token(i32::MAX, "gone@example.com")
            .unwrap();
        let err = resolve_token(&state, &token).await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
