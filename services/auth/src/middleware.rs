//! Middleware for JWT token validation and authentication

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::{error, warn};

use crate::{AppState, error::AuthError, models::Role};

/// Identity attached to requests that passed [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub role: Role,
}

/// Extract and validate JWT token from Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::Unauthorized)?;

    let claims = state
        .jwt_service
        .validate_token(bearer.token())
        .map_err(|e| {
            warn!("Rejected session token: {}", e);
            AuthError::Unauthorized
        })?;

    // The token may outlive its account
    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to load user {}: {}", claims.sub, e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        role: user.role,
    });

    Ok(next.run(req).await)
}

/// Reject authenticated users that are not administrators
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AuthError> {
    let caller = req
        .extensions()
        .get::<AuthUser>()
        .map(|user| (user.id, user.role));

    match caller {
        Some((_, Role::Admin)) => Ok(next.run(req).await),
        Some((id, role)) => {
            warn!("User {} with role {} denied admin access", id, role.as_str());
            Err(AuthError::Forbidden)
        }
        None => Err(AuthError::Unauthorized),
    }
}
