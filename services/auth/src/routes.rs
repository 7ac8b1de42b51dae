//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    AppState, admin,
    error::AuthError,
    middleware::{AuthUser, auth_middleware, require_admin},
    models::{LoginRequest, ParkingSummary, RegisterRequest, User},
    validation::{validate_email, validate_password},
};

/// User as returned to its owner, with the latest parking attached
#[derive(Serialize)]
pub struct UserWithParking {
    #[serde(flatten)]
    pub user: User,
    #[serde(rename = "lastParking")]
    pub last_parking: Option<ParkingSummary>,
}

/// Response for register and login
#[derive(Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub user: UserWithParking,
    pub token: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/api/v1/auth/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route(
            "/api/v1/admin/users",
            post(admin::create_user).get(admin::list_users),
        )
        .route("/api/v1/admin/users/:id/api-keys", post(admin::create_api_key))
        .route("/api/v1/admin/api-keys/:id", delete(admin::revoke_api_key))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .merge(authenticated)
        .merge(admin)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

fn issue_token(state: &AppState, user: &User) -> Result<String, AuthError> {
    state
        .jwt_service
        .generate_token(user.id, &user.email)
        .map_err(|e| {
            error!("Failed to generate token: {}", e);
            AuthError::InternalServerError
        })
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let email = payload.email.trim().to_lowercase();
    validate_email(&email).map_err(AuthError::Validation)?;
    validate_password(&payload.password).map_err(AuthError::Validation)?;

    let user = state
        .user_repository
        .create(&email, &payload.password)
        .await?
        .ok_or(AuthError::DuplicateOwner)?;

    info!("Registered user {}", user.id);
    let token = issue_token(&state, &user)?;

    let response = SessionResponse {
        message: "User registered successfully".to_string(),
        user: UserWithParking {
            user,
            last_parking: None,
        },
        token,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let email = payload.email.trim().to_lowercase();

    let user = state
        .user_repository
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !state.user_repository.verify_password(&user, &payload.password) {
        warn!("Failed login for user {}", user.id);
        return Err(AuthError::InvalidCredentials);
    }

    let last_parking = state.user_repository.latest_parking(user.id).await?;
    let token = issue_token(&state, &user)?;
    info!("User {} logged in", user.id);

    let response = SessionResponse {
        message: "Login successful".to_string(),
        user: UserWithParking { user, last_parking },
        token,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Profile of the authenticated user
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .user_repository
        .find_by_id(auth.id)
        .await?
        .ok_or_else(|| AuthError::NotFound("User".to_string()))?;

    let last_parking = state.user_repository.latest_parking(user.id).await?;
    let parkings_count = state.user_repository.parking_count(user.id).await?;

    Ok(Json(serde_json::json!({
        "user": user,
        "lastParking": last_parking,
        "parkingsCount": parkings_count,
    })))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, header},
    };
    use common::{
        api_key::{ApiKeyService, InMemoryApiKeyStore},
        jwt::{JwtConfig, JwtService},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::repositories::UserRepository;

    pub(crate) fn test_state() -> AppState {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/trackme_test")
            .unwrap();

        AppState {
            jwt_service: JwtService::new(JwtConfig {
                secret: "router-test-secret".to_string(),
                token_expiry: 3600,
            }),
            user_repository: UserRepository::new(pool),
            api_keys: ApiKeyService::new(Arc::new(InMemoryApiKeyStore::default())),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_profile_requires_token() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::get("/api/v1/auth/profile")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_admin_rejects_garbage_token() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::get("/api/v1/admin/users")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::post("/api/v1/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"email":"driver@example.com","password":"weak"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_email() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::post("/api/v1/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"nope","password":"Secret1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid email format");
    }
}
