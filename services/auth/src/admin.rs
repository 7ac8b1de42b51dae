//! Administration endpoints: provisioning users and their API keys

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use common::api_key::{ApiKeyRecord, IssuedApiKey};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    AppState,
    error::AuthError,
    models::UserOverview,
    validation::{validate_api_key_name, validate_email, validate_expires_in_days},
};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: Option<String>,
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: Option<String>,
    pub expires_in_days: Option<i64>,
}

/// Freshly issued key. The only response that ever carries the plaintext.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedKeyResponse {
    pub id: i32,
    pub name: String,
    pub key: String,
    pub key_prefix: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<IssuedApiKey> for IssuedKeyResponse {
    fn from(issued: IssuedApiKey) -> Self {
        Self {
            id: issued.record.id,
            name: issued.record.name,
            key: issued.secret,
            key_prefix: issued.record.key_prefix,
            expires_at: issued.record.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserWithKeys {
    #[serde(flatten)]
    pub user: UserOverview,
    #[serde(rename = "apiKeys")]
    pub api_keys: Vec<ApiKeyRecord>,
}

fn validate_key_request(name: Option<&str>, expires_in_days: Option<i64>) -> Result<(), AuthError> {
    validate_api_key_name(name).map_err(AuthError::Validation)?;
    validate_expires_in_days(expires_in_days).map_err(AuthError::Validation)
}

/// Label of a provisioned user's first key, named after the account unless given
fn first_key_name(email: &str, name: Option<String>) -> String {
    name.filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("Key for {}", email))
}

/// Create a key-only user together with its first API key
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let email = payload.email.trim().to_lowercase();
    validate_email(&email).map_err(AuthError::Validation)?;
    validate_key_request(payload.name.as_deref(), payload.expires_in_days)?;

    let user = state
        .user_repository
        .create_disabled(&email)
        .await?
        .ok_or(AuthError::DuplicateOwner)?;

    let issued = match state
        .api_keys
        .issue(
            user.id,
            Some(first_key_name(&email, payload.name)),
            payload.expires_in_days,
        )
        .await
    {
        Ok(issued) => issued,
        Err(e) => {
            error!("Failed to issue first key for user {}: {}", user.id, e);
            if let Err(e) = state.user_repository.delete(user.id).await {
                error!("Failed to roll back user {}: {}", user.id, e);
            }
            return Err(e.into());
        }
    };

    info!(
        "Provisioned user {} with key {}",
        user.id, issued.record.key_prefix
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "User created successfully",
            "user": user,
            "apiKey": IssuedKeyResponse::from(issued),
        })),
    ))
}

/// List every user with counts and key listings
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AuthError> {
    let overviews = state.user_repository.list_with_counts().await?;

    let mut users = Vec::with_capacity(overviews.len());
    for user in overviews {
        let api_keys = state.api_keys.list_for_user(user.id).await?;
        users.push(UserWithKeys { user, api_keys });
    }

    Ok(Json(serde_json::json!({
        "users": users,
        "total": users.len(),
    })))
}

/// Issue an additional key for an existing user
pub async fn create_api_key(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    payload: Option<Json<CreateApiKeyRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(payload) = payload.unwrap_or_default();
    validate_key_request(payload.name.as_deref(), payload.expires_in_days)?;

    state
        .user_repository
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AuthError::NotFound("User".to_string()))?;

    let issued = state
        .api_keys
        .issue(user_id, payload.name, payload.expires_in_days)
        .await?;

    info!("Issued key {} for user {}", issued.record.key_prefix, user_id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "API key created successfully",
            "apiKey": IssuedKeyResponse::from(issued),
        })),
    ))
}

/// Revoke a key. Revoking an already inactive key succeeds.
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<i32>,
) -> Result<impl IntoResponse, AuthError> {
    state.api_keys.revoke(key_id).await?;
    info!("Revoked API key {}", key_id);

    Ok(Json(serde_json::json!({
        "message": "API key revoked successfully",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::test_state;

    #[tokio::test]
    async fn test_revoke_unknown_key_is_not_found() {
        let state = test_state();

        let err = revoke_api_key(State(state), Path(42)).await.err().unwrap();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let state = test_state();
        let issued = state.api_keys.issue(7, None, None).await.unwrap();
        let id = issued.record.id;

        assert!(revoke_api_key(State(state.clone()), Path(id)).await.is_ok());
        assert!(revoke_api_key(State(state.clone()), Path(id)).await.is_ok());

        let keys = state.api_keys.list_for_user(7).await.unwrap();
        assert!(!keys[0].is_active);
    }

    #[test]
    fn test_issued_key_response_carries_secret_once() {
        let issued = IssuedApiKey {
            record: ApiKeyRecord {
                id: 3,
                user_id: 1,
                name: "phone".to_string(),
                key_hash: "abc".to_string(),
                key_prefix: "tk_live_ABCDEFGH".to_string(),
                is_active: true,
                created_at: Utc::now(),
                last_used_at: None,
                expires_at: None,
            },
            secret: "tk_live_ABCDEFGHsecret".to_string(),
        };

        let json = serde_json::to_value(IssuedKeyResponse::from(issued)).unwrap();
        assert_eq!(json["key"], "tk_live_ABCDEFGHsecret");
        assert_eq!(json["keyPrefix"], "tk_live_ABCDEFGH");
        assert!(json.get("key_hash").is_none());
    }

    #[test]
    fn test_first_key_is_named_after_the_account() {
        assert_eq!(
            first_key_name("fleet@example.com", None),
            "Key for fleet@example.com"
        );
        assert_eq!(
            first_key_name("fleet@example.com", Some("Van 3".to_string())),
            "Van 3"
        );
    }

    #[tokio::test]
    async fn test_create_user_rejects_invalid_lifetime() {
        let state = test_state();
        let payload = CreateUserRequest {
            email: "fleet@example.com".to_string(),
            name: None,
            expires_in_days: Some(0),
        };

        let err = create_user(State(state), Json(payload)).await.err().unwrap();
        assert!(matches!(err, AuthError::Validation(_)));
    }
}
