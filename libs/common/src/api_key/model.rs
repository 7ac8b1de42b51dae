//! API key records

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Persisted API key. Never carries the plaintext credential.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApiKeyRecord {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub key_prefix: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// Whether the expiry date has passed at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}

/// New API key payload
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub user_id: i32,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A freshly issued key; `secret` must be relayed to the caller exactly once
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub record: ApiKeyRecord,
    pub secret: String,
}
