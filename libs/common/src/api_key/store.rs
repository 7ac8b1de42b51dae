//! Storage seam for API keys

use async_trait::async_trait;

use super::model::{ApiKeyRecord, NewApiKey};
use crate::error::DatabaseResult;

/// Persistence operations the API key lifecycle depends on
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Look up a key by the digest of its plaintext
    async fn find_by_hash(&self, key_hash: &str) -> DatabaseResult<Option<ApiKeyRecord>>;

    /// Look up a key by id
    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<ApiKeyRecord>>;

    /// Persist a new key
    async fn create(&self, new_key: NewApiKey) -> DatabaseResult<ApiKeyRecord>;

    /// Activate or deactivate a key
    async fn set_active(&self, id: i32, is_active: bool) -> DatabaseResult<()>;

    /// Record a successful verification
    async fn touch_last_used(&self, id: i32) -> DatabaseResult<()>;

    /// All keys owned by a user, newest first
    async fn list_for_user(&self, user_id: i32) -> DatabaseResult<Vec<ApiKeyRecord>>;
}
