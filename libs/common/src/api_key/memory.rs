//! In-memory API key store, used by tests of both services

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::model::{ApiKeyRecord, NewApiKey};
use super::store::ApiKeyStore;
use crate::error::{DatabaseError, DatabaseResult};

#[derive(Default)]
struct Inner {
    next_id: i32,
    keys: HashMap<i32, ApiKeyRecord>,
    fail_touch: bool,
}

/// API key store backed by a `HashMap`
#[derive(Clone, Default)]
pub struct InMemoryApiKeyStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `touch_last_used` call fail
    pub async fn fail_touches(&self, fail: bool) {
        self.inner.write().await.fail_touch = fail;
    }

    /// Overwrite a stored record, e.g. to move its expiry into the past
    pub async fn replace(&self, record: ApiKeyRecord) {
        self.inner.write().await.keys.insert(record.id, record);
    }
}

#[async_trait]
impl ApiKeyStore for InMemoryApiKeyStore {
    async fn find_by_hash(&self, key_hash: &str) -> DatabaseResult<Option<ApiKeyRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.keys.values().find(|k| k.key_hash == key_hash).cloned())
    }

    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<ApiKeyRecord>> {
        Ok(self.inner.read().await.keys.get(&id).cloned())
    }

    async fn create(&self, new_key: NewApiKey) -> DatabaseResult<ApiKeyRecord> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;

        let record = ApiKeyRecord {
            id: inner.next_id,
            user_id: new_key.user_id,
            name: new_key.name,
            key_hash: new_key.key_hash,
            key_prefix: new_key.key_prefix,
            is_active: true,
            created_at: Utc::now(),
            last_used_at: None,
            expires_at: new_key.expires_at,
        };

        inner.keys.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_active(&self, id: i32, is_active: bool) -> DatabaseResult<()> {
        if let Some(record) = self.inner.write().await.keys.get_mut(&id) {
            record.is_active = is_active;
        }
        Ok(())
    }

    async fn touch_last_used(&self, id: i32) -> DatabaseResult<()> {
        let mut inner = self.inner.write().await;
        if inner.fail_touch {
            return Err(DatabaseError::Configuration(
                "in-memory store configured to fail".to_string(),
            ));
        }
        if let Some(record) = inner.keys.get_mut(&id) {
            record.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: i32) -> DatabaseResult<Vec<ApiKeyRecord>> {
        let inner = self.inner.read().await;
        let mut keys: Vec<_> = inner
            .keys
            .values()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect();
        keys.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(keys)
    }
}
