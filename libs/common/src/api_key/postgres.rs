//! PostgreSQL-backed API key store

use async_trait::async_trait;
use sqlx::PgPool;

use super::model::{ApiKeyRecord, NewApiKey};
use super::store::ApiKeyStore;
use crate::error::DatabaseResult;

const COLUMNS: &str =
    "id, user_id, name, key_hash, key_prefix, is_active, created_at, last_used_at, expires_at";

/// API key store over the `api_keys` table
#[derive(Clone)]
pub struct PgApiKeyStore {
    pool: PgPool,
}

impl PgApiKeyStore {
    /// Create a new API key store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyStore for PgApiKeyStore {
    async fn find_by_hash(&self, key_hash: &str) -> DatabaseResult<Option<ApiKeyRecord>> {
        let record = sqlx::query_as::<_, ApiKeyRecord>(&format!(
            "SELECT {COLUMNS} FROM api_keys WHERE key_hash = $1"
        ))
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<ApiKeyRecord>> {
        let record =
            sqlx::query_as::<_, ApiKeyRecord>(&format!("SELECT {COLUMNS} FROM api_keys WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record)
    }

    async fn create(&self, new_key: NewApiKey) -> DatabaseResult<ApiKeyRecord> {
        let record = sqlx::query_as::<_, ApiKeyRecord>(&format!(
            r#"
            INSERT INTO api_keys (user_id, name, key_hash, key_prefix, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(new_key.user_id)
        .bind(&new_key.name)
        .bind(&new_key.key_hash)
        .bind(&new_key.key_prefix)
        .bind(new_key.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn set_active(&self, id: i32, is_active: bool) -> DatabaseResult<()> {
        sqlx::query("UPDATE api_keys SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn touch_last_used(&self, id: i32) -> DatabaseResult<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: i32) -> DatabaseResult<Vec<ApiKeyRecord>> {
        let records = sqlx::query_as::<_, ApiKeyRecord>(&format!(
            "SELECT {COLUMNS} FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
