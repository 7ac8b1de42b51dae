//! API key service
//!
//! Issues, verifies and revokes API keys. Only digests and display prefixes
//! ever reach the store.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::generator::{ApiKeyGenerator, expires_in_days};
use super::model::{ApiKeyRecord, IssuedApiKey, NewApiKey};
use super::store::ApiKeyStore;
use crate::error::ApiKeyError;

/// API key lifecycle over an [`ApiKeyStore`]
#[derive(Clone)]
pub struct ApiKeyService {
    store: Arc<dyn ApiKeyStore>,
    generator: ApiKeyGenerator,
}

impl ApiKeyService {
    /// Create a new API key service
    pub fn new(store: Arc<dyn ApiKeyStore>) -> Self {
        Self {
            store,
            generator: ApiKeyGenerator::default(),
        }
    }

    /// Whether a presented token carries the API key tag
    pub fn looks_like_api_key(&self, token: &str) -> bool {
        token.starts_with(self.generator.tag())
    }

    /// Issue a new key for `user_id`.
    ///
    /// The plaintext in the result is the only copy that will ever exist.
    pub async fn issue(
        &self,
        user_id: i32,
        name: Option<String>,
        expires_in: Option<i64>,
    ) -> Result<IssuedApiKey, ApiKeyError> {
        let generated = self.generator.generate();
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("API key - {}", Utc::now().format("%Y-%m-%d")));

        let record = self
            .store
            .create(NewApiKey {
                user_id,
                name,
                key_hash: generated.hash,
                key_prefix: generated.prefix,
                expires_at: expires_in_days(expires_in),
            })
            .await?;

        info!(
            "API key issued: id={}, user_id={}, prefix={}",
            record.id, record.user_id, record.key_prefix
        );

        Ok(IssuedApiKey {
            record,
            secret: generated.key,
        })
    }

    /// Verify a presented key and return its record.
    ///
    /// The last-use timestamp is recorded on a detached task; its failure is
    /// logged and never changes the outcome.
    pub async fn verify(&self, plaintext: &str) -> Result<ApiKeyRecord, ApiKeyError> {
        if !self.generator.is_valid_format(plaintext) {
            debug!("Rejected malformed API key");
            return Err(ApiKeyError::Invalid);
        }

        let hash = ApiKeyGenerator::hash_key(plaintext);
        let record = self
            .store
            .find_by_hash(&hash)
            .await?
            .ok_or(ApiKeyError::Invalid)?;

        if !record.is_active {
            debug!("API key {} is disabled", record.key_prefix);
            return Err(ApiKeyError::Disabled);
        }

        if record.is_expired_at(Utc::now()) {
            debug!("API key {} has expired", record.key_prefix);
            return Err(ApiKeyError::Expired);
        }

        let store = self.store.clone();
        let id = record.id;
        tokio::spawn(async move {
            if let Err(e) = store.touch_last_used(id).await {
                warn!("Failed to record API key usage for id={}: {}", id, e);
            }
        });

        Ok(record)
    }

    /// Deactivate a key. Revoking an inactive key succeeds.
    pub async fn revoke(&self, id: i32) -> Result<(), ApiKeyError> {
        let record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ApiKeyError::NotFound)?;

        if record.is_active {
            self.store.set_active(id, false).await?;
            info!("API key revoked: id={}", id);
        }

        Ok(())
    }

    /// Keys owned by `user_id`, newest first
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<ApiKeyRecord>, ApiKeyError> {
        Ok(self.store.list_for_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_key::InMemoryApiKeyStore;
    use chrono::Duration;

    fn service() -> (ApiKeyService, InMemoryApiKeyStore) {
        let store = InMemoryApiKeyStore::new();
        (ApiKeyService::new(Arc::new(store.clone())), store)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_issued_key_verifies() {
        let (service, _) = service();
        let issued = service.issue(7, Some("ci".to_string()), None).await.unwrap();

        assert!(issued.secret.starts_with("tk_live_"));
        assert_ne!(issued.record.key_hash, issued.secret);
        assert_ne!(issued.record.key_prefix, issued.secret);
        assert_eq!(issued.record.name, "ci");

        let verified = service.verify(&issued.secret).await.unwrap();
        assert_eq!(verified.id, issued.record.id);
        assert_eq!(verified.user_id, 7);
    }

    #[tokio::test]
    async fn test_default_label() {
        let (service, _) = service();
        let issued = service.issue(1, Some("  ".to_string()), None).await.unwrap();
        assert!(issued.record.name.starts_with("API key - "));
    }

    #[tokio::test]
    async fn test_verify_records_last_use() {
        let (service, store) = service();
        let issued = service.issue(1, None, None).await.unwrap();

        service.verify(&issued.secret).await.unwrap();
        settle().await;

        let stored = store.find_by_id(issued.record.id).await.unwrap().unwrap();
        assert!(stored.last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_touch_does_not_fail_verification() {
        let (service, store) = service();
        let issued = service.issue(1, None, None).await.unwrap();
        store.fail_touches(true).await;

        assert!(service.verify(&issued.secret).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_key_is_invalid() {
        let (service, _) = service();
        let unknown = ApiKeyGenerator::default().generate();

        assert!(matches!(
            service.verify(&unknown.key).await,
            Err(ApiKeyError::Invalid)
        ));
        assert!(matches!(
            service.verify("garbage").await,
            Err(ApiKeyError::Invalid)
        ));
    }

    #[tokio::test]
    async fn test_revoked_key_is_disabled() {
        let (service, _) = service();
        let issued = service.issue(1, None, None).await.unwrap();

        service.revoke(issued.record.id).await.unwrap();
        assert!(matches!(
            service.verify(&issued.secret).await,
            Err(ApiKeyError::Disabled)
        ));

        // idempotent
        service.revoke(issued.record.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_unknown_key() {
        let (service, _) = service();
        assert!(matches!(service.revoke(99).await, Err(ApiKeyError::NotFound)));
    }

    #[tokio::test]
    async fn test_expired_key() {
        let (service, store) = service();
        let issued = service.issue(1, None, Some(30)).await.unwrap();
        assert!(issued.record.expires_at.is_some());

        let mut record = issued.record.clone();
        record.expires_at = Some(Utc::now() - Duration::seconds(5));
        store.replace(record).await;

        assert!(matches!(
            service.verify(&issued.secret).await,
            Err(ApiKeyError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_list_for_user() {
        let (service, _) = service();
        service.issue(1, None, None).await.unwrap();
        service.issue(1, None, None).await.unwrap();
        service.issue(2, None, None).await.unwrap();

        let keys = service.list_for_user(1).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].id > keys[1].id);
    }

    #[test]
    fn test_looks_like_api_key() {
        let (service, _) = service();
        assert!(service.looks_like_api_key("tk_live_abc"));
        assert!(!service.looks_like_api_key("eyJhbGciOi"));
    }
}
