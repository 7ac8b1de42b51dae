//! API key generation
//!
//! Generates high-entropy bearer credentials together with the SHA-256 digest
//! used for lookup and a short display prefix.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Literal tag identifying TrackMe live keys
pub const KEY_TAG: &str = "tk_live_";

/// Number of encoded characters appended to the tag in the display prefix
const DISPLAY_CHARS: usize = 8;

/// Result of generating a new API key
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    /// The full API key (only shown once at creation)
    pub key: String,
    /// The display prefix, safe to show in listings
    pub prefix: String,
    /// The hex SHA-256 digest stored in place of the key
    pub hash: String,
}

/// Generator for API keys
#[derive(Debug, Clone)]
pub struct ApiKeyGenerator {
    tag: String,
    key_bytes: usize,
}

impl ApiKeyGenerator {
    /// Create a generator with a custom tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            key_bytes: 32,
        }
    }

    /// Generate a new API key from 256 bits of randomness
    pub fn generate(&self) -> GeneratedApiKey {
        let mut random_bytes = vec![0u8; self.key_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        let encoded = STANDARD.encode(&random_bytes);
        let key = format!("{}{}", self.tag, encoded);

        GeneratedApiKey {
            prefix: self.display_prefix(&key),
            hash: Self::hash_key(&key),
            key,
        }
    }

    /// Hash an API key for storage and lookup
    pub fn hash_key(key: &str) -> String {
        let digest = Sha256::digest(key.as_bytes());
        hex::encode(digest)
    }

    /// Tag plus the first few encoded characters
    fn display_prefix(&self, key: &str) -> String {
        key.chars()
            .take(self.tag.chars().count() + DISPLAY_CHARS)
            .collect()
    }

    /// Check that a presented key looks like one of ours before hashing it
    pub fn is_valid_format(&self, key: &str) -> bool {
        match key.strip_prefix(self.tag.as_str()) {
            Some(secret) => {
                !secret.is_empty()
                    && secret
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
            }
            None => false,
        }
    }

    /// The tag prepended to every key
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl Default for ApiKeyGenerator {
    fn default() -> Self {
        Self::new(KEY_TAG)
    }
}

/// Concrete expiry for a key valid `days` days from now.
///
/// Absent or non-positive day counts mean the key never expires.
pub fn expires_in_days(days: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_days_from(Utc::now(), days)
}

pub(crate) fn expires_in_days_from(now: DateTime<Utc>, days: Option<i64>) -> Option<DateTime<Utc>> {
    match days {
        Some(days) if days > 0 => Some(now + Duration::days(days)),
        _ => None,
    }
}
