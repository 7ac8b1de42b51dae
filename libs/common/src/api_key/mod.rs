//! API key lifecycle: generation, verification, revocation and expiry

mod generator;
mod memory;
mod model;
mod postgres;
mod service;
mod store;

pub use generator::{ApiKeyGenerator, GeneratedApiKey, KEY_TAG, expires_in_days};
pub use memory::InMemoryApiKeyStore;
pub use model::{ApiKeyRecord, IssuedApiKey, NewApiKey};
pub use postgres::PgApiKeyStore;
pub use service::ApiKeyService;
pub use store::ApiKeyStore;
