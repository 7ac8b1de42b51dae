//! API models for request and response payloads

pub mod parking;

/// Identity attached to authenticated requests
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    /// Set when the caller authenticated with an API key
    pub api_key_id: Option<i32>,
}

/// User row as needed for authorization decisions
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub id: i32,
    pub email: String,
    pub role: String,
}

impl UserIdentity {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
