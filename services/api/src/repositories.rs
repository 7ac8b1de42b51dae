//! Repositories for database operations

use anyhow::Result;
use sqlx::{PgPool, Row};

use crate::models::UserIdentity;

pub mod parking;

pub use parking::ParkingRepository;

/// Read-only access to users, for authorization
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by ID
    pub async fn find_identity(&self, id: i32) -> Result<Option<UserIdentity>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, role
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserIdentity {
            id: row.get("id"),
            email: row.get("email"),
            role: row.get("role"),
        }))
    }
}
