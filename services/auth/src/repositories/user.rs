//! User repository for database operations

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{info, warn};

use crate::models::{ParkingSummary, Role, User, UserOverview};

/// Stored in place of a hash for accounts that can only use API keys
const DISABLED_PASSWORD: &str = "!disabled";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

fn map_user(row: &PgRow) -> User {
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: role.parse().unwrap_or(Role::User),
        created_at: row.get("created_at"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Hash a plaintext password with argon2
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    /// Create a new user. Returns `None` when the email is already taken.
    pub async fn create(&self, email: &str, password: &str) -> Result<Option<User>> {
        let password_hash = Self::hash_password(password)?;
        self.insert(email, &password_hash).await
    }

    /// Create a user that can never log in with a password
    pub async fn create_disabled(&self, email: &str) -> Result<Option<User>> {
        self.insert(email, DISABLED_PASSWORD).await
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<Option<User>> {
        info!("Creating new user: {}", email);

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, role, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(Some(map_user(&row))),
            Err(e) if is_unique_violation(&e) => {
                warn!("Email already registered: {}", email);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, role, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_user))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_user))
    }

    /// Verify a user's password. Disabled or malformed hashes never match.
    pub fn verify_password(&self, user: &User, password: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&user.password_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Delete a user and, by cascade, its parkings and keys
    pub async fn delete(&self, id: i32) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Most recent parking record of a user
    pub async fn latest_parking(&self, user_id: i32) -> Result<Option<ParkingSummary>> {
        let parking = sqlx::query_as::<_, ParkingSummary>(
            r#"
            SELECT id, latitude, longitude, address, note, created_at
            FROM parkings
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(parking)
    }

    /// Number of parking records of a user
    pub async fn parking_count(&self, user_id: i32) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM parkings WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    /// All users with their parking and key counts, newest first
    pub async fn list_with_counts(&self) -> Result<Vec<UserOverview>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.email, u.role, u.created_at,
                   (SELECT COUNT(*) FROM parkings p WHERE p.user_id = u.id) AS parkings_count,
                   (SELECT COUNT(*) FROM api_keys k WHERE k.user_id = u.id) AS api_keys_count
            FROM users u
            ORDER BY u.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let users = rows
            .iter()
            .map(|row| {
                let role: String = row.get("role");
                UserOverview {
                    id: row.get("id"),
                    email: row.get("email"),
                    role: role.parse().unwrap_or(Role::User),
                    created_at: row.get("created_at"),
                    parkings_count: row.get("parkings_count"),
                    api_keys_count: row.get("api_keys_count"),
                }
            })
            .collect();

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;

    fn repository() -> UserRepository {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/trackme_test")
            .unwrap();
        UserRepository::new(pool)
    }

    fn user_with_hash(password_hash: String) -> User {
        User {
            id: 1,
            email: "driver@example.com".to_string(),
            password_hash,
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_password_hash_verifies() {
        let repo = repository();
        let user = user_with_hash(UserRepository::hash_password("Secret1").unwrap());

        assert!(repo.verify_password(&user, "Secret1"));
        assert!(!repo.verify_password(&user, "Secret2"));
    }

    #[tokio::test]
    async fn test_disabled_password_never_verifies() {
        let repo = repository();
        let user = user_with_hash(DISABLED_PASSWORD.to_string());

        assert!(!repo.verify_password(&user, DISABLED_PASSWORD));
        assert!(!repo.verify_password(&user, ""));
    }
}
