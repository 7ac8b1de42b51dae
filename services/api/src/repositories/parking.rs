//! Parking repository for database operations

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::{
    models::parking::{CreateParkingRequest, Parking, UpdateParkingRequest},
    timer::ParkingStore,
};

const COLUMNS: &str = "id, user_id, latitude, longitude, address, note, created_at, updated_at";

/// Parking repository for database operations
#[derive(Clone)]
pub struct ParkingRepository {
    pool: PgPool,
}

impl ParkingRepository {
    /// Create a new parking repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a new parking location for `user_id`
    pub async fn create(&self, user_id: i32, payload: &CreateParkingRequest) -> Result<Parking> {
        let parking = sqlx::query_as::<_, Parking>(&format!(
            r#"
            INSERT INTO parkings (user_id, latitude, longitude, address, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(payload.latitude)
        .bind(payload.longitude)
        .bind(&payload.address)
        .bind(&payload.note)
        .fetch_one(&self.pool)
        .await?;

        Ok(parking)
    }

    /// Most recent parking of `user_id`
    pub async fn latest(&self, user_id: i32) -> Result<Option<Parking>> {
        let parking = sqlx::query_as::<_, Parking>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM parkings
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(parking)
    }

    /// One page of history, newest first, plus the total count
    pub async fn history(
        &self,
        user_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Parking>, i64)> {
        let parkings = sqlx::query_as::<_, Parking>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM parkings
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM parkings WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?
            .get("total");

        Ok((parkings, total))
    }

    /// A parking record, if it belongs to `user_id`
    pub async fn find_owned(&self, user_id: i32, id: i32) -> Result<Option<Parking>> {
        let parking = sqlx::query_as::<_, Parking>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM parkings
            WHERE id = $1 AND user_id = $2
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(parking)
    }

    /// Update address and/or note. `None` when missing or not owned.
    pub async fn update(
        &self,
        user_id: i32,
        id: i32,
        payload: &UpdateParkingRequest,
    ) -> Result<Option<Parking>> {
        let parking = sqlx::query_as::<_, Parking>(&format!(
            r#"
            UPDATE parkings
            SET address = COALESCE($3, address),
                note = COALESCE($4, note),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(&payload.address)
        .bind(&payload.note)
        .fetch_optional(&self.pool)
        .await?;

        Ok(parking)
    }

    /// Delete a record. Returns false when missing or not owned.
    pub async fn delete(&self, user_id: i32, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM parkings WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ParkingStore for ParkingRepository {
    async fn find_owned(&self, owner_id: i32, parking_id: i32) -> Result<Option<Parking>> {
        ParkingRepository::find_owned(self, owner_id, parking_id).await
    }

    async fn annotate(&self, parking_id: i32, note: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE parkings
            SET note = CASE
                    WHEN note IS NULL OR note = '' THEN $2
                    ELSE note || ' - ' || $2
                END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(parking_id)
        .bind(note)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
