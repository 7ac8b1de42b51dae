//! Read-only parking view used by login and profile responses

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Parking record as shown alongside a user
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ParkingSummary {
    pub id: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
