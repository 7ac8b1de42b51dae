//! Parking record models and request validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Longest accepted note
pub const MAX_NOTE_LEN: usize = 500;

/// Default page size for history listings
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Largest page size for history listings
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// A recorded parking location
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Parking {
    pub id: i32,
    pub user_id: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Parking {
    /// Human readable location: the address, or the coordinates
    pub fn location(&self) -> String {
        match self.address.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => format!("{}, {}", self.latitude, self.longitude),
        }
    }
}

/// Body of `POST /api/v1/parking`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateParkingRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub note: Option<String>,
}

impl CreateParkingRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err("Latitude must be between -90 and 90".to_string());
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err("Longitude must be between -180 and 180".to_string());
        }
        validate_note(self.note.as_deref())
    }
}

/// Body of `PATCH /api/v1/parking/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateParkingRequest {
    pub address: Option<String>,
    pub note: Option<String>,
}

impl UpdateParkingRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.address.is_none() && self.note.is_none() {
            return Err("Nothing to update: provide address or note".to_string());
        }
        validate_note(self.note.as_deref())
    }
}

fn validate_note(note: Option<&str>) -> Result<(), String> {
    match note {
        Some(note) if note.chars().count() > MAX_NOTE_LEN => Err(format!(
            "Note must be at most {} characters long",
            MAX_NOTE_LEN
        )),
        _ => Ok(()),
    }
}

/// Query string of the history listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl HistoryQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: i64, limit: i64, offset: i64) -> Self {
        Self {
            total,
            limit,
            offset,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

/// Body of `POST /api/v1/parking/:id/start-timer`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartTimerBody {
    pub duration: Option<i64>,
}
