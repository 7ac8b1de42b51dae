use async_trait::async_trait;

use crate::models::parking::Parking;

/// Persistence calls made by the timer core
#[async_trait]
pub trait ParkingStore: Send + Sync {
    /// The parking record `parking_id` if it belongs to `owner_id`
    async fn find_owned(&self, owner_id: i32, parking_id: i32) -> anyhow::Result<Option<Parking>>;

    /// Append `note` to the record's note. Returns false when no record was updated.
    async fn annotate(&self, parking_id: i32, note: &str) -> anyhow::Result<bool>;
}
