use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    ConnectionHub, ConnectionId, ParkingStore, ParkingTimeExpired, Scheduler, ServerEvent,
    TimerCancelled, TimerErrorEvent, TimerHandle, TimerStarted, TimerStatus,
};
use crate::config::TimerConfig;

pub type UserId = i32;

/// Reasons a timer command is refused
#[derive(Debug, Error, PartialEq)]
pub enum TimerError {
    #[error("Invalid duration: must be between 1 and {max} seconds")]
    InvalidDuration { max: u64 },

    #[error("Parking not found or not authorized")]
    NotFoundOrForbidden,

    #[error("No active timer to cancel")]
    NoActiveTimer,

    #[error("Parking service unavailable, try again later")]
    Unavailable,
}

struct TimerEntry {
    timer_id: Uuid,
    parking_id: i32,
    duration_secs: u64,
    started_at: DateTime<Utc>,
    started: Instant,
    connection_id: Option<ConnectionId>,
    location: String,
    handle: TimerHandle,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSummary {
    pub user_id: UserId,
    pub parking_id: i32,
    pub duration: u64,
    pub start_time: DateTime<Utc>,
    pub connection_id: Option<ConnectionId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStats {
    pub active_timers: usize,
    pub timers: Vec<TimerSummary>,
}

struct Inner {
    timers: Mutex<HashMap<UserId, TimerEntry>>,
    store: Arc<dyn ParkingStore>,
    hub: ConnectionHub,
    scheduler: Arc<dyn Scheduler>,
    config: TimerConfig,
}

/// Registry of armed timers, at most one per user
#[derive(Clone)]
pub struct TimerService {
    inner: Arc<Inner>,
}

/// Note appended to a parking record when its timer fires
fn expiry_note(at: DateTime<Utc>) -> String {
    format!("Time expired at {}", at.format("%H:%M:%S"))
}

impl TimerService {
    pub fn new(
        store: Arc<dyn ParkingStore>,
        hub: ConnectionHub,
        scheduler: Arc<dyn Scheduler>,
        config: TimerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                timers: Mutex::new(HashMap::new()),
                store,
                hub,
                scheduler,
                config,
            }),
        }
    }

    /// Arm a timer for `owner` on one of its parking records, replacing any armed one
    pub async fn start(
        &self,
        owner: UserId,
        parking_id: i32,
        duration: Option<i64>,
        connection_id: Option<ConnectionId>,
    ) -> Result<TimerStarted, TimerError> {
        let config = &self.inner.config;
        let requested = duration.unwrap_or(config.default_duration_secs as i64);
        let duration_secs = u64::try_from(requested)
            .ok()
            .filter(|secs| (1..=config.max_duration_secs).contains(secs))
            .ok_or(TimerError::InvalidDuration {
                max: config.max_duration_secs,
            })?;

        let lookup = tokio::time::timeout(
            config.store_timeout(),
            self.inner.store.find_owned(owner, parking_id),
        )
        .await;

        let parking = match lookup {
            Ok(Ok(Some(parking))) => parking,
            Ok(Ok(None)) => {
                warn!("User {} tried to time parking {}", owner, parking_id);
                return Err(TimerError::NotFoundOrForbidden);
            }
            Ok(Err(e)) => {
                error!("Ownership check failed for parking {}: {}", parking_id, e);
                return Err(TimerError::Unavailable);
            }
            Err(_) => {
                error!("Ownership check timed out for parking {}", parking_id);
                return Err(TimerError::Unavailable);
            }
        };

        let timer_id = Uuid::new_v4();
        let started_at = Utc::now();

        let mut timers = self.inner.timers.lock().await;

        let service = self.clone();
        let handle = self.inner.scheduler.schedule(
            Duration::from_secs(duration_secs),
            Box::pin(async move { service.fire(owner, timer_id).await }),
        );

        let previous = timers.insert(
            owner,
            TimerEntry {
                timer_id,
                parking_id,
                duration_secs,
                started_at,
                started: Instant::now(),
                connection_id,
                location: parking.location(),
                handle,
            },
        );
        drop(timers);

        if let Some(previous) = previous {
            previous.handle.cancel();
            info!(
                "Replaced timer on parking {} for user {}",
                previous.parking_id, owner
            );
        }

        info!(
            "Timer started for user {} on parking {} ({}s)",
            owner, parking_id, duration_secs
        );

        Ok(TimerStarted {
            message: "Timer started".to_string(),
            parking_id,
            duration: duration_secs,
            start_time: started_at,
            end_time: started_at + chrono::Duration::seconds(duration_secs as i64),
        })
    }

    /// Disarm the timer of `owner`
    pub async fn cancel(&self, owner: UserId) -> Result<TimerCancelled, TimerError> {
        let entry = self
            .inner
            .timers
            .lock()
            .await
            .remove(&owner)
            .ok_or(TimerError::NoActiveTimer)?;

        entry.handle.cancel();
        info!("Timer cancelled for user {}", owner);

        Ok(TimerCancelled {
            message: "Timer cancelled".to_string(),
            parking_id: entry.parking_id,
            timestamp: Utc::now(),
        })
    }

    pub async fn status(&self, owner: UserId) -> TimerStatus {
        let timers = self.inner.timers.lock().await;
        let Some(entry) = timers.get(&owner) else {
            return TimerStatus::inactive();
        };

        let elapsed = entry.started.elapsed().as_secs();
        TimerStatus {
            active: true,
            parking_id: Some(entry.parking_id),
            duration: Some(entry.duration_secs),
            elapsed: Some(elapsed),
            remaining: Some(entry.duration_secs.saturating_sub(elapsed)),
            start_time: Some(entry.started_at),
            message: None,
        }
    }

    pub async fn stats(&self) -> TimerStats {
        let timers = self.inner.timers.lock().await;
        let mut summaries: Vec<TimerSummary> = timers
            .iter()
            .map(|(owner, entry)| TimerSummary {
                user_id: *owner,
                parking_id: entry.parking_id,
                duration: entry.duration_secs,
                start_time: entry.started_at,
                connection_id: entry.connection_id,
            })
            .collect();
        summaries.sort_by_key(|s| s.user_id);

        TimerStats {
            active_timers: summaries.len(),
            timers: summaries,
        }
    }

    async fn fire(&self, owner: UserId, timer_id: Uuid) {
        let entry = {
            let mut timers = self.inner.timers.lock().await;
            match timers.get(&owner) {
                Some(entry) if entry.timer_id == timer_id => timers.remove(&owner),
                _ => None,
            }
        };

        let Some(entry) = entry else {
            debug!("Stale timer {} for user {} ignored", timer_id, owner);
            return;
        };

        let note = expiry_note(Utc::now());
        let annotated = tokio::time::timeout(
            self.inner.config.store_timeout(),
            self.inner.store.annotate(entry.parking_id, &note),
        )
        .await;

        let event = match annotated {
            Ok(Ok(true)) => ServerEvent::ParkingTimeExpired(ParkingTimeExpired::new(
                entry.parking_id,
                entry.location,
                entry.duration_secs,
            )),
            Ok(Ok(false)) => {
                warn!("Parking {} vanished before its timer fired", entry.parking_id);
                Self::notification_failure(entry.parking_id)
            }
            Ok(Err(e)) => {
                error!("Failed to annotate parking {}: {}", entry.parking_id, e);
                Self::notification_failure(entry.parking_id)
            }
            Err(_) => {
                error!("Annotating parking {} timed out", entry.parking_id);
                Self::notification_failure(entry.parking_id)
            }
        };

        let delivered = self.inner.hub.emit_to_owner(owner, event).await;
        info!(
            "Timer fired for user {} on parking {}, delivered to {} connection(s)",
            owner, entry.parking_id, delivered
        );
    }

    fn notification_failure(parking_id: i32) -> ServerEvent {
        ServerEvent::TimerError(TimerErrorEvent::new(
            "Failed to record parking expiry",
            Some(parking_id),
        ))
    }
}
