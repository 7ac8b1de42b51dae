//! In-memory parking countdowns with expiry notifications
//!
//! One timer per user. Starting a timer while one is armed replaces it,
//! and expiry is delivered to every open connection of the user at fire
//! time, whichever connection armed it.

mod events;
mod hub;
mod scheduler;
mod service;
mod store;

pub use events::{
    ClientCommand, Connected, Notification, ParkingTimeExpired, ServerEvent, TimerCancelled,
    TimerErrorEvent, TimerStarted, TimerStatus,
};
pub use hub::{ConnectionHub, ConnectionId};
pub use scheduler::{Scheduler, TimerHandle, TokioScheduler};
pub use service::{TimerError, TimerService, UserId};
pub use store::ParkingStore;
