//! Authentication service models

pub mod parking;
pub mod user;

// Re-export for convenience
pub use parking::ParkingSummary;
pub use user::{LoginRequest, RegisterRequest, Role, User, UserOverview};
