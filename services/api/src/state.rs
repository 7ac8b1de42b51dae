//! Application state shared across handlers

use common::{api_key::ApiKeyService, jwt::JwtService};

use crate::{
    repositories::{ParkingRepository, UserRepository},
    timer::{ConnectionHub, TimerService},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub user_repository: UserRepository,
    pub parking_repository: ParkingRepository,
    pub api_keys: ApiKeyService,
    pub jwt_service: JwtService,
    pub hub: ConnectionHub,
    pub timers: TimerService,
}
