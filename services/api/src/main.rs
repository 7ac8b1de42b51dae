use std::sync::Arc;

use anyhow::Result;
use tracing::info;

mod config;
mod error;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;
mod timer;
mod ws;

use common::{
    api_key::{ApiKeyService, PgApiKeyStore},
    config::ServerConfig,
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
    jwt::{JwtConfig, JwtService},
    telemetry,
};
use tokio::net::TcpListener;

use crate::{
    config::TimerConfig,
    repositories::{ParkingRepository, UserRepository},
    state::AppState,
    timer::{ConnectionHub, TimerService, TokioScheduler},
};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing("info");

    info!("Starting API service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    let timer_config = TimerConfig::load()?;
    info!(
        "Timers: default {}s, max {}s",
        timer_config.default_duration_secs, timer_config.max_duration_secs
    );

    // Initialize repositories
    let parking_repository = ParkingRepository::new(pool.clone());
    let user_repository = UserRepository::new(pool.clone());
    let api_keys = ApiKeyService::new(Arc::new(PgApiKeyStore::new(pool)));

    let hub = ConnectionHub::new();
    let timers = TimerService::new(
        Arc::new(parking_repository.clone()),
        hub.clone(),
        Arc::new(TokioScheduler),
        timer_config,
    );

    let app_state = AppState {
        user_repository,
        parking_repository,
        api_keys,
        jwt_service: JwtService::new(JwtConfig::from_env()?),
        hub,
        timers,
    };

    let server_config = ServerConfig::load("API", 3001)?;
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(server_config.address()).await?;
    info!("API service listening on {}", server_config.address());

    axum::serve(listener, app).await?;

    Ok(())
}
