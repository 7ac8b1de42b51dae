use std::sync::Arc;

use anyhow::Result;
use tracing::info;

mod admin;
mod error;
mod middleware;
mod models;
mod repositories;
mod routes;
mod validation;

use common::{
    api_key::{ApiKeyService, PgApiKeyStore},
    config::ServerConfig,
    database,
    jwt::{JwtConfig, JwtService},
    telemetry,
};
use tokio::net::TcpListener;

use crate::repositories::UserRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub api_keys: ApiKeyService,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing("info");

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = database::DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool).await?;

    let jwt_service = JwtService::new(JwtConfig::from_env()?);
    let api_keys = ApiKeyService::new(Arc::new(PgApiKeyStore::new(pool.clone())));
    let user_repository = UserRepository::new(pool);

    let app_state = AppState {
        jwt_service,
        user_repository,
        api_keys,
    };

    let server_config = ServerConfig::load("AUTH", 3000)?;
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(server_config.address()).await?;
    info!(
        "Authentication service listening on {}",
        server_config.address()
    );

    axum::serve(listener, app).await?;

    Ok(())
}
