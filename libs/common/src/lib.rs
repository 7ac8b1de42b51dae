//! Common library for the TrackMe services
//!
//! This crate provides shared functionality used by the auth and api
//! services: database connectivity and migrations, error types,
//! configuration, tracing setup, session tokens and the API key lifecycle.

pub mod api_key;
pub mod config;
pub mod database;
pub mod error;
pub mod jwt;
pub mod telemetry;

/// Example usage of the database module
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, init_pool, health_check, run_migrations};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = init_pool(&config).await?;
///     run_migrations(&pool).await?;
///     let is_healthy = health_check(&pool).await?;
///     println!("Database health check: {}", is_healthy);
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
