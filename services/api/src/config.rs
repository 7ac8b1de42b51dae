//! Parking timer configuration

use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Timer limits, loaded from `TIMER_*` environment variables
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TimerConfig {
    /// Countdown used when a start command omits the duration
    pub default_duration_secs: u64,
    /// Longest accepted countdown
    pub max_duration_secs: u64,
    /// Upper bound on each parking store call made by the timer core
    pub store_timeout_secs: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: 10,
            max_duration_secs: 3600,
            store_timeout_secs: 5,
        }
    }
}

impl TimerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_prefix("TIMER")
    }

    fn load_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .set_default("default_duration_secs", 10_i64)?
            .set_default("max_duration_secs", 3600_i64)?
            .set_default("store_timeout_secs", 5_i64)?
            .add_source(Environment::with_prefix(prefix).try_parsing(true))
            .build()?
            .try_deserialize()?;

        if config.max_duration_secs == 0 {
            return Err(ConfigError::Message(
                "max_duration_secs must be positive".to_string(),
            ));
        }
        if !(1..=config.max_duration_secs).contains(&config.default_duration_secs) {
            return Err(ConfigError::Message(format!(
                "default_duration_secs must be between 1 and {}",
                config.max_duration_secs
            )));
        }

        Ok(config)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}
