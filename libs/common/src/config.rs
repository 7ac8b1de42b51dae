//! HTTP server configuration loaded with the `config` crate

use serde::Deserialize;

/// Listen address of a service
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Load the server configuration from `<PREFIX>_HOST` / `<PREFIX>_PORT`
    pub fn load(prefix: &str, default_port: u16) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", i64::from(default_port))?
            .add_source(config::Environment::with_prefix(prefix).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Socket address in `host:port` form
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_server_config_defaults() {
        let config = ServerConfig::load("TRACKME_TEST_DEFAULTS", 3000).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.address(), "0.0.0.0:3000");
    }

    #[test]
    #[serial]
    fn test_server_config_from_env() {
        unsafe {
            std::env::set_var("TRACKME_TEST_HOST", "127.0.0.1");
            std::env::set_var("TRACKME_TEST_PORT", "4100");
        }

        let config = ServerConfig::load("TRACKME_TEST", 3000).unwrap();
        assert_eq!(config.address(), "127.0.0.1:4100");

        unsafe {
            std::env::remove_var("TRACKME_TEST_HOST");
            std::env::remove_var("TRACKME_TEST_PORT");
        }
    }
}
