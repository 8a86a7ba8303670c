//! Server configuration module
//!
//! Provides CLI argument parsing and validation for the echo peer.

use clap::Parser;
use tracing::debug;

#[derive(Parser, Debug, Clone)]
#[command(name = "rtt-server")]
#[command(about = "TCP echo peer for rtt-probe sessions")]
pub struct ServerConfig {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Bind port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,
}

impl ServerConfig {
    /// Returns the full bind address as a string (bind:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Validates the configuration values
    pub fn validate(&self) -> Result<(), String> {
        debug!("Validating server configuration");

        if self.port == 0 {
            return Err("port must be > 0".into());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            ));
        }

        Ok(())
    }

    /// Returns true if JSON format logging is enabled
    pub fn is_json_format(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(port: u16, log_level: &str, log_format: &str) -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1".to_string(),
            port,
            log_level: log_level.to_string(),
            log_format: log_format.to_string(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = config(9000, "debug", "json");
        assert_eq!(config.address(), "127.0.0.1:9000");
        assert!(config.is_json_format());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port() {
        assert!(config(0, "info", "text").validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        assert!(config(8080, "verbose", "text").validate().is_err());
    }
}
