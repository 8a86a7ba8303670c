use crate::client::constants::*;
use crate::client::error::{ClientError, Result};
use crate::client::session::SessionParams;
use clap::Parser;
use std::time::Duration;
use tracing::debug;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Parser, Debug, Clone)]
#[command(name = "rtt-client")]
#[command(about = "Measures round-trip latency with a paced series of echoed probes")]
pub struct Config {
    /// Peer address to connect to
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub server: String,

    /// Number of probes to send
    #[arg(long, default_value_t = DEFAULT_PROBE_COUNT)]
    pub count: usize,

    /// Delay between probes in milliseconds, measured from the end of the previous send
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval_ms: u64,

    /// Filler bytes carried by every probe
    #[arg(long, default_value_t = DEFAULT_PAYLOAD_SIZE)]
    pub payload_size: usize,

    /// Wait after the terminate echo before closing, in milliseconds
    #[arg(long, default_value_t = DEFAULT_GRACE_MS)]
    pub grace_ms: u64,

    /// Close if the terminate echo has not arrived this long after the last probe, in milliseconds
    #[arg(long, default_value_t = DEFAULT_TERMINATE_TIMEOUT_MS)]
    pub terminate_timeout_ms: u64,

    /// Upper bound on waiting for the scheduler to stop, in milliseconds
    #[arg(long, default_value_t = DEFAULT_STOP_TIMEOUT_MS)]
    pub stop_timeout_ms: u64,

    /// Connect timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,

    /// Disable the progress bar
    #[arg(long)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,
}

impl Config {
    /// Returns the probe interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns true if JSON format logging is enabled
    pub fn is_json_format(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    /// Validates the configuration values
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");
        if self.count == 0 {
            return Err(ClientError::Config("count must be > 0".into()));
        }
        if self.count > MAX_PROBE_COUNT {
            return Err(ClientError::Config(format!(
                "count must be <= {}",
                MAX_PROBE_COUNT
            )));
        }
        if self.interval_ms == 0 {
            return Err(ClientError::Config("interval must be > 0".into()));
        }
        if self.payload_size > MAX_PAYLOAD_SIZE {
            return Err(ClientError::Config(format!(
                "payload size must be <= {}",
                MAX_PAYLOAD_SIZE
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ClientError::Config("connect timeout must be > 0".into()));
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ClientError::Config(format!(
                "log_level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        debug!("Configuration validated successfully");
        Ok(())
    }

    /// Session parameters described by this configuration
    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            count: self.count,
            interval: self.interval(),
            payload_size: self.payload_size,
            grace: Duration::from_millis(self.grace_ms),
            terminate_timeout: Duration::from_millis(self.terminate_timeout_ms),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
            show_progress: !self.quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::parse_from(std::iter::once("rtt-client").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.count, DEFAULT_PROBE_COUNT);
        assert_eq!(config.interval(), Duration::from_millis(DEFAULT_INTERVAL_MS));
        assert_eq!(config.payload_size, DEFAULT_PAYLOAD_SIZE);
        assert!(!config.is_json_format());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_params() {
        let config = parse(&[
            "--count",
            "5",
            "--interval-ms",
            "100",
            "--payload-size",
            "16",
            "--grace-ms",
            "250",
            "--quiet",
        ]);
        let params = config.session_params();
        assert_eq!(params.count, 5);
        assert_eq!(params.interval, Duration::from_millis(100));
        assert_eq!(params.payload_size, 16);
        assert_eq!(params.grace, Duration::from_millis(250));
        assert!(!params.show_progress);
    }

    #[test]
    fn test_invalid_count() {
        assert!(parse(&["--count", "0"]).validate().is_err());
        assert!(parse(&["--count", "32768"]).validate().is_err());
        assert!(parse(&["--count", "32767"]).validate().is_ok());
    }

    #[test]
    fn test_invalid_interval_and_payload() {
        assert!(parse(&["--interval-ms", "0"]).validate().is_err());
        assert!(parse(&["--payload-size", "40000"]).validate().is_err());
        assert!(parse(&["--payload-size", "0"]).validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        assert!(parse(&["--log-level", "loud"]).validate().is_err());
        assert!(parse(&["--log-level", "DEBUG"]).validate().is_ok());
    }
}
