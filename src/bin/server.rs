use anyhow::Result;
use clap::Parser;
use rtt_probe::client::init_logging_with_config;
use rtt_probe::server::{serve, EchoCounters, ServerConfig};
use std::net::TcpListener;
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    let config = ServerConfig::parse();

    init_logging_with_config(&config.log_level, config.is_json_format());

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config) {
        error!(error = %e, "Server failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(config: ServerConfig) -> Result<()> {
    let addr = config.address();

    let listener = TcpListener::bind(&addr).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            anyhow::anyhow!(
                "Failed to bind to {}: Address already in use. Try a different port or ensure no other process is using it.",
                addr
            )
        } else {
            anyhow::Error::new(e).context(format!("Failed to bind to {}", addr))
        }
    })?;

    info!(address = %addr, "Echo peer listening");

    serve(listener, Arc::new(EchoCounters::default()))?;
    Ok(())
}
