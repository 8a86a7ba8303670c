use anyhow::{Context, Result};
use clap::Parser;
use rtt_probe::client::{
    init_logging_with_config, Config, Reporter, Session, TcpConnection,
};
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    let config = Config::parse();

    init_logging_with_config(&config.log_level, config.is_json_format());

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    match run(&config) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            error!(error = %e, "Client failed");
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the session completed cleanly
fn run(config: &Config) -> Result<bool> {
    let connection = TcpConnection::connect(&config.server, config.connect_timeout())
        .with_context(|| format!("Failed to connect to {}", config.server))?;
    let reader = connection
        .reader()
        .context("Failed to clone the connection for reading")?;
    info!(peer = %connection.peer_addr(), "Connected");

    let session = Session::new(config.session_params())?;
    let outcome = session.run(Arc::new(connection), reader)?;

    Reporter.print_results(&outcome);
    Ok(outcome.completed)
}
