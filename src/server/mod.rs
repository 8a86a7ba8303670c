//! Server module: echo peer for probe series

pub mod config;
pub mod echo;

pub use config::ServerConfig;
pub use echo::{handle_client, serve, EchoCounters, EchoStats};
