//! Client module: probe scheduling, reply correlation and reporting

pub mod config;
pub mod connection;
pub mod constants;
pub mod correlator;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod progress;
pub mod reporter;
pub mod scheduler;
pub mod session;
pub mod statistics;

pub use config::Config;
pub use connection::{read_message, Connection, TcpConnection};
pub use constants::*;
pub use correlator::{Correlation, ReplyCorrelator};
pub use error::{ClientError, Result};
pub use ledger::{Ledger, ProbeSlot};
pub use logging::init_logging_with_config;
pub use progress::ProgressTracker;
pub use reporter::Reporter;
pub use scheduler::{ProbeEmitter, ProbeScheduler};
pub use session::{Session, SessionOutcome, SessionParams};
pub use statistics::{summarize, Report};
