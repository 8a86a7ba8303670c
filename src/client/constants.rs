//! Constants used throughout the client application

/// Value held by a ledger slot whose probe never got a reply
pub const UNSET_RTT_MS: i32 = -1;

/// Default number of probes in a series
pub const DEFAULT_PROBE_COUNT: usize = 100;

/// Default delay between probe emissions in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 20;

/// Default filler bytes carried by every probe
pub const DEFAULT_PAYLOAD_SIZE: usize = 200;

/// Delay between the terminate echo and closing the connection, in milliseconds.
/// Leaves room for replies still in flight.
pub const DEFAULT_GRACE_MS: u64 = 3000;

/// How long to wait for the terminate echo after the last probe, in milliseconds
pub const DEFAULT_TERMINATE_TIMEOUT_MS: u64 = 10_000;

/// Upper bound on waiting for the scheduler during teardown, in milliseconds
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 3000;

/// Default connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;

/// Largest series the 2-byte signed sequence field can number
pub const MAX_PROBE_COUNT: usize = i16::MAX as usize;

/// Largest payload the 2-byte signed length field can describe
pub const MAX_PAYLOAD_SIZE: usize = i16::MAX as usize;

/// Percentiles included in every report, highest first
pub const REPORTED_PERCENTILES: [f64; 4] = [0.99, 0.95, 0.75, 0.50];

/// Progress bar tick interval in milliseconds
pub const PROGRESS_TICK_INTERVAL_MS: u64 = 100;
