//! rtt-probe - Round-trip latency probing over an established connection
//!
//! The client sends a bounded series of numbered, timestamped probes at a fixed
//! cadence, matches every echoed reply to the probe that produced it and, once
//! the series is over, summarizes the recorded round-trip times.

pub mod client;
pub mod protocol;
pub mod server;
