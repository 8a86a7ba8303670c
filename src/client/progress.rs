use crate::client::constants::PROGRESS_TICK_INTERVAL_MS;
use crate::client::error::{ClientError, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar over the probe series.
///
/// Cheap to clone; the scheduler advances it and the correlator updates its
/// message from another thread.
#[derive(Clone)]
pub struct ProgressTracker {
    pb: ProgressBar,
}

impl ProgressTracker {
    /// Create a visible progress tracker for `probe_count` probes
    pub fn new(probe_count: usize) -> Result<Self> {
        let pb = ProgressBar::new(probe_count as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{msg}\n{bar:40.cyan/blue} {pos:>5}/{len:5} probes [{elapsed_precise}]",
            )
            .map_err(|e| {
                ClientError::Measurement(format!("Failed to create progress style: {}", e))
            })?
            .progress_chars("█░"),
        );
        pb.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_INTERVAL_MS));
        Ok(Self { pb })
    }

    /// A tracker that draws nothing
    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }

    /// Record one probe sent
    pub fn probe_sent(&self) {
        self.pb.inc(1);
    }

    /// Show the latest reply
    pub fn reply_received(&self, sequence: i16, rtt_ms: i32) {
        let rtt = format!("{} ms", rtt_ms);
        let rtt = if rtt_ms < 1 {
            rtt.green()
        } else if rtt_ms < 10 {
            rtt.yellow()
        } else {
            rtt.red()
        };
        self.pb.set_message(format!("→ probe {}: {}", sequence, rtt));
    }

    pub fn finish(&self) {
        self.pb.finish();
    }

    pub fn position(&self) -> u64 {
        self.pb.position()
    }
}
