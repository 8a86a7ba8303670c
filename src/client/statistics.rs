use crate::client::constants::{REPORTED_PERCENTILES, UNSET_RTT_MS};
use crate::client::error::{ClientError, Result};
use crate::client::ledger::Ledger;
use tracing::debug;

/// Summary of one probe series.
///
/// Every ledger slot contributes, including unanswered ones at the `-1`
/// sentinel, which pulls mean and low percentiles down when replies are lost.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    sorted: Vec<i32>,
    mean: f64,
    std_dev: f64,
    unanswered: usize,
}

impl Report {
    /// Compute the summary over raw slot values
    pub fn new(rtts: &[i32], unanswered: usize) -> Result<Self> {
        if rtts.is_empty() {
            return Err(ClientError::Measurement(
                "no probes to summarize".into(),
            ));
        }
        debug!(sample_count = rtts.len(), "Summarizing round-trip times");

        let n = rtts.len() as f64;
        let mean = rtts.iter().map(|&v| v as f64).sum::<f64>() / n;
        let variance = rtts
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        let mut sorted = rtts.to_vec();
        sorted.sort_unstable();

        Ok(Self {
            sorted,
            mean,
            std_dev: variance.sqrt(),
            unanswered,
        })
    }

    pub fn count(&self) -> usize {
        self.sorted.len()
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// `sorted[floor(N * quantile)]`
    pub fn percentile(&self, quantile: f64) -> i32 {
        let idx = (self.sorted.len() as f64 * quantile) as usize;
        self.sorted[idx.min(self.sorted.len() - 1)]
    }

    /// The reported percentile set, highest first
    pub fn percentiles(&self) -> [(f64, i32); 4] {
        REPORTED_PERCENTILES.map(|q| (q, self.percentile(q)))
    }

    pub fn min(&self) -> i32 {
        self.sorted[0]
    }

    pub fn max(&self) -> i32 {
        self.sorted[self.sorted.len() - 1]
    }

    /// Ascending copy of every slot value
    pub fn sorted(&self) -> &[i32] {
        &self.sorted
    }

    /// Slots that never got a reply
    pub fn unanswered(&self) -> usize {
        self.unanswered
    }
}

/// Build the report from a ledger nobody is writing to anymore
pub fn summarize(ledger: &Ledger) -> Result<Report> {
    let rtts = ledger.rtts();
    let unanswered = ledger.len() - ledger.replied_count();
    Report::new(&rtts, unanswered)
}
