use crate::client::error::{ClientError, Result};
use crate::client::ledger::Ledger;
use crate::client::session::millis_between;
use crate::protocol::{Decoded, Packet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// What an inbound message did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// A probe reply was matched and its RTT stored
    Recorded {
        sequence: i16,
        rtt_ms: i32,
        /// RTT that was overwritten, when this reply was a duplicate
        replaced: Option<i32>,
    },
    /// The peer echoed the terminate message
    Terminated,
}

/// Matches echoed probes to ledger slots and records their round-trip time
pub struct ReplyCorrelator {
    ledger: Arc<Ledger>,
    started: Instant,
    duplicates: usize,
}

impl ReplyCorrelator {
    pub fn new(ledger: Arc<Ledger>, started: Instant) -> Self {
        Self {
            ledger,
            started,
            duplicates: 0,
        }
    }

    /// Handle one inbound message received now
    pub fn handle(&mut self, message: &[u8]) -> Result<Correlation> {
        self.handle_at(message, Instant::now())
    }

    /// Handle one inbound message received at `received_at`.
    ///
    /// RTT is `received_at - session start - elapsed`, where elapsed is the
    /// timestamp this client embedded when sending. Negative values are kept.
    pub fn handle_at(&mut self, message: &[u8], received_at: Instant) -> Result<Correlation> {
        let packet = match Packet::decode(message)? {
            Decoded::Terminate => {
                info!("Peer confirmed terminate");
                return Ok(Correlation::Terminated);
            }
            Decoded::Probe(packet) => packet,
        };

        let sequence = packet.sequence.0;
        let now_ms = millis_between(self.started, received_at);
        let rtt_ms = now_ms.wrapping_sub(packet.elapsed_ms);

        let replaced = self.ledger.record_rtt(sequence, rtt_ms)?;
        if let Some(previous_ms) = replaced {
            self.duplicates += 1;
            let anomaly = ClientError::DuplicateReply {
                sequence,
                previous_ms,
                current_ms: rtt_ms,
            };
            error!(
                sequence = sequence,
                previous_ms = previous_ms,
                current_ms = rtt_ms,
                "{}",
                anomaly
            );
        }

        info!(sequence = sequence, rtt_ms = rtt_ms, "rtt");

        Ok(Correlation::Recorded {
            sequence,
            rtt_ms,
            replaced,
        })
    }

    /// Duplicate replies seen so far
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
