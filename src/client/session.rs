use crate::client::connection::{read_message, Connection};
use crate::client::constants::*;
use crate::client::correlator::{Correlation, ReplyCorrelator};
use crate::client::error::{ClientError, Result};
use crate::client::ledger::Ledger;
use crate::client::progress::ProgressTracker;
use crate::client::scheduler::{ProbeEmitter, ProbeScheduler};
use crate::client::statistics::{summarize, Report};
use crate::protocol::filler_payload;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Whole milliseconds from `start` to `at`, as carried on the wire
pub fn millis_between(start: Instant, at: Instant) -> i32 {
    let ms = at.saturating_duration_since(start).as_millis();
    i32::try_from(ms).unwrap_or(i32::MAX)
}

/// Parameters fixed for the lifetime of a session
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub count: usize,
    pub interval: Duration,
    pub payload_size: usize,
    /// Delay between the terminate echo and closing the connection
    pub grace: Duration,
    /// How long to wait for the terminate echo once the series is sent
    pub terminate_timeout: Duration,
    /// Bounded wait for the scheduler at teardown
    pub stop_timeout: Duration,
    pub show_progress: bool,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            count: DEFAULT_PROBE_COUNT,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            payload_size: DEFAULT_PAYLOAD_SIZE,
            grace: Duration::from_millis(DEFAULT_GRACE_MS),
            terminate_timeout: Duration::from_millis(DEFAULT_TERMINATE_TIMEOUT_MS),
            stop_timeout: Duration::from_millis(DEFAULT_STOP_TIMEOUT_MS),
            show_progress: false,
        }
    }
}

/// Result of a finished session
#[derive(Debug)]
pub struct SessionOutcome {
    pub report: Report,
    pub probes_sent: usize,
    pub duplicates: usize,
    /// The peer confirmed the terminate message and nothing failed
    pub completed: bool,
    /// Fault that ended the session early, if any
    pub fault: Option<ClientError>,
    pub elapsed: Duration,
}

enum CloseEvent {
    SeriesSent,
    TerminateConfirmed,
}

/// One probe series over one connection.
///
/// Create it when the connection becomes active; the start timestamp every
/// probe is measured against is taken here.
pub struct Session {
    params: SessionParams,
    started: Instant,
    sent: Arc<AtomicUsize>,
    terminated: AtomicBool,
    ledger: Arc<Ledger>,
    payload: Arc<[u8]>,
}

impl Session {
    pub fn new(params: SessionParams) -> Result<Self> {
        if params.count == 0 || params.count > MAX_PROBE_COUNT {
            return Err(ClientError::Config(format!(
                "probe count must be in 1..={}, got {}",
                MAX_PROBE_COUNT, params.count
            )));
        }
        if params.payload_size > MAX_PAYLOAD_SIZE {
            return Err(ClientError::Config(format!(
                "payload size must be <= {}, got {}",
                MAX_PAYLOAD_SIZE, params.payload_size
            )));
        }

        Ok(Self {
            started: Instant::now(),
            sent: Arc::new(AtomicUsize::new(0)),
            terminated: AtomicBool::new(false),
            ledger: Arc::new(Ledger::new(params.count)),
            payload: filler_payload(params.payload_size).into(),
            params,
        })
    }

    /// Probes handed to the connection so far; readable from any thread
    pub fn probes_sent(&self) -> usize {
        self.sent.load(Ordering::Acquire)
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Run the series to completion.
    ///
    /// Probes go out on a scheduler thread while replies are correlated on
    /// the calling thread until `reader` reaches end-of-stream. Teardown stops
    /// the scheduler with a bounded wait before the ledger is summarized.
    pub fn run<C, R>(self, connection: Arc<C>, mut reader: R) -> Result<SessionOutcome>
    where
        C: Connection + 'static,
        R: Read,
    {
        let progress = if self.params.show_progress {
            ProgressTracker::new(self.params.count)?
        } else {
            ProgressTracker::hidden()
        };

        let close_tx = self.spawn_closer(Arc::clone(&connection))?;
        let series_tx = close_tx.clone();

        let emitter = ProbeEmitter {
            connection: Arc::clone(&connection),
            ledger: Arc::clone(&self.ledger),
            payload: Arc::clone(&self.payload),
            sent: Arc::clone(&self.sent),
            started: self.started,
            count: self.params.count,
            progress: progress.clone(),
        };
        let mut scheduler = ProbeScheduler::start(emitter, self.params.interval, move || {
            let _ = series_tx.send(CloseEvent::SeriesSent);
        })?;

        info!(
            count = self.params.count,
            interval_ms = self.params.interval.as_millis() as u64,
            payload_size = self.params.payload_size,
            "Session started"
        );

        let mut correlator = ReplyCorrelator::new(Arc::clone(&self.ledger), self.started);
        let mut fault = None;

        loop {
            let message = match read_message(&mut reader) {
                Ok(Some(message)) => message,
                Ok(None) => {
                    debug!("Connection closed");
                    break;
                }
                Err(e) if self.terminated.load(Ordering::Acquire) => {
                    debug!(error = %e, "Read ended after terminate");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Connection read failed");
                    fault = Some(e);
                    break;
                }
            };

            match correlator.handle(&message) {
                Ok(Correlation::Terminated) => {
                    if !self.terminated.swap(true, Ordering::AcqRel) {
                        let _ = close_tx.send(CloseEvent::TerminateConfirmed);
                    }
                }
                Ok(Correlation::Recorded {
                    sequence, rtt_ms, ..
                }) => progress.reply_received(sequence, rtt_ms),
                Err(e) => {
                    error!(error = %e, "Failed to process reply, closing connection");
                    fault = Some(e);
                    break;
                }
            }
        }

        // Teardown: the correlator is done; make sure the scheduler is too.
        drop(close_tx);
        if let Err(e) = connection.close() {
            debug!(error = %e, "Close during teardown failed");
        }
        if !scheduler.stop(self.params.stop_timeout) {
            warn!("Summarizing while the scheduler is still running");
        }
        progress.finish();

        let report = summarize(&self.ledger)?;
        let completed = self.terminated.load(Ordering::Acquire) && fault.is_none();
        let outcome = SessionOutcome {
            report,
            probes_sent: self.probes_sent(),
            duplicates: correlator.duplicates(),
            completed,
            fault,
            elapsed: self.started.elapsed(),
        };

        info!(
            probes_sent = outcome.probes_sent,
            replies = self.ledger.replied_count(),
            duplicates = outcome.duplicates,
            completed = completed,
            "Session finished"
        );
        Ok(outcome)
    }

    /// Thread that closes the connection `grace` after the terminate echo,
    /// or once the echo is overdue.
    fn spawn_closer<C: Connection + 'static>(&self, connection: Arc<C>) -> Result<Sender<CloseEvent>> {
        let (tx, rx) = mpsc::channel();
        let grace = self.params.grace;
        let terminate_timeout = self.params.terminate_timeout;

        thread::Builder::new()
            .name("session-closer".into())
            .spawn(move || {
                let confirmed = match rx.recv() {
                    Ok(CloseEvent::TerminateConfirmed) => true,
                    Ok(CloseEvent::SeriesSent) => match rx.recv_timeout(terminate_timeout) {
                        Ok(CloseEvent::TerminateConfirmed) => true,
                        Ok(CloseEvent::SeriesSent) => return,
                        Err(RecvTimeoutError::Timeout) => false,
                        Err(RecvTimeoutError::Disconnected) => return,
                    },
                    Err(_) => return,
                };

                if confirmed {
                    debug!(grace_ms = grace.as_millis() as u64, "Closing after grace period");
                    thread::sleep(grace);
                } else {
                    warn!(
                        timeout_ms = terminate_timeout.as_millis() as u64,
                        "Terminate echo not received, closing"
                    );
                }
                if let Err(e) = connection.close() {
                    debug!(error = %e, "Scheduled close failed");
                }
            })?;

        Ok(tx)
    }
}
