use crate::client::connection::Connection;
use crate::client::error::Result;
use crate::client::ledger::Ledger;
use crate::client::progress::ProgressTracker;
use crate::client::session::millis_between;
use crate::protocol::{Packet, SequenceNumber};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything a tick needs, shared with the session that spawned it
pub struct ProbeEmitter<C: Connection> {
    pub connection: Arc<C>,
    pub ledger: Arc<Ledger>,
    pub payload: Arc<[u8]>,
    pub sent: Arc<AtomicUsize>,
    pub started: Instant,
    pub count: usize,
    pub progress: ProgressTracker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    Continue,
    Finished,
}

impl<C: Connection> ProbeEmitter<C> {
    fn tick(&self) -> Tick {
        let sequence = self.sent.fetch_add(1, Ordering::AcqRel) + 1;
        // Count is capped at i16::MAX when the session is created.
        let seq = sequence as i16;
        let offset_ms = millis_between(self.started, Instant::now());
        let finished = sequence >= self.count;

        let result = self.emit(seq, offset_ms, finished);
        self.progress.probe_sent();

        if let Err(e) = result {
            // The next tick still fires; faults surface through the connection.
            warn!(sequence = seq, error = %e, "Probe tick failed");
        }

        if finished {
            info!(probes = sequence, "Probe series complete, terminate sent");
            Tick::Finished
        } else {
            Tick::Continue
        }
    }

    /// Write the probe, plus the terminate message on the last tick.
    ///
    /// The terminate message and the flush are attempted even when the final
    /// probe fails; the first error is returned.
    fn emit(&self, seq: i16, offset_ms: i32, finished: bool) -> Result<()> {
        let probe = self.send_probe(seq, offset_ms);
        if !finished {
            probe?;
            return self.connection.flush();
        }

        let terminate = self.send_terminate(offset_ms);
        let flushed = self.connection.flush();
        probe.and(terminate).and(flushed)
    }

    fn send_probe(&self, seq: i16, offset_ms: i32) -> Result<()> {
        self.ledger.record_sent(seq, offset_ms)?;

        let probe = Packet::new(SequenceNumber(seq), offset_ms, &self.payload)?;
        self.connection.write(&probe.encode())?;
        debug!(sequence = seq, elapsed_ms = offset_ms, "Probe sent");
        Ok(())
    }

    fn send_terminate(&self, offset_ms: i32) -> Result<()> {
        let terminate = Packet::terminate(offset_ms, &self.payload)?;
        self.connection.write(&terminate.encode())?;
        debug!("Terminate sent");
        Ok(())
    }
}

/// Periodic probe emission on a dedicated thread.
///
/// The delay before each tick starts when the previous tick returns
/// (fixed delay), so slow writes push every later probe back.
pub struct ProbeScheduler {
    stop_tx: Option<Sender<()>>,
    done_rx: Receiver<()>,
    handle: Option<JoinHandle<()>>,
    finished: Arc<AtomicBool>,
    stopped: bool,
}

impl ProbeScheduler {
    /// Start emitting; the first probe goes out after one interval.
    ///
    /// `on_finished` runs on the scheduler thread right after the terminate
    /// message is sent. It does not run when the scheduler is stopped early.
    pub fn start<C, F>(emitter: ProbeEmitter<C>, interval: Duration, on_finished: F) -> Result<Self>
    where
        C: Connection + 'static,
        F: FnOnce() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let finished = Arc::new(AtomicBool::new(false));
        let finished_flag = Arc::clone(&finished);

        debug!(
            count = emitter.count,
            interval_ms = interval.as_millis() as u64,
            "Starting probe scheduler"
        );

        let handle = thread::Builder::new()
            .name("probe-scheduler".into())
            .spawn(move || {
                // Dropped on exit, which is what `stop` waits for.
                let _done = done_tx;
                let completed = loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                            debug!("Probe scheduler cancelled");
                            break false;
                        }
                    }
                    if emitter.tick() == Tick::Finished {
                        break true;
                    }
                };
                if completed {
                    finished_flag.store(true, Ordering::Release);
                    on_finished();
                }
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            done_rx,
            handle: Some(handle),
            finished,
            stopped: false,
        })
    }

    /// True once the final probe and the terminate message have been sent
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Cancel further ticks and wait up to `timeout` for the thread to exit.
    ///
    /// Safe to call repeatedly. Returns false when the wait timed out; the
    /// thread is then left to finish on its own.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        if self.stopped {
            return true;
        }
        // Disconnecting the channel wakes the timer immediately.
        self.stop_tx.take();

        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        warn!("Probe scheduler thread panicked");
                    }
                }
                self.stopped = true;
                debug!("Probe scheduler stopped");
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Probe scheduler did not stop in time"
                );
                false
            }
        }
    }
}

impl Drop for ProbeScheduler {
    fn drop(&mut self) {
        self.stop_tx.take();
    }
}
