//! Thread-per-connection echo loop

use crate::client::connection::read_message;
use crate::client::error::{ClientError, Result};
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

/// Message counters shared by every connection handler.
///
/// Atomic and lock-free; handlers bump them on the hot path.
#[derive(Debug, Default)]
pub struct EchoCounters {
    received: AtomicU64,
    echoed: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoStats {
    pub received: u64,
    pub echoed: u64,
    pub errors: u64,
}

impl EchoCounters {
    #[inline]
    pub fn increment_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_echoed(&self) {
        self.echoed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> EchoStats {
        EchoStats {
            received: self.received.load(Ordering::Relaxed),
            echoed: self.echoed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Accept connections forever, echoing each on its own thread
pub fn serve(listener: TcpListener, counters: Arc<EchoCounters>) -> Result<()> {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let counters = Arc::clone(&counters);
                thread::spawn(move || {
                    let peer = stream.peer_addr().ok();
                    info!(peer = ?peer, "New client connected");
                    if let Err(e) = handle_client(stream, &counters) {
                        counters.increment_error();
                        error!(error = %e, peer = ?peer, "Connection failed");
                    }
                    let stats = counters.stats();
                    info!(
                        peer = ?peer,
                        received = stats.received,
                        echoed = stats.echoed,
                        errors = stats.errors,
                        "Client disconnected"
                    );
                });
            }
            Err(e) => {
                counters.increment_error();
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
    Ok(())
}

/// Echo every complete message back unmodified, once, until the client hangs up
pub fn handle_client(mut stream: TcpStream, counters: &EchoCounters) -> Result<()> {
    stream.set_nodelay(true)?;
    let mut writer = stream.try_clone()?;

    while let Some(message) = read_message(&mut stream)? {
        counters.increment_received();
        writer.write_all(&message).map_err(|e| {
            debug!(error = %e, "Failed to echo message");
            ClientError::Io(e)
        })?;
        counters.increment_echoed();
    }

    debug!("Client closed the connection");
    Ok(())
}
