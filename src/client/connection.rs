use crate::client::error::{ClientError, Result};
use crate::protocol::{decode_header, ProtocolError, HEADER_SIZE};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, warn};

/// Outbound side of an established connection.
///
/// Shared between the probe scheduler (writes) and the session (close), so
/// every method takes `&self`.
pub trait Connection: Send + Sync {
    /// Queue a complete message for sending
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Push queued bytes to the peer
    fn flush(&self) -> Result<()>;

    /// Close the connection; wakes up a blocked reader
    fn close(&self) -> Result<()>;
}

/// TCP implementation of Connection
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpConnection {
    /// Connect to a remote address, trying each resolved address in turn
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        debug!(addr = addr, "Connecting TCP stream");
        let addrs = addr.to_socket_addrs().map_err(|e| {
            warn!(error = %e, "Failed to resolve address");
            ClientError::ConnectionFault(format!("Failed to resolve {}: {}", addr, e))
        })?;

        let mut last_err = None;
        for candidate in addrs {
            match TcpStream::connect_timeout(&candidate, timeout) {
                Ok(stream) => return Self::from_stream(stream),
                Err(e) => {
                    debug!(addr = %candidate, error = %e, "Connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        let reason = last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no addresses resolved".into());
        warn!(addr = addr, reason = %reason, "Failed to connect");
        Err(ClientError::ConnectionFault(format!(
            "Failed to connect to {}: {}",
            addr, reason
        )))
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        // Every probe goes out on its own; no coalescing.
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        debug!(peer = %peer, "Connection established");
        Ok(Self { stream, peer })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// A second handle on the same stream for the inbound side
    pub fn reader(&self) -> Result<TcpStream> {
        Ok(self.stream.try_clone()?)
    }
}

impl Connection for TcpConnection {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        (&self.stream).write_all(bytes).map_err(|e| {
            warn!(error = %e, peer = %self.peer, "Failed to write message");
            ClientError::Io(e)
        })
    }

    fn flush(&self) -> Result<()> {
        (&self.stream).flush().map_err(ClientError::Io)
    }

    fn close(&self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => {
                debug!(peer = %self.peer, "Connection closed");
                Ok(())
            }
            // Already gone; closing twice is fine.
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(ClientError::Io(e)),
        }
    }
}

/// Read one complete probe message from a byte stream.
///
/// Returns `Ok(None)` when the stream ends cleanly on a message boundary.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut message = vec![0u8; HEADER_SIZE];
    let filled = fill(reader, &mut message)?;
    if filled == 0 {
        return Ok(None);
    }
    if filled < HEADER_SIZE {
        return Err(ProtocolError::MalformedMessage {
            declared: HEADER_SIZE,
            available: filled,
        }
        .into());
    }

    let (_, _, payload_len) = decode_header(&message)?;
    if payload_len < 0 {
        return Err(ProtocolError::NegativeLength(payload_len).into());
    }

    let declared = HEADER_SIZE + payload_len as usize;
    message.resize(declared, 0);
    let filled = fill(reader, &mut message[HEADER_SIZE..])?;
    if HEADER_SIZE + filled < declared {
        return Err(ProtocolError::MalformedMessage {
            declared,
            available: HEADER_SIZE + filled,
        }
        .into());
    }

    Ok(Some(message))
}

/// Read until `buf` is full or the stream ends; returns bytes read.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Packet, SequenceNumber};
    use mockall::mock;
    use std::io::Cursor;
    use std::net::TcpListener;

    mock! {
        pub Connection {}

        impl Connection for Connection {
            fn write(&self, bytes: &[u8]) -> Result<()>;
            fn flush(&self) -> Result<()>;
            fn close(&self) -> Result<()>;
        }
    }

    fn probe_bytes(seq: i16, payload: &[u8]) -> Vec<u8> {
        Packet::new(SequenceNumber(seq), 10, payload).unwrap().encode()
    }

    #[test]
    fn test_read_message_splits_stream() -> Result<()> {
        let mut stream = probe_bytes(1, &[1, 2, 3]);
        stream.extend(probe_bytes(2, &[]));
        stream.extend(Packet::terminate(0, &[9, 9]).unwrap().encode());
        let mut cursor = Cursor::new(stream);

        assert_eq!(read_message(&mut cursor)?, Some(probe_bytes(1, &[1, 2, 3])));
        assert_eq!(read_message(&mut cursor)?, Some(probe_bytes(2, &[])));
        assert_eq!(read_message(&mut cursor)?.map(|m| m.len()), Some(HEADER_SIZE + 2));
        assert_eq!(read_message(&mut cursor)?, None);
        Ok(())
    }

    #[test]
    fn test_read_message_truncated() {
        let bytes = probe_bytes(1, &[1, 2, 3, 4]);
        let mut cursor = Cursor::new(bytes[..bytes.len() - 2].to_vec());
        match read_message(&mut cursor) {
            Err(ClientError::Protocol(ProtocolError::MalformedMessage {
                declared,
                available,
            })) => {
                assert_eq!(declared, HEADER_SIZE + 4);
                assert_eq!(available, HEADER_SIZE + 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_read_message_partial_header() {
        let mut cursor = Cursor::new(vec![0u8; 5]);
        assert!(matches!(
            read_message(&mut cursor),
            Err(ClientError::Protocol(ProtocolError::MalformedMessage { .. }))
        ));
    }

    #[test]
    fn test_tcp_connection_write_and_close() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;

        let connection = TcpConnection::connect(&addr.to_string(), Duration::from_secs(1))?;
        let (mut accepted, _) = listener.accept()?;

        let message = probe_bytes(7, &[4, 5]);
        connection.write(&message)?;
        connection.flush()?;
        assert_eq!(read_message(&mut accepted)?, Some(message));

        connection.close()?;
        connection.close()?;
        assert_eq!(read_message(&mut accepted)?, None);
        Ok(())
    }

    #[test]
    fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let result = TcpConnection::connect(&addr.to_string(), Duration::from_millis(500));
        assert!(matches!(result, Err(ClientError::ConnectionFault(_))));
    }
}

#[cfg(test)]
pub use tests::MockConnection;
