use crate::protocol::error::{ProtocolError, Result};
use tracing::debug;

/// Size of the fixed header: sequence (2) + elapsed (4) + payload length (2)
pub const HEADER_SIZE: usize = 8;

/// Sequence value that marks the end of a probe series
pub const TERMINATE_SEQUENCE: i16 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceNumber(pub i16);

impl SequenceNumber {
    pub const TERMINATE: SequenceNumber = SequenceNumber(TERMINATE_SEQUENCE);

    pub fn is_terminate(self) -> bool {
        self.0 == TERMINATE_SEQUENCE
    }
}

/// A probe message as it travels on the wire.
///
/// Layout (big-endian, no padding):
///
/// | field      | width          |
/// |------------|----------------|
/// | sequence   | 2 bytes signed |
/// | elapsed    | 4 bytes signed |
/// | payloadLen | 2 bytes signed |
/// | payload    | payloadLen     |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet<'a> {
    pub sequence: SequenceNumber,
    pub elapsed_ms: i32,
    pub payload: &'a [u8],
}

/// Result of decoding one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<'a> {
    Probe(Packet<'a>),
    /// The end-of-series marker; elapsed and payload are not inspected
    Terminate,
}

impl<'a> Packet<'a> {
    pub fn new(sequence: SequenceNumber, elapsed_ms: i32, payload: &'a [u8]) -> Result<Self> {
        if payload.len() > i16::MAX as usize {
            return Err(ProtocolError::PayloadTooLarge(payload.len()));
        }
        Ok(Self {
            sequence,
            elapsed_ms,
            payload,
        })
    }

    /// The end-of-series message. The peer only looks at the sequence.
    pub fn terminate(elapsed_ms: i32, payload: &'a [u8]) -> Result<Self> {
        Self::new(SequenceNumber::TERMINATE, elapsed_ms, payload)
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&self.sequence.0.to_be_bytes());
        buf.extend_from_slice(&self.elapsed_ms.to_be_bytes());
        // Length is bounded by the constructor.
        buf.extend_from_slice(&(self.payload.len() as i16).to_be_bytes());
        buf.extend_from_slice(self.payload);
        buf
    }

    pub fn decode(bytes: &'a [u8]) -> Result<Decoded<'a>> {
        let (sequence, elapsed_ms, payload_len) = decode_header(bytes)?;

        if sequence.is_terminate() {
            debug!("Terminate message decoded");
            return Ok(Decoded::Terminate);
        }

        if payload_len < 0 {
            return Err(ProtocolError::NegativeLength(payload_len));
        }

        let declared = HEADER_SIZE + payload_len as usize;
        if bytes.len() < declared {
            debug!(
                declared = declared,
                available = bytes.len(),
                "Message shorter than its header declares"
            );
            return Err(ProtocolError::MalformedMessage {
                declared,
                available: bytes.len(),
            });
        }

        debug!(
            sequence = sequence.0,
            elapsed_ms = elapsed_ms,
            payload_len = payload_len,
            "Probe decoded successfully"
        );

        Ok(Decoded::Probe(Packet {
            sequence,
            elapsed_ms,
            payload: &bytes[HEADER_SIZE..declared],
        }))
    }
}

/// Reads the fixed header without looking at the payload.
pub fn decode_header(bytes: &[u8]) -> Result<(SequenceNumber, i32, i16)> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::MalformedMessage {
            declared: HEADER_SIZE,
            available: bytes.len(),
        });
    }
    let sequence = i16::from_be_bytes([bytes[0], bytes[1]]);
    let elapsed_ms = i32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
    let payload_len = i16::from_be_bytes([bytes[6], bytes[7]]);
    Ok((SequenceNumber(sequence), elapsed_ms, payload_len))
}

/// Deterministic test filler: an incrementing byte pattern.
pub fn filler_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| i as u8).collect()
}
