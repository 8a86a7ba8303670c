use thiserror::Error;

/// Protocol-level errors for probe encoding/decoding
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed message: header declares {declared} bytes, {available} available")]
    MalformedMessage { declared: usize, available: usize },

    #[error("Malformed message: negative payload length {0}")]
    NegativeLength(i16),

    #[error("Payload too large for the wire: {0} bytes")]
    PayloadTooLarge(usize),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
