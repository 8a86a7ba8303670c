use crate::protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Duplicate reply for probe {sequence}: had {previous_ms} ms, now {current_ms} ms")]
    DuplicateReply {
        sequence: i16,
        previous_ms: i32,
        current_ms: i32,
    },

    #[error("Reply for unknown probe {0}")]
    UnknownSequence(i16),

    #[error("Connection fault: {0}")]
    ConnectionFault(String),

    #[error("Measurement error: {0}")]
    Measurement(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
