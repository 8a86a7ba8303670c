//! Wire protocol for probe messages

pub mod error;
pub mod message;

pub use error::{ProtocolError, Result as ProtocolResult};
pub use message::{
    decode_header, filler_payload, Decoded, Packet, SequenceNumber, HEADER_SIZE, TERMINATE_SEQUENCE,
};
