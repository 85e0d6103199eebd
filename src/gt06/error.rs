//! GT06 protocol error types.

use thiserror::Error;

/// Errors that can occur while working with raw protocol bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Hex input with an odd length or a non-hex character.
    #[error("malformed hex input: {0}")]
    MalformedHex(String),

    /// Fixed-width read past the end of the buffer.
    #[error("read of {width} bytes at offset {offset} past end of {len}-byte buffer")]
    OutOfRange {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// Frame does not begin with the 0x78 0x78 start marker.
    #[error("frame does not start with 0x78 0x78")]
    InvalidStartMarker,
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
