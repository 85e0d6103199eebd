//! GT06-family binary protocol core.
//!
//! Reassembles a fragmented TCP byte stream into delimited frames, decodes
//! login, heartbeat and location reports into structured records, and builds
//! the acknowledgement frames the devices expect back.
//!
//! # Example
//!
//! ```ignore
//! use gt06_gateway::gt06::{FrameReassembler, decode, ack_for};
//!
//! let mut reassembler = FrameReassembler::new();
//! for frame in reassembler.feed(&chunk) {
//!     let record = decode(&frame)?;
//!     if let Some(ack) = ack_for(&frame) {
//!         // write ack back to the device
//!     }
//! }
//! ```

mod ack;
mod checksum;
mod codec;
mod decoder;
mod error;
mod framer;
mod types;


// Re-export public API
pub use ack::{ack_for, build_ack};
pub use checksum::{ChecksumReport, crc16_x25, verify_checksum, xor_checksum};
pub use codec::{bytes_to_hex, decode_device_id, hex_to_bytes, read_u16_be, read_u32_be};
pub use decoder::{
    Coordinate, DecodeFailure, DecodedRecord, FixStatus, GpsNotReady, HeartbeatRecord,
    LocationRecord, LoginRecord, UnknownRecord, decode,
};
pub use error::{ProtocolError, Result};
pub use framer::{FrameReassembler, ReassemblerState};
pub use types::{
    END_MARKER, Frame, MAX_LOGIN_FRAME_LEN, MIN_LOCATION_FRAME_LEN, MSG_HEARTBEAT,
    MSG_LOGIN_LOCATION, START_MARKER,
};
