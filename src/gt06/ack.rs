//! Acknowledgement frame construction.

use super::checksum::crc16_x25;
use super::types::{ACK_BODY_LEN, END_MARKER, Frame, START_MARKER};

/// Build the acknowledgement frame for an inbound message.
///
/// Layout: `78 78 05 <type> <serialHi> <serialLo> <crcHi> <crcLo> 0d 0a`,
/// with CRC-16/X25 over the four body bytes. Never fails; callers are
/// expected to have located the serial before reaching this point.
pub fn build_ack(message_type: u8, serial: [u8; 2]) -> Vec<u8> {
    let body = [ACK_BODY_LEN, message_type, serial[0], serial[1]];
    let crc = crc16_x25(&body);

    let mut frame = Vec::with_capacity(10);
    frame.extend_from_slice(&START_MARKER);
    frame.extend_from_slice(&body);
    frame.extend_from_slice(&crc.to_be_bytes());
    frame.extend_from_slice(&END_MARKER);
    frame
}

/// Guarded ack construction for a complete inbound frame.
///
/// Returns `None` when the frame is too short to locate the message type or
/// serial; such frames get no acknowledgement.
pub fn ack_for(frame: &Frame) -> Option<Vec<u8>> {
    let message_type = frame.message_type()?;
    let serial = frame.serial()?;
    Some(build_ack(message_type, serial))
}
