//! Frame classification and field extraction.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::codec::{decode_device_id, read_u16_be, read_u32_be};
use super::error::{ProtocolError, Result};
use super::types::{
    DEVICE_ID_LEN, DEVICE_ID_OFFSET, Frame, MAX_LOGIN_FRAME_LEN, MIN_LOCATION_FRAME_LEN,
    MSG_HEARTBEAT, MSG_LOGIN_LOCATION, SERIAL_OFFSET, START_MARKER, TYPE_OFFSET,
};

// Location report field offsets (sequence-number-included layout).
const LATITUDE_OFFSET: usize = 14;
const LONGITUDE_OFFSET: usize = 18;
const ALTITUDE_OFFSET: usize = 22;
const SPEED_OFFSET: usize = 24;
const COURSE_OFFSET: usize = 26;
const TIMESTAMP_OFFSET: usize = 28;
const STATUS_OFFSET: usize = 34;

// Status byte bits. Hemisphere bits are negative flags: set means
// southern/western.
const STATUS_SOUTH: u8 = 0x01;
const STATUS_WEST: u8 = 0x02;
const STATUS_UNFIXED: u8 = 0x04;

/// Scale factor between raw coordinate magnitudes and decimal degrees.
const DEGREES_SCALE: f64 = 1_800_000.0;

/// Whether the receiver has a satellite-derived position lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixStatus {
    Fixed,
    Unfixed,
}

/// One coordinate axis of a GPS fix.
///
/// Carries both the signed decimal value and the hemisphere letter, plus the
/// raw unsigned magnitude from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Signed decimal degrees, six decimal places.
    pub degrees: f64,
    /// Hemisphere letter: N/S for latitude, E/W for longitude.
    pub hemisphere: char,
    /// Raw unsigned magnitude as transmitted.
    pub raw: u32,
}

impl Coordinate {
    fn new(raw: u32, negative: bool, positive_letter: char, negative_letter: char) -> Self {
        let magnitude = (f64::from(raw) / DEGREES_SCALE * 1e6).round() / 1e6;
        Self {
            degrees: if negative { -magnitude } else { magnitude },
            hemisphere: if negative { negative_letter } else { positive_letter },
            raw,
        }
    }
}

/// Device registration at connection start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub device_id: String,
    pub serial: u16,
}

/// Periodic keep-alive with no positional payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    pub device_id: String,
    pub frame_len: usize,
}

/// Device is connected but has no satellite lock yet; it sends only
/// keep-alive-class content until the fix arrives. Expected transient state,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpsNotReady {
    pub device_id: String,
    pub frame_len: usize,
}

/// A full position report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub device_id: String,
    pub serial: u16,
    pub latitude: Coordinate,
    pub longitude: Coordinate,
    /// Altitude in meters.
    pub altitude_m: u16,
    /// Speed in km/h, one decimal place.
    pub speed_kmh: f64,
    /// Course over ground in degrees, 0-360.
    pub course_deg: u16,
    /// Device-reported timestamp (no timezone on the wire).
    pub timestamp: NaiveDateTime,
    pub satellites: u8,
    pub fix: FixStatus,
}

/// Frame with a message type the gateway does not act on (LBS, alarms, ...).
/// Legitimate traffic, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownRecord {
    pub message_type: u8,
    pub device_id: Option<String>,
}

/// Frame that failed mid-extraction. Carries whatever was already extracted;
/// one bad frame never aborts the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeFailure {
    pub message_type: Option<u8>,
    pub device_id: Option<String>,
    pub error: String,
}

/// Decoded result of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodedRecord {
    Login(LoginRecord),
    Heartbeat(HeartbeatRecord),
    Location(LocationRecord),
    GpsNotReady(GpsNotReady),
    Unknown(UnknownRecord),
    Failed(DecodeFailure),
}

impl DecodedRecord {
    /// Device identifier, when one was extractable.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Login(r) => Some(&r.device_id),
            Self::Heartbeat(r) => Some(&r.device_id),
            Self::Location(r) => Some(&r.device_id),
            Self::GpsNotReady(r) => Some(&r.device_id),
            Self::Unknown(r) => r.device_id.as_deref(),
            Self::Failed(r) => r.device_id.as_deref(),
        }
    }
}

/// Decode a complete frame into a structured record.
///
/// The only hard failure is a missing start marker, which rejects the frame
/// outright. Everything else is best-effort: short reads and parse failures
/// are captured in the returned [`DecodedRecord::Failed`] variant alongside
/// whatever was already extracted.
pub fn decode(frame: &Frame) -> Result<DecodedRecord> {
    let bytes = frame.as_bytes();

    if bytes.len() < 2 || bytes[..2] != START_MARKER {
        return Err(ProtocolError::InvalidStartMarker);
    }

    let Some(&message_type) = bytes.get(TYPE_OFFSET) else {
        return Ok(DecodedRecord::Failed(DecodeFailure {
            message_type: None,
            device_id: None,
            error: format!("frame of {} bytes has no message type", bytes.len()),
        }));
    };

    match message_type {
        MSG_LOGIN_LOCATION => Ok(decode_login_family(bytes)),
        MSG_HEARTBEAT => Ok(decode_heartbeat(bytes)),
        other => Ok(DecodedRecord::Unknown(UnknownRecord {
            message_type: other,
            device_id: try_device_id(bytes),
        })),
    }
}

/// Decode a type-0x01 frame: login, fixless keep-alive, or location report,
/// discriminated by total frame length.
fn decode_login_family(bytes: &[u8]) -> DecodedRecord {
    let device_id = match device_id_at(bytes) {
        Ok(id) => id,
        Err(e) => {
            return DecodedRecord::Failed(DecodeFailure {
                message_type: Some(MSG_LOGIN_LOCATION),
                device_id: None,
                error: format!("device identifier: {e}"),
            });
        }
    };

    let serial = match read_u16_be(bytes, SERIAL_OFFSET) {
        Ok(s) => s,
        Err(e) => {
            return DecodedRecord::Failed(DecodeFailure {
                message_type: Some(MSG_LOGIN_LOCATION),
                device_id: Some(device_id),
                error: format!("sequence number: {e}"),
            });
        }
    };

    if bytes.len() <= MAX_LOGIN_FRAME_LEN {
        return DecodedRecord::Login(LoginRecord { device_id, serial });
    }
    if bytes.len() < MIN_LOCATION_FRAME_LEN {
        return DecodedRecord::GpsNotReady(GpsNotReady {
            device_id,
            frame_len: bytes.len(),
        });
    }

    match decode_location(bytes, device_id.clone(), serial) {
        Ok(record) => DecodedRecord::Location(record),
        Err(error) => DecodedRecord::Failed(DecodeFailure {
            message_type: Some(MSG_LOGIN_LOCATION),
            device_id: Some(device_id),
            error,
        }),
    }
}

/// Extract the positional fields of a full location report.
fn decode_location(bytes: &[u8], device_id: String, serial: u16) -> std::result::Result<LocationRecord, String> {
    let latitude_raw = read_u32_be(bytes, LATITUDE_OFFSET).map_err(|e| format!("latitude: {e}"))?;
    let longitude_raw =
        read_u32_be(bytes, LONGITUDE_OFFSET).map_err(|e| format!("longitude: {e}"))?;
    let altitude_m = read_u16_be(bytes, ALTITUDE_OFFSET).map_err(|e| format!("altitude: {e}"))?;
    let speed_raw = read_u16_be(bytes, SPEED_OFFSET).map_err(|e| format!("speed: {e}"))?;
    let course_deg = read_u16_be(bytes, COURSE_OFFSET).map_err(|e| format!("course: {e}"))?;

    let timestamp = match bytes.get(TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 6) {
        Some(t) => decode_timestamp(t)?,
        None => return Err(format!("timestamp: frame ends at {}", bytes.len())),
    };

    let status = *bytes
        .get(STATUS_OFFSET)
        .ok_or_else(|| format!("status byte: frame ends at {}", bytes.len()))?;

    Ok(LocationRecord {
        device_id,
        serial,
        latitude: Coordinate::new(latitude_raw, status & STATUS_SOUTH != 0, 'N', 'S'),
        longitude: Coordinate::new(longitude_raw, status & STATUS_WEST != 0, 'E', 'W'),
        altitude_m,
        speed_kmh: f64::from(speed_raw) / 10.0,
        course_deg,
        timestamp,
        satellites: status >> 4,
        fix: if status & STATUS_UNFIXED != 0 {
            FixStatus::Unfixed
        } else {
            FixStatus::Fixed
        },
    })
}

/// Decode the 6-byte device timestamp (year offset from 2000).
fn decode_timestamp(t: &[u8]) -> std::result::Result<NaiveDateTime, String> {
    NaiveDate::from_ymd_opt(2000 + i32::from(t[0]), u32::from(t[1]), u32::from(t[2]))
        .and_then(|d| d.and_hms_opt(u32::from(t[3]), u32::from(t[4]), u32::from(t[5])))
        .ok_or_else(|| {
            format!(
                "timestamp: invalid calendar value {:02}-{:02}-{:02} {:02}:{:02}:{:02}",
                t[0], t[1], t[2], t[3], t[4], t[5]
            )
        })
}

fn decode_heartbeat(bytes: &[u8]) -> DecodedRecord {
    match device_id_at(bytes) {
        Ok(device_id) => DecodedRecord::Heartbeat(HeartbeatRecord {
            device_id,
            frame_len: bytes.len(),
        }),
        Err(e) => DecodedRecord::Failed(DecodeFailure {
            message_type: Some(MSG_HEARTBEAT),
            device_id: None,
            error: format!("device identifier: {e}"),
        }),
    }
}

fn device_id_at(bytes: &[u8]) -> Result<String> {
    match bytes.get(DEVICE_ID_OFFSET..DEVICE_ID_OFFSET + DEVICE_ID_LEN) {
        Some(id) => decode_device_id(id),
        None => Err(ProtocolError::OutOfRange {
            offset: DEVICE_ID_OFFSET,
            width: DEVICE_ID_LEN,
            len: bytes.len(),
        }),
    }
}

fn try_device_id(bytes: &[u8]) -> Option<String> {
    device_id_at(bytes).ok()
}
