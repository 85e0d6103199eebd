//! Byte-level primitives: hex conversion, big-endian reads, BCD identifiers.

use super::error::{ProtocolError, Result};
use super::types::DEVICE_ID_LEN;

/// Render bytes as a lowercase hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Parse a hex string into bytes.
///
/// Case-insensitive; whitespace is stripped before parsing. Fails on odd
/// length or non-hex characters.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>> {
    let cleaned: String = hex.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.len() % 2 != 0 {
        return Err(ProtocolError::MalformedHex(format!(
            "odd number of hex digits ({})",
            cleaned.len()
        )));
    }

    let mut out = Vec::with_capacity(cleaned.len() / 2);
    let digits = cleaned.as_bytes();
    for pair in digits.chunks_exact(2) {
        let hi = hex_digit(pair[0])?;
        let lo = hex_digit(pair[1])?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

fn hex_digit(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(ProtocolError::MalformedHex(format!(
            "invalid hex character {:?}",
            c as char
        ))),
    }
}

/// Read a big-endian u16 at `offset`.
pub fn read_u16_be(bytes: &[u8], offset: usize) -> Result<u16> {
    match bytes.get(offset..offset + 2) {
        Some(s) => Ok(u16::from_be_bytes([s[0], s[1]])),
        None => Err(ProtocolError::OutOfRange {
            offset,
            width: 2,
            len: bytes.len(),
        }),
    }
}

/// Read a big-endian u32 at `offset`.
pub fn read_u32_be(bytes: &[u8], offset: usize) -> Result<u32> {
    match bytes.get(offset..offset + 4) {
        Some(s) => Ok(u32::from_be_bytes([s[0], s[1], s[2], s[3]])),
        None => Err(ProtocolError::OutOfRange {
            offset,
            width: 4,
            len: bytes.len(),
        }),
    }
}

/// Decode the 8-byte packed-BCD device identifier into a digit string.
///
/// Each byte packs two digits, high nibble first. Devices left-pad 15-digit
/// identifiers to 16 BCD digits, so leading pad zeros are dropped from the
/// result. The digit order is fixed by captured device traffic:
/// `03 57 71 89 51 22 72 51` decodes to `357718951227251`.
pub fn decode_device_id(bytes: &[u8]) -> Result<String> {
    if bytes.len() < DEVICE_ID_LEN {
        return Err(ProtocolError::OutOfRange {
            offset: 0,
            width: DEVICE_ID_LEN,
            len: bytes.len(),
        });
    }

    let mut digits = String::with_capacity(DEVICE_ID_LEN * 2);
    for b in &bytes[..DEVICE_ID_LEN] {
        digits.push(nibble_char(b >> 4));
        digits.push(nibble_char(b & 0x0f));
    }

    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        Ok("0".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

// Non-decimal nibbles only show up in malformed identifiers; render them as
// hex digits rather than dropping them.
fn nibble_char(n: u8) -> char {
    if n < 10 {
        char::from(b'0' + n)
    } else {
        char::from(b'a' + n - 10)
    }
}
