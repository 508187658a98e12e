//! Helpers for rendering decoded values as text.

use crate::time::ticks_to_secs;
use data_encoding::HEXLOWER;

/// Renders a 32-bit identifier as ASCII when every byte is alphanumeric,
/// otherwise as hex.
///
/// ```rust
/// use scte35_extract::fmt::format_identifier_to_string;
///
/// assert_eq!(format_identifier_to_string(0x43554549), "CUEI");
/// assert_eq!(format_identifier_to_string(0x12345678), "0x12345678");
/// ```
pub fn format_identifier_to_string(identifier: u32) -> String {
    let bytes = identifier.to_be_bytes();
    if bytes.iter().all(u8::is_ascii_alphanumeric) {
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        format!("0x{identifier:08X}")
    }
}

/// Renders opaque bytes as a quoted string when they are printable ASCII,
/// otherwise as (possibly truncated) hex.
///
/// ```rust
/// use scte35_extract::fmt::format_private_data;
///
/// assert_eq!(format_private_data(b"test"), "\"test\"");
/// assert_eq!(format_private_data(&[0x01, 0x02, 0x03]), "0x010203");
/// assert_eq!(format_private_data(&[]), "empty");
/// ```
pub fn format_private_data(data: &[u8]) -> String {
    if data.is_empty() {
        return "empty".to_string();
    }
    match std::str::from_utf8(data) {
        Ok(s) if s.chars().all(|c| c.is_ascii_graphic() || c == ' ') => {
            if s.len() <= 50 {
                format!("\"{s}\"")
            } else {
                format!("\"{}...\" ({} bytes)", &s[..47], data.len())
            }
        }
        _ => format_as_hex(data),
    }
}

/// Hex with a `0x` prefix; more than 8 bytes are cut to a 6-byte preview.
///
/// ```rust
/// use scte35_extract::fmt::format_as_hex;
///
/// assert_eq!(format_as_hex(&[0x01, 0x02, 0x03]), "0x010203");
/// assert_eq!(format_as_hex(&(0..20).collect::<Vec<u8>>()), "0x000102030405... (20 bytes)");
/// ```
pub fn format_as_hex(data: &[u8]) -> String {
    if data.len() <= 8 {
        format!("0x{}", HEXLOWER.encode(data))
    } else {
        format!("0x{}... ({} bytes)", HEXLOWER.encode(&data[..6]), data.len())
    }
}

/// A 90 kHz tick count as hex plus seconds, e.g. `0x000015f90 (1.000000s)`.
pub fn format_ticks(ticks: u64) -> String {
    format!("0x{ticks:09x} ({:.6}s)", ticks_to_secs(ticks))
}
