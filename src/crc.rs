//! CRC-32/MPEG-2 checksum used by SCTE-35 and MPEG-2 PSI sections.
//!
//! Polynomial `0x04C11DB7`, initial value `0xFFFFFFFF`, no reflection and no
//! final XOR. The reflected ISO-HDLC variant (zip, Ethernet) gives different
//! results and must not be used here.

use crc::{CRC_32_MPEG_2, Crc};

/// MPEG-2 CRC-32 algorithm instance.
pub const MPEG_2: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Calculates the CRC-32/MPEG-2 checksum of `data`.
pub fn calculate_crc(data: &[u8]) -> u32 {
    MPEG_2.checksum(data)
}

/// Returns `true` when `data` hashes to `expected_crc`.
pub fn validate_crc(data: &[u8], expected_crc: u32) -> bool {
    calculate_crc(data) == expected_crc
}

/// Validates a complete section whose last four bytes hold its CRC-32.
///
/// Returns `false` for buffers too short to hold a CRC.
///
/// # Example
///
/// ```rust
/// use scte35_extract::crc::validate_message_crc;
/// use data_encoding::BASE64;
///
/// let buffer = BASE64.decode(b"/DAWAAAAAAAAAP/wBQb+Qjo1vQAAuwxz9A==").unwrap();
/// assert!(validate_message_crc(&buffer));
/// ```
pub fn validate_message_crc(buffer: &[u8]) -> bool {
    let Some(split) = buffer.len().checked_sub(4) else {
        return false;
    };
    let (data, crc_bytes) = buffer.split_at(split);
    let stored_crc = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
    validate_crc(data, stored_crc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mpeg2_check_value() {
        // catalogue check value for CRC-32/MPEG-2
        assert_eq!(calculate_crc(b"123456789"), 0x0376E6E7);
    }

    #[test]
    fn test_not_iso_hdlc() {
        // the zip CRC of the same input is 0xCBF43926
        assert_ne!(calculate_crc(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn test_message_crc_validation_short_buffer() {
        assert!(!validate_message_crc(&[0x01, 0x02]));
    }

    #[test]
    fn test_message_crc_validation() {
        let mut test_data = vec![0xFC, 0x30, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00];
        let crc = calculate_crc(&test_data);
        test_data.extend_from_slice(&crc.to_be_bytes());

        assert!(validate_message_crc(&test_data));

        test_data[3] ^= 0x01;
        assert!(!validate_message_crc(&test_data));
    }
}
