//! Main parsing function for SCTE-35 `splice_info_section`s.
//!
//! The header is read bit by bit; the splice command and the descriptor
//! loop are each decoded from a sub-slice bounded by their declared length,
//! so a wrong length can never make one part read into the next.

use crate::bit_reader::BitReader;
use crate::commands::{SpliceCommand, SpliceCommandType, parse_splice_command};
use crate::crc::calculate_crc;
use crate::descriptors::parse_descriptor_loop;
use crate::error::DecodeError;
use crate::types::{EncryptionAlgorithm, SCTE35_TABLE_ID, SapType, SpliceInfoSection};
use tracing::warn;

/// Bytes from `table_id` through `splice_command_type`.
const HEADER_LEN: usize = 14;

const CRC_LEN: usize = 4;

/// `splice_command_length` value meaning "not specified".
const UNSPECIFIED_COMMAND_LENGTH: u16 = 0xFFF;

/// Parses and validates a complete SCTE-35 splice information section.
///
/// `buffer` must hold exactly one section: `section_length + 3` bytes. The
/// CRC-32/MPEG-2 is verified right after the length, before any other
/// field is interpreted, and the section is only returned when every length
/// field is consistent; there is no partial result.
///
/// # Supported Command Types
///
/// - `0x00` - Splice Null
/// - `0x04` - Splice Schedule
/// - `0x05` - Splice Insert
/// - `0x06` - Time Signal
/// - `0x07` - Bandwidth Reservation
/// - `0xFF` - Private Command
///
/// Other type codes decode to [`SpliceCommand::Unknown`].
///
/// # Example
///
/// ```rust
/// use scte35_extract::{parse_splice_info_section, SpliceCommand};
/// use data_encoding::BASE64;
///
/// let buffer = BASE64.decode(b"/DAWAAAAAAAAAP/wBQb+Qjo1vQAAuwxz9A==").unwrap();
/// let section = parse_splice_info_section(&buffer).unwrap();
///
/// assert_eq!(section.splice_command_type, 0x06);
/// assert!(matches!(section.splice_command, SpliceCommand::TimeSignal(_)));
/// ```
pub fn parse_splice_info_section(buffer: &[u8]) -> Result<SpliceInfoSection, DecodeError> {
    let mut reader = BitReader::new(buffer);

    let table_id = reader.read_u8()?;
    if table_id != SCTE35_TABLE_ID {
        return Err(DecodeError::InvalidTableId(table_id));
    }
    let section_syntax_indicator = reader.read_flag()?;
    let private_indicator = reader.read_flag()?;
    let sap_type = SapType::from(reader.read_bits(2)? as u8);
    let section_length = reader.read_bits(12)? as u16;

    let declared = section_length as usize + 3;
    if declared != buffer.len() {
        return Err(DecodeError::LengthMismatch {
            declared,
            actual: buffer.len(),
        });
    }

    // Corrupted bytes must not reach the structural decode.
    let crc_start = buffer
        .len()
        .checked_sub(CRC_LEN)
        .filter(|&start| start >= HEADER_LEN)
        .ok_or(DecodeError::UnexpectedEof)?;
    let crc_32 = read_be_u32(&buffer[crc_start..]);
    let computed = calculate_crc(&buffer[..crc_start]);
    if computed != crc_32 {
        return Err(DecodeError::CrcMismatch {
            expected: crc_32,
            computed,
        });
    }

    if section_syntax_indicator || private_indicator {
        warn!(
            section_syntax_indicator,
            private_indicator, "splice_info_section indicator bits should be zero"
        );
    }

    let protocol_version = reader.read_u8()?;
    if protocol_version != 0 {
        warn!(protocol_version, "unknown SCTE-35 protocol version, decoding known fields");
    }
    let encrypted_packet = reader.read_flag()?;
    let encryption_algorithm = reader.read_bits(6)? as u8;
    let pts_adjustment = reader.read_wide(33)?;
    let cw_index = reader.read_u8()?;
    let tier = reader.read_bits(12)? as u16;
    let splice_command_length = reader.read_bits(12)? as u16;
    let splice_command_type = reader.read_u8()?;
    debug_assert_eq!(reader.byte_position(), HEADER_LEN);

    let mut section = SpliceInfoSection {
        table_id,
        section_syntax_indicator,
        private_indicator,
        sap_type,
        section_length,
        protocol_version,
        encrypted_packet,
        encryption_algorithm: None,
        pts_adjustment,
        cw_index,
        tier,
        splice_command_length,
        splice_command_type,
        splice_command: SpliceCommand::Null,
        descriptor_loop_length: 0,
        descriptors: Vec::new(),
        alignment_stuffing: Vec::new(),
        e_crc_32: None,
        crc_32,
    };

    if encrypted_packet {
        // Everything from the command to E_CRC_32 is ciphertext.
        let e_crc_start = crc_start
            .checked_sub(CRC_LEN)
            .filter(|&start| start >= HEADER_LEN)
            .ok_or(DecodeError::UnexpectedEof)?;
        section.encryption_algorithm = Some(EncryptionAlgorithm::from(encryption_algorithm));
        section.splice_command = SpliceCommand::Encrypted {
            data: buffer[HEADER_LEN..e_crc_start].to_vec(),
        };
        section.e_crc_32 = Some(read_be_u32(&buffer[e_crc_start..crc_start]));
    } else {
        let command_end = decode_command(buffer, crc_start, &mut section)?;

        let loop_start = command_end + 2;
        if loop_start > crc_start {
            return Err(DecodeError::UnexpectedEof);
        }
        let descriptor_loop_length =
            u16::from_be_bytes([buffer[command_end], buffer[command_end + 1]]);
        let loop_end = loop_start + descriptor_loop_length as usize;
        if loop_end > crc_start {
            return Err(DecodeError::DescriptorLengthMismatch {
                declared: descriptor_loop_length as usize,
                consumed: crc_start - loop_start,
            });
        }

        section.descriptor_loop_length = descriptor_loop_length;
        section.descriptors = parse_descriptor_loop(&buffer[loop_start..loop_end])?;
        section.alignment_stuffing = buffer[loop_end..crc_start].to_vec();
    }

    Ok(section)
}

/// Decodes the splice command into `section` and returns the offset of the
/// first byte after it.
fn decode_command(
    buffer: &[u8],
    crc_start: usize,
    section: &mut SpliceInfoSection,
) -> Result<usize, DecodeError> {
    let command_type = SpliceCommandType::from(section.splice_command_type);

    if section.splice_command_length == UNSPECIFIED_COMMAND_LENGTH {
        // Structured commands end where their layout ends. Opaque ones have
        // no layout, so they take everything up to an empty descriptor loop.
        let region_end = if command_type.is_opaque() {
            crc_start
                .checked_sub(2)
                .filter(|&end| end >= HEADER_LEN)
                .ok_or(DecodeError::UnexpectedEof)?
        } else {
            crc_start
        };
        let mut reader = BitReader::new(&buffer[HEADER_LEN..region_end]);
        section.splice_command = parse_splice_command(&mut reader, section.splice_command_type)?;
        return Ok(HEADER_LEN + reader.byte_position());
    }

    let declared = section.splice_command_length as usize;
    let command_end = HEADER_LEN + declared;
    if command_end > crc_start {
        return Err(DecodeError::CommandLengthMismatch {
            declared,
            consumed: crc_start - HEADER_LEN,
        });
    }

    let mut reader = BitReader::new(&buffer[HEADER_LEN..command_end]);
    section.splice_command = parse_splice_command(&mut reader, section.splice_command_type)
        .map_err(|err| match err {
            DecodeError::UnexpectedEof => DecodeError::CommandLengthMismatch {
                declared,
                consumed: reader.byte_position(),
            },
            other => other,
        })?;
    if reader.bits_remaining() != 0 {
        return Err(DecodeError::CommandLengthMismatch {
            declared,
            consumed: reader.byte_position(),
        });
    }

    Ok(command_end)
}

fn read_be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::calculate_crc;

    /// Builds a section around `body` (everything after `section_length`
    /// up to the CRC), fixing up the length and appending a valid CRC.
    fn build_section(body: &[u8]) -> Vec<u8> {
        let section_length = body.len() + 4;
        let mut section = vec![
            0xFC,
            0x30 | (section_length >> 8) as u8,
            section_length as u8,
        ];
        section.extend_from_slice(body);
        let crc = calculate_crc(&section);
        section.extend_from_slice(&crc.to_be_bytes());
        section
    }

    #[test]
    fn test_header_fields() {
        let section = build_section(&[
            0x00, // protocol_version
            0x01, 0x00, 0x00, 0x00, 0x10, // not encrypted, pts_adjustment = 0x1_0000_0010
            0x07, // cw_index
            0xAB, 0xC0, 0x00, // tier = 0xABC, command length 0
            0x00, // splice_null
            0x00, 0x00, // descriptor_loop_length
        ]);
        let parsed = parse_splice_info_section(&section).unwrap();

        assert_eq!(parsed.sap_type, SapType::NotSpecified);
        assert_eq!(parsed.pts_adjustment, 0x1_0000_0010);
        assert_eq!(parsed.cw_index, 7);
        assert_eq!(parsed.tier, 0xABC);
        assert_eq!(parsed.splice_command, SpliceCommand::Null);
        assert!(parsed.descriptors.is_empty());
    }

    #[test]
    fn test_invalid_table_id() {
        let mut section = build_section(&[0; 13]);
        section[0] = 0xFD;
        assert_eq!(
            parse_splice_info_section(&section),
            Err(DecodeError::InvalidTableId(0xFD))
        );
    }

    #[test]
    fn test_length_mismatch() {
        let mut section = build_section(&[
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xF0, 0x00, 0x00, 0x00, 0x00,
        ]);
        section.push(0x00);
        assert_eq!(
            parse_splice_info_section(&section),
            Err(DecodeError::LengthMismatch {
                declared: 20,
                actual: 21,
            })
        );
    }

    #[test]
    fn test_command_length_residue() {
        // time_signal without time is one byte, but two are declared
        let section = build_section(&[
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xF0, 0x02, 0x06, 0x7F, 0x00, 0x00,
            0x00,
        ]);
        assert_eq!(
            parse_splice_info_section(&section),
            Err(DecodeError::CommandLengthMismatch {
                declared: 2,
                consumed: 1,
            })
        );
    }

    #[test]
    fn test_command_length_too_short() {
        let section = build_section(&[
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xF0, 0x02, 0x06, 0xFE, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ]);
        assert!(matches!(
            parse_splice_info_section(&section),
            Err(DecodeError::CommandLengthMismatch { declared: 2, .. })
        ));
    }

    #[test]
    fn test_unspecified_command_length() {
        let section = build_section(&[
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0x06, 0xFE, 0x00, 0x00,
            0x00, 0x2A, 0x00, 0x00,
        ]);
        let parsed = parse_splice_info_section(&section).unwrap();

        assert_eq!(parsed.splice_command_length, 0xFFF);
        let SpliceCommand::TimeSignal(signal) = parsed.splice_command else {
            panic!("expected TimeSignal");
        };
        assert_eq!(signal.splice_time.pts_time(), Some(42));
    }

    #[test]
    fn test_unspecified_length_private_command() {
        let section = build_section(&[
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x41, 0x42, 0x43,
            0x44, 0x01, 0x02, 0x00, 0x00,
        ]);
        let parsed = parse_splice_info_section(&section).unwrap();

        let SpliceCommand::Private(private) = parsed.splice_command else {
            panic!("expected PrivateCommand");
        };
        assert_eq!(private.identifier, 0x41424344);
        assert_eq!(private.private_bytes, vec![0x01, 0x02]);
    }

    #[test]
    fn test_descriptor_loop_past_crc() {
        let section = build_section(&[
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xF0, 0x00, 0x00, 0x00, 0x05,
        ]);
        assert_eq!(
            parse_splice_info_section(&section),
            Err(DecodeError::DescriptorLengthMismatch {
                declared: 5,
                consumed: 0,
            })
        );
    }

    #[test]
    fn test_alignment_stuffing_is_kept() {
        let section = build_section(&[
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xF0, 0x00, 0x00, 0x00, 0x00, 0xFF,
            0xFF,
        ]);
        let parsed = parse_splice_info_section(&section).unwrap();
        assert_eq!(parsed.alignment_stuffing, vec![0xFF, 0xFF]);
    }

    #[test]
    fn test_unknown_protocol_version_still_decodes() {
        let section = build_section(&[
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xF0, 0x00, 0x00, 0x00, 0x00,
        ]);
        let parsed = parse_splice_info_section(&section).unwrap();
        assert_eq!(parsed.protocol_version, 1);
        assert!(!parsed.is_known_protocol_version());
    }

    #[test]
    fn test_too_short_for_header() {
        assert_eq!(
            parse_splice_info_section(&[0xFC, 0x30]),
            Err(DecodeError::UnexpectedEof)
        );
    }
}
