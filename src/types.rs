//! Core SCTE-35 data structures.
//!
//! [`SpliceInfoSection`] is the decoded envelope handed back to callers. It
//! is built once by [`crate::parse_splice_info_section`] and never mutated.

use crate::commands::SpliceCommand;
use crate::descriptors::SpliceDescriptor;
use crate::time::SpliceTime;
use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Table id carried by every `splice_info_section`.
pub const SCTE35_TABLE_ID: u8 = 0xFC;

/// A fully decoded and CRC-checked `splice_info_section`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SpliceInfoSection {
    /// Always 0xFC.
    pub table_id: u8,
    /// Expected to be `false` (MPEG short section).
    pub section_syntax_indicator: bool,
    /// Expected to be `false`.
    pub private_indicator: bool,
    pub sap_type: SapType,
    /// Number of bytes following the `section_length` field, CRC included.
    pub section_length: u16,
    /// Zero for every published SCTE-35 revision. Other values are decoded
    /// as far as the known layout allows.
    pub protocol_version: u8,
    pub encrypted_packet: bool,
    /// Present only when `encrypted_packet` is set.
    pub encryption_algorithm: Option<EncryptionAlgorithm>,
    /// 33-bit offset added to every PTS in the section.
    pub pts_adjustment: u64,
    pub cw_index: u8,
    /// 12-bit authorization tier.
    pub tier: u16,
    /// 0xFFF means the sender left the length unspecified.
    pub splice_command_length: u16,
    pub splice_command_type: u8,
    pub splice_command: SpliceCommand,
    /// Zero for encrypted sections, whose descriptors are ciphertext.
    pub descriptor_loop_length: u16,
    pub descriptors: Vec<SpliceDescriptor>,
    /// Bytes between the descriptor loop and the CRC.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub alignment_stuffing: Vec<u8>,
    /// Encrypted CRC-32, present when `encrypted_packet` is set.
    pub e_crc_32: Option<u32>,
    pub crc_32: u32,
}

impl SpliceInfoSection {
    /// Whether the protocol version is one this decoder fully understands.
    pub fn is_known_protocol_version(&self) -> bool {
        self.protocol_version == 0
    }

    /// Applies `pts_adjustment` to a splice time carried by this section.
    pub fn adjusted_pts(&self, time: &SpliceTime) -> Option<u64> {
        time.adjusted_pts(self.pts_adjustment)
    }

    /// The splice time of the command, adjusted, when the command carries
    /// exactly one program-level time (time_signal, or a timed program
    /// splice_insert).
    pub fn command_pts(&self) -> Option<u64> {
        let time = match &self.splice_command {
            SpliceCommand::TimeSignal(signal) => signal.splice_time,
            SpliceCommand::Insert(insert) => insert.event.as_ref()?.splice_time?,
            _ => return None,
        };
        self.adjusted_pts(&time)
    }
}

/// Stream Access Point type signaled in the 2 bits after `private_indicator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum SapType {
    Type1,
    Type2,
    Type3,
    NotSpecified,
}

impl From<u8> for SapType {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0x00 => SapType::Type1,
            0x01 => SapType::Type2,
            0x02 => SapType::Type3,
            _ => SapType::NotSpecified,
        }
    }
}

impl Display for SapType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SapType::Type1 => write!(f, "Type 1"),
            SapType::Type2 => write!(f, "Type 2"),
            SapType::Type3 => write!(f, "Type 3"),
            SapType::NotSpecified => write!(f, "Not Specified"),
        }
    }
}

/// 6-bit `encryption_algorithm` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum EncryptionAlgorithm {
    NotEncrypted,
    DesEcb,
    DesCbc,
    TripleDesEde3Ecb,
    /// 4-31
    Reserved(u8),
    /// 32-63
    Private(u8),
}

impl From<u8> for EncryptionAlgorithm {
    fn from(value: u8) -> Self {
        match value {
            0x00 => EncryptionAlgorithm::NotEncrypted,
            0x01 => EncryptionAlgorithm::DesEcb,
            0x02 => EncryptionAlgorithm::DesCbc,
            0x03 => EncryptionAlgorithm::TripleDesEde3Ecb,
            0x04..=0x1F => EncryptionAlgorithm::Reserved(value),
            _ => EncryptionAlgorithm::Private(value),
        }
    }
}

impl From<EncryptionAlgorithm> for u8 {
    fn from(value: EncryptionAlgorithm) -> Self {
        match value {
            EncryptionAlgorithm::NotEncrypted => 0x00,
            EncryptionAlgorithm::DesEcb => 0x01,
            EncryptionAlgorithm::DesCbc => 0x02,
            EncryptionAlgorithm::TripleDesEde3Ecb => 0x03,
            EncryptionAlgorithm::Reserved(value) | EncryptionAlgorithm::Private(value) => value,
        }
    }
}

impl Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EncryptionAlgorithm::NotEncrypted => write!(f, "No encryption"),
            EncryptionAlgorithm::DesEcb => write!(f, "DES - ECB mode"),
            EncryptionAlgorithm::DesCbc => write!(f, "DES - CBC mode"),
            EncryptionAlgorithm::TripleDesEde3Ecb => write!(f, "Triple DES EDE3 - ECB mode"),
            EncryptionAlgorithm::Reserved(v) => write!(f, "Reserved ({v})"),
            EncryptionAlgorithm::Private(v) => write!(f, "User private ({v})"),
        }
    }
}
