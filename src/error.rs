//! Error types for input normalization, transport stream demultiplexing and
//! section decoding.
//!
//! Errors are split by the scope they abort:
//!
//! - [`DecodeError`] aborts the decode of a single `splice_info_section`.
//! - [`StreamError`] is recoverable; the demuxer records it and keeps scanning.
//! - [`Error`] aborts processing of a whole input. Section failures are
//!   never folded into it; each [`RawSection`](crate::RawSection) is
//!   decoded on its own.

use std::io;
use thiserror::Error;

/// Failure while decoding one `splice_info_section`.
///
/// A section that fails with any of these is never returned, even partially.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Ran out of bits in the middle of a field.
    #[error("unexpected end of data while reading bits")]
    UnexpectedEof,

    /// The first byte is not the SCTE-35 table id `0xFC`.
    #[error("invalid table id: expected 0xFC, got 0x{0:02X}")]
    InvalidTableId(u8),

    /// `section_length + 3` disagrees with the buffer size.
    #[error("section length mismatch: header declares {declared} bytes, buffer holds {actual}")]
    LengthMismatch {
        /// Total size implied by `section_length`.
        declared: usize,
        /// Size of the buffer handed to the decoder.
        actual: usize,
    },

    /// The splice command did not fill exactly `splice_command_length` bytes.
    #[error("splice command length mismatch: declared {declared} bytes, consumed {consumed}")]
    CommandLengthMismatch { declared: usize, consumed: usize },

    /// The descriptor loop did not split into whole descriptors, or a known
    /// descriptor's structure ran past its own `descriptor_length`. In the
    /// latter case `consumed` is the size the structure needed.
    #[error("descriptor loop length mismatch: declared {declared} bytes, consumed {consumed}")]
    DescriptorLengthMismatch { declared: usize, consumed: usize },

    /// The CRC-32 stored in the section does not match its contents.
    #[error("CRC validation failed: section carries 0x{expected:08X}, computed 0x{computed:08X}")]
    CrcMismatch { expected: u32, computed: u32 },
}

/// Recoverable problem found while demultiplexing a transport stream.
///
/// The in-progress section on the affected PID is dropped and scanning
/// resumes at the next payload unit start.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The continuity counter skipped while a section was being reassembled.
    #[error("continuity counter discontinuity: expected {expected}, found {found}")]
    Discontinuity { expected: u8, found: u8 },

    /// A section header declared more bytes than the configured limit.
    #[error("section of {declared} bytes exceeds the {limit} byte limit")]
    SectionTooLarge { declared: usize, limit: usize },
}

/// Failure that stops processing of an entire input.
#[derive(Error, Debug)]
pub enum Error {
    /// Hex or base64 text that could not be decoded.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    /// The byte stream does not carry 188-byte packets starting with `0x47`.
    #[error("not an MPEG transport stream: bad sync byte at offset {offset}")]
    NotMpegTs { offset: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
