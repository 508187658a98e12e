//! # scte35-extract
//!
//! Extraction and decoding of SCTE-35 `splice_info_section`s.
//!
//! Sections can be supplied directly as hex, base64 or binary, or pulled
//! out of an MPEG transport stream. Every section is validated (lengths and
//! CRC-32/MPEG-2) before a decoded [`SpliceInfoSection`] is returned.
//!
//! ## Decoding a single section
//!
//! ```rust
//! use scte35_extract::{parse_splice_info_section, SpliceCommand};
//! use data_encoding::BASE64;
//!
//! let buffer = BASE64
//!     .decode(b"/DAvAAAAAAAA///wFAVIAACPf+/+c2nALv4AUsz1AAAAAAAKAAhDVUVJAAABNWLbowo=")
//!     .unwrap();
//! let section = parse_splice_info_section(&buffer).unwrap();
//!
//! match &section.splice_command {
//!     SpliceCommand::Insert(insert) => assert_eq!(insert.splice_event_id, 0x4800008F),
//!     other => panic!("unexpected command {}", other.name()),
//! }
//! ```
//!
//! ## Extracting from a transport stream
//!
//! ```rust,no_run
//! use scte35_extract::{extract, DemuxConfig, Input};
//!
//! let config = DemuxConfig::default().with_pid(0x1F4);
//! let extraction = extract(Input::TsFile("capture.ts".into()), &config)?;
//! for found in &extraction.sections {
//!     match found.section.decode() {
//!         Ok(section) => println!("{} at {}", section.splice_command.name(), found.offset),
//!         Err(e) => eprintln!("bad section at {}: {e}", found.offset),
//!     }
//! }
//! # Ok::<(), scte35_extract::Error>(())
//! ```

#[cfg(feature = "serde")]
use serde::Serializer;

mod bit_reader;
mod commands;
pub mod crc;
mod descriptors;
mod error;
pub mod fmt;
mod input;
mod parser;
mod segmentation;
pub mod time;
pub mod ts;
mod types;
pub mod upid;

pub use commands::{
    InsertComponent, InsertEvent, PrivateCommand, ScheduleComponent, ScheduleEvent,
    ScheduleEventDetails, SpliceCommand, SpliceCommandType, SpliceInsert, SpliceSchedule,
    TimeSignal,
};
pub use descriptors::{
    AudioComponent, AudioDescriptor, AvailDescriptor, CUEI_IDENTIFIER, DescriptorPayload,
    DtmfDescriptor, SpliceDescriptor, TimeDescriptor,
};
pub use error::{DecodeError, Error, Result, StreamError};
pub use input::{
    Extraction, Input, InputFormat, RawSection, decode_base64, decode_hex, extract,
    extract_from_reader,
};
pub use parser::parse_splice_info_section;
pub use segmentation::{
    DeliveryRestrictions, DeviceRestrictions, SegmentationComponent, SegmentationDescriptor,
    SegmentationDetails, SegmentationType,
};
pub use time::{BreakDuration, SpliceTime};
pub use ts::{DemuxConfig, ExtractedSection, StreamEvent};
pub use types::{EncryptionAlgorithm, SCTE35_TABLE_ID, SapType, SpliceInfoSection};
pub use upid::{SegmentationUpid, SegmentationUpidType};

/// Serializes opaque bytes as a base64 string.
#[cfg(feature = "serde")]
pub(crate) fn serialize_bytes<S>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&data_encoding::BASE64.encode(bytes))
}

#[cfg(test)]
mod tests;
