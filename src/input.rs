//! Input normalization.
//!
//! Every supported representation of SCTE-35 data ends up as one or more
//! [`RawSection`]s: hex and base64 text is decoded, binary is passed
//! through, and transport streams go through the [`TsDemuxer`].

use crate::error::{DecodeError, Error, Result};
use crate::parser::parse_splice_info_section;
use crate::ts::{DemuxConfig, ExtractedSection, StreamEvent, TS_PACKET_SIZE, TsDemuxer};
use crate::types::{SCTE35_TABLE_ID, SpliceInfoSection};
use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::PathBuf;
use tracing::debug;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// The bytes of exactly one `splice_info_section`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection(Vec<u8>);

impl RawSection {
    pub fn new(bytes: Vec<u8>) -> Self {
        RawSection(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Decodes the section. See [`parse_splice_info_section`].
    pub fn decode(&self) -> Result<SpliceInfoSection, DecodeError> {
        parse_splice_info_section(&self.0)
    }
}

impl AsRef<[u8]> for RawSection {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RawSection {
    fn from(bytes: Vec<u8>) -> Self {
        RawSection(bytes)
    }
}

/// How raw input bytes should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum InputFormat {
    /// Infer from the content, see [`InputFormat::detect`].
    #[default]
    Auto,
    Hex,
    Base64,
    Binary,
    #[cfg_attr(feature = "cli", value(alias = "ts"))]
    TransportStream,
}

impl InputFormat {
    /// Infers the format from cheap structural checks, in this order:
    ///
    /// 1. a table id `0xFC` whose `section_length` covers exactly the input:
    ///    binary section;
    /// 2. a `0x47` sync byte repeating 188 bytes later (or a lone packet);
    /// 3. a leading SCTE-35 table id `0xFC`: binary section;
    /// 4. only hex digits and ASCII whitespace, with an optional `0x`
    ///    prefix: hex;
    /// 5. only base64 alphabet characters: base64;
    /// 6. anything else is treated as binary.
    ///
    /// Never returns [`InputFormat::Auto`].
    pub fn detect(data: &[u8]) -> InputFormat {
        if is_whole_section(data) {
            return InputFormat::Binary;
        }
        if looks_like_transport_stream(data) {
            return InputFormat::TransportStream;
        }
        if data.first() == Some(&SCTE35_TABLE_ID) {
            return InputFormat::Binary;
        }

        let text = data.trim_ascii();
        let digits = strip_hex_prefix(text);
        if digits.iter().any(u8::is_ascii_hexdigit)
            && digits
                .iter()
                .all(|b| b.is_ascii_hexdigit() || b.is_ascii_whitespace())
        {
            return InputFormat::Hex;
        }
        if !text.is_empty()
            && text
                .iter()
                .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        {
            return InputFormat::Base64;
        }
        InputFormat::Binary
    }
}

fn is_whole_section(data: &[u8]) -> bool {
    match data {
        [SCTE35_TABLE_ID, hi, lo, ..] => {
            ((usize::from(hi & 0x0F) << 8) | usize::from(*lo)) + 3 == data.len()
        }
        _ => false,
    }
}

fn looks_like_transport_stream(data: &[u8]) -> bool {
    let window = data.len().min(TS_PACKET_SIZE);
    (0..window).any(|i| {
        data[i] == crate::ts::packet::SYNC_BYTE
            && match data.get(i + TS_PACKET_SIZE) {
                Some(&next) => next == crate::ts::packet::SYNC_BYTE,
                None => i == 0 && data.len() == TS_PACKET_SIZE,
            }
    })
}

fn strip_hex_prefix(text: &[u8]) -> &[u8] {
    text.strip_prefix(b"0x")
        .or_else(|| text.strip_prefix(b"0X"))
        .unwrap_or(text)
}

/// One external representation of SCTE-35 data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Hex(String),
    Base64(String),
    /// A single binary section.
    Binary(Vec<u8>),
    /// An in-memory transport stream.
    TransportStream(Vec<u8>),
    /// A transport stream file, read incrementally.
    TsFile(PathBuf),
}

impl Input {
    /// Wraps `data` according to `format`, running detection for
    /// [`InputFormat::Auto`].
    ///
    /// Text formats require UTF-8 input.
    pub fn from_bytes(data: Vec<u8>, format: InputFormat) -> Result<Input> {
        let format = match format {
            InputFormat::Auto => {
                let detected = InputFormat::detect(&data);
                debug!(?detected, "detected input format");
                detected
            }
            explicit => explicit,
        };
        Ok(match format {
            InputFormat::Hex => Input::Hex(into_text(data, "hex")?),
            InputFormat::Base64 => Input::Base64(into_text(data, "base64")?),
            InputFormat::TransportStream => Input::TransportStream(data),
            InputFormat::Binary | InputFormat::Auto => Input::Binary(data),
        })
    }
}

fn into_text(data: Vec<u8>, kind: &str) -> Result<String> {
    String::from_utf8(data)
        .map_err(|_| Error::MalformedEncoding(format!("{kind} input is not valid UTF-8")))
}

/// Sections extracted from one input, with any recoverable stream events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub sections: Vec<ExtractedSection>,
    pub events: Vec<StreamEvent>,
}

impl Extraction {
    fn single(bytes: Vec<u8>) -> Self {
        Extraction {
            sections: vec![ExtractedSection {
                pid: None,
                offset: 0,
                section: RawSection::new(bytes),
            }],
            events: Vec::new(),
        }
    }
}

/// Turns an input into raw sections.
///
/// Direct encodings yield exactly one section; transport streams yield as
/// many as they carry, possibly none.
///
/// # Example
///
/// ```rust
/// use scte35_extract::{extract, DemuxConfig, Input};
///
/// let input = Input::Base64("/DAWAAAAAAAAAP/wBQb+Qjo1vQAAuwxz9A==".into());
/// let extraction = extract(input, &DemuxConfig::default()).unwrap();
///
/// assert_eq!(extraction.sections.len(), 1);
/// assert_eq!(extraction.sections[0].section.as_bytes()[0], 0xFC);
/// ```
pub fn extract(input: Input, config: &DemuxConfig) -> Result<Extraction> {
    match input {
        Input::Hex(text) => decode_hex(&text).map(Extraction::single),
        Input::Base64(text) => decode_base64(&text).map(Extraction::single),
        Input::Binary(bytes) => Ok(Extraction::single(bytes)),
        Input::TransportStream(bytes) => extract_from_reader(bytes.as_slice(), config),
        Input::TsFile(path) => {
            let file = File::open(&path)?;
            extract_from_reader(BufReader::new(file), config)
        }
    }
}

/// Demultiplexes a transport stream read from `reader`.
pub fn extract_from_reader<R: Read>(mut reader: R, config: &DemuxConfig) -> Result<Extraction> {
    let mut demuxer = TsDemuxer::new(config.clone());
    let mut sections = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        sections.extend(demuxer.push(&chunk[..read])?);
    }
    sections.extend(demuxer.finish()?);

    let stats = demuxer.stats();
    debug!(
        packets = stats.packets,
        sections = stats.sections,
        discontinuities = stats.discontinuities,
        "transport stream done"
    );
    Ok(Extraction {
        sections,
        events: demuxer.take_events(),
    })
}

/// Decodes case-insensitive hex, optionally prefixed with `0x`. ASCII
/// whitespace between digits is ignored, so `FC 30 16 ...` is accepted.
pub fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = strip_hex_prefix(text.trim().as_bytes())
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    HEXLOWER_PERMISSIVE
        .decode(&digits)
        .map_err(|e| Error::MalformedEncoding(format!("invalid hex: {e}")))
}

/// Decodes standard padded base64.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(text.trim().as_bytes())
        .map_err(|e| Error::MalformedEncoding(format!("invalid base64: {e}")))
}
