//! Splice descriptors and the descriptor loop.
//!
//! Every SCTE-35 descriptor is `tag (8) | length (8) | identifier (32) | body`.
//! Descriptors with a known tag and the `CUEI` identifier are decoded into
//! their structured form; everything else is kept byte for byte.

use crate::bit_reader::BitReader;
use crate::error::DecodeError;
use crate::segmentation::SegmentationDescriptor;

#[cfg(feature = "serde")]
use serde::Serialize;

/// ASCII "CUEI", the identifier of all SCTE-defined descriptors.
pub const CUEI_IDENTIFIER: u32 = 0x43554549;

/// A descriptor that can be decoded from its payload bytes.
pub(crate) trait DecodeDescriptor: Sized {
    const TAG: u8;

    /// Decodes from a reader over the bytes following `descriptor_length`,
    /// starting with the 32-bit identifier. Trailing bytes are ignored.
    fn decode(reader: &mut BitReader) -> Result<Self, DecodeError>;
}

/// One entry of the descriptor loop.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SpliceDescriptor {
    pub descriptor_tag: u8,
    pub descriptor_length: u8,
    pub payload: DescriptorPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum DescriptorPayload {
    Avail(AvailDescriptor),
    Dtmf(DtmfDescriptor),
    Segmentation(SegmentationDescriptor),
    Time(TimeDescriptor),
    Audio(AudioDescriptor),
    /// Unassigned tags and non-CUEI descriptors, identifier included.
    Unknown {
        #[cfg_attr(feature = "serde", serde(serialize_with = "crate::serialize_bytes"))]
        data: Vec<u8>,
    },
}

impl SpliceDescriptor {
    pub fn name(&self) -> &'static str {
        match self.payload {
            DescriptorPayload::Avail(_) => "Avail Descriptor",
            DescriptorPayload::Dtmf(_) => "DTMF Descriptor",
            DescriptorPayload::Segmentation(_) => "Segmentation Descriptor",
            DescriptorPayload::Time(_) => "Time Descriptor",
            DescriptorPayload::Audio(_) => "Audio Descriptor",
            DescriptorPayload::Unknown { .. } => "Unknown Descriptor",
        }
    }

    pub fn as_segmentation(&self) -> Option<&SegmentationDescriptor> {
        match &self.payload {
            DescriptorPayload::Segmentation(segmentation) => Some(segmentation),
            _ => None,
        }
    }
}

/// `avail_descriptor()` (tag 0x00).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AvailDescriptor {
    pub identifier: u32,
    pub provider_avail_id: u32,
}

impl DecodeDescriptor for AvailDescriptor {
    const TAG: u8 = 0x00;

    fn decode(reader: &mut BitReader) -> Result<Self, DecodeError> {
        Ok(AvailDescriptor {
            identifier: reader.read_u32()?,
            provider_avail_id: reader.read_u32()?,
        })
    }
}

/// `DTMF_descriptor()` (tag 0x01).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DtmfDescriptor {
    pub identifier: u32,
    /// Tenths of a second between the tones and the splice.
    pub preroll: u8,
    pub dtmf_chars: String,
}

impl DecodeDescriptor for DtmfDescriptor {
    const TAG: u8 = 0x01;

    fn decode(reader: &mut BitReader) -> Result<Self, DecodeError> {
        let identifier = reader.read_u32()?;
        let preroll = reader.read_u8()?;
        let dtmf_count = reader.read_bits(3)? as usize;
        reader.skip_bits(5)?;
        let dtmf_chars = reader
            .read_bytes(dtmf_count)?
            .into_iter()
            .map(char::from)
            .collect();
        Ok(DtmfDescriptor {
            identifier,
            preroll,
            dtmf_chars,
        })
    }
}

/// `time_descriptor()` (tag 0x03): TAI time with the UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TimeDescriptor {
    pub identifier: u32,
    pub tai_seconds: u64,
    pub tai_ns: u32,
    pub utc_offset: u16,
}

impl DecodeDescriptor for TimeDescriptor {
    const TAG: u8 = 0x03;

    fn decode(reader: &mut BitReader) -> Result<Self, DecodeError> {
        Ok(TimeDescriptor {
            identifier: reader.read_u32()?,
            tai_seconds: reader.read_wide(48)?,
            tai_ns: reader.read_u32()?,
            utc_offset: reader.read_u16()?,
        })
    }
}

/// `audio_descriptor()` (tag 0x04).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AudioDescriptor {
    pub identifier: u32,
    pub components: Vec<AudioComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AudioComponent {
    pub component_tag: u8,
    /// ISO 639-2 language code.
    pub iso_code: String,
    pub bit_stream_mode: u8,
    pub num_channels: u8,
    pub full_srvc_audio: bool,
}

impl DecodeDescriptor for AudioDescriptor {
    const TAG: u8 = 0x04;

    fn decode(reader: &mut BitReader) -> Result<Self, DecodeError> {
        let identifier = reader.read_u32()?;
        let audio_count = reader.read_bits(4)?;
        reader.skip_bits(4)?;

        let mut components = Vec::with_capacity(audio_count as usize);
        for _ in 0..audio_count {
            let component_tag = reader.read_u8()?;
            let iso_code = reader.read_bytes(3)?.into_iter().map(char::from).collect();
            components.push(AudioComponent {
                component_tag,
                iso_code,
                bit_stream_mode: reader.read_bits(3)? as u8,
                num_channels: reader.read_bits(4)? as u8,
                full_srvc_audio: reader.read_flag()?,
            });
        }

        Ok(AudioDescriptor {
            identifier,
            components,
        })
    }
}

fn decode_known<D: DecodeDescriptor>(
    body: &[u8],
    wrap: fn(D) -> DescriptorPayload,
) -> Result<DescriptorPayload, DecodeError> {
    let mut reader = BitReader::new(body);
    // the structure ran past descriptor_length
    D::decode(&mut reader)
        .map(wrap)
        .map_err(|_| DecodeError::DescriptorLengthMismatch {
            declared: body.len(),
            consumed: reader.bytes_required(),
        })
}

/// Decodes one descriptor given its tag and payload bytes.
pub(crate) fn parse_splice_descriptor(
    descriptor_tag: u8,
    body: &[u8],
) -> Result<SpliceDescriptor, DecodeError> {
    let is_cuei = body.len() >= 4
        && u32::from_be_bytes([body[0], body[1], body[2], body[3]]) == CUEI_IDENTIFIER;

    let payload = match descriptor_tag {
        _ if !is_cuei => DescriptorPayload::Unknown {
            data: body.to_vec(),
        },
        AvailDescriptor::TAG => decode_known(body, DescriptorPayload::Avail)?,
        DtmfDescriptor::TAG => decode_known(body, DescriptorPayload::Dtmf)?,
        SegmentationDescriptor::TAG => decode_known(body, DescriptorPayload::Segmentation)?,
        TimeDescriptor::TAG => decode_known(body, DescriptorPayload::Time)?,
        AudioDescriptor::TAG => decode_known(body, DescriptorPayload::Audio)?,
        _ => DescriptorPayload::Unknown {
            data: body.to_vec(),
        },
    };

    Ok(SpliceDescriptor {
        descriptor_tag,
        descriptor_length: body.len() as u8,
        payload,
    })
}

/// Splits and decodes a descriptor loop. The loop must divide exactly into
/// whole descriptors.
pub(crate) fn parse_descriptor_loop(loop_bytes: &[u8]) -> Result<Vec<SpliceDescriptor>, DecodeError> {
    let mut descriptors = Vec::new();
    let mut offset = 0;

    while offset < loop_bytes.len() {
        let mismatch = DecodeError::DescriptorLengthMismatch {
            declared: loop_bytes.len(),
            consumed: offset,
        };
        let &[tag, length, ..] = &loop_bytes[offset..] else {
            return Err(mismatch);
        };
        let body_start = offset + 2;
        let body_end = body_start + length as usize;
        if body_end > loop_bytes.len() {
            return Err(DecodeError::DescriptorLengthMismatch {
                declared: loop_bytes.len(),
                consumed: body_end,
            });
        }

        descriptors.push(parse_splice_descriptor(tag, &loop_bytes[body_start..body_end])?);
        offset = body_end;
    }

    Ok(descriptors)
}
