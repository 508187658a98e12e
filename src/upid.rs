//! UPID (Unique Program Identifier) types and rendering.
//!
//! Segmentation descriptors identify content with a typed UPID. The raw
//! bytes are always kept; [`SegmentationUpid::to_display_string`] renders
//! them in the conventional notation of each type.

use data_encoding::{BASE64, HEXLOWER};

#[cfg(feature = "serde")]
use serde::Serialize;

macro_rules! upid_types {
    ($($name:ident = $id:literal => $desc:literal,)*) => {
        /// The `segmentation_upid_type` field.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(Serialize))]
        #[non_exhaustive]
        pub enum SegmentationUpidType {
            $(
                #[doc = $desc]
                $name,
            )*
            Reserved(u8),
        }

        impl From<u8> for SegmentationUpidType {
            fn from(value: u8) -> Self {
                match value {
                    $($id => SegmentationUpidType::$name,)*
                    other => SegmentationUpidType::Reserved(other),
                }
            }
        }

        impl From<SegmentationUpidType> for u8 {
            fn from(upid_type: SegmentationUpidType) -> Self {
                match upid_type {
                    $(SegmentationUpidType::$name => $id,)*
                    SegmentationUpidType::Reserved(value) => value,
                }
            }
        }

        impl SegmentationUpidType {
            pub fn description(&self) -> &'static str {
                match self {
                    $(SegmentationUpidType::$name => $desc,)*
                    SegmentationUpidType::Reserved(_) => "Reserved/Unknown",
                }
            }
        }
    };
}

upid_types! {
    NotUsed = 0x00 => "Not Used",
    UserDefinedDeprecated = 0x01 => "User Defined (Deprecated)",
    ISCI = 0x02 => "ISCI (Industry Standard Commercial Identifier)",
    AdID = 0x03 => "Ad Identifier",
    UMID = 0x04 => "UMID (Unique Material Identifier)",
    ISANDeprecated = 0x05 => "ISAN (Deprecated)",
    ISAN = 0x06 => "ISAN (International Standard Audiovisual Number)",
    TID = 0x07 => "TID (Tribune Media Systems Program Identifier)",
    AiringID = 0x08 => "Airing ID",
    ADI = 0x09 => "ADI (Advertising Digital Identification)",
    EIDR = 0x0A => "EIDR (Entertainment Identifier Registry)",
    ATSCContentIdentifier = 0x0B => "ATSC Content Identifier",
    MPU = 0x0C => "MPU (Managed Private UPID)",
    MID = 0x0D => "MID (Multiple UPID)",
    ADSInformation = 0x0E => "ADS Information",
    URI = 0x0F => "URI (Uniform Resource Identifier)",
    UUID = 0x10 => "UUID (Universally Unique Identifier)",
    SCR = 0x11 => "SCR (Subscriber Company Reporting)",
}

impl Default for SegmentationUpidType {
    fn default() -> Self {
        SegmentationUpidType::NotUsed
    }
}

impl SegmentationUpidType {
    fn is_text(&self) -> bool {
        use SegmentationUpidType::*;
        matches!(
            self,
            UserDefinedDeprecated | ISCI | AdID | TID | ADI | ADSInformation | URI | SCR
        )
    }
}

/// A UPID as carried in a segmentation descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SegmentationUpid {
    pub upid_type: SegmentationUpidType,
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::serialize_bytes"))]
    pub data: Vec<u8>,
}

impl SegmentationUpid {
    pub fn new(upid_type: u8, data: Vec<u8>) -> Self {
        SegmentationUpid {
            upid_type: SegmentationUpidType::from(upid_type),
            data,
        }
    }

    /// Splits a MID UPID into its nested UPIDs. Returns `None` for other
    /// types or when the nested lengths overrun the data.
    pub fn mid_entries(&self) -> Option<Vec<SegmentationUpid>> {
        if self.upid_type != SegmentationUpidType::MID {
            return None;
        }
        let mut entries = Vec::new();
        let mut rest = self.data.as_slice();
        while let [upid_type, len, tail @ ..] = rest {
            let len = *len as usize;
            if tail.len() < len {
                return None;
            }
            entries.push(SegmentationUpid::new(*upid_type, tail[..len].to_vec()));
            rest = &tail[len..];
        }
        rest.is_empty().then_some(entries)
    }

    /// Renders the UPID in the notation conventional for its type.
    pub fn to_display_string(&self) -> String {
        use SegmentationUpidType::*;
        let bytes = self.data.as_slice();
        match self.upid_type {
            NotUsed => String::new(),
            t if t.is_text() => match std::str::from_utf8(bytes) {
                Ok(s) if s.chars().all(|c| !c.is_control()) => s.to_string(),
                _ => format_base64(bytes),
            },
            ISAN | ISANDeprecated => format_isan(bytes),
            UUID => format_uuid(bytes),
            AiringID if bytes.len() == 8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                format!("0x{:016x}", u64::from_be_bytes(raw))
            }
            EIDR if bytes.len() == 12 => {
                let prefix = u16::from_be_bytes([bytes[0], bytes[1]]);
                format!("10.{}/{}", prefix, format_dashed_hex(&bytes[2..]))
            }
            MPU if bytes.len() >= 4 => {
                let identifier = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                format!(
                    "{}:{}",
                    crate::fmt::format_identifier_to_string(identifier),
                    HEXLOWER.encode(&bytes[4..])
                )
            }
            MID => match self.mid_entries() {
                Some(entries) => entries
                    .iter()
                    .map(|e| format!("{}={}", u8::from(e.upid_type), e.to_display_string()))
                    .collect::<Vec<_>>()
                    .join(","),
                None => format_base64(bytes),
            },
            UMID => format_dashed_hex(bytes),
            _ => format!("0x{}", HEXLOWER.encode(bytes)),
        }
    }
}

/// Formats 16 bytes as a standard UUID string.
pub fn format_uuid(bytes: &[u8]) -> String {
    if bytes.len() != 16 {
        return format_base64(bytes);
    }
    format!(
        "{}-{}-{}-{}-{}",
        HEXLOWER.encode(&bytes[0..4]),
        HEXLOWER.encode(&bytes[4..6]),
        HEXLOWER.encode(&bytes[6..8]),
        HEXLOWER.encode(&bytes[8..10]),
        HEXLOWER.encode(&bytes[10..16]),
    )
}

/// Formats the 12 ISAN bytes as six dash-separated groups of 4 hex digits.
pub fn format_isan(bytes: &[u8]) -> String {
    if bytes.len() < 12 {
        return format_base64(bytes);
    }
    format_dashed_hex(&bytes[..12])
}

fn format_dashed_hex(bytes: &[u8]) -> String {
    bytes
        .chunks(2)
        .map(|chunk| HEXLOWER.encode(chunk))
        .collect::<Vec<_>>()
        .join("-")
}

pub fn format_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}
