//! The segmentation descriptor (tag 0x02) and its segmentation type table.

use crate::bit_reader::BitReader;
use crate::descriptors::DecodeDescriptor;
use crate::error::DecodeError;
use crate::upid::SegmentationUpid;

#[cfg(feature = "serde")]
use serde::Serialize;

macro_rules! segmentation_types {
    ($($name:ident = $id:literal => $desc:literal,)*) => {
        /// The `segmentation_type_id` field.
        ///
        /// Ids missing from the table decode to [`SegmentationType::Other`]
        /// so the original value is never lost.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(Serialize))]
        pub enum SegmentationType {
            $(
                #[doc = $desc]
                $name,
            )*
            Other(u8),
        }

        impl SegmentationType {
            pub fn id(&self) -> u8 {
                match self {
                    $(SegmentationType::$name => $id,)*
                    SegmentationType::Other(id) => *id,
                }
            }

            pub fn description(&self) -> &'static str {
                match self {
                    $(SegmentationType::$name => $desc,)*
                    SegmentationType::Other(_) => "Reserved",
                }
            }
        }

        impl From<u8> for SegmentationType {
            fn from(id: u8) -> Self {
                match id {
                    $($id => SegmentationType::$name,)*
                    other => SegmentationType::Other(other),
                }
            }
        }
    };
}

segmentation_types! {
    NotIndicated = 0x00 => "Not Indicated",
    ContentIdentification = 0x01 => "Content Identification",
    ProgramStart = 0x10 => "Program Start",
    ProgramEnd = 0x11 => "Program End",
    ProgramEarlyTermination = 0x12 => "Program Early Termination",
    ProgramBreakaway = 0x13 => "Program Breakaway",
    ProgramResumption = 0x14 => "Program Resumption",
    ProgramRunoverPlanned = 0x15 => "Program Runover Planned",
    ProgramRunoverUnplanned = 0x16 => "Program Runover Unplanned",
    ProgramOverlapStart = 0x17 => "Program Overlap Start",
    ProgramBlackoutOverride = 0x18 => "Program Blackout Override",
    ProgramJoin = 0x19 => "Program Join",
    ChapterStart = 0x20 => "Chapter Start",
    ChapterEnd = 0x21 => "Chapter End",
    BreakStart = 0x22 => "Break Start",
    BreakEnd = 0x23 => "Break End",
    OpeningCreditStartDeprecated = 0x24 => "Opening Credit Start (Deprecated)",
    OpeningCreditEndDeprecated = 0x25 => "Opening Credit End (Deprecated)",
    ClosingCreditStartDeprecated = 0x26 => "Closing Credit Start (Deprecated)",
    ClosingCreditEndDeprecated = 0x27 => "Closing Credit End (Deprecated)",
    ProviderAdvertisementStart = 0x30 => "Provider Advertisement Start",
    ProviderAdvertisementEnd = 0x31 => "Provider Advertisement End",
    DistributorAdvertisementStart = 0x32 => "Distributor Advertisement Start",
    DistributorAdvertisementEnd = 0x33 => "Distributor Advertisement End",
    ProviderPlacementOpportunityStart = 0x34 => "Provider Placement Opportunity Start",
    ProviderPlacementOpportunityEnd = 0x35 => "Provider Placement Opportunity End",
    DistributorPlacementOpportunityStart = 0x36 => "Distributor Placement Opportunity Start",
    DistributorPlacementOpportunityEnd = 0x37 => "Distributor Placement Opportunity End",
    ProviderOverlayPlacementOpportunityStart = 0x38 => "Provider Overlay Placement Opportunity Start",
    ProviderOverlayPlacementOpportunityEnd = 0x39 => "Provider Overlay Placement Opportunity End",
    DistributorOverlayPlacementOpportunityStart = 0x3A => "Distributor Overlay Placement Opportunity Start",
    DistributorOverlayPlacementOpportunityEnd = 0x3B => "Distributor Overlay Placement Opportunity End",
    ProviderPromoStart = 0x3C => "Provider Promo Start",
    ProviderPromoEnd = 0x3D => "Provider Promo End",
    DistributorPromoStart = 0x3E => "Distributor Promo Start",
    DistributorPromoEnd = 0x3F => "Distributor Promo End",
    UnscheduledEventStart = 0x40 => "Unscheduled Event Start",
    UnscheduledEventEnd = 0x41 => "Unscheduled Event End",
    AlternateContentOpportunityStart = 0x42 => "Alternate Content Opportunity Start",
    AlternateContentOpportunityEnd = 0x43 => "Alternate Content Opportunity End",
    ProviderAdBlockStart = 0x44 => "Provider Ad Block Start",
    ProviderAdBlockEnd = 0x45 => "Provider Ad Block End",
    DistributorAdBlockStart = 0x46 => "Distributor Ad Block Start",
    DistributorAdBlockEnd = 0x47 => "Distributor Ad Block End",
    NetworkStart = 0x50 => "Network Start",
    NetworkEnd = 0x51 => "Network End",
}

impl SegmentationType {
    /// Placement opportunity starts carry `sub_segment_num` and
    /// `sub_segments_expected`.
    pub fn has_sub_segments(&self) -> bool {
        matches!(self.id(), 0x34 | 0x36 | 0x38 | 0x3A)
    }
}

/// `device_restrictions`, 2 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum DeviceRestrictions {
    RestrictGroup0,
    RestrictGroup1,
    RestrictGroup2,
    None,
}

impl From<u8> for DeviceRestrictions {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => DeviceRestrictions::RestrictGroup0,
            1 => DeviceRestrictions::RestrictGroup1,
            2 => DeviceRestrictions::RestrictGroup2,
            _ => DeviceRestrictions::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DeliveryRestrictions {
    pub web_delivery_allowed_flag: bool,
    pub no_regional_blackout_flag: bool,
    pub archive_allowed_flag: bool,
    pub device_restrictions: DeviceRestrictions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SegmentationComponent {
    pub component_tag: u8,
    /// 33-bit offset from the splice time, in 90 kHz ticks.
    pub pts_offset: u64,
}

/// `segmentation_descriptor()`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SegmentationDescriptor {
    pub identifier: u32,
    pub segmentation_event_id: u32,
    pub segmentation_event_cancel_indicator: bool,
    pub segmentation_event_id_compliance_indicator: bool,
    /// Absent when the event is cancelled.
    pub details: Option<SegmentationDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SegmentationDetails {
    pub program_segmentation_flag: bool,
    pub segmentation_duration_flag: bool,
    pub delivery_not_restricted_flag: bool,
    /// Present when `delivery_not_restricted_flag` is clear.
    pub delivery_restrictions: Option<DeliveryRestrictions>,
    /// Present when `program_segmentation_flag` is clear.
    pub components: Vec<SegmentationComponent>,
    /// 40-bit duration in 90 kHz ticks.
    pub segmentation_duration: Option<u64>,
    pub segmentation_upid: SegmentationUpid,
    pub segmentation_type: SegmentationType,
    pub segment_num: u8,
    pub segments_expected: u8,
    pub sub_segment_num: Option<u8>,
    pub sub_segments_expected: Option<u8>,
}

impl DecodeDescriptor for SegmentationDescriptor {
    const TAG: u8 = 0x02;

    fn decode(reader: &mut BitReader) -> Result<Self, DecodeError> {
        let identifier = reader.read_u32()?;
        let segmentation_event_id = reader.read_u32()?;
        let segmentation_event_cancel_indicator = reader.read_flag()?;
        let segmentation_event_id_compliance_indicator = reader.read_flag()?;
        reader.skip_bits(6)?;

        let details = if segmentation_event_cancel_indicator {
            None
        } else {
            Some(parse_details(reader)?)
        };

        Ok(SegmentationDescriptor {
            identifier,
            segmentation_event_id,
            segmentation_event_cancel_indicator,
            segmentation_event_id_compliance_indicator,
            details,
        })
    }
}

fn parse_details(reader: &mut BitReader) -> Result<SegmentationDetails, DecodeError> {
    let program_segmentation_flag = reader.read_flag()?;
    let segmentation_duration_flag = reader.read_flag()?;
    let delivery_not_restricted_flag = reader.read_flag()?;

    let delivery_restrictions = if delivery_not_restricted_flag {
        reader.skip_bits(5)?;
        None
    } else {
        Some(DeliveryRestrictions {
            web_delivery_allowed_flag: reader.read_flag()?,
            no_regional_blackout_flag: reader.read_flag()?,
            archive_allowed_flag: reader.read_flag()?,
            device_restrictions: DeviceRestrictions::from(reader.read_bits(2)? as u8),
        })
    };

    let mut components = Vec::new();
    if !program_segmentation_flag {
        let component_count = reader.read_u8()?;
        for _ in 0..component_count {
            let component_tag = reader.read_u8()?;
            reader.skip_bits(7)?;
            components.push(SegmentationComponent {
                component_tag,
                pts_offset: reader.read_wide(33)?,
            });
        }
    }

    let segmentation_duration = if segmentation_duration_flag {
        Some(reader.read_wide(40)?)
    } else {
        None
    };

    let upid_type = reader.read_u8()?;
    let upid_length = reader.read_u8()? as usize;
    let segmentation_upid = SegmentationUpid::new(upid_type, reader.read_bytes(upid_length)?);

    let segmentation_type = SegmentationType::from(reader.read_u8()?);
    let segment_num = reader.read_u8()?;
    let segments_expected = reader.read_u8()?;

    // older senders omit the sub-segment pair even for placement opportunities
    let (sub_segment_num, sub_segments_expected) =
        if segmentation_type.has_sub_segments() && reader.bits_remaining() >= 16 {
            (Some(reader.read_u8()?), Some(reader.read_u8()?))
        } else {
            (None, None)
        };

    Ok(SegmentationDetails {
        program_segmentation_flag,
        segmentation_duration_flag,
        delivery_not_restricted_flag,
        delivery_restrictions,
        components,
        segmentation_duration,
        segmentation_upid,
        segmentation_type,
        segment_num,
        segments_expected,
        sub_segment_num,
        sub_segments_expected,
    })
}
