//! MPEG transport stream handling.

mod demux;
pub mod packet;

pub use demux::{
    DEFAULT_MAX_SECTION_SIZE, DemuxConfig, DemuxStats, ExtractedSection, StreamEvent, TsDemuxer,
};
pub use packet::{TS_PACKET_SIZE, TsHeader, TsPacket};
