//! MPEG transport stream packet headers.
//!
//! Only the parts needed to route section payloads are decoded: the 4-byte
//! header and the adaptation field's `discontinuity_indicator`.

/// MPEG-TS packet size in bytes.
pub const TS_PACKET_SIZE: usize = 188;

/// MPEG-TS sync byte value.
pub const SYNC_BYTE: u8 = 0x47;

/// Maximum valid PID value.
pub const PID_MAX: u16 = 0x1FFF;

/// The 2-bit `adaptation_field_control` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptationFieldControl {
    Reserved,
    PayloadOnly,
    AdaptationFieldOnly,
    AdaptationFieldAndPayload,
}

impl AdaptationFieldControl {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => AdaptationFieldControl::Reserved,
            1 => AdaptationFieldControl::PayloadOnly,
            2 => AdaptationFieldControl::AdaptationFieldOnly,
            _ => AdaptationFieldControl::AdaptationFieldAndPayload,
        }
    }

    pub fn has_adaptation_field(self) -> bool {
        matches!(
            self,
            AdaptationFieldControl::AdaptationFieldOnly
                | AdaptationFieldControl::AdaptationFieldAndPayload
        )
    }

    pub fn has_payload(self) -> bool {
        matches!(
            self,
            AdaptationFieldControl::PayloadOnly | AdaptationFieldControl::AdaptationFieldAndPayload
        )
    }
}

/// Transport packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TsHeader {
    pub transport_error: bool,
    pub payload_unit_start: bool,
    /// Packet identifier (13 bits).
    pub pid: u16,
    pub adaptation_field_control: AdaptationFieldControl,
    /// Continuity counter (4 bits).
    pub continuity_counter: u8,
}

impl TsHeader {
    pub const SIZE: usize = 4;

    /// Parses the header. Returns `None` if `data` is short or does not
    /// start with the sync byte.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE || data[0] != SYNC_BYTE {
            return None;
        }
        Some(TsHeader {
            transport_error: data[1] & 0x80 != 0,
            payload_unit_start: data[1] & 0x40 != 0,
            pid: (u16::from(data[1] & 0x1F) << 8) | u16::from(data[2]),
            adaptation_field_control: AdaptationFieldControl::from_bits(data[3] >> 4),
            continuity_counter: data[3] & 0x0F,
        })
    }
}

/// A borrowed view of one 188-byte transport packet.
#[derive(Debug, Clone, Copy)]
pub struct TsPacket<'a> {
    pub header: TsHeader,
    /// The adaptation field signalled a discontinuity in this packet.
    pub discontinuity: bool,
    payload: Option<&'a [u8]>,
}

impl<'a> TsPacket<'a> {
    /// Parses a packet. Returns `None` on a bad sync byte or a wrong size.
    ///
    /// An adaptation field whose length runs past the end of the packet
    /// leaves the packet without payload.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() != TS_PACKET_SIZE {
            return None;
        }
        let header = TsHeader::parse(data)?;
        let control = header.adaptation_field_control;

        let mut discontinuity = false;
        let mut payload_start = TsHeader::SIZE;
        if control.has_adaptation_field() {
            let length = data[4] as usize;
            if length > 0 {
                discontinuity = data[5] & 0x80 != 0;
            }
            payload_start += 1 + length;
        }

        let payload = (control.has_payload() && payload_start < TS_PACKET_SIZE)
            .then(|| &data[payload_start..]);

        Some(TsPacket {
            header,
            discontinuity,
            payload,
        })
    }

    pub fn pid(&self) -> u16 {
        self.header.pid
    }

    pub fn payload(&self) -> Option<&'a [u8]> {
        self.payload
    }
}
