//! Splice command variants and their decoders.
//!
//! Each command type has its own body layout. [`parse_splice_command`]
//! dispatches on `splice_command_type` and decodes the body from a reader
//! that covers exactly the command bytes.

use crate::bit_reader::BitReader;
use crate::error::DecodeError;
use crate::time::{BreakDuration, SpliceTime};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Command type codes defined by SCTE-35.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceCommandType {
    SpliceNull,
    SpliceSchedule,
    SpliceInsert,
    TimeSignal,
    BandwidthReservation,
    PrivateCommand,
    Reserved(u8),
}

impl From<u8> for SpliceCommandType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => SpliceCommandType::SpliceNull,
            0x04 => SpliceCommandType::SpliceSchedule,
            0x05 => SpliceCommandType::SpliceInsert,
            0x06 => SpliceCommandType::TimeSignal,
            0x07 => SpliceCommandType::BandwidthReservation,
            0xFF => SpliceCommandType::PrivateCommand,
            other => SpliceCommandType::Reserved(other),
        }
    }
}

impl From<SpliceCommandType> for u8 {
    fn from(value: SpliceCommandType) -> Self {
        match value {
            SpliceCommandType::SpliceNull => 0x00,
            SpliceCommandType::SpliceSchedule => 0x04,
            SpliceCommandType::SpliceInsert => 0x05,
            SpliceCommandType::TimeSignal => 0x06,
            SpliceCommandType::BandwidthReservation => 0x07,
            SpliceCommandType::PrivateCommand => 0xFF,
            SpliceCommandType::Reserved(other) => other,
        }
    }
}

impl SpliceCommandType {
    /// Whether the body is an opaque run of bytes whose size only the
    /// `splice_command_length` field can tell.
    pub(crate) fn is_opaque(self) -> bool {
        matches!(
            self,
            SpliceCommandType::PrivateCommand | SpliceCommandType::Reserved(_)
        )
    }
}

/// The decoded splice command. Exactly one variant is present per section.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum SpliceCommand {
    /// 0x00
    Null,
    /// 0x04
    Schedule(SpliceSchedule),
    /// 0x05
    Insert(SpliceInsert),
    /// 0x06
    TimeSignal(TimeSignal),
    /// 0x07, which has an empty body.
    BandwidthReservation,
    /// 0xFF
    Private(PrivateCommand),
    /// The command and descriptors of an encrypted section, left undecoded.
    Encrypted {
        #[cfg_attr(feature = "serde", serde(serialize_with = "crate::serialize_bytes"))]
        data: Vec<u8>,
    },
    /// A command type this decoder does not know, kept verbatim.
    Unknown {
        command_type: u8,
        #[cfg_attr(feature = "serde", serde(serialize_with = "crate::serialize_bytes"))]
        data: Vec<u8>,
    },
}

impl SpliceCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SpliceCommand::Null => "SpliceNull",
            SpliceCommand::Schedule(_) => "SpliceSchedule",
            SpliceCommand::Insert(_) => "SpliceInsert",
            SpliceCommand::TimeSignal(_) => "TimeSignal",
            SpliceCommand::BandwidthReservation => "BandwidthReservation",
            SpliceCommand::Private(_) => "PrivateCommand",
            SpliceCommand::Encrypted { .. } => "Encrypted",
            SpliceCommand::Unknown { .. } => "Unknown",
        }
    }
}

/// `splice_schedule()`: a list of events planned against UTC wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SpliceSchedule {
    pub events: Vec<ScheduleEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ScheduleEvent {
    pub splice_event_id: u32,
    pub splice_event_cancel_indicator: bool,
    /// Absent when the event is cancelled.
    pub details: Option<ScheduleEventDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ScheduleEventDetails {
    pub out_of_network_indicator: bool,
    pub program_splice_flag: bool,
    pub duration_flag: bool,
    /// Seconds since 1980-01-06 00:00:00 UTC, for program splices.
    pub utc_splice_time: Option<u32>,
    /// Per-component times, for component splices.
    pub components: Vec<ScheduleComponent>,
    pub break_duration: Option<BreakDuration>,
    pub unique_program_id: u16,
    pub avail_num: u8,
    pub avails_expected: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ScheduleComponent {
    pub component_tag: u8,
    pub utc_splice_time: u32,
}

/// `splice_insert()`: the classic ad-break cue.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SpliceInsert {
    pub splice_event_id: u32,
    pub splice_event_cancel_indicator: bool,
    /// Absent when the event is cancelled.
    pub event: Option<InsertEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct InsertEvent {
    /// `true` when leaving the network feed for the break.
    pub out_of_network_indicator: bool,
    pub program_splice_flag: bool,
    pub duration_flag: bool,
    pub splice_immediate_flag: bool,
    /// Present for timed program splices.
    pub splice_time: Option<SpliceTime>,
    /// Present for component splices.
    pub components: Vec<InsertComponent>,
    pub break_duration: Option<BreakDuration>,
    pub unique_program_id: u16,
    pub avail_num: u8,
    pub avails_expected: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct InsertComponent {
    pub component_tag: u8,
    /// Absent for immediate splices.
    pub splice_time: Option<SpliceTime>,
}

/// `time_signal()`: a bare time, usually qualified by segmentation descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TimeSignal {
    pub splice_time: SpliceTime,
}

/// `private_command()`: a registered identifier followed by vendor bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PrivateCommand {
    pub identifier: u32,
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::serialize_bytes"))]
    pub private_bytes: Vec<u8>,
}

/// Decodes a command body. `reader` must span the command and nothing after
/// it when the command is opaque, since opaque bodies run to its end.
pub(crate) fn parse_splice_command(
    reader: &mut BitReader,
    command_type: u8,
) -> Result<SpliceCommand, DecodeError> {
    Ok(match SpliceCommandType::from(command_type) {
        SpliceCommandType::SpliceNull => SpliceCommand::Null,
        SpliceCommandType::SpliceSchedule => SpliceCommand::Schedule(parse_splice_schedule(reader)?),
        SpliceCommandType::SpliceInsert => SpliceCommand::Insert(parse_splice_insert(reader)?),
        SpliceCommandType::TimeSignal => SpliceCommand::TimeSignal(TimeSignal {
            splice_time: SpliceTime::parse(reader)?,
        }),
        SpliceCommandType::BandwidthReservation => SpliceCommand::BandwidthReservation,
        SpliceCommandType::PrivateCommand => {
            let identifier = reader.read_u32()?;
            let private_bytes = read_rest(reader)?;
            SpliceCommand::Private(PrivateCommand {
                identifier,
                private_bytes,
            })
        }
        SpliceCommandType::Reserved(command_type) => SpliceCommand::Unknown {
            command_type,
            data: read_rest(reader)?,
        },
    })
}

fn read_rest(reader: &mut BitReader) -> Result<Vec<u8>, DecodeError> {
    reader.read_bytes(reader.bits_remaining() / 8)
}

fn parse_splice_schedule(reader: &mut BitReader) -> Result<SpliceSchedule, DecodeError> {
    let splice_count = reader.read_u8()?;
    let mut events = Vec::with_capacity(splice_count as usize);

    for _ in 0..splice_count {
        let splice_event_id = reader.read_u32()?;
        let splice_event_cancel_indicator = reader.read_flag()?;
        reader.skip_bits(7)?;

        let details = if splice_event_cancel_indicator {
            None
        } else {
            let out_of_network_indicator = reader.read_flag()?;
            let program_splice_flag = reader.read_flag()?;
            let duration_flag = reader.read_flag()?;
            reader.skip_bits(5)?;

            let mut utc_splice_time = None;
            let mut components = Vec::new();
            if program_splice_flag {
                utc_splice_time = Some(reader.read_u32()?);
            } else {
                let component_count = reader.read_u8()?;
                for _ in 0..component_count {
                    components.push(ScheduleComponent {
                        component_tag: reader.read_u8()?,
                        utc_splice_time: reader.read_u32()?,
                    });
                }
            }

            let break_duration = if duration_flag {
                Some(BreakDuration::parse(reader)?)
            } else {
                None
            };

            Some(ScheduleEventDetails {
                out_of_network_indicator,
                program_splice_flag,
                duration_flag,
                utc_splice_time,
                components,
                break_duration,
                unique_program_id: reader.read_u16()?,
                avail_num: reader.read_u8()?,
                avails_expected: reader.read_u8()?,
            })
        };

        events.push(ScheduleEvent {
            splice_event_id,
            splice_event_cancel_indicator,
            details,
        });
    }

    Ok(SpliceSchedule { events })
}

fn parse_splice_insert(reader: &mut BitReader) -> Result<SpliceInsert, DecodeError> {
    let splice_event_id = reader.read_u32()?;
    let splice_event_cancel_indicator = reader.read_flag()?;
    reader.skip_bits(7)?;

    if splice_event_cancel_indicator {
        return Ok(SpliceInsert {
            splice_event_id,
            splice_event_cancel_indicator,
            event: None,
        });
    }

    let out_of_network_indicator = reader.read_flag()?;
    let program_splice_flag = reader.read_flag()?;
    let duration_flag = reader.read_flag()?;
    let splice_immediate_flag = reader.read_flag()?;
    reader.skip_bits(4)?;

    let mut splice_time = None;
    let mut components = Vec::new();
    if program_splice_flag {
        if !splice_immediate_flag {
            splice_time = Some(SpliceTime::parse(reader)?);
        }
    } else {
        let component_count = reader.read_u8()?;
        for _ in 0..component_count {
            let component_tag = reader.read_u8()?;
            let splice_time = if splice_immediate_flag {
                None
            } else {
                Some(SpliceTime::parse(reader)?)
            };
            components.push(InsertComponent {
                component_tag,
                splice_time,
            });
        }
    }

    let break_duration = if duration_flag {
        Some(BreakDuration::parse(reader)?)
    } else {
        None
    };

    Ok(SpliceInsert {
        splice_event_id,
        splice_event_cancel_indicator,
        event: Some(InsertEvent {
            out_of_network_indicator,
            program_splice_flag,
            duration_flag,
            splice_immediate_flag,
            splice_time,
            components,
            break_duration,
            unique_program_id: reader.read_u16()?,
            avail_num: reader.read_u8()?,
            avails_expected: reader.read_u8()?,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(command_type: u8, body: &[u8]) -> (SpliceCommand, usize) {
        let mut reader = BitReader::new(body);
        let command = parse_splice_command(&mut reader, command_type).unwrap();
        (command, reader.byte_position())
    }

    #[test]
    fn test_splice_null_consumes_nothing() {
        assert_eq!(parse(0x00, &[]), (SpliceCommand::Null, 0));
    }

    #[test]
    fn test_splice_insert_program_timed() {
        let body = [
            0x48, 0x00, 0x00, 0x8F, // splice_event_id
            0x7F, // not cancelled
            0xEF, // out=1 program=1 duration=1 immediate=0
            0xFE, 0x73, 0x69, 0xC0, 0x2E, // splice_time
            0xFE, 0x00, 0x52, 0xCC, 0xF5, // break_duration
            0x00, 0x00, // unique_program_id
            0x00, 0x00, // avail_num, avails_expected
        ];
        let (command, consumed) = parse(0x05, &body);
        assert_eq!(consumed, body.len());

        let SpliceCommand::Insert(insert) = command else {
            panic!("expected SpliceInsert");
        };
        assert_eq!(insert.splice_event_id, 0x4800008F);
        let event = insert.event.expect("event details");
        assert!(event.out_of_network_indicator);
        assert!(!event.splice_immediate_flag);
        assert_eq!(event.splice_time.and_then(|t| t.pts_time()), Some(0x07369C02E));
        assert_eq!(
            event.break_duration,
            Some(BreakDuration {
                auto_return: true,
                duration: 0x052CCF5,
            })
        );
    }

    #[test]
    fn test_splice_insert_cancelled_has_no_event() {
        let body = [0x00, 0x00, 0x00, 0x01, 0xFF];
        let (command, consumed) = parse(0x05, &body);
        assert_eq!(consumed, 5);
        assert_eq!(
            command,
            SpliceCommand::Insert(SpliceInsert {
                splice_event_id: 1,
                splice_event_cancel_indicator: true,
                event: None,
            })
        );
    }

    #[test]
    fn test_splice_insert_component_immediate() {
        let body = [
            0x00, 0x00, 0x00, 0x02, // splice_event_id
            0x7F, // not cancelled
            0x9F, // out=1 program=0 duration=0 immediate=1
            0x02, // component_count
            0x01, 0x02, // component tags, no times
            0x12, 0x34, 0x01, 0x02,
        ];
        let (command, consumed) = parse(0x05, &body);
        assert_eq!(consumed, body.len());

        let SpliceCommand::Insert(insert) = command else {
            panic!("expected SpliceInsert");
        };
        let event = insert.event.unwrap();
        assert_eq!(event.components.len(), 2);
        assert_eq!(event.components[1].component_tag, 0x02);
        assert_eq!(event.components[1].splice_time, None);
        assert_eq!(event.unique_program_id, 0x1234);
        assert_eq!(event.avails_expected, 2);
    }

    #[test]
    fn test_splice_schedule_two_events() {
        let body = [
            0x02, // splice_count
            // event 1: program splice with duration
            0x00, 0x00, 0x00, 0x0A, 0x7F, 0xFF, // out=1 program=1 duration=1
            0x49, 0x96, 0x02, 0xD2, // utc_splice_time
            0x7E, 0x00, 0x00, 0x00, 0x10, // break_duration, auto_return=0
            0x00, 0x01, 0x01, 0x02,
            // event 2: cancelled
            0x00, 0x00, 0x00, 0x0B, 0xFF,
        ];
        let (command, consumed) = parse(0x04, &body);
        assert_eq!(consumed, body.len());

        let SpliceCommand::Schedule(schedule) = command else {
            panic!("expected SpliceSchedule");
        };
        assert_eq!(schedule.events.len(), 2);
        let first = schedule.events[0].details.as_ref().unwrap();
        assert_eq!(first.utc_splice_time, Some(0x499602D2));
        assert_eq!(first.break_duration.unwrap().duration, 0x10);
        assert!(!first.break_duration.unwrap().auto_return);
        assert!(schedule.events[1].splice_event_cancel_indicator);
        assert!(schedule.events[1].details.is_none());
    }

    #[test]
    fn test_private_command_takes_rest() {
        let body = [0x43, 0x55, 0x45, 0x49, 0xAA, 0xBB];
        let (command, consumed) = parse(0xFF, &body);
        assert_eq!(consumed, 6);
        assert_eq!(
            command,
            SpliceCommand::Private(PrivateCommand {
                identifier: 0x43554549,
                private_bytes: vec![0xAA, 0xBB],
            })
        );
    }

    #[test]
    fn test_reserved_command_type_is_kept() {
        let (command, _) = parse(0x01, &[0x01, 0x02]);
        assert_eq!(
            command,
            SpliceCommand::Unknown {
                command_type: 0x01,
                data: vec![0x01, 0x02],
            }
        );
    }

    #[test]
    fn test_truncated_time_signal() {
        let mut reader = BitReader::new(&[0xFE, 0x00]);
        assert_eq!(
            parse_splice_command(&mut reader, 0x06),
            Err(DecodeError::UnexpectedEof)
        );
    }
}
