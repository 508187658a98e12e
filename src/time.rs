//! Time-related structures: `splice_time()` and `break_duration()`.

use crate::bit_reader::BitReader;
use crate::error::DecodeError;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::Serialize;

/// 90 kHz system clock rate used by every SCTE-35 time field.
pub const TICKS_PER_SECOND: u64 = 90_000;

/// PTS values wrap at 33 bits.
pub const PTS_MODULUS: u64 = 1 << 33;

/// Converts 90 kHz ticks to seconds, rounded up to 6 decimal places.
pub fn ticks_to_secs(value: u64) -> f64 {
    (value as f64 / TICKS_PER_SECOND as f64 * 1_000_000.0).ceil() / 1_000_000.0
}

/// Converts 90 kHz ticks to a [`Duration`] without going through floats.
pub fn ticks_to_duration(ticks: u64) -> Duration {
    let secs = ticks / TICKS_PER_SECOND;
    let nanos = (ticks % TICKS_PER_SECOND) * 1_000_000_000 / TICKS_PER_SECOND;
    Duration::new(secs, nanos as u32)
}

/// A `splice_time()` structure.
///
/// The two variants have different bit layouts on the wire: a specified time
/// is 5 bytes (flag, 6 reserved bits, 33-bit PTS), an unspecified one is a
/// single byte (flag, 7 reserved bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum SpliceTime {
    TimeSpecified { pts_time: u64 },
    NoTimeSpecified,
}

impl SpliceTime {
    pub(crate) fn parse(reader: &mut BitReader) -> Result<Self, DecodeError> {
        if reader.read_flag()? {
            reader.skip_bits(6)?;
            Ok(SpliceTime::TimeSpecified {
                pts_time: reader.read_wide(33)?,
            })
        } else {
            reader.skip_bits(7)?;
            Ok(SpliceTime::NoTimeSpecified)
        }
    }

    /// The raw 33-bit PTS, when a time is specified.
    pub fn pts_time(&self) -> Option<u64> {
        match self {
            SpliceTime::TimeSpecified { pts_time } => Some(*pts_time),
            SpliceTime::NoTimeSpecified => None,
        }
    }

    /// The PTS with `pts_adjustment` applied, wrapping at 33 bits.
    pub fn adjusted_pts(&self, pts_adjustment: u64) -> Option<u64> {
        self.pts_time()
            .map(|pts| (pts + pts_adjustment) % PTS_MODULUS)
    }

    pub fn to_duration(&self) -> Option<Duration> {
        self.pts_time().map(ticks_to_duration)
    }
}

/// A `break_duration()` structure: 1 bit auto_return, 6 reserved, 33-bit duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct BreakDuration {
    /// When set, the splicer returns to the network at the end of the break.
    pub auto_return: bool,
    /// Break length in 90 kHz ticks.
    pub duration: u64,
}

impl BreakDuration {
    pub(crate) fn parse(reader: &mut BitReader) -> Result<Self, DecodeError> {
        let auto_return = reader.read_flag()?;
        reader.skip_bits(6)?;
        let duration = reader.read_wide(33)?;
        Ok(BreakDuration {
            auto_return,
            duration,
        })
    }

    pub fn to_duration(&self) -> Duration {
        ticks_to_duration(self.duration)
    }
}
