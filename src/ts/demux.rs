//! Section reassembly from an MPEG transport stream.
//!
//! [`TsDemuxer`] is fed arbitrary chunks of a byte stream, finds packet sync,
//! and rebuilds complete `splice_info_section`s from the payloads of the PIDs
//! in its [`DemuxConfig`]. Problems that only spoil one section are recorded
//! as [`StreamEvent`]s and never stop the scan.

use crate::error::{Error, Result, StreamError};
use crate::input::RawSection;
use crate::ts::packet::{SYNC_BYTE, TS_PACKET_SIZE, TsPacket};
use crate::types::SCTE35_TABLE_ID;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Largest section SCTE-35 allows: `section_length` tops out at 4093.
pub const DEFAULT_MAX_SECTION_SIZE: usize = 4096;

/// Table id of the padding that may follow the last section in a payload.
const STUFFING_TABLE_ID: u8 = 0xFF;

/// Demultiplexer settings.
///
/// With an empty `pids` set every PID is scanned and only sections whose
/// first byte is the SCTE-35 table id are kept. With PIDs configured, every
/// section found on them is handed on as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemuxConfig {
    pub pids: BTreeSet<u16>,
    /// Upper bound on `section_length + 3`; bigger sections are skipped.
    pub max_section_size: usize,
    /// How many leading bytes may precede the first sync byte.
    pub resync_window: usize,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        DemuxConfig {
            pids: BTreeSet::new(),
            max_section_size: DEFAULT_MAX_SECTION_SIZE,
            resync_window: TS_PACKET_SIZE,
        }
    }
}

impl DemuxConfig {
    pub fn with_pid(mut self, pid: u16) -> Self {
        self.pids.insert(pid);
        self
    }

    pub fn with_pids(mut self, pids: impl IntoIterator<Item = u16>) -> Self {
        self.pids.extend(pids);
        self
    }

    pub fn with_max_section_size(mut self, max_section_size: usize) -> Self {
        self.max_section_size = max_section_size;
        self
    }

    pub fn with_resync_window(mut self, resync_window: usize) -> Self {
        self.resync_window = resync_window;
        self
    }

    fn scans_all_pids(&self) -> bool {
        self.pids.is_empty()
    }
}

/// A reassembled section together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSection {
    /// PID the section arrived on; `None` for directly supplied sections.
    pub pid: Option<u16>,
    /// Byte offset of the packet holding the section's first byte.
    pub offset: u64,
    pub section: RawSection,
}

/// A recoverable problem, with the PID and packet offset it occurred at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub offset: u64,
    pub pid: u16,
    pub error: StreamError,
}

/// Running totals kept by the demuxer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    pub packets: u64,
    pub sections: u64,
    pub discontinuities: u64,
    pub oversized_sections: u64,
    /// Packets dropped for `transport_error_indicator` or as duplicates.
    pub dropped_packets: u64,
}

#[derive(Debug, Default)]
enum SectionState {
    #[default]
    Idle,
    Accumulating {
        buffer: Vec<u8>,
        /// Total size, known once the 3-byte header is in.
        expected: Option<usize>,
        offset: u64,
    },
}

/// Outcome of appending payload bytes to a PID's section.
enum Progress<'d> {
    /// Nothing is being accumulated.
    Idle,
    /// All bytes were taken; the section needs more packets.
    Pending,
    Complete {
        bytes: Vec<u8>,
        offset: u64,
        rest: &'d [u8],
    },
    TooLarge {
        declared: usize,
    },
    /// Not an SCTE-35 section while scanning all PIDs.
    Foreign,
}

#[derive(Debug, Default)]
struct PidState {
    last_cc: Option<u8>,
    section: SectionState,
}

impl PidState {
    fn is_accumulating(&self) -> bool {
        matches!(self.section, SectionState::Accumulating { .. })
    }

    fn start(&mut self, offset: u64) {
        self.section = SectionState::Accumulating {
            buffer: Vec::new(),
            expected: None,
            offset,
        };
    }

    fn append<'d>(&mut self, data: &'d [u8], limit: usize, scte35_only: bool) -> Progress<'d> {
        let SectionState::Accumulating {
            buffer,
            expected,
            offset,
        } = &mut self.section
        else {
            return Progress::Idle;
        };

        let mut data = data;
        let total = match *expected {
            Some(total) => total,
            None => {
                let take = (3 - buffer.len()).min(data.len());
                buffer.extend_from_slice(&data[..take]);
                data = &data[take..];
                if buffer.len() < 3 {
                    return Progress::Pending;
                }
                if scte35_only && buffer[0] != SCTE35_TABLE_ID {
                    self.section = SectionState::Idle;
                    return Progress::Foreign;
                }
                let total = ((usize::from(buffer[1] & 0x0F) << 8) | usize::from(buffer[2])) + 3;
                if total > limit {
                    self.section = SectionState::Idle;
                    return Progress::TooLarge { declared: total };
                }
                *expected = Some(total);
                total
            }
        };

        let take = (total - buffer.len()).min(data.len());
        buffer.extend_from_slice(&data[..take]);
        if buffer.len() < total {
            return Progress::Pending;
        }

        let bytes = std::mem::take(buffer);
        let offset = *offset;
        self.section = SectionState::Idle;
        Progress::Complete {
            bytes,
            offset,
            rest: &data[take..],
        }
    }
}

/// Push-style demultiplexer for SCTE-35 sections.
///
/// # Example
///
/// ```rust
/// use data_encoding::BASE64;
/// use scte35_extract::ts::{DemuxConfig, TsDemuxer};
///
/// let section = BASE64.decode(b"/DAWAAAAAAAAAP/wBQb+Qjo1vQAAuwxz9A==").unwrap();
/// let mut packet = vec![0x47, 0x41, 0xF4, 0x10, 0x00];
/// packet.extend_from_slice(&section);
/// packet.resize(188, 0xFF);
///
/// let mut demuxer = TsDemuxer::new(DemuxConfig::default().with_pid(0x1F4));
/// let mut sections = demuxer.push(&packet).unwrap();
/// sections.extend(demuxer.finish().unwrap());
///
/// assert_eq!(sections.len(), 1);
/// assert!(sections[0].section.decode().is_ok());
/// ```
#[derive(Debug)]
pub struct TsDemuxer {
    config: DemuxConfig,
    /// Bytes not yet forming a whole packet.
    pending: Vec<u8>,
    /// Stream offset of `pending[0]`.
    position: u64,
    synced: bool,
    pids: HashMap<u16, PidState>,
    events: Vec<StreamEvent>,
    stats: DemuxStats,
}

impl TsDemuxer {
    pub fn new(config: DemuxConfig) -> Self {
        TsDemuxer {
            config,
            pending: Vec::new(),
            position: 0,
            synced: false,
            pids: HashMap::new(),
            events: Vec::new(),
            stats: DemuxStats::default(),
        }
    }

    pub fn config(&self) -> &DemuxConfig {
        &self.config
    }

    /// Recoverable events recorded so far.
    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<StreamEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    /// Feeds the next chunk of the stream and returns the sections it
    /// completed.
    ///
    /// Fails with [`Error::NotMpegTs`] when no sync is found within the
    /// resync window or a packet boundary after sync lacks the sync byte.
    /// The demuxer must not be used after an error.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<ExtractedSection>> {
        self.pending.extend_from_slice(data);
        if !self.synced && !self.acquire_sync(false)? {
            return Ok(Vec::new());
        }
        self.drain_packets()
    }

    /// Signals the end of the stream.
    ///
    /// A stream shorter than two packets is only checked for sync here.
    /// Trailing bytes and sections left unfinished are discarded.
    pub fn finish(&mut self) -> Result<Vec<ExtractedSection>> {
        let mut sections = Vec::new();
        if !self.synced {
            if self.pending.is_empty() {
                return Ok(sections);
            }
            self.acquire_sync(true)?;
            sections = self.drain_packets()?;
        }

        if !self.pending.is_empty() {
            debug!(
                offset = self.position,
                bytes = self.pending.len(),
                "discarding trailing partial packet"
            );
            self.position += self.pending.len() as u64;
            self.pending.clear();
        }
        for (pid, state) in &mut self.pids {
            if state.is_accumulating() {
                debug!(pid, "stream ended inside a section");
                state.section = SectionState::Idle;
            }
        }
        Ok(sections)
    }

    /// Looks for the first packet boundary. Returns `Ok(false)` when more
    /// data is needed to decide.
    fn acquire_sync(&mut self, at_end: bool) -> Result<bool> {
        let window = usize::try_from(
            (self.config.resync_window as u64).saturating_sub(self.position),
        )
        .unwrap_or(usize::MAX);

        let mut candidate = None;
        for i in 0..=window {
            let Some(&byte) = self.pending.get(i) else {
                if at_end {
                    break;
                }
                return Ok(false);
            };
            if byte != SYNC_BYTE {
                continue;
            }
            match self.pending.get(i + TS_PACKET_SIZE) {
                Some(&SYNC_BYTE) => {
                    candidate = Some(i);
                    break;
                }
                Some(_) => continue,
                None if at_end => {
                    if self.pending.len() >= i + TS_PACKET_SIZE {
                        candidate = Some(i);
                        break;
                    }
                }
                None => return Ok(false),
            }
        }

        let Some(skip) = candidate else {
            return Err(Error::NotMpegTs {
                offset: self.position,
            });
        };
        if skip > 0 {
            debug!(bytes = skip, "skipped leading bytes before sync");
        }
        self.pending.drain(..skip);
        self.position += skip as u64;
        self.synced = true;
        debug!(offset = self.position, "acquired transport stream sync");
        Ok(true)
    }

    fn drain_packets(&mut self) -> Result<Vec<ExtractedSection>> {
        let mut sections = Vec::new();
        let buffer = std::mem::take(&mut self.pending);
        let mut packets = buffer.chunks_exact(TS_PACKET_SIZE);
        for chunk in &mut packets {
            let offset = self.position;
            let packet = TsPacket::parse(chunk).ok_or(Error::NotMpegTs { offset })?;
            self.handle_packet(&packet, offset, &mut sections);
            self.position += TS_PACKET_SIZE as u64;
        }
        self.pending = packets.remainder().to_vec();
        Ok(sections)
    }

    fn handle_packet(&mut self, packet: &TsPacket, offset: u64, out: &mut Vec<ExtractedSection>) {
        self.stats.packets += 1;
        let header = packet.header;
        let pid = packet.pid();
        if !self.config.scans_all_pids() && !self.config.pids.contains(&pid) {
            return;
        }
        if header.transport_error {
            debug!(pid, offset, "dropping packet with transport_error_indicator");
            self.stats.dropped_packets += 1;
            return;
        }
        // The continuity counter only advances on packets with payload.
        let Some(payload) = packet.payload() else {
            return;
        };

        let scte35_only = self.config.scans_all_pids();
        let limit = self.config.max_section_size;
        let state = self.pids.entry(pid).or_default();

        let cc = header.continuity_counter;
        if let Some(last) = state.last_cc {
            let expected = (last + 1) & 0x0F;
            if cc == last && !packet.discontinuity {
                debug!(pid, offset, cc, "dropping duplicate packet");
                self.stats.dropped_packets += 1;
                return;
            }
            if cc != expected && state.is_accumulating() {
                state.section = SectionState::Idle;
                if packet.discontinuity {
                    debug!(pid, offset, "signalled discontinuity, dropping partial section");
                } else {
                    warn!(pid, offset, expected, found = cc, "continuity counter discontinuity");
                    self.stats.discontinuities += 1;
                    self.events.push(StreamEvent {
                        offset,
                        pid,
                        error: StreamError::Discontinuity {
                            expected,
                            found: cc,
                        },
                    });
                }
            }
        }
        state.last_cc = Some(cc);

        let mut results = Vec::new();
        if header.payload_unit_start {
            let Some((&pointer, rest)) = payload.split_first() else {
                return;
            };
            let pointer = pointer as usize;
            if pointer > rest.len() {
                debug!(pid, offset, pointer, "pointer_field past end of payload");
                state.section = SectionState::Idle;
                return;
            }
            let (tail, mut data) = rest.split_at(pointer);
            if state.is_accumulating() {
                results.push(state.append(tail, limit, scte35_only));
                if state.is_accumulating() {
                    debug!(pid, offset, "section cut short by a new payload unit");
                    state.section = SectionState::Idle;
                }
            }

            while let Some(&table_id) = data.first() {
                if table_id == STUFFING_TABLE_ID {
                    break;
                }
                state.start(offset);
                let progress = state.append(data, limit, scte35_only);
                data = match &progress {
                    Progress::Complete { rest, .. } => *rest,
                    _ => &[],
                };
                results.push(progress);
            }
        } else {
            results.push(state.append(payload, limit, scte35_only));
        }

        for progress in results {
            match progress {
                Progress::Complete { bytes, offset, .. } => {
                    debug!(pid, offset, len = bytes.len(), "extracted section");
                    self.stats.sections += 1;
                    out.push(ExtractedSection {
                        pid: Some(pid),
                        offset,
                        section: RawSection::new(bytes),
                    });
                }
                Progress::TooLarge { declared } => {
                    warn!(pid, offset, declared, limit, "section exceeds size limit");
                    self.stats.oversized_sections += 1;
                    self.events.push(StreamEvent {
                        offset,
                        pid,
                        error: StreamError::SectionTooLarge { declared, limit },
                    });
                }
                Progress::Idle | Progress::Pending | Progress::Foreign => {}
            }
        }
    }
}
