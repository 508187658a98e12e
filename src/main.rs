use clap::{Parser, ValueEnum};
use scte35_extract::fmt::{format_as_hex, format_identifier_to_string, format_private_data, format_ticks};
use scte35_extract::ts::DEFAULT_MAX_SECTION_SIZE;
use scte35_extract::ts::packet::PID_MAX;
use scte35_extract::{
    BreakDuration, DecodeError, DemuxConfig, DescriptorPayload, Error, ExtractedSection, Extraction,
    Input, InputFormat, SegmentationDescriptor, SpliceCommand, SpliceDescriptor, SpliceInfoSection,
    SpliceTime, StreamEvent, extract,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "scte35-extract",
    version,
    about = "Extract and decode SCTE-35 splice information sections"
)]
struct Cli {
    /// Hex or base64 payload, or a file path with --file
    input: String,

    /// How to interpret the input
    #[arg(short, long, value_enum, default_value_t = InputFormat::Auto)]
    format: InputFormat,

    /// Treat INPUT as a path to a file
    #[arg(long)]
    file: bool,

    /// PID carrying SCTE-35 sections (repeatable; decimal or 0x-prefixed hex).
    /// Without it every PID is scanned.
    #[arg(long = "pid", value_parser = parse_pid)]
    pids: Vec<u16>,

    /// Largest section accepted from a transport stream, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_SECTION_SIZE)]
    max_section_size: usize,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_pid(value: &str) -> Result<u16, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    }
    .map_err(|e| format!("invalid PID {value:?}: {e}"))?;
    if parsed > PID_MAX {
        return Err(format!("PID {parsed:#x} is out of range (max {PID_MAX:#x})"));
    }
    Ok(parsed)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = DemuxConfig::default()
        .with_pids(cli.pids.iter().copied())
        .with_max_section_size(cli.max_section_size);

    let extraction = match load_input(&cli).and_then(|input| extract(input, &config)) {
        Ok(extraction) => extraction,
        Err(e) => {
            report_fatal(cli.output, &e);
            return ExitCode::FAILURE;
        }
    };

    let decoded: Vec<_> = extraction
        .sections
        .iter()
        .map(|found| (found, found.section.decode()))
        .collect();
    let successes = decoded.iter().filter(|(_, result)| result.is_ok()).count();
    debug!(total = decoded.len(), successes, "decoded sections");

    match cli.output {
        OutputFormat::Text => print_text(&decoded, &extraction),
        OutputFormat::Json => print_json(&decoded, &extraction),
    }

    if successes == 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn load_input(cli: &Cli) -> Result<Input, Error> {
    if !cli.file {
        return Input::from_bytes(cli.input.clone().into_bytes(), cli.format);
    }
    let path = PathBuf::from(&cli.input);
    if cli.format == InputFormat::TransportStream {
        return Ok(Input::TsFile(path));
    }
    let data = std::fs::read(&path)?;
    Input::from_bytes(data, cli.format)
}

fn report_fatal(output: OutputFormat, error: &Error) {
    match output {
        OutputFormat::Text => eprintln!("Error: {error}"),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "status": "error",
                "error": error.to_string(),
                "sections": [],
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
    }
}

type Decoded<'a> = (&'a ExtractedSection, Result<SpliceInfoSection, DecodeError>);

fn print_json(decoded: &[Decoded], extraction: &Extraction) {
    let sections: Vec<_> = decoded
        .iter()
        .map(|(found, result)| match result {
            Ok(section) => serde_json::json!({
                "status": "success",
                "pid": found.pid,
                "offset": found.offset,
                "data": section,
            }),
            Err(e) => serde_json::json!({
                "status": "error",
                "pid": found.pid,
                "offset": found.offset,
                "error": e.to_string(),
            }),
        })
        .collect();
    let events: Vec<_> = extraction.events.iter().map(event_json).collect();

    let successes = decoded.iter().filter(|(_, r)| r.is_ok()).count();
    let status = match successes {
        0 => "error",
        n if n == decoded.len() => "success",
        _ => "partial",
    };
    let json = serde_json::json!({
        "status": status,
        "sections": sections,
        "events": events,
    });
    match serde_json::to_string_pretty(&json) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Error serializing output: {e}"),
    }
}

fn event_json(event: &StreamEvent) -> serde_json::Value {
    serde_json::json!({
        "pid": event.pid,
        "offset": event.offset,
        "error": event.error.to_string(),
    })
}

fn print_text(decoded: &[Decoded], extraction: &Extraction) {
    if decoded.is_empty() {
        println!("No SCTE-35 sections found");
    }
    for (index, (found, result)) in decoded.iter().enumerate() {
        if index > 0 {
            println!();
        }
        if let Some(pid) = found.pid {
            println!("Section {} (PID 0x{pid:04x}, offset {}):", index + 1, found.offset);
        }
        match result {
            Ok(section) => print_section(section),
            Err(e) => println!("Error parsing SpliceInfoSection: {e}"),
        }
    }
    for event in &extraction.events {
        eprintln!(
            "Stream warning: PID 0x{:04x} at offset {}: {}",
            event.pid, event.offset, event.error
        );
    }
}

fn print_section(section: &SpliceInfoSection) {
    println!("Successfully parsed SpliceInfoSection:");
    println!("  Table ID: {}", section.table_id);
    println!("  SAP Type: {}", section.sap_type);
    println!("  Section Length: {}", section.section_length);
    println!("  Protocol Version: {}", section.protocol_version);
    if let Some(algorithm) = section.encryption_algorithm {
        println!("  Encryption Algorithm: {algorithm}");
        println!("  CW Index: {}", section.cw_index);
    }
    println!("  PTS Adjustment: {}", format_ticks(section.pts_adjustment));
    println!("  Tier: 0x{:03x}", section.tier);
    println!("  Splice Command Type: 0x{:02x}", section.splice_command_type);
    println!("  Splice Command Length: {}", section.splice_command_length);
    println!("  Splice Command: {}", section.splice_command.name());
    print_command(&section.splice_command);

    println!("  Descriptor Loop Length: {}", section.descriptor_loop_length);
    println!("  Number of Descriptors: {}", section.descriptors.len());
    for descriptor in &section.descriptors {
        print_descriptor(descriptor);
    }
    if !section.alignment_stuffing.is_empty() {
        println!("  Alignment Stuffing: {} bytes", section.alignment_stuffing.len());
    }

    if let Some(crc) = section.e_crc_32 {
        println!("  Encrypted CRC-32: 0x{crc:08x}");
    }
    println!("  CRC-32: 0x{:08x}", section.crc_32);
}

fn print_command(command: &SpliceCommand) {
    match command {
        SpliceCommand::Null | SpliceCommand::BandwidthReservation => {}
        SpliceCommand::Schedule(schedule) => {
            println!("    Events: {}", schedule.events.len());
            for event in &schedule.events {
                println!("    Splice Event ID: 0x{:08x}", event.splice_event_id);
                println!("      Cancelled: {}", event.splice_event_cancel_indicator);
                let Some(details) = &event.details else {
                    continue;
                };
                println!("      Out of Network: {}", details.out_of_network_indicator);
                if let Some(utc) = details.utc_splice_time {
                    println!("      UTC Splice Time: {utc}");
                }
                for component in &details.components {
                    println!(
                        "      Component 0x{:02x} UTC Splice Time: {}",
                        component.component_tag, component.utc_splice_time
                    );
                }
                print_break_duration(details.break_duration.as_ref(), "      ");
                println!("      Unique Program ID: {}", details.unique_program_id);
            }
        }
        SpliceCommand::Insert(insert) => {
            println!("    Splice Event ID: 0x{:08x}", insert.splice_event_id);
            println!("    Splice Event Cancel: {}", insert.splice_event_cancel_indicator);
            let Some(event) = &insert.event else {
                return;
            };
            println!("    Out of Network: {}", event.out_of_network_indicator);
            println!("    Program Splice Flag: {}", event.program_splice_flag);
            println!("    Duration Flag: {}", event.duration_flag);
            println!("    Splice Immediate Flag: {}", event.splice_immediate_flag);
            if let Some(time) = &event.splice_time {
                print_splice_time(time, "    ");
            }
            for component in &event.components {
                println!("    Component Tag: 0x{:02x}", component.component_tag);
                if let Some(time) = &component.splice_time {
                    print_splice_time(time, "      ");
                }
            }
            print_break_duration(event.break_duration.as_ref(), "    ");
            println!("    Unique Program ID: {}", event.unique_program_id);
            println!("    Avail Num: {}", event.avail_num);
            println!("    Avails Expected: {}", event.avails_expected);
        }
        SpliceCommand::TimeSignal(signal) => print_splice_time(&signal.splice_time, "    "),
        SpliceCommand::Private(private) => {
            println!("    Identifier: {}", format_identifier_to_string(private.identifier));
            println!("    Private Bytes: {}", format_private_data(&private.private_bytes));
        }
        SpliceCommand::Encrypted { data } => {
            println!("    Encrypted Payload: {}", format_as_hex(data));
        }
        SpliceCommand::Unknown { data, .. } => {
            println!("    Raw Bytes: {}", format_as_hex(data));
        }
    }
}

fn print_splice_time(time: &SpliceTime, indent: &str) {
    match time {
        SpliceTime::TimeSpecified { pts_time } => {
            println!("{indent}Splice Time PTS: {}", format_ticks(*pts_time));
        }
        SpliceTime::NoTimeSpecified => println!("{indent}Splice Time: not specified"),
    }
}

fn print_break_duration(duration: Option<&BreakDuration>, indent: &str) {
    if let Some(duration) = duration {
        println!("{indent}Break Duration:");
        println!("{indent}  Auto Return: {}", duration.auto_return);
        println!("{indent}  Duration: {}", format_ticks(duration.duration));
    }
}

fn print_descriptor(descriptor: &SpliceDescriptor) {
    println!(
        "    {} (tag 0x{:02x}, length {})",
        descriptor.name(),
        descriptor.descriptor_tag,
        descriptor.descriptor_length
    );
    match &descriptor.payload {
        DescriptorPayload::Avail(avail) => {
            println!("      Provider Avail ID: 0x{:08x}", avail.provider_avail_id);
        }
        DescriptorPayload::Dtmf(dtmf) => {
            println!("      Preroll: {}", dtmf.preroll);
            println!("      DTMF Chars: {}", dtmf.dtmf_chars);
        }
        DescriptorPayload::Segmentation(segmentation) => print_segmentation(segmentation),
        DescriptorPayload::Time(time) => {
            println!("      TAI: {}.{:09}", time.tai_seconds, time.tai_ns);
            println!("      UTC Offset: {}", time.utc_offset);
        }
        DescriptorPayload::Audio(audio) => {
            for component in &audio.components {
                println!(
                    "      Component 0x{:02x}: {} ({} channels)",
                    component.component_tag, component.iso_code, component.num_channels
                );
            }
        }
        DescriptorPayload::Unknown { data } => {
            println!("      Data: {}", format_as_hex(data));
        }
    }
}

fn print_segmentation(segmentation: &SegmentationDescriptor) {
    println!(
        "      Segmentation Event ID: 0x{:08x}",
        segmentation.segmentation_event_id
    );
    println!(
        "      Cancelled: {}",
        segmentation.segmentation_event_cancel_indicator
    );
    let Some(details) = &segmentation.details else {
        return;
    };
    println!(
        "      Segmentation Type: {} (0x{:02x})",
        details.segmentation_type.description(),
        details.segmentation_type.id()
    );
    println!(
        "      UPID: {} {}",
        details.segmentation_upid.upid_type.description(),
        details.segmentation_upid.to_display_string()
    );
    if let Some(duration) = details.segmentation_duration {
        println!("      Duration: {}", format_ticks(duration));
    }
    println!(
        "      Segment: {}/{}",
        details.segment_num, details.segments_expected
    );
    if let (Some(num), Some(expected)) = (details.sub_segment_num, details.sub_segments_expected) {
        println!("      Sub-segment: {num}/{expected}");
    }
}
