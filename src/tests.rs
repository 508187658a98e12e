//! Scenario tests over real and hand-built SCTE-35 sections.

use crate::crc::calculate_crc;
use crate::*;
use data_encoding::BASE64;

const TIME_SIGNAL: &str = "/DAWAAAAAAAAAP/wBQb+Qjo1vQAAuwxz9A==";
const TIME_SIGNAL_AVAIL: &str = "/DAgAAAAAAAAAP/wBQb+Qjo1vQAKAAhDVUVJAAAE0iVuWvA=";
const SPLICE_INSERT: &str = "/DAvAAAAAAAA///wFAVIAACPf+/+c2nALv4AUsz1AAAAAAAKAAhDVUVJAAABNWLbowo=";
const SEGMENTATION_AIRING_ID: &str =
    "/DAvAAAAAAAA///wBQb+dGKQoAAZAhdDVUVJSAAAjn+fCAgAAAAALKChijUCAKnMZ1g=";
const BAD_CRC: &str =
    "/DA4AAAAAAAA///wBQb+AKpFLgAiAiBDVUVJAAAAA3//AAApPWwDDEFCQ0QwMTIzNDU2SHAAAFkTm+A=";

fn decode(payload: &str) -> Result<SpliceInfoSection, DecodeError> {
    let buffer = BASE64.decode(payload.as_bytes()).unwrap();
    parse_splice_info_section(&buffer)
}

/// Prepends `table_id` and `section_length` to `body` and appends its CRC.
fn build_section(body: &[u8]) -> Vec<u8> {
    let section_length = body.len() + 4;
    let mut section = vec![0xFC, 0x30 | (section_length >> 8) as u8, section_length as u8];
    section.extend_from_slice(body);
    let crc = calculate_crc(&section);
    section.extend_from_slice(&crc.to_be_bytes());
    section
}

/// A clear header with the given command, followed by `descriptors`.
fn clear_section(command_type: u8, command: &[u8], descriptors: &[u8]) -> Vec<u8> {
    let command_length = command.len();
    let mut body = vec![
        0x00, // protocol_version
        0x00, 0x00, 0x00, 0x00, 0x00, // not encrypted, pts_adjustment 0
        0x00, // cw_index
        0xFF,
        0xF0 | (command_length >> 8) as u8,
        command_length as u8,
        command_type,
    ];
    body.extend_from_slice(command);
    body.extend_from_slice(&(descriptors.len() as u16).to_be_bytes());
    body.extend_from_slice(descriptors);
    build_section(&body)
}

#[test]
fn test_time_signal() {
    let section = decode(TIME_SIGNAL).unwrap();

    assert_eq!(section.table_id, 0xFC);
    assert!(!section.section_syntax_indicator);
    assert!(!section.private_indicator);
    assert_eq!(section.sap_type, SapType::NotSpecified);
    assert_eq!(section.section_length, 22);
    assert_eq!(section.protocol_version, 0);
    assert!(!section.encrypted_packet);
    assert_eq!(section.encryption_algorithm, None);
    assert_eq!(section.pts_adjustment, 0);
    assert_eq!(section.tier, 0xFFF);
    assert_eq!(section.splice_command_length, 5);
    assert_eq!(section.splice_command_type, 0x06);
    assert_eq!(
        section.splice_command,
        SpliceCommand::TimeSignal(TimeSignal {
            splice_time: SpliceTime::TimeSpecified {
                pts_time: 0x0423A35BD
            },
        })
    );
    assert_eq!(section.descriptor_loop_length, 0);
    assert!(section.descriptors.is_empty());
    assert_eq!(section.crc_32, 0xBB0C73F4);
    assert_eq!(section.command_pts(), Some(0x0423A35BD));
}

#[test]
fn test_time_signal_with_avail_descriptor() {
    let section = decode(TIME_SIGNAL_AVAIL).unwrap();

    assert_eq!(section.descriptor_loop_length, 10);
    assert_eq!(section.descriptors.len(), 1);
    let descriptor = &section.descriptors[0];
    assert_eq!(descriptor.descriptor_tag, 0x00);
    assert_eq!(descriptor.descriptor_length, 8);
    assert_eq!(
        descriptor.payload,
        DescriptorPayload::Avail(AvailDescriptor {
            identifier: CUEI_IDENTIFIER,
            provider_avail_id: 1234,
        })
    );
}

#[test]
fn test_splice_insert() {
    let section = decode(SPLICE_INSERT).unwrap();

    assert_eq!(section.splice_command_length, 20);
    let SpliceCommand::Insert(insert) = &section.splice_command else {
        panic!("expected SpliceInsert, got {}", section.splice_command.name());
    };
    assert_eq!(insert.splice_event_id, 0x4800008F);
    assert!(!insert.splice_event_cancel_indicator);

    let event = insert.event.as_ref().unwrap();
    assert!(event.out_of_network_indicator);
    assert!(event.program_splice_flag);
    assert!(event.duration_flag);
    assert!(!event.splice_immediate_flag);
    assert_eq!(
        event.splice_time,
        Some(SpliceTime::TimeSpecified {
            pts_time: 0x07369C02E
        })
    );
    assert_eq!(
        event.break_duration,
        Some(BreakDuration {
            auto_return: true,
            duration: 0x00052CCF5,
        })
    );
    assert_eq!(event.unique_program_id, 0);
    assert_eq!(event.avail_num, 0);
    assert_eq!(event.avails_expected, 0);

    let duration = event.break_duration.unwrap().to_duration();
    assert_eq!(duration.as_secs(), 60);

    assert_eq!(section.descriptors.len(), 1);
    assert_eq!(section.descriptors[0].name(), "Avail Descriptor");
}

#[test]
fn test_segmentation_descriptor() {
    let section = decode(SEGMENTATION_AIRING_ID).unwrap();

    assert_eq!(
        section.splice_command,
        SpliceCommand::TimeSignal(TimeSignal {
            splice_time: SpliceTime::TimeSpecified {
                pts_time: 0x0746290A0
            },
        })
    );
    assert_eq!(section.descriptor_loop_length, 25);

    let segmentation = section.descriptors[0].as_segmentation().unwrap();
    assert_eq!(segmentation.segmentation_event_id, 0x4800008E);
    assert!(!segmentation.segmentation_event_cancel_indicator);

    let details = segmentation.details.as_ref().unwrap();
    assert!(details.program_segmentation_flag);
    assert!(!details.segmentation_duration_flag);
    assert_eq!(details.segmentation_duration, None);
    assert_eq!(details.segmentation_upid.upid_type, SegmentationUpidType::AiringID);
    assert_eq!(details.segmentation_upid.to_display_string(), "0x000000002ca0a18a");
    assert_eq!(
        details.segmentation_type,
        SegmentationType::ProviderPlacementOpportunityEnd
    );
    assert_eq!(details.segment_num, 2);
    assert_eq!(details.segments_expected, 0);
    assert_eq!(details.sub_segment_num, None);
}

#[test]
fn test_real_payload_with_bad_crc() {
    assert_eq!(
        decode(BAD_CRC),
        Err(DecodeError::CrcMismatch {
            expected: 0x59139BE0,
            computed: 0x5B7A57D8,
        })
    );
}

#[test]
fn test_single_bit_flip_fails_crc() {
    let original = BASE64.decode(SPLICE_INSERT.as_bytes()).unwrap();
    // The first 3 bytes are covered by table id and length checks.
    for byte in 3..original.len() {
        for bit in 0..8 {
            let mut corrupted = original.clone();
            corrupted[byte] ^= 1 << bit;
            assert!(
                matches!(
                    parse_splice_info_section(&corrupted),
                    Err(DecodeError::CrcMismatch { .. })
                ),
                "flipping bit {bit} of byte {byte} was not detected"
            );
        }
    }
}

#[test]
fn test_decoding_is_idempotent() {
    let raw = RawSection::new(BASE64.decode(SEGMENTATION_AIRING_ID.as_bytes()).unwrap());
    assert_eq!(raw.decode().unwrap(), raw.decode().unwrap());
}

#[test]
fn test_time_signal_without_time() {
    let buffer = clear_section(0x06, &[0x7F], &[]);
    let section = parse_splice_info_section(&buffer).unwrap();

    assert_eq!(
        section.splice_command,
        SpliceCommand::TimeSignal(TimeSignal {
            splice_time: SpliceTime::NoTimeSpecified,
        })
    );
    assert_eq!(section.command_pts(), None);
}

#[test]
fn test_unknown_descriptor_tag_is_preserved() {
    let descriptors = [
        0xEE, 0x06, 0x43, 0x55, 0x45, 0x49, 0xAB, 0xCD, // unassigned tag
        0x00, 0x08, 0x43, 0x55, 0x45, 0x49, 0x00, 0x00, 0x00, 0x07, // avail
    ];
    let buffer = clear_section(0x00, &[], &descriptors);
    let section = parse_splice_info_section(&buffer).unwrap();

    assert_eq!(section.descriptors.len(), 2);
    assert_eq!(section.descriptors[0].descriptor_tag, 0xEE);
    assert_eq!(
        section.descriptors[0].payload,
        DescriptorPayload::Unknown {
            data: vec![0x43, 0x55, 0x45, 0x49, 0xAB, 0xCD],
        }
    );
    assert!(matches!(
        section.descriptors[1].payload,
        DescriptorPayload::Avail(AvailDescriptor {
            provider_avail_id: 7,
            ..
        })
    ));
}

#[test]
fn test_descriptor_overrunning_loop() {
    // descriptor_length says 10, the loop only holds 8 more bytes
    let descriptors = [0x00, 0x0A, 0x43, 0x55, 0x45, 0x49, 0x00, 0x00, 0x00, 0x07];
    let buffer = clear_section(0x00, &[], &descriptors);

    assert!(matches!(
        parse_splice_info_section(&buffer),
        Err(DecodeError::DescriptorLengthMismatch { declared: 10, .. })
    ));
}

#[test]
fn test_known_descriptor_too_short() {
    // avail descriptor cut after its identifier
    let descriptors = [0x00, 0x04, 0x43, 0x55, 0x45, 0x49];
    let buffer = clear_section(0x00, &[], &descriptors);

    assert!(matches!(
        parse_splice_info_section(&buffer),
        Err(DecodeError::DescriptorLengthMismatch { .. })
    ));
}

#[test]
fn test_encrypted_section() {
    let body = [
        0x00, // protocol_version
        0x82, 0x00, 0x00, 0x00, 0x00, // encrypted, DES-ECB, pts_adjustment 0
        0x05, // cw_index
        0xFF, 0xF0, 0x05, // tier, command length 5
        0x06, // splice_command_type
        0xDE, 0xAD, 0xBE, 0xEF, 0x01, // ciphertext command
        0x00, 0x00, // ciphertext descriptor loop
        0x11, 0x22, 0x33, 0x44, // E_CRC_32
    ];
    let section = parse_splice_info_section(&build_section(&body)).unwrap();

    assert!(section.encrypted_packet);
    assert_eq!(section.encryption_algorithm, Some(EncryptionAlgorithm::DesEcb));
    assert_eq!(section.cw_index, 5);
    assert_eq!(
        section.splice_command,
        SpliceCommand::Encrypted {
            data: vec![0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x00, 0x00],
        }
    );
    assert!(section.descriptors.is_empty());
    assert_eq!(section.e_crc_32, Some(0x11223344));
}

#[test]
fn test_round_trip_of_hand_built_insert() {
    let command = [
        0x00, 0x00, 0x30, 0x39, // splice_event_id 12345
        0x7F, // not cancelled
        0x0F, // out_of_network 0, component mode, no duration, not immediate
        0x02, // component_count
        0x10, 0xFE, 0x00, 0x00, 0x03, 0xE8, // component 0x10 at pts 1000
        0x11, 0x7F, // component 0x11 without time
        0x12, 0x34, // unique_program_id
        0x01, 0x02, // avail_num, avails_expected
    ];
    let mut body = vec![
        0x00, // protocol_version
        0x01, 0x00, 0x00, 0x00, 0x00, // pts_adjustment = 2^32
        0x2A, // cw_index
        0x12, 0x30, command.len() as u8, // tier 0x123
        0x05,
    ];
    body.extend_from_slice(&command);
    body.extend_from_slice(&[0x00, 0x00]);
    let buffer = build_section(&body);
    let section = parse_splice_info_section(&buffer).unwrap();

    assert_eq!(section.pts_adjustment, 1 << 32);
    assert_eq!(section.cw_index, 0x2A);
    assert_eq!(section.tier, 0x123);
    assert_eq!(
        section.splice_command,
        SpliceCommand::Insert(SpliceInsert {
            splice_event_id: 12345,
            splice_event_cancel_indicator: false,
            event: Some(InsertEvent {
                out_of_network_indicator: false,
                program_splice_flag: false,
                duration_flag: false,
                splice_immediate_flag: false,
                splice_time: None,
                components: vec![
                    InsertComponent {
                        component_tag: 0x10,
                        splice_time: Some(SpliceTime::TimeSpecified { pts_time: 1000 }),
                    },
                    InsertComponent {
                        component_tag: 0x11,
                        splice_time: Some(SpliceTime::NoTimeSpecified),
                    },
                ],
                break_duration: None,
                unique_program_id: 0x1234,
                avail_num: 1,
                avails_expected: 2,
            }),
        })
    );
    assert_eq!(section.section_length as usize + 3, buffer.len());
}

#[test]
fn test_unknown_command_type_is_kept() {
    let buffer = clear_section(0x42, &[0x01, 0x02, 0x03], &[]);
    let section = parse_splice_info_section(&buffer).unwrap();

    assert_eq!(
        section.splice_command,
        SpliceCommand::Unknown {
            command_type: 0x42,
            data: vec![0x01, 0x02, 0x03],
        }
    );
}

#[test]
fn test_bandwidth_reservation() {
    let buffer = clear_section(0x07, &[], &[]);
    let section = parse_splice_info_section(&buffer).unwrap();
    assert_eq!(section.splice_command, SpliceCommand::BandwidthReservation);
}

#[test]
fn test_truncated_buffer_is_length_mismatch() {
    let buffer = BASE64.decode(TIME_SIGNAL.as_bytes()).unwrap();
    assert_eq!(
        parse_splice_info_section(&buffer[..20]),
        Err(DecodeError::LengthMismatch {
            declared: 25,
            actual: 20,
        })
    );
}

#[test]
fn test_extract_then_decode_every_encoding() {
    let bytes = BASE64.decode(TIME_SIGNAL.as_bytes()).unwrap();
    let hex = data_encoding::HEXUPPER.encode(&bytes);

    for input in [
        Input::Base64(TIME_SIGNAL.to_string()),
        Input::Hex(hex),
        Input::Binary(bytes.clone()),
    ] {
        let extraction = extract(input, &DemuxConfig::default()).unwrap();
        assert_eq!(extraction.sections.len(), 1);
        assert_eq!(extraction.sections[0].section.as_bytes(), bytes.as_slice());
        assert!(extraction.sections[0].section.decode().is_ok());
    }
}

#[test]
fn test_binary_section_with_sync_like_bytes() {
    let mut command = b"TEST".to_vec();
    command.extend((0..298).map(|i| i as u8 & 0x3F));
    // 0x47 at section offsets 30 and 218, one packet length apart
    command[16] = 0x47;
    command[204] = 0x47;
    let section = clear_section(0xFF, &command, &[]);
    assert_eq!(section.len(), 322);
    assert_eq!(section[30], 0x47);
    assert_eq!(section[30 + 188], 0x47);

    assert_eq!(InputFormat::detect(&section), InputFormat::Binary);

    let input = Input::from_bytes(section.clone(), InputFormat::Auto).unwrap();
    let extraction = extract(input, &DemuxConfig::default()).unwrap();
    assert_eq!(extraction.sections.len(), 1);
    assert_eq!(extraction.sections[0].section.as_bytes(), section.as_slice());

    let decoded = extraction.sections[0].section.decode().unwrap();
    let SpliceCommand::Private(private) = decoded.splice_command else {
        panic!("expected a private command");
    };
    assert_eq!(private.private_bytes.len(), 298);
}
