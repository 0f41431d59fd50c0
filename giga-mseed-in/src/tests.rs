use giga_mseed_core::crc::crc32c;
use giga_mseed_core::enums::ByteOrder;
use giga_mseed_core::time::nstime_from_yday;
use giga_mseed_core::CRC_OFFSET_V3;

/// Build a v3 record with the given content and a correct CRC.
fn build_v3(
    sid: &str,
    encoding: u8,
    sample_rate: f64,
    sample_count: u32,
    start: (u16, u16, u8, u8, u8, u32),
    publication_version: u8,
    extra: &[u8],
    payload: &[u8],
) -> Vec<u8> {
    let (year, day, hour, minute, second, nanosecond) = start;
    let mut buf = Vec::new();
    buf.extend_from_slice(b"MS");
    buf.push(3);
    buf.push(0); // flags
    buf.extend_from_slice(&nanosecond.to_le_bytes());
    buf.extend_from_slice(&year.to_le_bytes());
    buf.extend_from_slice(&day.to_le_bytes());
    buf.push(hour);
    buf.push(minute);
    buf.push(second);
    buf.push(encoding);
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&sample_count.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // CRC, patched below
    buf.push(publication_version);
    buf.push(sid.len() as u8);
    buf.extend_from_slice(&(extra.len() as u16).to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(sid.as_bytes());
    buf.extend_from_slice(extra);
    buf.extend_from_slice(payload);

    let crc = crc32c(&buf, 0);
    buf[CRC_OFFSET_V3..CRC_OFFSET_V3 + 4].copy_from_slice(&crc.to_le_bytes());
    buf
}

struct V2Options {
    quality: u8,
    byte_order: ByteOrder,
    start: (u16, u16, u8, u8, u8, u16),
    sample_count: u16,
    samprate_fact: i16,
    samprate_mult: i16,
    act_flags: u8,
    time_correction: i32,
    encoding: u8,
    reclen_exp: u8,
    with_b1001: bool,
    timing_quality: u8,
    usec_offset: i8,
    with_b100: Option<f32>,
}

impl Default for V2Options {
    fn default() -> Self {
        V2Options {
            quality: b'D',
            byte_order: ByteOrder::Big,
            start: (2024, 1, 0, 0, 0, 0),
            sample_count: 0,
            samprate_fact: 40,
            samprate_mult: 1,
            act_flags: 0,
            time_correction: 0,
            encoding: 1, // INT16
            reclen_exp: 8,
            with_b1001: false,
            timing_quality: 0,
            usec_offset: 0,
            with_b100: None,
        }
    }
}

/// Build a v2 record for `IU ANMO 00 BHZ` with blockette 1000 and optionally
/// blockettes 1001 and 100.
fn build_v2(opts: &V2Options, payload: &[u8]) -> Vec<u8> {
    let le = opts.byte_order.is_le();
    let u16_to = if le { u16::to_le_bytes } else { u16::to_be_bytes };
    let i16_to = if le { i16::to_le_bytes } else { i16::to_be_bytes };
    let i32_to = if le { i32::to_le_bytes } else { i32::to_be_bytes };
    let f32_to = if le { f32::to_le_bytes } else { f32::to_be_bytes };

    let reclen = 1usize << opts.reclen_exp;
    let mut buf = Vec::with_capacity(reclen);
    buf.extend_from_slice(b"000001");
    buf.push(opts.quality);
    buf.push(b' ');
    buf.extend_from_slice(b"ANMO "); // station
    buf.extend_from_slice(b"00"); // location
    buf.extend_from_slice(b"BHZ"); // channel
    buf.extend_from_slice(b"IU"); // network
    let (year, day, hour, minute, second, fract) = opts.start;
    buf.extend_from_slice(&u16_to(year));
    buf.extend_from_slice(&u16_to(day));
    buf.push(hour);
    buf.push(minute);
    buf.push(second);
    buf.push(0);
    buf.extend_from_slice(&u16_to(fract));
    buf.extend_from_slice(&u16_to(opts.sample_count));
    buf.extend_from_slice(&i16_to(opts.samprate_fact));
    buf.extend_from_slice(&i16_to(opts.samprate_mult));
    buf.push(opts.act_flags);
    buf.push(0); // io flags
    buf.push(0); // quality flags
    let mut blockette_count = 1u8;
    if opts.with_b1001 {
        blockette_count += 1;
    }
    if opts.with_b100.is_some() {
        blockette_count += 1;
    }
    buf.push(blockette_count);
    buf.extend_from_slice(&i32_to(opts.time_correction));
    buf.extend_from_slice(&u16_to(64)); // data offset
    buf.extend_from_slice(&u16_to(48)); // first blockette

    // Blockette 1000 at offset 48.
    let mut next = 0u16;
    if opts.with_b1001 || opts.with_b100.is_some() {
        next = 56;
    }
    buf.extend_from_slice(&u16_to(1000));
    buf.extend_from_slice(&u16_to(next));
    buf.push(opts.encoding);
    buf.push(if le { 0 } else { 1 });
    buf.push(opts.reclen_exp);
    buf.push(0);

    // An optional second blockette at offset 56.
    if opts.with_b1001 {
        buf.extend_from_slice(&u16_to(1001));
        buf.extend_from_slice(&u16_to(0));
        buf.push(opts.timing_quality);
        buf.push(opts.usec_offset as u8);
        buf.push(0);
        buf.push(0);
    } else if let Some(rate) = opts.with_b100 {
        buf.extend_from_slice(&u16_to(100));
        buf.extend_from_slice(&u16_to(0));
        buf.extend_from_slice(&f32_to(rate));
    }
    while buf.len() < 64 {
        buf.push(0);
    }
    buf.extend_from_slice(payload);
    buf.resize(reclen, 0);
    buf
}

fn int16_payload(samples: &[i16], byte_order: ByteOrder) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|s| {
            if byte_order.is_le() {
                s.to_le_bytes()
            } else {
                s.to_be_bytes()
            }
        })
        .collect()
}

mod detect {
    use super::*;
    use crate::detect::detect;

    #[test]
    fn v2_indicator_and_year_day() {
        // Sequence "000001", indicator 'D', space, then a year of 2000 and a
        // day of 350 in big endian at offset 20.
        let mut buf = vec![0u8; 512];
        buf[..8].copy_from_slice(&[0x30, 0x30, 0x30, 0x30, 0x30, 0x31, 0x44, 0x20]);
        buf[20..24].copy_from_slice(&[0x07, 0xD0, 0x01, 0x5E]);
        let detection = detect(&buf).unwrap();
        assert_eq!(detection.format_version, 2);
        assert_eq!(detection.byte_order, ByteOrder::Big);
        assert_eq!(detection.rec_len, None);

        // The same fields in little endian layout.
        buf[20..24].copy_from_slice(&[0xD0, 0x07, 0x5E, 0x01]);
        let detection = detect(&buf).unwrap();
        assert_eq!(detection.format_version, 2);
        assert_eq!(detection.byte_order, ByteOrder::Little);
    }

    #[test]
    fn v3_signature() {
        let rec = build_v3(
            "FDSN:XX_TEST__L_H_Z",
            3,
            1.0,
            0,
            (2024, 1, 0, 0, 0, 0),
            1,
            &[],
            &[],
        );
        let detection = detect(&rec).unwrap();
        assert_eq!(detection.format_version, 3);
        assert_eq!(detection.byte_order, ByteOrder::Little);
        assert_eq!(detection.rec_len, Some(rec.len()));
    }

    #[test]
    fn rejects_junk() {
        assert!(detect(b"this is not miniseed data at all........").is_none());
        assert!(detect(&[]).is_none());
        // A valid indicator but an impossible year.
        let mut buf = vec![0x30u8; 64];
        buf[6] = b'D';
        buf[7] = b' ';
        buf[20..24].copy_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(detect(&buf).is_none());
    }
}

mod parse_v3 {
    use super::*;
    use crate::parse_v3::parse_v3;
    use giga_mseed_core::steim::encode_steim2;
    use giga_mseed_core::{DataEncoding, MseedError, MseedSettings};

    #[test]
    fn int32_record_round_trip() {
        let samples: Vec<i32> = vec![10, -20, 30, -40];
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let rec = build_v3(
            "FDSN:IU_ANMO_00_B_H_Z",
            3,
            40.0,
            4,
            (2024, 1, 0, 0, 0, 0),
            2,
            &[],
            &payload,
        );
        let record = parse_v3(&rec, &MseedSettings::default()).unwrap();
        assert_eq!(record.format_version, 3);
        assert_eq!(&record.sid, "FDSN:IU_ANMO_00_B_H_Z");
        assert_eq!(record.publication_version, 2);
        assert_eq!(record.sample_count, 4);
        assert_eq!(record.encoding, DataEncoding::Int32);
        assert_eq!(record.sample_rate_hz(), 40.0);
        assert_eq!(record.record_length, rec.len());
        assert_eq!(
            record.start_time,
            nstime_from_yday(2024, 1, 0, 0, 0, 0).unwrap()
        );
        assert_eq!(
            record.samples.as_ref().unwrap().as_i32().unwrap(),
            &samples[..]
        );
    }

    #[test]
    fn steim2_payload_stays_big_endian() {
        let samples: Vec<i32> = (0..100).map(|i| i * 3 - 150).collect();
        let encoded = encode_steim2(&samples, 0, ByteOrder::Big).unwrap();
        let rec = build_v3(
            "FDSN:IU_ANMO_00_B_H_Z",
            11,
            40.0,
            100,
            (2024, 32, 6, 30, 0, 500),
            1,
            &[],
            &encoded.payload,
        );
        let record = parse_v3(&rec, &MseedSettings::default()).unwrap();
        assert_eq!(record.encoding, DataEncoding::Steim2);
        assert_eq!(
            record.samples.as_ref().unwrap().as_i32().unwrap(),
            &samples[..]
        );
    }

    #[test]
    fn extra_headers_are_parsed() {
        // {"FDSN": {"Time": {"Quality": 100}}}
        let extra = [
            0xA1, 0x64, b'F', b'D', b'S', b'N', 0xA1, 0x64, b'T', b'i', b'm', b'e', 0xA1, 0x67,
            b'Q', b'u', b'a', b'l', b'i', b't', b'y', 0x18, 0x64,
        ];
        let rec = build_v3(
            "FDSN:XX_TEST__L_H_Z",
            0,
            0.0,
            4,
            (2024, 1, 0, 0, 0, 0),
            1,
            &extra,
            b"log\n",
        );
        let record = parse_v3(&rec, &MseedSettings::default()).unwrap();
        assert_eq!(
            record.extra_headers.fetch("FDSN/Time/Quality").unwrap(),
            giga_mseed_core::cbor::CborItem::UInt(100)
        );
        assert_eq!(record.samples.as_ref().unwrap().as_text().unwrap(), b"log\n");
    }

    #[test]
    fn corrupt_byte_fails_crc() {
        let samples: Vec<i32> = vec![1, 2, 3, 4];
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let mut rec = build_v3(
            "FDSN:XX_TEST__B_H_Z",
            3,
            40.0,
            4,
            (2024, 1, 0, 0, 0, 0),
            1,
            &[],
            &payload,
        );
        let last = rec.len() - 1;
        rec[last] ^= 0x40;
        assert!(matches!(
            parse_v3(&rec, &MseedSettings::default()),
            Err(MseedError::BadCrc { .. })
        ));

        // With validation off the damage goes unnoticed until decode.
        let mut settings = MseedSettings::default();
        settings.set_validate_crc(false);
        assert!(parse_v3(&rec, &settings).is_ok());
    }

    #[test]
    fn truncated_record() {
        let payload = [0u8; 16];
        let rec = build_v3(
            "FDSN:XX_TEST__B_H_Z",
            3,
            40.0,
            4,
            (2024, 1, 0, 0, 0, 0),
            1,
            &[],
            &payload,
        );
        assert!(matches!(
            parse_v3(&rec[..rec.len() - 4], &MseedSettings::default()),
            Err(MseedError::Truncated { .. })
        ));
        assert!(matches!(
            parse_v3(&rec[..20], &MseedSettings::default()),
            Err(MseedError::Truncated { .. })
        ));
    }

    #[test]
    fn bad_day_of_year_is_rejected() {
        let rec = build_v3(
            "FDSN:XX_TEST__B_H_Z",
            0,
            0.0,
            0,
            (2023, 366, 0, 0, 0, 0),
            1,
            &[],
            &[],
        );
        assert!(parse_v3(&rec, &MseedSettings::default()).is_err());
    }
}

mod parse_v2 {
    use super::*;
    use crate::parse_v2::{nominal_sample_rate, parse_v2};
    use giga_mseed_core::cbor::CborItem;
    use giga_mseed_core::{DataEncoding, MseedError, MseedSettings};

    #[test]
    fn basics_big_endian() {
        let payload = int16_payload(&[1, -2, 3, -4], ByteOrder::Big);
        let rec = build_v2(
            &V2Options {
                sample_count: 4,
                ..V2Options::default()
            },
            &payload,
        );
        assert_eq!(rec.len(), 256);
        let record = parse_v2(&rec, ByteOrder::Big, &MseedSettings::default()).unwrap();
        assert_eq!(record.format_version, 2);
        assert_eq!(&record.sid, "FDSN:IU_ANMO_00_B_H_Z");
        assert_eq!(record.publication_version, 1); // quality 'D'
        assert_eq!(record.encoding, DataEncoding::Int16);
        assert_eq!(num::ToPrimitive::to_u8(&record.encoding), Some(1));
        assert_eq!(record.sample_rate_hz(), 40.0);
        assert_eq!(record.record_length, 256);
        assert_eq!(
            record.start_time,
            nstime_from_yday(2024, 1, 0, 0, 0, 0).unwrap()
        );
        assert_eq!(
            record.samples.as_ref().unwrap().as_i32().unwrap(),
            &[1, -2, 3, -4]
        );
    }

    #[test]
    fn quality_maps_to_publication_version() {
        for &(quality, version) in &[(b'D', 1u8), (b'R', 2), (b'Q', 3), (b'M', 4)] {
            let rec = build_v2(
                &V2Options {
                    quality,
                    ..V2Options::default()
                },
                &[],
            );
            let record = parse_v2(&rec, ByteOrder::Big, &MseedSettings::default()).unwrap();
            assert_eq!(record.publication_version, version);
        }
    }

    #[test]
    fn byte_order_invariance() {
        let samples = [100i16, -200, 300, -400, 500, -600];
        let mut records = Vec::new();
        for &byte_order in &[ByteOrder::Big, ByteOrder::Little] {
            let rec = build_v2(
                &V2Options {
                    byte_order,
                    sample_count: 6,
                    with_b1001: true,
                    timing_quality: 80,
                    ..V2Options::default()
                },
                &int16_payload(&samples, byte_order),
            );
            records.push(parse_v2(&rec, byte_order, &MseedSettings::default()).unwrap());
        }
        let (be, le) = (&records[0], &records[1]);
        assert_eq!(be.sid, le.sid);
        assert_eq!(be.start_time, le.start_time);
        assert_eq!(be.sample_rate, le.sample_rate);
        assert_eq!(be.sample_count, le.sample_count);
        assert_eq!(be.publication_version, le.publication_version);
        assert_eq!(be.samples, le.samples);
        assert_eq!(
            be.extra_headers.fetch("FDSN/Time/Quality").unwrap(),
            le.extra_headers.fetch("FDSN/Time/Quality").unwrap()
        );
    }

    #[test]
    fn sample_rate_sign_cases() {
        assert_eq!(nominal_sample_rate(40, 1), 40.0);
        assert_eq!(nominal_sample_rate(20, 5), 100.0);
        assert_eq!(nominal_sample_rate(20, -10), 2.0);
        assert_eq!(nominal_sample_rate(-50, 1), 0.02);
        assert_eq!(nominal_sample_rate(-10, -2), 0.05);
        assert_eq!(nominal_sample_rate(0, 1), 0.0);
    }

    #[test]
    fn blockette_100_overrides_nominal_rate() {
        let rec = build_v2(
            &V2Options {
                with_b100: Some(39.5),
                ..V2Options::default()
            },
            &[],
        );
        let record = parse_v2(&rec, ByteOrder::Big, &MseedSettings::default()).unwrap();
        assert_eq!(record.sample_rate, 39.5f32 as f64);
    }

    #[test]
    fn blockette_1001_microseconds_and_quality() {
        let rec = build_v2(
            &V2Options {
                with_b1001: true,
                timing_quality: 100,
                usec_offset: 50,
                ..V2Options::default()
            },
            &[],
        );
        let record = parse_v2(&rec, ByteOrder::Big, &MseedSettings::default()).unwrap();
        let base = nstime_from_yday(2024, 1, 0, 0, 0, 0).unwrap();
        assert_eq!(record.start_time, base + 50_000);
        assert_eq!(
            record.extra_headers.fetch("FDSN/Time/Quality").unwrap(),
            CborItem::UInt(100)
        );
    }

    #[test]
    fn time_correction_honors_applied_flag() {
        // 1 second in 0.1 ms ticks.
        let pending = build_v2(
            &V2Options {
                time_correction: 10_000,
                ..V2Options::default()
            },
            &[],
        );
        let applied = build_v2(
            &V2Options {
                time_correction: 10_000,
                act_flags: 0x02,
                ..V2Options::default()
            },
            &[],
        );
        let base = nstime_from_yday(2024, 1, 0, 0, 0, 0).unwrap();
        let record = parse_v2(&pending, ByteOrder::Big, &MseedSettings::default()).unwrap();
        assert_eq!(record.start_time, base + 1_000_000_000);
        let record = parse_v2(&applied, ByteOrder::Big, &MseedSettings::default()).unwrap();
        assert_eq!(record.start_time, base);
    }

    #[test]
    fn missing_blockette_1000_fails() {
        let mut rec = build_v2(&V2Options::default(), &[]);
        // Rewrite the blockette type to something unknown, orphaning the chain.
        rec[48..50].copy_from_slice(&4095u16.to_be_bytes());
        assert!(matches!(
            parse_v2(&rec, ByteOrder::Big, &MseedSettings::default()),
            Err(MseedError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn event_flags_land_in_extra_headers() {
        let rec = build_v2(
            &V2Options {
                act_flags: 0x04 | 0x40,
                ..V2Options::default()
            },
            &[],
        );
        let record = parse_v2(&rec, ByteOrder::Big, &MseedSettings::default()).unwrap();
        assert_eq!(
            record.extra_headers.fetch("FDSN/Event/Begin").unwrap(),
            CborItem::Bool(true)
        );
        assert_eq!(
            record.extra_headers.fetch("FDSN/Event/InProgress").unwrap(),
            CborItem::Bool(true)
        );
        assert!(record.extra_headers.fetch("FDSN/Event/End").is_err());
    }
}

mod reader {
    use super::*;
    use crate::{read_trace_list, MseedReader};
    use giga_mseed_core::{MseedError, MseedSettings};

    fn contiguous_v3_pair() -> (Vec<u8>, Vec<u8>) {
        let first_samples: Vec<i32> = (0..1000).collect();
        let second_samples: Vec<i32> = (1000..2000).collect();
        let first = build_v3(
            "FDSN:IU_ANMO_00_B_H_Z",
            3,
            40.0,
            1000,
            (2024, 1, 0, 0, 0, 0),
            1,
            &[],
            &first_samples
                .iter()
                .flat_map(|s| s.to_le_bytes())
                .collect::<Vec<u8>>(),
        );
        let second = build_v3(
            "FDSN:IU_ANMO_00_B_H_Z",
            3,
            40.0,
            1000,
            (2024, 1, 0, 0, 25, 0),
            1,
            &[],
            &second_samples
                .iter()
                .flat_map(|s| s.to_le_bytes())
                .collect::<Vec<u8>>(),
        );
        (first, second)
    }

    fn write_temp(parts: &[&[u8]]) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().expect("Couldn't get tempdir.");
        let path = dir.path().join("records.mseed");
        let mut bytes = Vec::new();
        for part in parts {
            bytes.extend_from_slice(part);
        }
        std::fs::write(&path, &bytes).unwrap();
        let name = path.to_str().unwrap().to_string();
        (dir, name)
    }

    #[test]
    fn reads_records_in_file_order() {
        let (first, second) = contiguous_v3_pair();
        let (_dir, path) = write_temp(&[&first, &second]);

        let mut reader = MseedReader::open(&path, MseedSettings::default()).unwrap();
        let a = reader.next_record().unwrap().unwrap();
        let b = reader.next_record().unwrap().unwrap();
        assert!(reader.next_record().unwrap().is_none());
        assert!(a.start_time < b.start_time);
        assert_eq!(reader.records_found(), 2);
    }

    #[test]
    fn skips_leading_and_interleaved_junk() {
        let (first, second) = contiguous_v3_pair();
        let junk = vec![b'x'; 100];
        let (_dir, path) = write_temp(&[&junk, &first, b"???", &second]);

        let mut reader = MseedReader::open(&path, MseedSettings::default()).unwrap();
        assert!(reader.next_record().unwrap().is_some());
        assert!(reader.next_record().unwrap().is_some());
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn file_scheme_is_stripped_and_urls_are_rejected() {
        let (first, second) = contiguous_v3_pair();
        let (_dir, path) = write_temp(&[&first, &second]);

        let prefixed = format!("file://{}", path);
        let mut reader = MseedReader::open(&prefixed, MseedSettings::default()).unwrap();
        assert!(reader.next_record().unwrap().is_some());

        assert!(matches!(
            MseedReader::open("http://example.org/data.mseed", MseedSettings::default()),
            Err(MseedError::Unsupported { .. })
        ));
    }

    #[test]
    fn no_records_at_all() {
        let junk = vec![b'y'; 4096];
        let (_dir, path) = write_temp(&[&junk]);
        let mut reader = MseedReader::open(&path, MseedSettings::default()).unwrap();
        assert!(matches!(
            reader.next_record(),
            Err(MseedError::NotMiniseed)
        ));
    }

    #[test]
    fn strict_mode_fails_on_damage() {
        let (first, second) = contiguous_v3_pair();
        let mut damaged = second.clone();
        damaged[100] ^= 0xFF;
        let (_dir, path) = write_temp(&[&first, &damaged]);

        let mut settings = MseedSettings::default();
        settings.set_strict(true);
        let mut reader = MseedReader::open(&path, settings).unwrap();
        assert!(reader.next_record().unwrap().is_some());
        assert!(matches!(
            reader.next_record(),
            Err(MseedError::BadCrc { .. })
        ));
    }

    #[test]
    fn lenient_mode_recovers_after_damage() {
        let (first, second) = contiguous_v3_pair();
        let mut damaged = first.clone();
        damaged[100] ^= 0xFF;
        let (_dir, path) = write_temp(&[&damaged, &second]);

        let mut reader = MseedReader::open(&path, MseedSettings::default()).unwrap();
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.start_time, nstime_from_yday(2024, 1, 0, 0, 25, 0).unwrap());
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn iterator_adapter() {
        let (first, second) = contiguous_v3_pair();
        let (_dir, path) = write_temp(&[&first, &second]);
        let mut reader = MseedReader::open(&path, MseedSettings::default()).unwrap();
        let records: Result<Vec<_>, _> = reader.records().collect();
        assert_eq!(records.unwrap().len(), 2);
    }

    #[test]
    fn trace_list_from_file() {
        let (first, second) = contiguous_v3_pair();
        let (_dir, path) = write_temp(&[&first, &second]);

        let list = read_trace_list(&path, MseedSettings::default(), None).unwrap();
        assert_eq!(list.trace_count(), 1);
        let trace = list.get_trace("FDSN:IU_ANMO_00_B_H_Z", 0).unwrap();
        assert_eq!(trace.segment_count(), 1);
        let segment = trace.segments().next().unwrap();
        assert_eq!(segment.sample_count(), 2000);
        let expected: Vec<i32> = (0..2000).collect();
        assert_eq!(segment.samples().as_i32().unwrap(), &expected[..]);
    }

    #[test]
    fn selections_filter_records() {
        use giga_mseed_core::{Selection, Selections};
        let (first, second) = contiguous_v3_pair();
        let (_dir, path) = write_temp(&[&first, &second]);

        let mut selections = Selections::new();
        selections.push(Selection::new("FDSN:GE_*", vec![], 0));
        let mut reader = MseedReader::open_with_selections(
            &path,
            MseedSettings::default(),
            selections,
        )
        .unwrap();
        assert!(reader.next_record().unwrap().is_none());
    }
}

mod selections_file {
    use crate::read_selections::read_selection_file;
    use giga_mseed_core::time::{parse_nstime, NST_UNSET};

    #[test]
    fn both_line_shapes() {
        let dir = tempfile::tempdir().expect("Couldn't get tempdir.");
        let path = dir.path().join("selections.txt");
        let content = "\
# A comment line
FDSN:IU_ANMO_00_B_H_Z 2024-01-01 2024-02-01 1

IU COLA -- BH? 2024-01-01 *
XX TEST * LHZ
";
        std::fs::write(&path, content).unwrap();
        let selections = read_selection_file(path.to_str().unwrap()).unwrap();
        assert_eq!(selections.len(), 3);

        let entries: Vec<_> = selections.iter().collect();
        assert_eq!(&entries[0].sid_pattern, "FDSN:IU_ANMO_00_B_H_Z");
        assert_eq!(entries[0].pub_version, 1);
        assert_eq!(entries[0].time_windows.len(), 1);
        assert_eq!(
            entries[0].time_windows[0].start,
            parse_nstime("2024-01-01").unwrap()
        );

        assert_eq!(&entries[1].sid_pattern, "FDSN:IU_COLA__B_H_?");
        assert_eq!(entries[1].time_windows[0].end, NST_UNSET);

        assert_eq!(&entries[2].sid_pattern, "FDSN:XX_TEST_*_L_H_Z");
        assert!(entries[2].time_windows.is_empty());
    }

    #[test]
    fn bad_lines_name_their_number() {
        let dir = tempfile::tempdir().expect("Couldn't get tempdir.");
        let path = dir.path().join("selections.txt");
        std::fs::write(&path, "FDSN:IU_* not-a-time\n").unwrap();
        let err = read_selection_file(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
