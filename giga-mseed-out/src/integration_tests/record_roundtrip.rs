use super::*;
use crate::{pack_records, MseedWriter, PackSettings};

use giga_mseed_core::crc::crc32c;
use giga_mseed_core::enums::{ByteOrder, DataEncoding};
use giga_mseed_core::time::parse_nstime;
use giga_mseed_core::{MseedError, MseedSettings, SampleBuffer, CRC_OFFSET_V3};
use giga_mseed_in::MseedReader;

const SID: &str = "FDSN:IU_ANMO_00_B_H_Z";

#[test]
fn v3_steim2_splits_and_round_trips() {
    let samples = wiggle(5000);
    let record = int_record(SID, "2024-01-01T00:00:00", 40.0, samples.clone());

    let mut settings = PackSettings::default();
    settings.set_max_record_length(512).unwrap();

    let dir = tempfile::tempdir().expect("Couldn't get tempfile.");
    let path = temp_path(&dir, "steim2.mseed");
    let mut writer = MseedWriter::create_file(&path, settings).unwrap();
    let written = writer.write_record(&record).unwrap();
    assert!(written > 1, "5000 samples must not fit one 512-byte record");
    assert_eq!(writer.records_written, written);
    assert_eq!(writer.record_count_for(SID), written);

    let mut reader = MseedReader::open(&path, MseedSettings::default()).unwrap();
    let mut collected: Vec<i32> = Vec::new();
    let mut count = 0;
    while let Some(rec) = reader.next_record().unwrap() {
        assert_eq!(rec.format_version, 3);
        assert_eq!(rec.encoding, DataEncoding::Steim2);
        assert!(rec.record_length <= 512);
        collected.extend_from_slice(rec.samples.as_ref().unwrap().as_i32().unwrap());
        count += 1;
    }
    assert_eq!(count, written);
    assert_eq!(collected, samples);
}

#[test]
fn chunked_records_are_time_contiguous() {
    let record = int_record(SID, "2024-01-01T00:00:00", 40.0, wiggle(3000));
    let mut settings = PackSettings::default();
    settings.set_max_record_length(256).unwrap();

    let dir = tempfile::tempdir().expect("Couldn't get tempfile.");
    let path = temp_path(&dir, "chunks.mseed");
    let mut writer = MseedWriter::create_file(&path, settings).unwrap();
    writer.write_record(&record).unwrap();

    let mut reader = MseedReader::open(&path, MseedSettings::default()).unwrap();
    let mut previous: Option<(i64, i64)> = None; // (end time, period)
    while let Some(rec) = reader.next_record().unwrap() {
        if let Some((end, period)) = previous {
            assert_eq!(rec.start_time, end + period);
        }
        previous = Some((rec.end_time(), rec.sample_period_ns()));
    }
}

#[test]
fn v3_crc_rewrite_property() {
    let record = int_record(SID, "2024-01-01T00:00:00", 40.0, wiggle(100));
    let (mut bytes, count) = pack_records(&record, &PackSettings::default()).unwrap();
    assert_eq!(count, 1);

    let dir = tempfile::tempdir().expect("Couldn't get tempfile.");
    let settings = MseedSettings::default();

    // As written, the record parses.
    let path = temp_path(&dir, "ok.mseed");
    std::fs::write(&path, &bytes).unwrap();
    let mut reader = MseedReader::open(&path, settings.clone()).unwrap();
    assert!(reader.next_record().unwrap().is_some());

    // One flipped payload byte fails the CRC.
    let last = bytes.len() - 1;
    bytes[last] ^= 0x10;
    let mut strict = settings.clone();
    strict.set_strict(true);
    let path = temp_path(&dir, "bad.mseed");
    std::fs::write(&path, &bytes).unwrap();
    let mut reader = MseedReader::open(&path, strict).unwrap();
    assert!(matches!(
        reader.next_record(),
        Err(MseedError::BadCrc { .. })
    ));

    // Recomputing over the record with a zeroed CRC field and writing the
    // result back makes it parse again.
    bytes[CRC_OFFSET_V3..CRC_OFFSET_V3 + 4].copy_from_slice(&[0; 4]);
    let crc = crc32c(&bytes, 0);
    bytes[CRC_OFFSET_V3..CRC_OFFSET_V3 + 4].copy_from_slice(&crc.to_le_bytes());
    let path = temp_path(&dir, "fixed.mseed");
    std::fs::write(&path, &bytes).unwrap();
    let mut reader = MseedReader::open(&path, settings).unwrap();
    let rec = reader.next_record().unwrap().unwrap();
    assert_eq!(rec.crc, crc);
}

#[test]
fn v2_round_trips_in_both_byte_orders() {
    let samples = wiggle(600);
    let mut parsed = Vec::new();
    for &byte_order in &[ByteOrder::Big, ByteOrder::Little] {
        let record = int_record(SID, "2024-01-01T06:30:00", 40.0, samples.clone());
        let mut settings = PackSettings::default();
        settings.set_format_version(2).unwrap();
        settings.set_max_record_length(512).unwrap();
        settings.set_byte_order(byte_order);

        let dir = tempfile::tempdir().expect("Couldn't get tempfile.");
        let path = temp_path(&dir, "v2.mseed");
        let mut writer = MseedWriter::create_file(&path, settings).unwrap();
        writer.write_record(&record).unwrap();

        let mut collected: Vec<i32> = Vec::new();
        let mut reader = MseedReader::open(&path, MseedSettings::default()).unwrap();
        let mut first_start = None;
        while let Some(rec) = reader.next_record().unwrap() {
            assert_eq!(rec.format_version, 2);
            assert_eq!(rec.byte_order, byte_order);
            assert_eq!(rec.record_length, 512);
            assert_eq!(rec.publication_version, 1);
            if first_start.is_none() {
                first_start = Some(rec.start_time);
            }
            collected.extend_from_slice(rec.samples.as_ref().unwrap().as_i32().unwrap());
        }
        assert_eq!(collected, samples);
        assert_eq!(
            first_start.unwrap(),
            parse_nstime("2024-01-01T06:30:00").unwrap()
        );
        parsed.push(collected);
    }
    // Byte order leaves the decoded content untouched.
    assert_eq!(parsed[0], parsed[1]);
}

#[test]
fn v2_microseconds_survive_through_blockette_1001() {
    use giga_mseed_core::cbor::CborItem;

    let mut record = int_record(SID, "2024-01-01T00:00:00.000050", 40.0, wiggle(10));
    record
        .extra_headers
        .set("FDSN/Time/Quality", CborItem::UInt(90))
        .unwrap();
    let mut settings = PackSettings::default();
    settings.set_format_version(2).unwrap();
    settings.set_max_record_length(256).unwrap();

    let dir = tempfile::tempdir().expect("Couldn't get tempfile.");
    let path = temp_path(&dir, "b1001.mseed");
    let mut writer = MseedWriter::create_file(&path, settings).unwrap();
    writer.write_record(&record).unwrap();

    let mut reader = MseedReader::open(&path, MseedSettings::default()).unwrap();
    let rec = reader.next_record().unwrap().unwrap();
    assert_eq!(
        rec.start_time,
        parse_nstime("2024-01-01T00:00:00.000050").unwrap()
    );
    assert_eq!(
        rec.extra_headers.fetch("FDSN/Time/Quality").unwrap(),
        CborItem::UInt(90)
    );
}

#[test]
fn float_and_text_records_round_trip() {
    let values: Vec<f64> = (0..500).map(|i| (i as f64) * 0.125 - 31.25).collect();
    let record = MseedRecord::new(
        SID,
        parse_nstime("2024-01-01T00:00:00").unwrap(),
        1.0,
        SampleBuffer::Float64(values.clone()),
    );
    let log_record = MseedRecord::new(
        "FDSN:IU_ANMO_00_L_O_G",
        parse_nstime("2024-01-01T00:00:00").unwrap(),
        0.0,
        SampleBuffer::Text(b"state of health: nominal\n".to_vec()),
    );

    let dir = tempfile::tempdir().expect("Couldn't get tempfile.");
    let path = temp_path(&dir, "mixed.mseed");
    let mut writer = MseedWriter::create_file(&path, PackSettings::default()).unwrap();
    writer.write_record(&record).unwrap();
    writer.write_record(&log_record).unwrap();

    let mut reader = MseedReader::open(&path, MseedSettings::default()).unwrap();
    let doubles = reader.next_record().unwrap().unwrap();
    assert_eq!(doubles.encoding, DataEncoding::Float64);
    assert_eq!(doubles.samples.as_ref().unwrap().as_f64().unwrap(), &values[..]);
    let text = reader.next_record().unwrap().unwrap();
    assert_eq!(text.encoding, DataEncoding::Text);
    assert_eq!(
        text.samples.as_ref().unwrap().as_text().unwrap(),
        b"state of health: nominal\n"
    );
}

#[test]
fn pinned_encoding_overrides_default() {
    let record = int_record(SID, "2024-01-01T00:00:00", 40.0, wiggle(50));
    let mut settings = PackSettings::default();
    settings.set_encoding(DataEncoding::Int32);
    let (bytes, count) = pack_records(&record, &settings).unwrap();
    assert_eq!(count, 1);

    let dir = tempfile::tempdir().expect("Couldn't get tempfile.");
    let path = temp_path(&dir, "pinned.mseed");
    std::fs::write(&path, &bytes).unwrap();
    let mut reader = MseedReader::open(&path, MseedSettings::default()).unwrap();
    let rec = reader.next_record().unwrap().unwrap();
    assert_eq!(rec.encoding, DataEncoding::Int32);
    assert_eq!(
        rec.samples.as_ref().unwrap().as_i32().unwrap(),
        record.samples.as_ref().unwrap().as_i32().unwrap()
    );
}

#[test]
fn packing_without_samples_fails() {
    let mut record = int_record(SID, "2024-01-01T00:00:00", 40.0, vec![1]);
    record.samples = None;
    assert!(pack_records(&record, &PackSettings::default()).is_err());
}

#[test]
fn encoding_and_sample_type_must_agree() {
    let record = MseedRecord::new(
        SID,
        0,
        1.0,
        SampleBuffer::Float32(vec![1.0, 2.0]),
    );
    let mut settings = PackSettings::default();
    settings.set_encoding(DataEncoding::Steim2);
    assert!(matches!(
        pack_records(&record, &settings),
        Err(MseedError::EncodingMismatch { .. })
    ));
}
