use super::*;
use crate::{MseedWriter, PackSettings};

use giga_mseed_core::time::parse_nstime;
use giga_mseed_core::{MseedSettings, TraceList};
use giga_mseed_in::read_trace_list;

const SID: &str = "FDSN:IU_ANMO_00_B_H_Z";

#[test]
fn contiguous_records_assemble_into_one_segment() {
    let first = int_record(SID, "2024-01-01T00:00:00", 40.0, (0..1000).collect());
    let second = int_record(SID, "2024-01-01T00:00:25", 40.0, (1000..2000).collect());

    let dir = tempfile::tempdir().expect("Couldn't get tempfile.");
    let path = temp_path(&dir, "merge.mseed");
    let mut writer = MseedWriter::create_file(&path, PackSettings::default()).unwrap();
    writer.write_record(&first).unwrap();
    writer.write_record(&second).unwrap();

    let list = read_trace_list(&path, MseedSettings::default(), None).unwrap();
    assert_eq!(list.trace_count(), 1);
    let trace = list.get_trace(SID, 0).unwrap();
    assert_eq!(trace.segment_count(), 1);
    let segment = trace.segments().next().unwrap();
    assert_eq!(segment.sample_count(), 2000);
    assert_eq!(
        segment.start_time,
        parse_nstime("2024-01-01T00:00:00").unwrap()
    );
    // 50 seconds of data minus one 25 ms sample period.
    assert_eq!(
        segment.end_time,
        parse_nstime("2024-01-01T00:00:49.975").unwrap()
    );
}

#[test]
fn a_gap_splits_the_trace() {
    let first = int_record(SID, "2024-01-01T00:00:00", 40.0, (0..1000).collect());
    let late = int_record(SID, "2024-01-01T00:00:26", 40.0, (1000..2000).collect());

    let dir = tempfile::tempdir().expect("Couldn't get tempfile.");
    let path = temp_path(&dir, "gap.mseed");
    let mut writer = MseedWriter::create_file(&path, PackSettings::default()).unwrap();
    writer.write_record(&first).unwrap();
    writer.write_record(&late).unwrap();

    let list = read_trace_list(&path, MseedSettings::default(), None).unwrap();
    let trace = list.get_trace(SID, 0).unwrap();
    assert_eq!(trace.segment_count(), 2);
    let segments: Vec<_> = trace.segments().collect();
    // The gap is a full second where one sample period was expected.
    assert_eq!(
        segments[1].start_time - segments[0].end_time,
        1_000_000_000
    );
}

#[test]
fn trace_list_writes_back_out() {
    let mut list = TraceList::new(MseedSettings::default());
    list.insert(&int_record(SID, "2024-01-01T00:00:00", 40.0, wiggle(2000)))
        .unwrap();
    list.insert(&int_record(
        "FDSN:GE_WLF__B_H_N",
        "2024-01-01T00:00:00",
        20.0,
        wiggle(500),
    ))
    .unwrap();

    let dir = tempfile::tempdir().expect("Couldn't get tempfile.");
    let path = temp_path(&dir, "list.mseed");
    let mut writer = MseedWriter::create_file(&path, PackSettings::default()).unwrap();
    let written = writer.write_trace_list(&list).unwrap();
    assert!(written >= 2);
    writer.flush().unwrap();

    let read_back = read_trace_list(&path, MseedSettings::default(), None).unwrap();
    assert_eq!(read_back.trace_count(), 2);
    for (original, round_tripped) in list.traces().zip(read_back.traces()) {
        assert_eq!(original.sid, round_tripped.sid);
        assert_eq!(original.segment_count(), round_tripped.segment_count());
        for (a, b) in original.segments().zip(round_tripped.segments()) {
            assert_eq!(a.start_time, b.start_time);
            assert_eq!(a.sample_count(), b.sample_count());
            assert_eq!(a.samples(), b.samples());
        }
    }
    let listing = read_back.listing();
    assert!(listing.contains(SID));
    assert!(listing.contains("FDSN:GE_WLF__B_H_N"));
}

#[test]
fn idempotent_merge_through_the_full_pipeline() {
    let record = int_record(SID, "2024-01-01T00:00:00", 40.0, wiggle(100));

    let dir = tempfile::tempdir().expect("Couldn't get tempfile.");
    let path = temp_path(&dir, "dupes.mseed");
    let mut writer = MseedWriter::create_file(&path, PackSettings::default()).unwrap();
    writer.write_record(&record).unwrap();
    writer.write_record(&record).unwrap();

    let list = read_trace_list(&path, MseedSettings::default(), None).unwrap();
    let trace = list.get_trace(SID, 0).unwrap();
    assert_eq!(trace.segment_count(), 1);
    assert_eq!(trace.total_sample_count(), 100);
}
