// Copyright (C) 2022 by GiGa infosystems.
//! Here we write and read records, to test that `giga_mseed_in` and
//! `giga_mseed_out` are compatible.
use giga_mseed_core::time::parse_nstime;
use giga_mseed_core::{MseedRecord, SampleBuffer};

mod record_roundtrip;
mod trace_roundtrip;

/// A deterministic sample series with the small steps and occasional jumps of
/// real digitizer output.
pub(crate) fn wiggle(n: usize) -> Vec<i32> {
    let mut state = 0x9E37_79B9u32;
    let mut value = 0i32;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let step = match i % 11 {
            0 => (state % 40_000) as i32 - 20_000,
            1..=4 => (state % 31) as i32 - 15,
            _ => (state % 201) as i32 - 100,
        };
        value = value.wrapping_add(step);
        out.push(value);
    }
    out
}

pub(crate) fn int_record(sid: &str, start: &str, rate: f64, samples: Vec<i32>) -> MseedRecord {
    MseedRecord::new(
        sid,
        parse_nstime(start).unwrap(),
        rate,
        SampleBuffer::Int32(samples),
    )
}

pub(crate) fn temp_path(dir: &tempfile::TempDir, name: &str) -> String {
    dir.path().join(name).to_str().unwrap().to_string()
}
