// Copyright (C) 2022 by GiGa infosystems
//! This is a simplified library for writing miniSEED records from rust. It packs
//! typed records and their decoded samples into version 2.4 or 3.0 records in a
//! record-by-record manner, splitting long sample runs across records and
//! computing the v3 CRC as the last step of each record.
//!
//! The library was designed to follow the FDSN miniSEED 2.4 and 3.0
//! specifications.
extern crate fnv;
extern crate giga_mseed_core;
extern crate log;
extern crate num;
extern crate tinyvec;
#[cfg(test)]
extern crate giga_mseed_in;
#[cfg(test)]
extern crate tempfile;

#[cfg(test)]
mod integration_tests;
pub mod pack;
pub mod pack_v2;

pub use giga_mseed_core::enums;
pub use giga_mseed_core::errors::*;
pub use giga_mseed_core::{MseedRecord, MseedSettings, SampleBuffer, TraceList};
pub use pack::{pack_records, PackSettings};

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// A handle for writing records to a file, one typed record at a time.
///
/// ```no_run
/// use giga_mseed_core::{MseedRecord, SampleBuffer};
/// use giga_mseed_out::{MseedWriter, PackSettings};
///
/// let mut writer = MseedWriter::create_file("out.mseed", PackSettings::default()).unwrap();
/// let rec = MseedRecord::new(
///     "FDSN:XX_TEST__B_H_Z",
///     0,
///     40.0,
///     SampleBuffer::Int32((0..4000).collect()),
/// );
/// // One long record is split into however many records fit the length limit.
/// let written = writer.write_record(&rec).unwrap();
/// assert!(written >= 1);
/// ```
pub struct MseedWriter {
    /// The file which the records are being written to.
    pub file: File,
    settings: PackSettings,
    /// How many records have been written in total.
    pub records_written: usize,
    /// Records written per source identifier.
    lookup: fnv::FnvHashMap<String, usize>,
}

impl MseedWriter {
    /// Create a new file and return the handle to it. Fails if the file
    /// already exists.
    pub fn create_file<T: AsRef<Path>>(
        file_name: T,
        settings: PackSettings,
    ) -> Result<Self, MseedError> {
        let file = OpenOptions::new()
            .write(true)
            .read(true)
            .create_new(true)
            .open(file_name)?;
        Ok(MseedWriter {
            file,
            settings,
            records_written: 0,
            lookup: fnv::FnvHashMap::default(),
        })
    }

    /// Pack and append one typed record, returning how many encoded records it
    /// became.
    pub fn write_record(&mut self, record: &MseedRecord) -> Result<usize, MseedError> {
        let (bytes, count) = pack::pack_records(record, &self.settings)?;
        self.file.write_all(&bytes)?;
        self.records_written += count;
        *self.lookup.entry(record.sid.clone()).or_insert(0) += count;
        Ok(count)
    }

    /// Write every segment of every trace in the list, in list order.
    ///
    /// Each segment becomes a fresh record run: the segment's own encoding is
    /// kept where it is writable, otherwise the natural encoding for the
    /// sample type takes over.
    pub fn write_trace_list(&mut self, list: &TraceList) -> Result<usize, MseedError> {
        let mut total = 0;
        for trace in list.traces() {
            for segment in trace.segments() {
                let mut record = MseedRecord::new(
                    &trace.sid,
                    segment.start_time,
                    segment.sample_rate,
                    segment.samples().clone(),
                );
                if trace.publication_version > 0 {
                    record.publication_version = trace.publication_version;
                }
                if segment.encoding().writable() {
                    record.encoding = segment.encoding();
                }
                total += self.write_record(&record)?;
            }
        }
        Ok(total)
    }

    /// How many records have been written for a given source identifier.
    pub fn record_count_for(&self, sid: &str) -> usize {
        self.lookup.get(sid).copied().unwrap_or(0)
    }

    /// Flush file buffers to the operating system.
    pub fn flush(&mut self) -> Result<(), MseedError> {
        self.file.flush()?;
        Ok(())
    }
}
