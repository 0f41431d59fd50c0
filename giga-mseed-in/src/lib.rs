//! This is a simplified library for reading miniSEED data into rust. It frames,
//! validates and parses version 2.4 and 3.0 records from memory-mapped files
//! without holding more than one decoded record in memory at a time.
//!
//! The library was designed to follow the FDSN miniSEED 2.4 and 3.0
//! specifications.
//!
//! Reading is chained: [`MseedReader`] yields records in file order, skipping
//! non-record bytes until a valid header turns up, and stops cleanly at the end
//! of the file. Records can be collected into a gap-aware
//! [`giga_mseed_core::TraceList`] with [`read_trace_list`].
extern crate log;
extern crate memmap2;
extern crate num;

pub mod detect;
pub mod memory_map;
pub mod parse_v2;
pub mod parse_v3;
pub mod read_selections;
#[cfg(test)]
mod tests;

use log::warn;

use memory_map::MappedMseed;

pub use detect::{detect, RecordDetection};
pub use read_selections::read_selection_file;

pub use giga_mseed_core::enums;
pub use giga_mseed_core::errors::*;
pub use giga_mseed_core::{
    MseedRecord, MseedSettings, SampleBuffer, SelectTime, Selection, Selections, TraceList,
};

/// A stateful reader that consumes records from a file in order.
///
/// ```no_run
/// use giga_mseed_in::MseedReader;
///
/// let mut reader = MseedReader::open("archive.mseed", Default::default()).unwrap();
/// while let Some(record) = reader.next_record().unwrap() {
///     println!("{}", record);
/// }
/// ```
pub struct MseedReader {
    data: MappedMseed,
    offset: usize,
    settings: MseedSettings,
    selections: Option<Selections>,
    records_found: usize,
}

impl MseedReader {
    /// Open a file for chained record reading with the given settings.
    ///
    /// A `file://` prefix is accepted and stripped. Any other scheme would
    /// need the HTTP range-request backend, which this crate does not carry,
    /// and is rejected up front.
    pub fn open(file_name: &str, settings: MseedSettings) -> Result<Self, MseedError> {
        let file_name = match file_name.strip_prefix("file://") {
            Some(path) => path,
            None if file_name.contains("://") => {
                return Err(MseedError::Unsupported {
                    msg: format!("cannot read from URL '{}' without an HTTP backend", file_name),
                });
            }
            None => file_name,
        };
        let data = MappedMseed::new(file_name)?;
        Ok(MseedReader {
            data,
            offset: 0,
            settings,
            selections: None,
            records_found: 0,
        })
    }

    /// As [`Self::open`], additionally dropping records that match none of the
    /// selections.
    pub fn open_with_selections(
        file_name: &str,
        settings: MseedSettings,
        selections: Selections,
    ) -> Result<Self, MseedError> {
        let mut reader = Self::open(file_name, settings)?;
        reader.selections = Some(selections);
        Ok(reader)
    }

    /// The current byte offset into the file.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// How many records have been returned so far.
    pub fn records_found(&self) -> usize {
        self.records_found
    }

    /// The next record in file order, or `Ok(None)` at the end of the file.
    ///
    /// Bytes that do not start a valid record are skipped (with a warning once
    /// per contiguous run) unless the `strict` setting is on, in which case the
    /// first damaged record fails the read. A file in which nothing ever
    /// parses yields [`MseedError::NotMiniseed`].
    pub fn next_record(&mut self) -> Result<Option<MseedRecord>, MseedError> {
        let mut skipped = 0usize;
        loop {
            let buf = self.data.bytes();
            if self.offset >= buf.len() {
                if skipped > 0 {
                    warn!("skipped {} trailing bytes", skipped);
                }
                return if self.records_found == 0 {
                    Err(MseedError::NotMiniseed)
                } else {
                    Ok(None)
                };
            }
            let window = &buf[self.offset..];
            let detection = match detect::detect(window) {
                Some(d) => d,
                None => {
                    if self.settings.get_strict() && self.records_found > 0 {
                        return Err(MseedError::NotMiniseed);
                    }
                    self.offset += 1;
                    skipped += 1;
                    continue;
                }
            };
            if skipped > 0 {
                warn!(
                    "skipped {} non-record bytes before offset {}",
                    skipped, self.offset
                );
                skipped = 0;
            }

            let parsed = match detection.format_version {
                3 => parse_v3::parse_v3(window, &self.settings),
                _ => parse_v2::parse_v2(window, detection.byte_order, &self.settings),
            };
            match parsed {
                Ok(record) => {
                    self.offset += record.record_length;
                    self.records_found += 1;
                    if let Some(ref selections) = self.selections {
                        if !selections.matches(
                            &record.sid,
                            record.start_time,
                            record.end_time(),
                            record.publication_version,
                        ) {
                            continue;
                        }
                    }
                    return Ok(Some(record));
                }
                Err(e) => {
                    if self.settings.get_strict() {
                        return Err(e);
                    }
                    warn!("skipping unreadable record at offset {}: {}", self.offset, e);
                    self.offset += 1;
                    skipped += 1;
                }
            }
        }
    }

    /// Iterate over the remaining records.
    pub fn records(&mut self) -> Records {
        Records { reader: self }
    }
}

/// Iterator adapter over [`MseedReader::next_record`].
pub struct Records<'a> {
    reader: &'a mut MseedReader,
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<MseedRecord, MseedError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_record().transpose()
    }
}

/// Read a whole file into a trace list, optionally filtered by selections.
///
/// Records that match no selection are dropped before insertion; everything
/// else is merged into gap-aware segments under the given settings.
pub fn read_trace_list(
    file_name: &str,
    settings: MseedSettings,
    selections: Option<Selections>,
) -> Result<TraceList, MseedError> {
    let mut list = TraceList::new(settings.clone());
    let mut reader = match selections {
        Some(selections) => MseedReader::open_with_selections(file_name, settings, selections)?,
        None => MseedReader::open(file_name, settings)?,
    };
    while let Some(record) = reader.next_record()? {
        list.insert(&record)?;
    }
    Ok(list)
}
