//! This submodule exists to map the input file as a "memory map" so records can
//! be framed and parsed without reading the whole file into owned memory first.
use giga_mseed_core::errors::*;
use giga_mseed_core::MIN_RECORD_LEN;

use memmap2::{Mmap, MmapOptions};

/// A memory map with the underlying file handle that keeps it alive.
pub struct MappedMseed {
    pub(crate) map: Mmap,
    _file: std::fs::File,
}

impl MappedMseed {
    /// Map the file at `file_name`, rejecting files too short to hold any record.
    pub(crate) fn new(file_name: &str) -> Result<MappedMseed, MseedError> {
        let file = std::fs::File::open(file_name)?;
        // NB: Mapping a file that another process truncates afterwards is
        // undefined behaviour on most platforms; data files are expected to be
        // quiescent while being read.
        let map = unsafe { MmapOptions::new().map(&file)? };

        if map.len() < MIN_RECORD_LEN {
            return Err(MseedError::NotMiniseed);
        }
        Ok(MappedMseed { map, _file: file })
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.map
    }
}
