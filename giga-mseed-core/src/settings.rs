//! This module contains the [`MseedSettings`] structure which customises parsing
//! and trace assembly.
//!
//! NB: Plenty of archived miniSEED bends the rules, so the defaults are lenient:
//! the reader logs and skips what it cannot parse instead of failing, and trace
//! merging uses a tolerance derived from the sample rate. Turning on `strict`
//! or changing the tolerance changes how much of a damaged file survives, so it
//! should be done with care.
use crate::enums::OverlapPolicy;
#[cfg(any(feature = "to_json", feature = "serde"))]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Deserialize, Serialize)
)]
pub struct MseedSettings {
    /// An upper bound in nanoseconds on the gap two records may have and still
    /// be merged. `None` bounds the tolerance by half a sample period only.
    pub(crate) time_tolerance: Option<i64>,
    /// Key traces by `(sid, publication_version)` instead of `sid` alone.
    pub(crate) split_by_version: bool,
    /// What to do with records that overlap samples a segment already holds.
    pub(crate) overlap_policy: OverlapPolicy,
    /// Verify the CRC of every v3 record during parsing.
    pub(crate) validate_crc: bool,
    /// Fail on the first damaged record instead of logging and resuming at the
    /// next plausible boundary.
    pub(crate) strict: bool,
    /// Decode payloads into samples during parsing. When false, records keep
    /// their raw payload and can be decoded later.
    pub(crate) unpack_data: bool,
}

impl Default for MseedSettings {
    /// Creates the default instance: lenient reading, CRC validation on, data
    /// unpacked, traces keyed by source identifier alone.
    fn default() -> Self {
        MseedSettings {
            time_tolerance: None,
            split_by_version: false,
            overlap_policy: OverlapPolicy::KeepExisting,
            validate_crc: true,
            strict: false,
            unpack_data: true,
        }
    }
}

impl MseedSettings {
    #[cfg(feature = "to_json")]
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(&self).map_err(|e| e.to_string())
    }

    /// Set a fixed upper bound on the merge tolerance, in nanoseconds. The
    /// effective tolerance is the smaller of this and half a sample period.
    pub fn set_time_tolerance(&mut self, nanoseconds: i64) {
        self.time_tolerance = Some(nanoseconds.max(0));
    }

    /// Remove the fixed tolerance bound again.
    pub fn clear_time_tolerance(&mut self) {
        self.time_tolerance = None;
    }

    pub fn get_time_tolerance(&self) -> Option<i64> {
        self.time_tolerance
    }

    /// Key traces by `(sid, publication_version)` if true.
    pub fn set_split_by_version(&mut self, split: bool) {
        self.split_by_version = split;
    }

    pub fn get_split_by_version(&self) -> bool {
        self.split_by_version
    }

    pub fn set_overlap_policy(&mut self, policy: OverlapPolicy) {
        self.overlap_policy = policy;
    }

    pub fn get_overlap_policy(&self) -> OverlapPolicy {
        self.overlap_policy
    }

    /// Enable or disable CRC validation of v3 records.
    pub fn set_validate_crc(&mut self, validate: bool) {
        self.validate_crc = validate;
    }

    pub fn get_validate_crc(&self) -> bool {
        self.validate_crc
    }

    /// Make the reader fail on damaged records instead of skipping them.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn get_strict(&self) -> bool {
        self.strict
    }

    /// Decode sample payloads while parsing if true.
    pub fn set_unpack_data(&mut self, unpack: bool) {
        self.unpack_data = unpack;
    }

    pub fn get_unpack_data(&self) -> bool {
        self.unpack_data
    }
}
