//! This library is the foundation for the `giga-mseed-in` and `giga-mseed-out` crates.
//! It holds the record descriptor and trace structures, the sample codecs, the CRC and
//! calendar primitives, and the CBOR extra-header store shared by reading and writing.
//! It can be built either with serialization support, or in a slightly more lightweight
//! manner without it (see features).
//!
//! The library was designed to follow the FDSN miniSEED 2.4 and 3.0 specifications.
#![allow(clippy::derive_partial_eq_without_eq)]
extern crate log;
extern crate num;
#[macro_use]
extern crate num_derive;

#[cfg(any(feature = "to_json", feature = "serde"))]
extern crate serde;
#[cfg(feature = "to_json")]
extern crate serde_json;

pub mod cbor;
pub mod codecs;
pub mod crc;
pub mod enums;
pub mod errors;
pub mod extra_headers;
pub mod selection;
pub mod settings;
pub mod sid;
pub mod steim;
pub mod swap;
pub mod time;
pub mod trace_list;

pub use errors::MseedError;

pub use enums::*;
pub use extra_headers::ExtraHeaders;
pub use selection::{SelectTime, Selection, Selections};
pub use settings::MseedSettings;
pub use time::{NsTime, NST_ERROR, NST_UNSET};
pub use trace_list::{InsertOutcome, Trace, TraceList, TraceSegment};

/// The length of the v2.4 fixed header section.
pub const FIXED_HEADER_LEN_V2: usize = 48;
/// The length of the v3 fixed header section, before the identifier.
pub const FIXED_HEADER_LEN_V3: usize = 40;
/// The offset of the CRC field within a v3 header.
pub const CRC_OFFSET_V3: usize = 28;
/// No record of either version can be shorter than this.
pub const MIN_RECORD_LEN: usize = FIXED_HEADER_LEN_V3;
/// A sanity bound on the record length of either version.
pub const MAX_RECORD_LEN: usize = 10_000_000;

/// An owned buffer of decoded samples, tagged with its sample type.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    /// 32-bit integer samples ('i').
    Int32(Vec<i32>),
    /// 32-bit IEEE float samples ('f').
    Float32(Vec<f32>),
    /// 64-bit IEEE float samples ('d').
    Float64(Vec<f64>),
    /// Text bytes ('t'); the sample count is the byte length.
    Text(Vec<u8>),
}

macro_rules! for_each_buffer {
    ($self:expr, $values:ident => $body:expr) => {
        match $self {
            SampleBuffer::Int32($values) => $body,
            SampleBuffer::Float32($values) => $body,
            SampleBuffer::Float64($values) => $body,
            SampleBuffer::Text($values) => $body,
        }
    };
}

impl SampleBuffer {
    /// An empty buffer of the given sample type.
    pub fn empty(sample_type: SampleType) -> Self {
        match sample_type {
            SampleType::Integer32 => SampleBuffer::Int32(Vec::new()),
            SampleType::Float32 => SampleBuffer::Float32(Vec::new()),
            SampleType::Float64 => SampleBuffer::Float64(Vec::new()),
            SampleType::Text => SampleBuffer::Text(Vec::new()),
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            SampleBuffer::Int32(_) => SampleType::Integer32,
            SampleBuffer::Float32(_) => SampleType::Float32,
            SampleBuffer::Float64(_) => SampleType::Float64,
            SampleBuffer::Text(_) => SampleType::Text,
        }
    }

    /// The number of samples held.
    pub fn len(&self) -> usize {
        for_each_buffer!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The size of the held samples in bytes.
    pub fn byte_length(&self) -> usize {
        self.len() * self.sample_type().byte_length()
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            SampleBuffer::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            SampleBuffer::Float32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            SampleBuffer::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&[u8]> {
        match self {
            SampleBuffer::Text(v) => Some(v),
            _ => None,
        }
    }

    /// A copy of the samples in `start..end` as a new buffer of the same type.
    pub fn slice(&self, start: usize, end: usize) -> SampleBuffer {
        match self {
            SampleBuffer::Int32(v) => SampleBuffer::Int32(v[start..end].to_vec()),
            SampleBuffer::Float32(v) => SampleBuffer::Float32(v[start..end].to_vec()),
            SampleBuffer::Float64(v) => SampleBuffer::Float64(v[start..end].to_vec()),
            SampleBuffer::Text(v) => SampleBuffer::Text(v[start..end].to_vec()),
        }
    }

    /// Grow the backing capacity for `additional` more samples, by at least
    /// half of the current length, so repeated appends stay amortized.
    fn reserve_geometric(&mut self, additional: usize) {
        fn grow<T>(values: &mut Vec<T>, additional: usize) {
            let needed = values.len() + additional;
            if needed > values.capacity() {
                let target = needed.max(values.len() + values.len() / 2);
                values.reserve_exact(target - values.len());
            }
        }
        for_each_buffer!(self, v => grow(v, additional))
    }

    /// Append the samples of `other`, which must have the same sample type.
    pub fn append(&mut self, other: &SampleBuffer) -> Result<(), MseedError> {
        self.reserve_geometric(other.len());
        match (self, other) {
            (SampleBuffer::Int32(a), SampleBuffer::Int32(b)) => a.extend_from_slice(b),
            (SampleBuffer::Float32(a), SampleBuffer::Float32(b)) => a.extend_from_slice(b),
            (SampleBuffer::Float64(a), SampleBuffer::Float64(b)) => a.extend_from_slice(b),
            (SampleBuffer::Text(a), SampleBuffer::Text(b)) => a.extend_from_slice(b),
            (a, b) => {
                return Err(MseedError::Unsupported {
                    msg: format!(
                        "cannot splice '{}' samples into a '{}' buffer",
                        b.sample_type().as_char(),
                        a.sample_type().as_char()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Insert the samples of `other` at the front; same-type requirement as
    /// [`Self::append`].
    pub fn prepend(&mut self, other: &SampleBuffer) -> Result<(), MseedError> {
        self.reserve_geometric(other.len());
        match (self, other) {
            (SampleBuffer::Int32(a), SampleBuffer::Int32(b)) => {
                a.splice(0..0, b.iter().cloned());
            }
            (SampleBuffer::Float32(a), SampleBuffer::Float32(b)) => {
                a.splice(0..0, b.iter().cloned());
            }
            (SampleBuffer::Float64(a), SampleBuffer::Float64(b)) => {
                a.splice(0..0, b.iter().cloned());
            }
            (SampleBuffer::Text(a), SampleBuffer::Text(b)) => {
                a.splice(0..0, b.iter().cloned());
            }
            (a, b) => {
                return Err(MseedError::Unsupported {
                    msg: format!(
                        "cannot splice '{}' samples into a '{}' buffer",
                        b.sample_type().as_char(),
                        a.sample_type().as_char()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Overwrite `count` samples starting at `offset` with the front of `other`.
    pub(crate) fn overwrite(
        &mut self,
        offset: usize,
        other: &SampleBuffer,
        count: usize,
    ) -> Result<(), MseedError> {
        match (self, other) {
            (SampleBuffer::Int32(a), SampleBuffer::Int32(b)) => {
                a[offset..offset + count].copy_from_slice(&b[..count]);
            }
            (SampleBuffer::Float32(a), SampleBuffer::Float32(b)) => {
                a[offset..offset + count].copy_from_slice(&b[..count]);
            }
            (SampleBuffer::Float64(a), SampleBuffer::Float64(b)) => {
                a[offset..offset + count].copy_from_slice(&b[..count]);
            }
            (SampleBuffer::Text(a), SampleBuffer::Text(b)) => {
                a[offset..offset + count].copy_from_slice(&b[..count]);
            }
            (a, b) => {
                return Err(MseedError::Unsupported {
                    msg: format!(
                        "cannot splice '{}' samples into a '{}' buffer",
                        b.sample_type().as_char(),
                        a.sample_type().as_char()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// One parsed or to-be-packed miniSEED record.
///
/// The parser fills every field including the raw bytes; a record built by hand
/// for packing needs only the identity, timing and sample fields, and leaves
/// `raw` empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MseedRecord {
    /// The record exactly as it sits on the wire. Empty for synthesized records.
    pub raw: Vec<u8>,
    /// The length of the record in bytes.
    pub record_length: usize,
    /// Major format version, 2 or 3.
    pub format_version: u8,
    /// Record flags, in the v3 bit layout for either version.
    pub flags: u8,
    /// The canonical source identifier, `FDSN:NET_STA_LOC_B_S_SS`.
    pub sid: String,
    /// Time of the first sample, nanoseconds from the epoch.
    pub start_time: NsTime,
    /// Positive values are a rate in Hz, negative values a period in seconds.
    pub sample_rate: f64,
    pub encoding: DataEncoding,
    /// 1 to 255; v2 quality codes D/R/Q/M map to 1 to 4.
    pub publication_version: u8,
    pub sample_count: u64,
    /// The CRC as stored in a v3 record; zero for v2. Only meaningful after
    /// validation.
    pub crc: u32,
    pub extra_headers: ExtraHeaders,
    /// Byte order of the header and payload. Always little endian headers for v3.
    pub byte_order: ByteOrder,
    /// Where the payload starts within `raw`.
    pub payload_offset: usize,
    /// Decoded samples, once [`Self::decode_samples`] has run.
    pub samples: Option<SampleBuffer>,
}

impl MseedRecord {
    /// Construct a record for packing from identity, timing and samples.
    ///
    /// The encoding is the natural one for the sample type: Steim-2 for
    /// integers, the matching IEEE width for floats and TEXT for text.
    /// ```
    /// use giga_mseed_core::{MseedRecord, SampleBuffer, DataEncoding};
    ///
    /// let rec = MseedRecord::new(
    ///     "FDSN:XX_TEST__B_H_Z",
    ///     0,
    ///     40.0,
    ///     SampleBuffer::Int32(vec![1, 2, 3]),
    /// );
    /// assert_eq!(rec.encoding, DataEncoding::Steim2);
    /// assert_eq!(rec.sample_count, 3);
    /// ```
    pub fn new(sid: &str, start_time: NsTime, sample_rate: f64, samples: SampleBuffer) -> Self {
        let encoding = match samples.sample_type() {
            SampleType::Integer32 => DataEncoding::Steim2,
            SampleType::Float32 => DataEncoding::Float32,
            SampleType::Float64 => DataEncoding::Float64,
            SampleType::Text => DataEncoding::Text,
        };
        MseedRecord {
            raw: Vec::new(),
            record_length: 0,
            format_version: 3,
            flags: 0,
            sid: sid.to_string(),
            start_time,
            sample_rate,
            encoding,
            publication_version: 1,
            sample_count: samples.len() as u64,
            crc: 0,
            extra_headers: ExtraHeaders::new(),
            byte_order: ByteOrder::Big,
            payload_offset: 0,
            samples: Some(samples),
        }
    }

    /// The raw payload bytes within the record.
    pub fn payload(&self) -> &[u8] {
        &self.raw[self.payload_offset.min(self.raw.len())..self.record_length.min(self.raw.len())]
    }

    /// The sample rate in Hz, resolving the negative-period convention.
    pub fn sample_rate_hz(&self) -> f64 {
        if self.sample_rate < 0.0 {
            -1.0 / self.sample_rate
        } else {
            self.sample_rate
        }
    }

    /// The sample period in nanoseconds, or 0 for an unsampled record.
    pub fn sample_period_ns(&self) -> i64 {
        let hz = self.sample_rate_hz();
        if hz > 0.0 {
            (time::NSTMODULUS as f64 / hz).round() as i64
        } else {
            0
        }
    }

    /// The time of the last sample in the record.
    pub fn end_time(&self) -> NsTime {
        if self.sample_count < 2 {
            return self.start_time;
        }
        self.start_time + (self.sample_count as i64 - 1) * self.sample_period_ns()
    }

    /// The sample type this record decodes to.
    pub fn sample_type(&self) -> Result<SampleType, MseedError> {
        self.encoding.sample_type()
    }

    /// Decode the payload into `samples` and return the sample count.
    ///
    /// If the data is already decoded, the existing count is returned.
    pub fn decode_samples(&mut self) -> Result<usize, MseedError> {
        if let Some(ref samples) = self.samples {
            return Ok(samples.len());
        }
        let samples = self.decoded_samples()?;
        let count = samples.len();
        self.samples = Some(samples);
        Ok(count)
    }

    /// The byte order of the payload, which for v3 is not always that of the
    /// header: Steim frames keep their defined big endian word layout while
    /// the fixed-width payloads follow the little endian header.
    pub fn payload_byte_order(&self) -> ByteOrder {
        if self.format_version == 3
            && matches!(self.encoding, DataEncoding::Steim1 | DataEncoding::Steim2)
        {
            ByteOrder::Big
        } else {
            self.byte_order
        }
    }

    /// Decode the payload into a fresh buffer without storing it.
    pub fn decoded_samples(&self) -> Result<SampleBuffer, MseedError> {
        codecs::decode_samples(
            self.encoding,
            self.payload(),
            self.sample_count as usize,
            self.payload_byte_order(),
        )
    }
}

impl std::fmt::Display for MseedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, version {}, {} bytes (format: {}), {} samples, {} Hz, {}",
            self.sid,
            self.publication_version,
            self.record_length,
            self.format_version,
            self.sample_count,
            self.sample_rate_hz(),
            time::format_nstime(self.start_time),
        )
    }
}
