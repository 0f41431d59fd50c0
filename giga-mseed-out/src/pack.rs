// Copyright (C) 2022 by GiGa infosystems
//! Packing of typed records and their samples into on-the-wire records.
//!
//! A sample run larger than one record holds is split across as many records as
//! needed, each filled to at most the maximum record length and restamped with
//! the start time of its first sample. Version 3 records are variable length
//! with the CRC written last, once every other byte is final; version 2 records
//! are fixed power-of-two length with synthesized blockettes (see
//! [`crate::pack_v2`]).
use giga_mseed_core::codecs;
use giga_mseed_core::enums::{ByteOrder, DataEncoding};
use giga_mseed_core::errors::*;
use giga_mseed_core::steim;
use giga_mseed_core::time::BrokenDownTime;
use giga_mseed_core::{
    crc::crc32c, MseedRecord, SampleBuffer, CRC_OFFSET_V3, FIXED_HEADER_LEN_V3, MAX_RECORD_LEN,
};

use crate::pack_v2;

/// Settings for the record packer, in the builder-by-setter style of
/// [`giga_mseed_core::MseedSettings`].
#[derive(Debug, Clone, PartialEq)]
pub struct PackSettings {
    pub(crate) max_record_length: usize,
    pub(crate) format_version: u8,
    /// Pins the payload encoding. `None` uses the record's own encoding, which
    /// for freshly built integer records is Steim-2.
    pub(crate) encoding: Option<DataEncoding>,
    /// Header and payload byte order for v2 records. v3 is fixed by the format.
    pub(crate) byte_order: ByteOrder,
}

impl Default for PackSettings {
    fn default() -> Self {
        PackSettings {
            max_record_length: 4096,
            format_version: 3,
            encoding: None,
            byte_order: ByteOrder::Big,
        }
    }
}

impl PackSettings {
    /// Set the maximum record length in bytes. For v2 this is the exact record
    /// length and must be a power of two.
    pub fn set_max_record_length(&mut self, length: usize) -> Result<(), MseedError> {
        if !(128..=MAX_RECORD_LEN).contains(&length) {
            return Err(MseedError::BadLength { len: length });
        }
        self.max_record_length = length;
        Ok(())
    }

    pub fn get_max_record_length(&self) -> usize {
        self.max_record_length
    }

    /// Choose the output format version, 2 or 3.
    pub fn set_format_version(&mut self, version: u8) -> Result<(), MseedError> {
        if version != 2 && version != 3 {
            return Err(MseedError::InvalidHeader {
                msg: format!("cannot pack format version {}", version),
            });
        }
        self.format_version = version;
        Ok(())
    }

    pub fn get_format_version(&self) -> u8 {
        self.format_version
    }

    /// Pin the payload encoding instead of following the record.
    pub fn set_encoding(&mut self, encoding: DataEncoding) {
        self.encoding = Some(encoding);
    }

    pub fn get_encoding(&self) -> Option<DataEncoding> {
        self.encoding
    }

    /// Set the byte order used for v2 records.
    pub fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }

    pub fn get_byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}

/// v2 sample counts are 16-bit, whatever the record length allows.
const MAX_V2_SAMPLES: usize = u16::MAX as usize;

/// Pack one typed record (with decoded samples) into one or more encoded
/// records. Returns the concatenated record bytes and how many records they
/// are.
pub fn pack_records(
    record: &MseedRecord,
    settings: &PackSettings,
) -> Result<(Vec<u8>, usize), MseedError> {
    let samples = record.samples.as_ref().ok_or_else(|| MseedError::InvalidHeader {
        msg: "record has no decoded samples to pack".to_string(),
    })?;
    let encoding = settings.encoding.unwrap_or(record.encoding);
    if !encoding.writable() {
        return Err(MseedError::UnknownEncoding {
            code: num::ToPrimitive::to_u8(&encoding).unwrap_or(u8::MAX),
        });
    }
    if encoding.sample_type()? != samples.sample_type() {
        return Err(MseedError::EncodingMismatch {
            encoding,
            sample_type: samples.sample_type().as_char(),
        });
    }

    let mut out = Vec::new();
    let mut packed = 0usize;
    let mut records = 0usize;
    let total = samples.len();
    let period = record.sample_period_ns();

    while packed < total {
        let start_time = record.start_time + packed as i64 * period;
        let (payload, consumed) = encode_chunk(record, samples, packed, encoding, settings)?;
        let bytes = match settings.format_version {
            3 => build_v3_record(record, encoding, start_time, consumed, &payload)?,
            _ => pack_v2::build_v2_record(
                record,
                encoding,
                start_time,
                consumed,
                &payload,
                settings,
                records + 1,
            )?,
        };
        out.extend_from_slice(&bytes);
        packed += consumed;
        records += 1;
    }
    Ok((out, records))
}

/// Encode as many samples from `offset` onward as one record can hold.
fn encode_chunk(
    record: &MseedRecord,
    samples: &SampleBuffer,
    offset: usize,
    encoding: DataEncoding,
    settings: &PackSettings,
) -> Result<(Vec<u8>, usize), MseedError> {
    let (overhead, payload_order) = if settings.format_version == 3 {
        (
            FIXED_HEADER_LEN_V3 + record.sid.len() + record.extra_headers.len(),
            ByteOrder::Little,
        )
    } else {
        (pack_v2::DATA_OFFSET, settings.byte_order)
    };
    let available = settings.max_record_length.saturating_sub(overhead);
    let remaining = samples.len() - offset;
    let sample_cap = if settings.format_version == 2 {
        remaining.min(MAX_V2_SAMPLES)
    } else {
        remaining
    };

    match encoding {
        DataEncoding::Steim1 | DataEncoding::Steim2 => {
            let max_frames = available / steim::FRAME_LEN;
            if max_frames == 0 {
                return Err(MseedError::BadLength {
                    len: settings.max_record_length,
                });
            }
            // Steim frames are big endian words in v3; v2 follows the record.
            let steim_order = if settings.format_version == 3 {
                ByteOrder::Big
            } else {
                settings.byte_order
            };
            let values = &samples.as_i32().unwrap()[offset..offset + sample_cap];
            let encoded = match encoding {
                DataEncoding::Steim1 => steim::encode_steim1(values, max_frames, steim_order)?,
                _ => steim::encode_steim2(values, max_frames, steim_order)?,
            };
            Ok((encoded.payload, encoded.sample_count))
        }
        DataEncoding::Text => {
            let chunk = sample_cap.min(available);
            if chunk == 0 {
                return Err(MseedError::BadLength {
                    len: settings.max_record_length,
                });
            }
            let bytes = samples.as_text().unwrap()[offset..offset + chunk].to_vec();
            Ok((bytes, chunk))
        }
        _ => {
            let width = encoding.sample_type()?.byte_length();
            let per_record = available / width;
            if per_record == 0 {
                return Err(MseedError::BadLength {
                    len: settings.max_record_length,
                });
            }
            let chunk = sample_cap.min(per_record);
            let slice = samples.slice(offset, offset + chunk);
            let bytes = codecs::encode_samples(encoding, &slice, payload_order)?;
            Ok((bytes, chunk))
        }
    }
}

/// Assemble one complete v3 record. The CRC is computed over the finished
/// bytes with the CRC field still zero, then written into place.
fn build_v3_record(
    record: &MseedRecord,
    encoding: DataEncoding,
    start_time: i64,
    sample_count: usize,
    payload: &[u8],
) -> Result<Vec<u8>, MseedError> {
    if record.sid.len() > u8::MAX as usize {
        return Err(MseedError::InvalidSid {
            msg: format!("identifier is {} bytes, limit is 255", record.sid.len()),
        });
    }
    let extra = record.extra_headers.as_bytes();
    if extra.len() > u16::MAX as usize {
        return Err(MseedError::BadLength { len: extra.len() });
    }
    let t = BrokenDownTime::from_nstime(start_time)?;

    let mut buf =
        Vec::with_capacity(FIXED_HEADER_LEN_V3 + record.sid.len() + extra.len() + payload.len());
    buf.extend_from_slice(b"MS");
    buf.push(3);
    buf.push(record.flags);
    buf.extend_from_slice(&t.nanosec.to_le_bytes());
    buf.extend_from_slice(&(t.year as u16).to_le_bytes());
    buf.extend_from_slice(&t.yday.to_le_bytes());
    buf.push(t.hour);
    buf.push(t.min);
    buf.push(t.sec);
    buf.push(num::ToPrimitive::to_u8(&encoding).unwrap());
    buf.extend_from_slice(&record.sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_count as u32).to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // CRC, written last
    buf.push(record.publication_version);
    buf.push(record.sid.len() as u8);
    buf.extend_from_slice(&(extra.len() as u16).to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(record.sid.as_bytes());
    buf.extend_from_slice(extra);
    buf.extend_from_slice(payload);

    let crc = crc32c(&buf, 0);
    buf[CRC_OFFSET_V3..CRC_OFFSET_V3 + 4].copy_from_slice(&crc.to_le_bytes());
    Ok(buf)
}
