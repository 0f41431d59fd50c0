// Copyright (C) 2022 by GiGa infosystems
//! Parsing of miniSEED 3 records: a 40-byte little endian fixed section, then
//! the identifier, the CBOR extra headers and the payload.
use giga_mseed_core::crc::crc32c;
use giga_mseed_core::enums::{ByteOrder, DataEncoding};
use giga_mseed_core::errors::*;
use giga_mseed_core::extra_headers::ExtraHeaders;
use giga_mseed_core::time::nstime_from_yday;
use giga_mseed_core::{
    MseedRecord, MseedSettings, CRC_OFFSET_V3, FIXED_HEADER_LEN_V3, MAX_RECORD_LEN,
};

use std::convert::TryInto;

/// Parse one v3 record from the start of `buf`. The buffer may extend past the
/// record; `record_length` on the result says how much was consumed.
pub(crate) fn parse_v3(
    buf: &[u8],
    settings: &MseedSettings,
) -> Result<MseedRecord, MseedError> {
    if buf.len() < FIXED_HEADER_LEN_V3 {
        return Err(MseedError::Truncated {
            have: buf.len(),
            need: FIXED_HEADER_LEN_V3,
        });
    }
    if buf[0] != b'M' || buf[1] != b'S' || buf[2] != 3 {
        return Err(MseedError::NotMiniseed);
    }
    let flags = buf[3];
    let nanosecond = u32::from_le_bytes(buf[4..8].try_into().unwrap());
    let year = u16::from_le_bytes(buf[8..10].try_into().unwrap());
    let day = u16::from_le_bytes(buf[10..12].try_into().unwrap());
    let hour = buf[12];
    let minute = buf[13];
    let second = buf[14];
    let encoding = DataEncoding::new(buf[15])?;
    let sample_rate = f64::from_le_bytes(buf[16..24].try_into().unwrap());
    let sample_count = u32::from_le_bytes(buf[24..28].try_into().unwrap());
    let crc = u32::from_le_bytes(buf[28..32].try_into().unwrap());
    let publication_version = buf[32];
    let sid_length = buf[33] as usize;
    let extra_length = u16::from_le_bytes(buf[34..36].try_into().unwrap()) as usize;
    let payload_length = u32::from_le_bytes(buf[36..40].try_into().unwrap()) as usize;

    let record_length = FIXED_HEADER_LEN_V3 + sid_length + extra_length + payload_length;
    if record_length > MAX_RECORD_LEN {
        return Err(MseedError::BadLength { len: record_length });
    }
    if buf.len() < record_length {
        return Err(MseedError::Truncated {
            have: buf.len(),
            need: record_length,
        });
    }

    if settings.get_validate_crc() {
        // The CRC covers the whole record with its own field zeroed; stream
        // around the field instead of copying into a scratch buffer.
        let mut computed = crc32c(&buf[..CRC_OFFSET_V3], 0);
        computed = crc32c(&[0u8; 4], computed);
        computed = crc32c(&buf[CRC_OFFSET_V3 + 4..record_length], computed);
        if computed != crc {
            return Err(MseedError::BadCrc {
                stored: crc,
                computed,
            });
        }
    }

    let start_time = nstime_from_yday(year as i32, day, hour, minute, second, nanosecond)?;

    let sid_end = FIXED_HEADER_LEN_V3 + sid_length;
    let sid = String::from_utf8(buf[FIXED_HEADER_LEN_V3..sid_end].to_vec())?;
    let extra_headers = ExtraHeaders::from_bytes(&buf[sid_end..sid_end + extra_length])?;

    let mut record = MseedRecord {
        raw: buf[..record_length].to_vec(),
        record_length,
        format_version: 3,
        flags,
        sid,
        start_time,
        sample_rate,
        encoding,
        publication_version,
        sample_count: sample_count as u64,
        crc,
        extra_headers,
        byte_order: ByteOrder::Little,
        payload_offset: sid_end + extra_length,
        samples: None,
    };
    if settings.get_unpack_data() {
        record.decode_samples()?;
    }
    Ok(record)
}
