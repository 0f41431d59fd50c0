// Copyright (C) 2022 by GiGa infosystems
//! Assembly of v2.4 records: the 48-byte fixed section, a synthesized blockette
//! 1000 (and 1001 when sub-0.1-millisecond timing or a timing quality survives
//! in the extra headers), and the payload, padded to the fixed record length.
use giga_mseed_core::cbor::CborItem;
use giga_mseed_core::enums::DataEncoding;
use giga_mseed_core::errors::*;
use giga_mseed_core::sid::nslc_from_sid;
use giga_mseed_core::time::BrokenDownTime;
use giga_mseed_core::{MseedRecord, FIXED_HEADER_LEN_V2};

use crate::pack::PackSettings;
use log::debug;
use tinyvec::TinyVec;

/// Payload offset used for every synthesized v2 record; 64-byte aligned so
/// Steim frames land on their natural boundary.
pub(crate) const DATA_OFFSET: usize = 64;

const BLOCKETTE_1000_OFFSET: usize = 48;
const BLOCKETTE_1001_OFFSET: usize = 56;

/// v3 flag bits, denormalized back to the three v2 flag bytes.
const V3_CALIBRATION: u8 = 0x01;
const V3_TIME_QUESTIONABLE: u8 = 0x02;
const V3_CLOCK_LOCKED: u8 = 0x04;

/// Derive the v2 sample rate factor and multiplier for a rate in Hz.
///
/// Integral rates and integral periods fit directly; fractional rates are
/// scaled by the smallest power of ten that makes them integral, using the
/// divide-by-multiplier sign case.
pub(crate) fn generate_factmult(rate_hz: f64) -> Result<(i16, i16), MseedError> {
    if rate_hz == 0.0 {
        return Ok((0, 0));
    }
    if rate_hz < 0.0 || !rate_hz.is_finite() {
        return Err(MseedError::InvalidHeader {
            msg: format!("cannot represent sample rate {} in a v2 header", rate_hz),
        });
    }
    if rate_hz.fract() == 0.0 && rate_hz <= i16::MAX as f64 {
        return Ok((rate_hz as i16, 1));
    }
    let period = 1.0 / rate_hz;
    if period.fract() == 0.0 && period <= i16::MAX as f64 {
        return Ok((-(period as i16), 1));
    }
    for scale in [10i64, 100, 1000, 10_000] {
        let scaled = rate_hz * scale as f64;
        if (scaled - scaled.round()).abs() < 1e-6 && scaled.round() <= i16::MAX as f64 {
            return Ok((scaled.round() as i16, -(scale as i16)));
        }
    }
    Err(MseedError::InvalidHeader {
        msg: format!("cannot represent sample rate {} in a v2 header", rate_hz),
    })
}

fn quality_indicator(publication_version: u8) -> u8 {
    match publication_version {
        0 | 1 => b'D',
        2 => b'R',
        3 => b'Q',
        _ => b'M',
    }
}

/// Pad an ASCII code to a fixed-width header field.
fn padded<const N: usize>(code: &str, what: &str) -> Result<[u8; N], MseedError> {
    if code.len() > N || !code.is_ascii() {
        return Err(MseedError::InvalidSid {
            msg: format!("{} code '{}' does not fit a v2 header", what, code),
        });
    }
    let mut field = [b' '; N];
    field[..code.len()].copy_from_slice(code.as_bytes());
    Ok(field)
}

/// Assemble one complete v2 record of exactly the settings' record length.
pub(crate) fn build_v2_record(
    record: &MseedRecord,
    encoding: DataEncoding,
    start_time: i64,
    sample_count: usize,
    payload: &[u8],
    settings: &PackSettings,
    sequence: usize,
) -> Result<Vec<u8>, MseedError> {
    let reclen = settings.get_max_record_length();
    if !reclen.is_power_of_two() {
        return Err(MseedError::BadLength { len: reclen });
    }
    let reclen_exp = reclen.trailing_zeros() as u8;
    if DATA_OFFSET + payload.len() > reclen {
        return Err(MseedError::BadLength { len: payload.len() });
    }

    let le = settings.get_byte_order().is_le();
    let u16_to = if le { u16::to_le_bytes } else { u16::to_be_bytes };
    let i16_to = if le { i16::to_le_bytes } else { i16::to_be_bytes };

    let (network, station, location, channel) = nslc_from_sid(&record.sid)?;
    let network = padded::<2>(&network, "network")?;
    let station = padded::<5>(&station, "station")?;
    let location = padded::<2>(&location, "location")?;
    let channel = padded::<3>(&channel, "channel")?;

    let t = BrokenDownTime::from_nstime(start_time)?;
    let fract = (t.nanosec / 100_000) as u16;
    let usec_offset = (t.nanosec % 100_000 / 1_000) as i8;
    if t.nanosec % 1_000 != 0 {
        debug!(
            "{}: start time has sub-microsecond digits that v2 cannot carry",
            record.sid
        );
    }
    // A timing quality carried over from parsing survives in blockette 1001.
    let timing_quality = match record.extra_headers.fetch("FDSN/Time/Quality") {
        Ok(CborItem::UInt(quality)) => Some(quality.min(100) as u8),
        _ => None,
    };
    if !record.extra_headers.is_empty() {
        debug!(
            "{}: extra headers other than the timing quality are not representable in v2",
            record.sid
        );
    }
    let with_b1001 = usec_offset != 0 || timing_quality.is_some();

    let (fact, mult) = generate_factmult(record.sample_rate_hz())?;

    let mut act_flags = 0u8;
    let mut io_flags = 0u8;
    let mut dq_flags = 0u8;
    if record.flags & V3_CALIBRATION != 0 {
        act_flags |= 0x01;
    }
    if record.flags & V3_TIME_QUESTIONABLE != 0 {
        dq_flags |= 0x80;
    }
    if record.flags & V3_CLOCK_LOCKED != 0 {
        io_flags |= 0x20;
    }

    let mut buf = Vec::with_capacity(reclen);
    buf.extend_from_slice(format!("{:06}", sequence % 1_000_000).as_bytes());
    buf.push(quality_indicator(record.publication_version));
    buf.push(b' ');
    buf.extend_from_slice(&station);
    buf.extend_from_slice(&location);
    buf.extend_from_slice(&channel);
    buf.extend_from_slice(&network);
    buf.extend_from_slice(&u16_to(t.year as u16)); // 20-21
    buf.extend_from_slice(&u16_to(t.yday)); // 22-23
    buf.push(t.hour);
    buf.push(t.min);
    buf.push(t.sec);
    buf.push(0);
    buf.extend_from_slice(&u16_to(fract)); // 28-29
    buf.extend_from_slice(&u16_to(sample_count as u16)); // 30-31
    buf.extend_from_slice(&i16_to(fact)); // 32-33
    buf.extend_from_slice(&i16_to(mult)); // 34-35
    buf.push(act_flags);
    buf.push(io_flags);
    buf.push(dq_flags);
    buf.push(if with_b1001 { 2 } else { 1 });
    buf.extend_from_slice(&[0; 4]); // time correction; already in the start time
    buf.extend_from_slice(&u16_to(DATA_OFFSET as u16)); // 44-45
    buf.extend_from_slice(&u16_to(BLOCKETTE_1000_OFFSET as u16)); // 46-47
    debug_assert_eq!(buf.len(), FIXED_HEADER_LEN_V2);

    let mut b1000: TinyVec<[u8; 8]> = TinyVec::new();
    b1000.extend_from_slice(&u16_to(1000));
    b1000.extend_from_slice(&u16_to(if with_b1001 {
        BLOCKETTE_1001_OFFSET as u16
    } else {
        0
    }));
    b1000.push(num::ToPrimitive::to_u8(&encoding).unwrap());
    b1000.push(if le { 0 } else { 1 });
    b1000.push(reclen_exp);
    b1000.push(0);
    buf.extend_from_slice(&b1000);

    if with_b1001 {
        let mut b1001: TinyVec<[u8; 8]> = TinyVec::new();
        b1001.extend_from_slice(&u16_to(1001));
        b1001.extend_from_slice(&u16_to(0));
        b1001.push(timing_quality.unwrap_or(0));
        b1001.push(usec_offset as u8);
        b1001.push(0);
        b1001.push((payload.len() / 64) as u8); // frame count, Steim or not
        buf.extend_from_slice(&b1001);
    }
    buf.resize(DATA_OFFSET, 0);
    buf.extend_from_slice(payload);
    buf.resize(reclen, 0);
    Ok(buf)
}
