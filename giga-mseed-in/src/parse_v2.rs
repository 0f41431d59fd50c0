// Copyright (C) 2022 by GiGa infosystems
//! Parsing of miniSEED 2.4 records: the 48-byte fixed section followed by the
//! blockette chain, with the record length and encoding taken from blockette
//! 1000 and the finer timing details from blockettes 100, 500 and 1001.
//!
//! The fixed header fields that v3 dropped are normalized on the way in: the
//! quality indicator becomes a publication version, the three flag bytes fold
//! into the v3 flag layout, and event/timing details land in the extra headers
//! under the `FDSN` key the way a converted record would carry them.
use giga_mseed_core::cbor::{serialize_floating, CborItem};
use giga_mseed_core::enums::{ByteOrder, DataEncoding};
use giga_mseed_core::errors::*;
use giga_mseed_core::extra_headers::ExtraHeaders;
use giga_mseed_core::sid::sid_from_nslc;
use giga_mseed_core::time::{nstime_from_yday, NsTime};
use giga_mseed_core::{MseedRecord, MseedSettings, FIXED_HEADER_LEN_V2, MAX_RECORD_LEN};

use log::{debug, warn};
use std::convert::TryInto;

/// v2 activity flag bits.
const ACT_CALIBRATION: u8 = 0x01;
const ACT_TIME_CORRECTION_APPLIED: u8 = 0x02;
const ACT_EVENT_BEGIN: u8 = 0x04;
const ACT_EVENT_END: u8 = 0x08;
const ACT_POSITIVE_LEAP: u8 = 0x10;
const ACT_NEGATIVE_LEAP: u8 = 0x20;
const ACT_EVENT_IN_PROGRESS: u8 = 0x40;
/// v2 I/O flag bit for a locked clock.
const IO_CLOCK_LOCKED: u8 = 0x20;
/// v2 quality flag bit for a questionable time tag.
const DQ_TIME_QUESTIONABLE: u8 = 0x80;

/// v3 flag bits, the normalized layout.
const V3_CALIBRATION: u8 = 0x01;
const V3_TIME_QUESTIONABLE: u8 = 0x02;
const V3_CLOCK_LOCKED: u8 = 0x04;

/// The nominal sample rate from the factor/multiplier pair, in Hz.
///
/// Positive values count samples, negative values count seconds, giving the
/// four sign cases of the format.
pub(crate) fn nominal_sample_rate(factor: i16, multiplier: i16) -> f64 {
    let mut rate = if factor > 0 {
        factor as f64
    } else if factor < 0 {
        -1.0 / factor as f64
    } else {
        return 0.0;
    };
    if multiplier > 0 {
        rate *= multiplier as f64;
    } else if multiplier < 0 {
        rate /= -(multiplier as f64);
    }
    rate
}

fn trimmed_ascii(bytes: &[u8]) -> String {
    let text: String = bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { ' ' })
        .collect();
    text.trim_matches(|c: char| c == ' ' || c == '\0').to_string()
}

/// Parse a 10-byte BTIME at `offset` into epoch nanoseconds.
fn parse_btime(
    buf: &[u8],
    offset: usize,
    u16_from: fn([u8; 2]) -> u16,
) -> Result<NsTime, MseedError> {
    let year = u16_from(buf[offset..offset + 2].try_into().unwrap());
    let day = u16_from(buf[offset + 2..offset + 4].try_into().unwrap());
    let hour = buf[offset + 4];
    let minute = buf[offset + 5];
    let second = buf[offset + 6];
    let fract = u16_from(buf[offset + 8..offset + 10].try_into().unwrap());
    nstime_from_yday(
        year as i32,
        day,
        hour,
        minute,
        second,
        fract as u32 * 100_000,
    )
}

/// Everything gathered while walking the blockette chain.
#[derive(Default)]
struct BlocketteInfo {
    record_length: Option<usize>,
    encoding: Option<u8>,
    payload_order: Option<ByteOrder>,
    actual_rate: Option<f64>,
    usec_offset: Option<i8>,
    usec_offset_b500: Option<i8>,
}

pub(crate) fn parse_v2(
    buf: &[u8],
    byte_order: ByteOrder,
    settings: &MseedSettings,
) -> Result<MseedRecord, MseedError> {
    if buf.len() < FIXED_HEADER_LEN_V2 {
        return Err(MseedError::Truncated {
            have: buf.len(),
            need: FIXED_HEADER_LEN_V2,
        });
    }
    let le = byte_order.is_le();
    let u16_from = if le {
        u16::from_le_bytes
    } else {
        u16::from_be_bytes
    };
    let i16_from = if le {
        i16::from_le_bytes
    } else {
        i16::from_be_bytes
    };
    let i32_from = if le {
        i32::from_le_bytes
    } else {
        i32::from_be_bytes
    };
    let f32_from = if le {
        f32::from_le_bytes
    } else {
        f32::from_be_bytes
    };

    let publication_version = match buf[6] {
        b'D' => 1,
        b'R' => 2,
        b'Q' => 3,
        b'M' => 4,
        other => {
            return Err(MseedError::InvalidHeader {
                msg: format!("unknown data quality indicator '{}'", other as char),
            });
        }
    };

    let station = trimmed_ascii(&buf[8..13]);
    let location = trimmed_ascii(&buf[13..15]);
    let channel = trimmed_ascii(&buf[15..18]);
    let network = trimmed_ascii(&buf[18..20]);
    let sid = sid_from_nslc(&network, &station, &location, &channel)?;

    let mut start_time = parse_btime(buf, 20, u16_from)?;
    let sample_count = u16_from(buf[30..32].try_into().unwrap());
    let samprate_fact = i16_from(buf[32..34].try_into().unwrap());
    let samprate_mult = i16_from(buf[34..36].try_into().unwrap());
    let act_flags = buf[36];
    let io_flags = buf[37];
    let dq_flags = buf[38];
    let blockette_count = buf[39];
    let time_correction = i32_from(buf[40..44].try_into().unwrap());
    let data_offset = u16_from(buf[44..46].try_into().unwrap()) as usize;
    let blockette_offset = u16_from(buf[46..48].try_into().unwrap()) as usize;

    // The correction is in 0.1 ms ticks and is pre-applied by some writers.
    if act_flags & ACT_TIME_CORRECTION_APPLIED == 0 {
        start_time += time_correction as i64 * 100_000;
    }

    let mut extra_headers = ExtraHeaders::new();
    let info = walk_blockettes(
        buf,
        blockette_offset,
        blockette_count,
        u16_from,
        f32_from,
        &mut extra_headers,
    )?;

    let record_length = match info.record_length {
        Some(len) => len,
        None => {
            return Err(MseedError::InvalidHeader {
                msg: "record has no blockette 1000, so its length is unknown".to_string(),
            });
        }
    };
    if buf.len() < record_length {
        return Err(MseedError::Truncated {
            have: buf.len(),
            need: record_length,
        });
    }
    let encoding = match info.encoding {
        Some(code) => DataEncoding::new(code)?,
        None => {
            return Err(MseedError::InvalidHeader {
                msg: "record has no blockette 1000, so its encoding is unknown".to_string(),
            });
        }
    };
    if let Some(order) = info.payload_order {
        if order != byte_order {
            warn!(
                "{}: blockette 1000 byte order contradicts the header; trusting the header",
                sid
            );
        }
    }
    if sample_count > 0 && (data_offset < FIXED_HEADER_LEN_V2 || data_offset > record_length) {
        return Err(MseedError::InvalidHeader {
            msg: format!("data offset {} is outside the record", data_offset),
        });
    }

    // Microsecond-precision start time, preferring blockette 1001.
    if let Some(usec) = info.usec_offset.or(info.usec_offset_b500) {
        start_time += usec as i64 * 1_000;
    }

    let sample_rate = match info.actual_rate {
        Some(rate) => rate,
        None => nominal_sample_rate(samprate_fact, samprate_mult),
    };

    let mut flags = 0u8;
    if act_flags & ACT_CALIBRATION != 0 {
        flags |= V3_CALIBRATION;
    }
    if dq_flags & DQ_TIME_QUESTIONABLE != 0 {
        flags |= V3_TIME_QUESTIONABLE;
    }
    if io_flags & IO_CLOCK_LOCKED != 0 {
        flags |= V3_CLOCK_LOCKED;
    }

    // Event markers and leap seconds have no v3 header bits; they live in the
    // extra headers instead.
    if act_flags & ACT_EVENT_BEGIN != 0 {
        extra_headers.set("FDSN/Event/Begin", CborItem::Bool(true))?;
    }
    if act_flags & ACT_EVENT_END != 0 {
        extra_headers.set("FDSN/Event/End", CborItem::Bool(true))?;
    }
    if act_flags & ACT_EVENT_IN_PROGRESS != 0 {
        extra_headers.set("FDSN/Event/InProgress", CborItem::Bool(true))?;
    }
    if act_flags & ACT_POSITIVE_LEAP != 0 {
        extra_headers.set("FDSN/Time/LeapSecond", CborItem::UInt(1))?;
    }
    if act_flags & ACT_NEGATIVE_LEAP != 0 {
        extra_headers.set("FDSN/Time/LeapSecond", CborItem::NegInt(0))?;
    }

    let mut record = MseedRecord {
        raw: buf[..record_length].to_vec(),
        record_length,
        format_version: 2,
        flags,
        sid,
        start_time,
        sample_rate,
        encoding,
        publication_version,
        sample_count: sample_count as u64,
        crc: 0,
        extra_headers,
        byte_order,
        payload_offset: data_offset,
        samples: None,
    };
    if settings.get_unpack_data() && record.sample_count > 0 {
        record.decode_samples()?;
    }
    Ok(record)
}

fn walk_blockettes(
    buf: &[u8],
    first_offset: usize,
    declared_count: u8,
    u16_from: fn([u8; 2]) -> u16,
    f32_from: fn([u8; 4]) -> f32,
    extra_headers: &mut ExtraHeaders,
) -> Result<BlocketteInfo, MseedError> {
    let mut info = BlocketteInfo::default();
    let mut offset = first_offset;
    let mut seen = 0u16;

    while offset != 0 {
        if offset < FIXED_HEADER_LEN_V2 || offset + 4 > buf.len() {
            return Err(MseedError::InvalidHeader {
                msg: format!("blockette offset {} is outside the record", offset),
            });
        }
        if seen > declared_count as u16 {
            return Err(MseedError::InvalidHeader {
                msg: "more blockettes than the header declares".to_string(),
            });
        }
        seen += 1;

        let blkt_type = u16_from(buf[offset..offset + 2].try_into().unwrap());
        let next = u16_from(buf[offset + 2..offset + 4].try_into().unwrap()) as usize;
        if next != 0 && next <= offset {
            return Err(MseedError::InvalidHeader {
                msg: format!("blockette chain does not advance at offset {}", offset),
            });
        }

        let body = offset + 4;
        let need = |bytes: usize| -> Result<(), MseedError> {
            if body + bytes > buf.len() {
                Err(MseedError::Truncated {
                    have: buf.len(),
                    need: body + bytes,
                })
            } else {
                Ok(())
            }
        };

        match blkt_type {
            100 => {
                need(4)?;
                let rate = f32_from(buf[body..body + 4].try_into().unwrap());
                info.actual_rate = Some(rate as f64);
            }
            200 | 201 => {
                need(24)?;
                let amplitude = f32_from(buf[body..body + 4].try_into().unwrap());
                let period = f32_from(buf[body + 4..body + 8].try_into().unwrap());
                let background = f32_from(buf[body + 8..body + 12].try_into().unwrap());
                let onset = parse_btime(buf, body + 14, u16_from)?;
                let kind = if blkt_type == 201 { "MURDOCK" } else { "GENERIC" };
                extra_headers.append_to_array(
                    "FDSN/Event/Detection",
                    vec![
                        ("Type".to_string(), CborItem::Text(kind.to_string())),
                        ("SignalAmplitude".to_string(), serialize_floating(amplitude as f64)),
                        ("SignalPeriod".to_string(), serialize_floating(period as f64)),
                        (
                            "BackgroundEstimate".to_string(),
                            serialize_floating(background as f64),
                        ),
                        (
                            "OnsetTime".to_string(),
                            CborItem::Text(giga_mseed_core::time::format_nstime(onset)),
                        ),
                    ],
                )?;
            }
            300 | 310 | 320 | 390 => {
                need(14)?;
                let begin = parse_btime(buf, body, u16_from)?;
                let kind = match blkt_type {
                    300 => "Step",
                    310 => "Sine",
                    320 => "PseudoRandom",
                    _ => "Generic",
                };
                extra_headers.append_to_array(
                    "FDSN/Calibration/Sequence",
                    vec![
                        ("Type".to_string(), CborItem::Text(kind.to_string())),
                        (
                            "BeginTime".to_string(),
                            CborItem::Text(giga_mseed_core::time::format_nstime(begin)),
                        ),
                    ],
                )?;
            }
            395 => {
                need(10)?;
                let end = parse_btime(buf, body, u16_from)?;
                extra_headers.append_to_array(
                    "FDSN/Calibration/Sequence",
                    vec![
                        ("Type".to_string(), CborItem::Text("Abort".to_string())),
                        (
                            "EndTime".to_string(),
                            CborItem::Text(giga_mseed_core::time::format_nstime(end)),
                        ),
                    ],
                )?;
            }
            400 | 405 => {
                debug!("skipping beam blockette {}", blkt_type);
            }
            500 => {
                need(196)?;
                let exception_time = parse_btime(buf, body + 4, u16_from)?;
                let usec = buf[body + 14] as i8;
                let reception_quality = buf[body + 15];
                let exception_type = trimmed_ascii(&buf[body + 20..body + 36]);
                let clock_model = trimmed_ascii(&buf[body + 36..body + 68]);
                info.usec_offset_b500 = Some(usec);
                extra_headers.append_to_array(
                    "FDSN/Time/Exception",
                    vec![
                        (
                            "Time".to_string(),
                            CborItem::Text(giga_mseed_core::time::format_nstime(exception_time)),
                        ),
                        (
                            "ReceptionQuality".to_string(),
                            CborItem::UInt(reception_quality as u64),
                        ),
                        ("Type".to_string(), CborItem::Text(exception_type)),
                    ],
                )?;
                if !clock_model.is_empty() {
                    extra_headers.set("FDSN/Clock/Model", CborItem::Text(clock_model))?;
                }
            }
            1000 => {
                need(4)?;
                info.encoding = Some(buf[body]);
                info.payload_order = Some(if buf[body + 1] == 0 {
                    ByteOrder::Little
                } else {
                    ByteOrder::Big
                });
                let exponent = buf[body + 2] as u32;
                if !(7..=24).contains(&exponent) {
                    return Err(MseedError::BadLength {
                        len: 1usize.checked_shl(exponent).unwrap_or(usize::MAX),
                    });
                }
                let record_length = 1usize << exponent;
                if record_length > MAX_RECORD_LEN {
                    return Err(MseedError::BadLength { len: record_length });
                }
                info.record_length = Some(record_length);
            }
            1001 => {
                need(4)?;
                let timing_quality = buf[body];
                let usec = buf[body + 1] as i8;
                info.usec_offset = Some(usec);
                extra_headers.set("FDSN/Time/Quality", CborItem::UInt(timing_quality as u64))?;
            }
            2000 => {
                debug!("skipping opaque blockette 2000");
            }
            other => {
                warn!("skipping unrecognized blockette {}", other);
            }
        }
        offset = next;
    }
    Ok(info)
}
