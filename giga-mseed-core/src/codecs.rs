// Copyright (C) 2022 by GiGa infosystems
//! Decoding and encoding of record payloads into typed sample buffers.
//!
//! The fixed-width codecs are direct reads with a byte swap to host order, and
//! writing is the exact inverse. The legacy gain-ranged families (GEOSCOPE, CDSN,
//! SRO, DWWSSN) can only be decoded; nothing has produced them for decades. Text
//! payloads are copied verbatim, one "sample" per byte. Steim payloads delegate
//! to [`crate::steim`].
use crate::enums::{ByteOrder, DataEncoding, SampleType};
use crate::errors::*;
use crate::steim;
use crate::SampleBuffer;

use std::convert::{TryFrom, TryInto};

/// Decode `sample_count` samples from a payload.
///
/// The payload may be longer than the encoded data requires (v2 records are
/// padded to a fixed length); extra bytes are ignored. For TEXT the sample
/// count is the byte length, and a shorter declared count truncates.
pub fn decode_samples(
    encoding: DataEncoding,
    payload: &[u8],
    sample_count: usize,
    byte_order: ByteOrder,
) -> Result<SampleBuffer, MseedError> {
    use num::ToPrimitive;
    if sample_count == 0 {
        return empty_buffer(encoding);
    }
    match encoding {
        DataEncoding::Text => {
            let count = sample_count.min(payload.len());
            Ok(SampleBuffer::Text(payload[..count].to_vec()))
        }
        DataEncoding::Int16 => {
            let le = byte_order.is_le();
            decode_fixed(payload, sample_count, 2, |b| {
                let b: [u8; 2] = b.try_into().unwrap();
                let v = if le {
                    i16::from_le_bytes(b)
                } else {
                    i16::from_be_bytes(b)
                };
                v as i32
            })
            .map(SampleBuffer::Int32)
        }
        DataEncoding::Int32 => {
            let le = byte_order.is_le();
            decode_fixed(payload, sample_count, 4, |b| {
                let b: [u8; 4] = b.try_into().unwrap();
                if le {
                    i32::from_le_bytes(b)
                } else {
                    i32::from_be_bytes(b)
                }
            })
            .map(SampleBuffer::Int32)
        }
        DataEncoding::Float32 => {
            let le = byte_order.is_le();
            decode_fixed(payload, sample_count, 4, |b| {
                let b: [u8; 4] = b.try_into().unwrap();
                if le {
                    f32::from_le_bytes(b)
                } else {
                    f32::from_be_bytes(b)
                }
            })
            .map(SampleBuffer::Float32)
        }
        DataEncoding::Float64 => {
            let le = byte_order.is_le();
            decode_fixed(payload, sample_count, 8, |b| {
                let b: [u8; 8] = b.try_into().unwrap();
                if le {
                    f64::from_le_bytes(b)
                } else {
                    f64::from_be_bytes(b)
                }
            })
            .map(SampleBuffer::Float64)
        }
        DataEncoding::Steim1 => {
            steim::decode_steim1(payload, sample_count, byte_order).map(SampleBuffer::Int32)
        }
        DataEncoding::Steim2 => {
            steim::decode_steim2(payload, sample_count, byte_order).map(SampleBuffer::Int32)
        }
        DataEncoding::GeoScope24 => decode_fixed(payload, sample_count, 3, |b| {
            // 24-bit offset binary, always stored most significant byte first.
            let magnitude = ((b[0] as u32) << 16) | ((b[1] as u32) << 8) | b[2] as u32;
            magnitude as f32 - 8_388_608.0
        })
        .map(SampleBuffer::Float32),
        DataEncoding::GeoScope163 => decode_geoscope16(payload, sample_count, byte_order, 0x7),
        DataEncoding::GeoScope164 => decode_geoscope16(payload, sample_count, byte_order, 0xF),
        DataEncoding::Cdsn => {
            let le = byte_order.is_le();
            decode_fixed(payload, sample_count, 2, |b| {
                let b: [u8; 2] = b.try_into().unwrap();
                let word = if le {
                    u16::from_le_bytes(b)
                } else {
                    u16::from_be_bytes(b)
                };
                let mantissa = (word & 0x3FFF) as i32 - 8191;
                let multiplier = match word >> 14 {
                    0 => 1,
                    1 => 4,
                    2 => 16,
                    _ => 128,
                };
                mantissa * multiplier
            })
            .map(SampleBuffer::Int32)
        }
        DataEncoding::Sro => {
            let le = byte_order.is_le();
            decode_fixed(payload, sample_count, 2, |b| {
                let b: [u8; 2] = b.try_into().unwrap();
                let word = if le {
                    u16::from_le_bytes(b)
                } else {
                    u16::from_be_bytes(b)
                };
                let mut mantissa = (word & 0x0FFF) as i32;
                if mantissa > 0x7FF {
                    mantissa -= 0x1000;
                }
                let gain = (word >> 12) as i32 & 0xF;
                mantissa << (10 - gain)
            })
            .map(SampleBuffer::Int32)
        }
        DataEncoding::Dwwssn => {
            let le = byte_order.is_le();
            decode_fixed(payload, sample_count, 2, |b| {
                let b: [u8; 2] = b.try_into().unwrap();
                let word = if le {
                    u16::from_le_bytes(b)
                } else {
                    u16::from_be_bytes(b)
                };
                word as i16 as i32
            })
            .map(SampleBuffer::Int32)
        }
        other => Err(MseedError::UnknownEncoding {
            code: other.to_u8().unwrap_or(u8::MAX),
        }),
    }
}

fn empty_buffer(encoding: DataEncoding) -> Result<SampleBuffer, MseedError> {
    Ok(match encoding.sample_type()? {
        SampleType::Integer32 => SampleBuffer::Int32(Vec::new()),
        SampleType::Float32 => SampleBuffer::Float32(Vec::new()),
        SampleType::Float64 => SampleBuffer::Float64(Vec::new()),
        SampleType::Text => SampleBuffer::Text(Vec::new()),
    })
}

fn decode_fixed<T>(
    payload: &[u8],
    sample_count: usize,
    width: usize,
    convert: impl Fn(&[u8]) -> T,
) -> Result<Vec<T>, MseedError> {
    let needed = sample_count * width;
    if payload.len() < needed {
        return Err(MseedError::Truncated {
            have: payload.len(),
            need: needed,
        });
    }
    Ok(payload[..needed].chunks_exact(width).map(convert).collect())
}

fn decode_geoscope16(
    payload: &[u8],
    sample_count: usize,
    byte_order: ByteOrder,
    gain_mask: u16,
) -> Result<SampleBuffer, MseedError> {
    let le = byte_order.is_le();
    decode_fixed(payload, sample_count, 2, |b| {
        let b: [u8; 2] = b.try_into().unwrap();
        let word = if le {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        };
        let mantissa = (word & 0x0FFF) as f64;
        let gain = ((word >> 12) & gain_mask) as f64;
        ((mantissa - 2048.0) / gain.exp2()) as f32
    })
    .map(SampleBuffer::Float32)
}

/// Encode a sample buffer with a fixed-width or text encoding.
///
/// Steim encodings have their own entry points in [`crate::steim`], since they
/// compress and need a frame budget; asking for them here is an error.
pub fn encode_samples(
    encoding: DataEncoding,
    samples: &SampleBuffer,
    byte_order: ByteOrder,
) -> Result<Vec<u8>, MseedError> {
    let le = byte_order.is_le();
    let mismatch = || MseedError::EncodingMismatch {
        encoding,
        sample_type: samples.sample_type().as_char(),
    };
    match (encoding, samples) {
        (DataEncoding::Text, SampleBuffer::Text(bytes)) => Ok(bytes.clone()),
        (DataEncoding::Int16, SampleBuffer::Int32(values)) => values
            .iter()
            .map(|&v| {
                let v = i16::try_from(v).map_err(|_| MseedError::EncodingMismatch {
                    encoding,
                    sample_type: 'i',
                })?;
                Ok(if le { v.to_le_bytes() } else { v.to_be_bytes() })
            })
            .collect::<Result<Vec<_>, MseedError>>()
            .map(|chunks| chunks.concat()),
        (DataEncoding::Int32, SampleBuffer::Int32(values)) => Ok(values
            .iter()
            .flat_map(|v| {
                if le {
                    v.to_le_bytes()
                } else {
                    v.to_be_bytes()
                }
            })
            .collect()),
        (DataEncoding::Float32, SampleBuffer::Float32(values)) => Ok(values
            .iter()
            .flat_map(|v| {
                if le {
                    v.to_le_bytes()
                } else {
                    v.to_be_bytes()
                }
            })
            .collect()),
        (DataEncoding::Float64, SampleBuffer::Float64(values)) => Ok(values
            .iter()
            .flat_map(|v| {
                if le {
                    v.to_le_bytes()
                } else {
                    v.to_be_bytes()
                }
            })
            .collect()),
        (DataEncoding::Steim1, _) | (DataEncoding::Steim2, _) => Err(MseedError::Unsupported {
            msg: "Steim encoding needs a frame budget; use the steim module".to_string(),
        }),
        _ => Err(mismatch()),
    }
}
