// Copyright (C) 2022 by GiGa infosystems
//! Steim-1 and Steim-2 difference compression.
//!
//! A compressed payload is a whole number of 64-byte frames of sixteen 32-bit
//! words. Word 0 of each frame holds sixteen 2-bit nibbles classifying the other
//! fifteen words (nibble 0 describes the nibble word itself and is always 0).
//! Word 1 of frame 0 is the forward integration constant X0, the first sample of
//! the block; word 2 of frame 0 is the reverse integration constant Xn, the last.
//!
//! The remaining words hold successive differences. The difference stream begins
//! with `d0 = S0 - 0`, so decoders that integrate from zero recover `S0` without
//! touching X0; this library takes `S0` from X0 directly and checks the last
//! integrated sample against Xn, failing hard on a mismatch.
//!
//! Packings per word, selected by the nibble (and for Steim-2 a further 2-bit
//! `dnib` in the word's top bits):
//!
//! - Steim-1: nibble 1 = 4 x 8-bit, nibble 2 = 2 x 16-bit, nibble 3 = 1 x 32-bit.
//! - Steim-2: nibble 1 = 4 x 8-bit; nibble 2 with dnib 1/2/3 = 1 x 30, 2 x 15,
//!   3 x 10 bits; nibble 3 with dnib 0/1/2 = 5 x 6, 6 x 5, 7 x 4 bits.
//!
//! Encoders pick the packing that holds the most pending differences, which
//! minimizes output, and accept a frame budget so a record packer can split a
//! sample run across records.
use crate::enums::ByteOrder;
use crate::errors::*;

use std::convert::TryInto;

/// The length in bytes of one Steim frame.
pub const FRAME_LEN: usize = 64;

const WORDS_PER_FRAME: usize = 16;

/// The result of encoding a run of samples into Steim frames.
#[derive(Debug, Clone)]
pub struct SteimEncoding {
    /// Whole frames, zero padded.
    pub payload: Vec<u8>,
    /// How many samples from the input were consumed. Less than the input
    /// length when the frame budget ran out.
    pub sample_count: usize,
}

fn read_word(frame: &[u8], word: usize, byte_order: ByteOrder) -> u32 {
    let bytes: [u8; 4] = frame[word * 4..word * 4 + 4].try_into().unwrap();
    if byte_order.is_le() {
        u32::from_le_bytes(bytes)
    } else {
        u32::from_be_bytes(bytes)
    }
}

/// Extract a signed field of the given width ending at bit `shift`.
fn extract(word: u32, shift: u32, bits: u32) -> i32 {
    (((word >> shift) << (32 - bits)) as i32) >> (32 - bits)
}

fn check_payload(payload: &[u8], sample_count: usize) -> Result<usize, MseedError> {
    if payload.is_empty() || payload.len() % FRAME_LEN != 0 {
        return Err(MseedError::BadLength { len: payload.len() });
    }
    if sample_count == 0 {
        return Err(MseedError::BadLength { len: 0 });
    }
    Ok(payload.len() / FRAME_LEN)
}

fn integrate(
    diffs: &[i32],
    x0: i32,
    xn: i32,
    sample_count: usize,
) -> Result<Vec<i32>, MseedError> {
    if diffs.len() < sample_count {
        return Err(MseedError::InvalidHeader {
            msg: format!(
                "payload holds {} differences for {} declared samples",
                diffs.len(),
                sample_count
            ),
        });
    }
    let mut samples = Vec::with_capacity(sample_count);
    samples.push(x0);
    let mut last = x0;
    for &diff in &diffs[1..sample_count] {
        last = last.wrapping_add(diff);
        samples.push(last);
    }
    if last != xn {
        return Err(MseedError::SteimXnMismatch {
            expected: xn,
            actual: last,
        });
    }
    Ok(samples)
}

/// Decode a Steim-1 payload into `sample_count` samples.
pub fn decode_steim1(
    payload: &[u8],
    sample_count: usize,
    byte_order: ByteOrder,
) -> Result<Vec<i32>, MseedError> {
    let num_frames = check_payload(payload, sample_count)?;
    let mut diffs: Vec<i32> = Vec::with_capacity(sample_count + 4);
    let mut x0 = 0i32;
    let mut xn = 0i32;

    for frame_idx in 0..num_frames {
        let frame = &payload[frame_idx * FRAME_LEN..(frame_idx + 1) * FRAME_LEN];
        let nibbles = read_word(frame, 0, byte_order);
        for word_idx in 1..WORDS_PER_FRAME {
            if frame_idx == 0 && (word_idx == 1 || word_idx == 2) {
                let value = read_word(frame, word_idx, byte_order) as i32;
                if word_idx == 1 {
                    x0 = value;
                } else {
                    xn = value;
                }
                continue;
            }
            let nibble = (nibbles >> (30 - 2 * word_idx)) & 0x3;
            let word = read_word(frame, word_idx, byte_order);
            match nibble {
                0 => {}
                1 => {
                    for k in 0..4u32 {
                        diffs.push(extract(word, 24 - 8 * k, 8));
                    }
                }
                2 => {
                    diffs.push(extract(word, 16, 16));
                    diffs.push(extract(word, 0, 16));
                }
                3 => diffs.push(word as i32),
                _ => unreachable!(),
            }
        }
    }
    integrate(&diffs, x0, xn, sample_count)
}

/// Decode a Steim-2 payload into `sample_count` samples.
pub fn decode_steim2(
    payload: &[u8],
    sample_count: usize,
    byte_order: ByteOrder,
) -> Result<Vec<i32>, MseedError> {
    let num_frames = check_payload(payload, sample_count)?;
    let mut diffs: Vec<i32> = Vec::with_capacity(sample_count + 8);
    let mut x0 = 0i32;
    let mut xn = 0i32;

    for frame_idx in 0..num_frames {
        let frame = &payload[frame_idx * FRAME_LEN..(frame_idx + 1) * FRAME_LEN];
        let nibbles = read_word(frame, 0, byte_order);
        for word_idx in 1..WORDS_PER_FRAME {
            if frame_idx == 0 && (word_idx == 1 || word_idx == 2) {
                let value = read_word(frame, word_idx, byte_order) as i32;
                if word_idx == 1 {
                    x0 = value;
                } else {
                    xn = value;
                }
                continue;
            }
            let nibble = (nibbles >> (30 - 2 * word_idx)) & 0x3;
            let word = read_word(frame, word_idx, byte_order);
            match nibble {
                0 => {}
                1 => {
                    for k in 0..4u32 {
                        diffs.push(extract(word, 24 - 8 * k, 8));
                    }
                }
                2 => match word >> 30 {
                    1 => diffs.push(extract(word, 0, 30)),
                    2 => {
                        diffs.push(extract(word, 15, 15));
                        diffs.push(extract(word, 0, 15));
                    }
                    3 => {
                        for k in 0..3u32 {
                            diffs.push(extract(word, 20 - 10 * k, 10));
                        }
                    }
                    _ => {
                        return Err(MseedError::SteimBadNibble {
                            nibble: (word >> 30) as u8,
                            word: frame_idx * WORDS_PER_FRAME + word_idx,
                        });
                    }
                },
                3 => match word >> 30 {
                    0 => {
                        for k in 0..5u32 {
                            diffs.push(extract(word, 24 - 6 * k, 6));
                        }
                    }
                    1 => {
                        for k in 0..6u32 {
                            diffs.push(extract(word, 25 - 5 * k, 5));
                        }
                    }
                    2 => {
                        for k in 0..7u32 {
                            diffs.push(extract(word, 24 - 4 * k, 4));
                        }
                    }
                    _ => {
                        return Err(MseedError::SteimBadNibble {
                            nibble: 3,
                            word: frame_idx * WORDS_PER_FRAME + word_idx,
                        });
                    }
                },
                _ => unreachable!(),
            }
        }
    }
    integrate(&diffs, x0, xn, sample_count)
}

// ---------------------------------------------------------------------------
// Encoding.
// ---------------------------------------------------------------------------

/// One way of packing pending differences into a payload word.
struct Packing {
    count: usize,
    bits: u32,
    nibble: u32,
    /// The Steim-2 sub-nibble stored in the word's top bits, or `None`.
    dnib: Option<u32>,
}

const STEIM1_PACKINGS: [Packing; 3] = [
    Packing { count: 4, bits: 8, nibble: 1, dnib: None },
    Packing { count: 2, bits: 16, nibble: 2, dnib: None },
    Packing { count: 1, bits: 32, nibble: 3, dnib: None },
];

const STEIM2_PACKINGS: [Packing; 7] = [
    Packing { count: 7, bits: 4, nibble: 3, dnib: Some(2) },
    Packing { count: 6, bits: 5, nibble: 3, dnib: Some(1) },
    Packing { count: 5, bits: 6, nibble: 3, dnib: Some(0) },
    Packing { count: 4, bits: 8, nibble: 1, dnib: None },
    Packing { count: 3, bits: 10, nibble: 2, dnib: Some(3) },
    Packing { count: 2, bits: 15, nibble: 2, dnib: Some(2) },
    Packing { count: 1, bits: 30, nibble: 2, dnib: Some(1) },
];

fn fits(diff: i32, bits: u32) -> bool {
    if bits >= 32 {
        return true;
    }
    let limit = 1i32 << (bits - 1);
    (-limit..limit).contains(&diff)
}

/// Choose the packing that consumes the most pending differences, and build the
/// word. Steim-2 differences wider than 30 bits cannot be represented.
fn pack_word(diffs: &[i32], packings: &[Packing]) -> Result<(usize, u32, u32), MseedError> {
    for packing in packings {
        if diffs.len() < packing.count {
            continue;
        }
        if !diffs[..packing.count].iter().all(|d| fits(*d, packing.bits)) {
            continue;
        }
        let mut word = match packing.dnib {
            Some(dnib) => dnib << 30,
            None => 0,
        };
        let mask = if packing.bits >= 32 {
            u32::MAX
        } else {
            (1u32 << packing.bits) - 1
        };
        for (i, diff) in diffs[..packing.count].iter().enumerate() {
            let shift = packing.bits * (packing.count - 1 - i) as u32;
            word |= (*diff as u32 & mask) << shift;
        }
        return Ok((packing.count, packing.nibble, word));
    }
    Err(MseedError::SteimRange {
        diff: diffs[0] as i64,
    })
}

/// Successive differences with `d0 = S0`. Computed wrapping, which the Steim-1
/// 32-bit packing decodes exactly; narrower packings only see differences that
/// passed a range check, where wrapping cannot have occurred.
fn differences(samples: &[i32]) -> Vec<i32> {
    let mut prev = 0i32;
    samples
        .iter()
        .map(|&s| {
            let diff = s.wrapping_sub(prev);
            prev = s;
            diff
        })
        .collect()
}

fn encode(
    samples: &[i32],
    max_frames: usize,
    byte_order: ByteOrder,
    packings: &[Packing],
    steim2: bool,
) -> Result<SteimEncoding, MseedError> {
    if samples.is_empty() {
        return Err(MseedError::BadLength { len: 0 });
    }
    let diffs = differences(samples);
    if steim2 {
        // A difference beyond 30 bits has no representation; fail up front so
        // no partial frame set is emitted.
        for (i, &diff) in diffs.iter().enumerate() {
            let true_diff = if i == 0 {
                samples[0] as i64
            } else {
                samples[i] as i64 - samples[i - 1] as i64
            };
            if true_diff != diff as i64 || !fits(diff, 30) {
                return Err(MseedError::SteimRange { diff: true_diff });
            }
        }
    }

    let mut frames: Vec<[u32; 16]> = Vec::new();
    let mut current = [0u32; 16];
    let mut word_idx = 3; // frame 0 reserves X0 and Xn
    current[1] = samples[0] as u32;
    let mut consumed = 0usize;

    while consumed < diffs.len() {
        if word_idx == WORDS_PER_FRAME {
            if max_frames > 0 && frames.len() + 1 >= max_frames {
                break;
            }
            frames.push(current);
            current = [0u32; 16];
            word_idx = 1;
        }
        let (count, nibble, word) = pack_word(&diffs[consumed..], packings)?;
        current[0] |= nibble << (30 - 2 * word_idx);
        current[word_idx] = word;
        word_idx += 1;
        consumed += count;
    }
    frames.push(current);
    frames[0][2] = samples[consumed - 1] as u32;

    let mut payload = Vec::with_capacity(frames.len() * FRAME_LEN);
    for frame in &frames {
        for word in frame.iter() {
            let bytes = if byte_order.is_le() {
                word.to_le_bytes()
            } else {
                word.to_be_bytes()
            };
            payload.extend_from_slice(&bytes);
        }
    }
    Ok(SteimEncoding {
        payload,
        sample_count: consumed,
    })
}

/// Encode samples as Steim-1 frames. `max_frames` of 0 means unlimited.
pub fn encode_steim1(
    samples: &[i32],
    max_frames: usize,
    byte_order: ByteOrder,
) -> Result<SteimEncoding, MseedError> {
    encode(samples, max_frames, byte_order, &STEIM1_PACKINGS, false)
}

/// Encode samples as Steim-2 frames. `max_frames` of 0 means unlimited.
pub fn encode_steim2(
    samples: &[i32],
    max_frames: usize,
    byte_order: ByteOrder,
) -> Result<SteimEncoding, MseedError> {
    encode(samples, max_frames, byte_order, &STEIM2_PACKINGS, true)
}
