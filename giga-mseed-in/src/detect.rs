//! Format detection: deciding whether a byte position starts a miniSEED record,
//! of which version, and for v2 in which byte order.
use giga_mseed_core::enums::ByteOrder;
use giga_mseed_core::FIXED_HEADER_LEN_V3;

use std::convert::TryInto;

/// What [`detect`] found at the start of a buffer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordDetection {
    /// Major version of the format detected, 2 or 3.
    pub format_version: u8,
    /// Size of the record in bytes. `None` when the length is not knowable
    /// from the fixed header alone (v2 needs blockette 1000, and a v3 header
    /// cut short cannot declare its lengths).
    pub rec_len: Option<usize>,
    /// Header byte order. Fixed little endian for v3; discovered from the
    /// year/day plausibility check for v2.
    pub byte_order: ByteOrder,
}

/// Determine if the buffer starts with a miniSEED record by verifying known
/// signatures (fields with known limited values). Returns `None` when it does
/// not.
///
/// - v3 starts `M`, `S`, 3.
/// - v2 has a sequence number of ASCII digits or spaces, a data-record
///   indicator of `D`/`R`/`Q`/`M` at byte 6, and a year in 1900..=2100 with a
///   day in 1..=366 at bytes 20..24 under one of the two byte orders; that
///   order is the header's.
pub fn detect(buf: &[u8]) -> Option<RecordDetection> {
    if buf.len() >= 3 && buf[0] == b'M' && buf[1] == b'S' && buf[2] == 3 {
        let rec_len = if buf.len() >= FIXED_HEADER_LEN_V3 {
            let id_len = buf[33] as usize;
            let eh_len = u16::from_le_bytes(buf[34..36].try_into().unwrap()) as usize;
            let payload_len = u32::from_le_bytes(buf[36..40].try_into().unwrap()) as usize;
            Some(FIXED_HEADER_LEN_V3 + id_len + eh_len + payload_len)
        } else {
            None
        };
        return Some(RecordDetection {
            format_version: 3,
            rec_len,
            byte_order: ByteOrder::Little,
        });
    }

    if buf.len() < 24 {
        return None;
    }
    let sequence_ok = buf[..6]
        .iter()
        .all(|b| b.is_ascii_digit() || *b == b' ' || *b == 0);
    let indicator_ok = matches!(buf[6], b'D' | b'R' | b'Q' | b'M');
    let separator_ok = matches!(buf[7], b' ' | 0);
    if !(sequence_ok && indicator_ok && separator_ok) {
        return None;
    }

    for &byte_order in &[ByteOrder::Big, ByteOrder::Little] {
        let year_bytes: [u8; 2] = buf[20..22].try_into().unwrap();
        let day_bytes: [u8; 2] = buf[22..24].try_into().unwrap();
        let (year, day) = if byte_order.is_le() {
            (u16::from_le_bytes(year_bytes), u16::from_le_bytes(day_bytes))
        } else {
            (u16::from_be_bytes(year_bytes), u16::from_be_bytes(day_bytes))
        };
        if (1900..=2100).contains(&year) && (1..=366).contains(&day) {
            return Some(RecordDetection {
                format_version: 2,
                rec_len: None,
                byte_order,
            });
        }
    }
    None
}
