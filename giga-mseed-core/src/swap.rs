// Copyright (C) 2022 by GiGa infosystems
//! In-place byte order reversal for 2, 4 and 8-byte quantities.
//!
//! The swaps go through unsigned integers of the matching width, so they work on any
//! alignment and make no assumptions about what the bytes represent. Reversal of an
//! 8-byte quantity is a full reversal of all eight bytes, not a pairwise swap of the
//! two 32-bit halves.

/// Reverse a 2-byte quantity in place.
pub fn gswap2(bytes: &mut [u8; 2]) {
    let v = u16::from_ne_bytes(*bytes);
    *bytes = v.swap_bytes().to_ne_bytes();
}

/// Reverse a 4-byte quantity in place.
pub fn gswap4(bytes: &mut [u8; 4]) {
    let v = u32::from_ne_bytes(*bytes);
    *bytes = v.swap_bytes().to_ne_bytes();
}

/// Reverse an 8-byte quantity in place.
pub fn gswap8(bytes: &mut [u8; 8]) {
    let v = u64::from_ne_bytes(*bytes);
    *bytes = v.swap_bytes().to_ne_bytes();
}

/// Whether the host stores multi-byte quantities least significant byte first.
pub fn host_is_le() -> bool {
    cfg!(target_endian = "little")
}
