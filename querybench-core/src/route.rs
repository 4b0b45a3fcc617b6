//! Consistent Key Routing
//!
//! Maps a routing key to a lane with 32-bit FNV-1a. The mapping depends only
//! on the key bytes and the lane count, so every job for a key lands on the
//! same lane for the lifetime of a dispatcher.

/// FNV-1a 32-bit offset basis
pub const FNV_OFFSET_BASIS_32: u32 = 0x811c_9dc5;

/// FNV-1a 32-bit prime
pub const FNV_PRIME_32: u32 = 0x0100_0193;

/// Hash a byte sequence with 32-bit FNV-1a.
#[inline]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS_32, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME_32)
    })
}

/// Lane index for `key` among `lanes` lanes.
///
/// `lanes` of 0 is treated as 1.
#[inline]
pub fn lane_index(key: &str, lanes: usize) -> usize {
    fnv1a_32(key.as_bytes()) as usize % lanes.max(1)
}
