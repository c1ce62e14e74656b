//! Mathematical utility functions.

use crate::Result;

/// Converts a `usize` to `u32` for DEX serialization, returning an error if the value
/// exceeds `u32::MAX`. Every offset and count in a container is a 32-bit field.
///
/// # Errors
///
/// Returns an error if `value` exceeds `u32::MAX`.
pub fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| malformed_error!("DEX serialization value {value} exceeds u32::MAX"))
}

/// Converts a `usize` to `u16`, used for register counts, try counts and 16-bit pool indices.
///
/// # Errors
///
/// Returns an error if `value` exceeds `u16::MAX`.
pub fn to_u16(value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| malformed_error!("Value {value} exceeds u16::MAX"))
}

/// Rounds `value` up to the next multiple of `alignment` (a power of two).
#[must_use]
pub fn align_to(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// Appends zero bytes to `buffer` until its length is a multiple of `alignment`.
pub fn pad_to(buffer: &mut Vec<u8>, alignment: usize) {
    let target = align_to(buffer.len(), alignment);
    buffer.resize(target, 0);
}
