//! LEB128 variable-length integer encoding.
//!
//! DEX uses unsigned LEB128 for counts, indices and offsets inside data items, and signed LEB128
//! for catch handler list sizes. Values are at most 32 bits wide, so an encoding never exceeds
//! five bytes. Decoding lives on [`crate::file::parser::Parser`].

/// Appends the unsigned LEB128 encoding of `value` to `buffer`.
///
/// # Examples
///
/// ```rust
/// use dexscope::utils::write_uleb128;
///
/// let mut buffer = Vec::new();
/// write_uleb128(624_485, &mut buffer);
/// assert_eq!(buffer, [0xE5, 0x8E, 0x26]);
/// ```
pub fn write_uleb128(value: u32, buffer: &mut Vec<u8>) {
    let mut remaining = value;
    loop {
        let byte = (remaining & 0x7F) as u8;
        remaining >>= 7;
        if remaining == 0 {
            buffer.push(byte);
            return;
        }
        buffer.push(byte | 0x80);
    }
}

/// Appends the signed LEB128 encoding of `value` to `buffer`.
pub fn write_sleb128(value: i32, buffer: &mut Vec<u8>) {
    let mut remaining = value;
    loop {
        #[allow(clippy::cast_sign_loss)] // masked to seven bits
        let byte = (remaining & 0x7F) as u8;
        remaining >>= 7;
        let done = (remaining == 0 && byte & 0x40 == 0) || (remaining == -1 && byte & 0x40 != 0);
        if done {
            buffer.push(byte);
            return;
        }
        buffer.push(byte | 0x80);
    }
}

/// Returns the number of bytes the unsigned LEB128 encoding of `value` occupies.
#[must_use]
pub fn uleb128_size(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x001F_FFFF => 3,
        0x0020_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}
