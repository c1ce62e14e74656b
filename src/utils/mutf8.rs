//! Modified UTF-8 as used by DEX string data.
//!
//! MUTF-8 differs from standard UTF-8 in two ways: the NUL character is written as the two byte
//! sequence `C0 80`, and characters outside the Basic Multilingual Plane are written as a UTF-16
//! surrogate pair, each half encoded as its own three byte sequence.

use std::cmp::Ordering;

use crate::Result;

/// Encodes `value` as MUTF-8, without the trailing terminator.
///
/// # Examples
///
/// ```rust
/// use dexscope::utils::mutf8;
///
/// assert_eq!(mutf8::encode("a\0"), [0x61, 0xC0, 0x80]);
/// ```
#[must_use]
pub fn encode(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/// Returns the length of `value` in UTF-16 code units, the count stored before string data.
#[must_use]
pub fn utf16_len(value: &str) -> usize {
    value.encode_utf16().count()
}

/// Compares two strings by their UTF-16 code units, the order of the string pool.
///
/// This differs from `str` ordering for characters above U+FFFF, whose surrogates sort below
/// U+E000..=U+FFFF.
///
/// ```rust
/// use std::cmp::Ordering;
/// use dexscope::utils::mutf8::utf16_cmp;
///
/// assert_eq!(utf16_cmp("\u{10000}", "\u{FFFF}"), Ordering::Less);
/// assert_eq!("\u{10000}".cmp("\u{FFFF}"), Ordering::Greater);
/// ```
#[must_use]
pub fn utf16_cmp(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

/// Decodes MUTF-8 bytes (without terminator) into a string.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for truncated sequences or unpaired surrogates.
pub fn decode(data: &[u8]) -> Result<String> {
    let mut units = Vec::with_capacity(data.len());
    let mut index = 0;
    while index < data.len() {
        let first = u16::from(data[index]);
        let (unit, consumed) = match data[index] >> 4 {
            0x0..=0x7 => (first, 1),
            0xC | 0xD => {
                let second = continuation(data, index + 1)?;
                (((first & 0x1F) << 6) | second, 2)
            }
            0xE => {
                let second = continuation(data, index + 1)?;
                let third = continuation(data, index + 2)?;
                (((first & 0x0F) << 12) | (second << 6) | third, 3)
            }
            _ => {
                return Err(malformed_error!(
                    "Invalid MUTF-8 lead byte 0x{:02x} at {}",
                    first,
                    index
                ))
            }
        };
        units.push(unit);
        index += consumed;
    }

    String::from_utf16(&units).map_err(|_| malformed_error!("Unpaired surrogate in MUTF-8 data"))
}

fn continuation(data: &[u8], index: usize) -> Result<u16> {
    match data.get(index) {
        Some(&byte) if byte & 0xC0 == 0x80 => Ok(u16::from(byte & 0x3F)),
        _ => Err(malformed_error!(
            "Truncated MUTF-8 sequence at offset {}",
            index
        )),
    }
}
