//! Low-level byte stream parser for DEX structures.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary data
//! parser for reading the little-endian fixed-width fields and LEB128 varints that make up a DEX
//! container. It is used to read written containers back (see [`crate::file::header`]) and to
//! inspect individual items in tests and tooling.
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to specific position
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by specified bytes
//! - [`crate::file::parser::Parser::pos`] - Get current position
//! - [`crate::file::parser::Parser::align`] - Align to byte boundaries
//!
//! ## Data Access Methods
//! - [`crate::file::parser::Parser::read_le`] - Read primitive types (little-endian)
//! - [`crate::file::parser::Parser::read_uleb128`] - Read an unsigned LEB128 value
//! - [`crate::file::parser::Parser::read_sleb128`] - Read a signed LEB128 value
//! - [`crate::file::parser::Parser::read_mutf8`] - Read a NUL-terminated MUTF-8 string
//!
//! # Usage Examples
//!
//! ```rust
//! use dexscope::Parser;
//!
//! let data = [0x03, 0x00, 0xE5, 0x8E, 0x26, 0x7F];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_le::<u16>()?, 3);
//! assert_eq!(parser.read_uleb128()?, 624_485);
//! assert_eq!(parser.read_sleb128()?, -1);
//! # Ok::<(), dexscope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, DexIO},
    utils::mutf8,
    Error, Result,
};

/// A cursor over a byte slice for reading DEX structures.
///
/// The parser maintains an internal position and bounds-checks every read, so truncated or
/// malformed input surfaces as [`crate::Error::OutOfBounds`] or [`crate::Error::Malformed`]
/// instead of a panic.
///
/// # Examples
///
/// ```rust
/// use dexscope::Parser;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut parser = Parser::new(&data);
///
/// let first = parser.read_le::<u32>()?;
/// assert_eq!(first, 0x04030201);
///
/// parser.seek(6)?;
/// assert_eq!(parser.read_le::<u16>()?, 0x0807);
/// # Ok::<(), dexscope::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the data is allowed; reads from there fail.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the new position would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let end = self.calc_end_position(step)?;
        self.position = end;
        Ok(())
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data
    }

    /// Align the position to the next multiple of `alignment`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the aligned position would exceed the data length.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        if self.position + padding > self.data.len() {
            return Err(Error::OutOfBounds);
        }
        self.position += padding;
        Ok(())
    }

    /// Read a type `T` from the current position in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: DexIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read an unsigned LEB128 value of at most five bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data ends inside the value, or
    /// [`crate::Error::Malformed`] if the encoding is longer than five bytes.
    pub fn read_uleb128(&mut self) -> Result<u32> {
        let mut result: u32 = 0;
        for index in 0..5 {
            let byte = self.read_le::<u8>()?;
            result |= u32::from(byte & 0x7F) << (index * 7);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }

        Err(malformed_error!(
            "uleb128 at offset {} exceeds five bytes",
            self.position - 5
        ))
    }

    /// Read a signed LEB128 value of at most five bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data ends inside the value, or
    /// [`crate::Error::Malformed`] if the encoding is longer than five bytes.
    pub fn read_sleb128(&mut self) -> Result<i32> {
        let mut result: i32 = 0;
        let mut shift = 0;
        for _ in 0..5 {
            let byte = self.read_le::<u8>()?;
            result |= i32::from(byte & 0x7F) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                if shift < 32 && (byte & 0x40) != 0 {
                    result |= -1 << shift;
                }
                return Ok(result);
            }
        }

        Err(malformed_error!(
            "sleb128 at offset {} exceeds five bytes",
            self.position - 5
        ))
    }

    /// Read a NUL-terminated MUTF-8 string and decode it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no terminator is found, or
    /// [`crate::Error::Malformed`] for invalid MUTF-8 sequences.
    pub fn read_mutf8(&mut self) -> Result<String> {
        let start = self.position;
        let Some(length) = self.data[start..].iter().position(|&b| b == 0) else {
            return Err(Error::OutOfBounds);
        };

        let value = mutf8::decode(&self.data[start..start + length])?;
        self.position = start + length + 1;
        Ok(value)
    }

    /// Read a slice of bytes and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Get the number of bytes remaining from the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    fn calc_end_position(&self, length: usize) -> Result<usize> {
        let end = self
            .position
            .checked_add(length)
            .ok_or(Error::OutOfBounds)?;

        if end > self.data.len() {
            return Err(Error::OutOfBounds);
        }

        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_uleb128() {
        let test_cases = vec![
            (vec![0x00], 0),
            (vec![0x01], 1),
            (vec![0x7F], 127),
            (vec![0x80, 0x7F], 16256),
            (vec![0xE5, 0x8E, 0x26], 624_485),
            (vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F], 0xFFFF_FFFF),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_uleb128().unwrap(), expected);
            assert_eq!(parser.pos(), input.len());
        }
    }

    #[test]
    fn test_read_sleb128() {
        let test_cases = vec![
            (vec![0x00], 0),
            (vec![0x01], 1),
            (vec![0x7F], -1),
            (vec![0x80, 0x7F], -128),
            (vec![0x3F], 63),
            (vec![0x40], -64),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_sleb128().unwrap(), expected);
        }
    }

    #[test]
    fn test_read_uleb128_errors() {
        let mut parser = Parser::new(&[0x80]);
        assert!(matches!(parser.read_uleb128(), Err(Error::OutOfBounds)));

        let mut parser = Parser::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert!(matches!(
            parser.read_uleb128(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_read_mutf8() {
        let data = [0x61, 0x62, 0x00, 0xC0, 0x80, 0x00];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_mutf8().unwrap(), "ab");
        assert_eq!(parser.read_mutf8().unwrap(), "\0");
        assert!(!parser.has_more_data());
    }

    #[test]
    fn test_seek_and_align() {
        let data = [0u8; 8];
        let mut parser = Parser::new(&data);
        parser.advance_by(1).unwrap();
        parser.align(4).unwrap();
        assert_eq!(parser.pos(), 4);
        parser.seek(8).unwrap();
        assert!(parser.seek(9).is_err());
        assert_eq!(parser.remaining(), 0);
    }
}
