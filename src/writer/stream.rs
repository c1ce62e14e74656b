//! Sequential byte stream for one region of the container.
//!
//! The writer lays out the data section and the index sections in separate streams, each
//! knowing the file offset it starts at. Items record [`ByteStream::position`] before they are
//! written; values that are only known later are patched in place.

use crate::{
    utils::{pad_to, to_u32, write_sleb128, write_uleb128},
    Error, Result,
};

/// A growable byte buffer placed at a fixed file offset.
#[derive(Debug, Clone)]
pub struct ByteStream {
    base: u32,
    bytes: Vec<u8>,
}

impl ByteStream {
    /// Creates an empty stream starting at file offset `base`.
    #[must_use]
    pub fn new(base: u32) -> Self {
        ByteStream {
            base,
            bytes: Vec::new(),
        }
    }

    /// File offset of the first byte.
    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    /// File offset of the next byte to be written.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the offset exceeds 32 bits.
    pub fn position(&self) -> Result<u32> {
        let len = to_u32(self.bytes.len())?;
        self.base
            .checked_add(len)
            .ok_or_else(|| malformed_error!("Stream position exceeds u32::MAX"))
    }

    /// Number of bytes written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Pads with zero bytes until the file offset is a multiple of `alignment`.
    ///
    /// The base itself must be aligned, which holds for every region of the container.
    pub fn align(&mut self, alignment: usize) {
        pad_to(&mut self.bytes, alignment);
    }

    /// Returns `true` if the file offset is a multiple of `alignment`.
    #[must_use]
    pub fn is_aligned(&self, alignment: u32) -> bool {
        self.position().is_ok_and(|pos| pos % alignment == 0)
    }

    /// Appends one byte.
    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    /// Appends a little-endian `u16`.
    pub fn write_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Appends a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Appends a ULEB128 value.
    pub fn write_uleb128(&mut self, value: u32) {
        write_uleb128(value, &mut self.bytes);
    }

    /// Appends a SLEB128 value.
    pub fn write_sleb128(&mut self, value: i32) {
        write_sleb128(value, &mut self.bytes);
    }

    /// Mutable access for encoders that append to a `Vec<u8>`.
    pub fn buffer(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    /// Overwrites a little-endian `u32` at a file offset inside this stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the four bytes are not inside the stream.
    pub fn patch_u32(&mut self, offset: u32, value: u32) -> Result<()> {
        let start = offset
            .checked_sub(self.base)
            .ok_or(Error::OutOfBounds)? as usize;
        let slot = self
            .bytes
            .get_mut(start..start + 4)
            .ok_or(Error::OutOfBounds)?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Written bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the stream and returns its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_include_base() {
        let mut stream = ByteStream::new(0x70);
        stream.write_u8(1);
        assert_eq!(stream.position().unwrap(), 0x71);
        stream.align(4);
        assert_eq!(stream.position().unwrap(), 0x74);
        assert!(stream.is_aligned(4));
    }

    #[test]
    fn patch_inside_stream() {
        let mut stream = ByteStream::new(0x100);
        stream.write_u32(0);
        stream.write_u16(0xFFFF);
        stream.patch_u32(0x100, 0xAABB_CCDD).unwrap();
        assert_eq!(stream.as_slice(), [0xDD, 0xCC, 0xBB, 0xAA, 0xFF, 0xFF]);

        assert!(matches!(stream.patch_u32(0xFC, 0), Err(Error::OutOfBounds)));
        assert!(matches!(stream.patch_u32(0x103, 0), Err(Error::OutOfBounds)));
    }
}
