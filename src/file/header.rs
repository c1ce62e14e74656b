//! DEX file header reading and writing.
//!
//! This module defines [`DexHeader`], the fixed 0x70 byte structure at the start of every DEX
//! container. The writer fills it in after the layout is known; [`DexHeader::read`] reads it back
//! from a finished buffer for inspection.
//!
//! # Layout
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0x00 | magic `dex\n035\0` |
//! | 0x08 | Adler-32 checksum of `[0x0C..]` |
//! | 0x0C | SHA-1 signature of `[0x20..]` |
//! | 0x20 | file size, header size, endian tag |
//! | 0x2C | link size/offset, map offset |
//! | 0x38 | six (count, offset) pairs for the index sections |
//! | 0x68 | data size, data offset |

use crate::{
    file::{
        io::{read_le_at, write_le_at},
        parser::Parser,
    },
    Error::OutOfBounds,
    Result,
};

/// Size of the header in bytes.
pub const HEADER_SIZE: u32 = 0x70;

/// Value of the endian tag field for little-endian containers.
pub const ENDIAN_CONSTANT: u32 = 0x1234_5678;

/// Sentinel used for absent indices (superclass, source file).
pub const NO_INDEX: u32 = 0xFFFF_FFFF;

/// Offset of the Adler-32 checksum field.
pub const CHECKSUM_OFFSET: usize = 8;

/// Offset of the SHA-1 signature field.
pub const SIGNATURE_OFFSET: usize = 12;

/// First byte covered by the signature.
pub const SIGNATURE_END: usize = 32;

/// Builds the eight magic bytes for a three digit format version, e.g. `35` gives `dex\n035\0`.
#[must_use]
pub fn magic_for_version(version: u16) -> [u8; 8] {
    let digits = version.min(999);
    [
        b'd',
        b'e',
        b'x',
        b'\n',
        b'0' + u8::try_from(digits / 100).unwrap_or(0),
        b'0' + u8::try_from((digits / 10) % 10).unwrap_or(0),
        b'0' + u8::try_from(digits % 10).unwrap_or(0),
        0,
    ]
}

/// The header of a DEX container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DexHeader {
    /// `dex\n` followed by three version digits and a NUL
    pub magic: [u8; 8],
    /// Adler-32 of everything after this field
    pub checksum: u32,
    /// SHA-1 of everything after this field
    pub signature: [u8; 20],
    /// Total size of the container in bytes
    pub file_size: u32,
    /// Always 0x70
    pub header_size: u32,
    /// Always `ENDIAN_CONSTANT`
    pub endian_tag: u32,
    /// Size of the link section, always 0
    pub link_size: u32,
    /// Offset of the link section, always 0
    pub link_off: u32,
    /// Offset of the map list
    pub map_off: u32,
    /// Number of string ids
    pub string_ids_size: u32,
    /// Offset of the string ids, 0 when empty
    pub string_ids_off: u32,
    /// Number of type ids
    pub type_ids_size: u32,
    /// Offset of the type ids, 0 when empty
    pub type_ids_off: u32,
    /// Number of proto ids
    pub proto_ids_size: u32,
    /// Offset of the proto ids, 0 when empty
    pub proto_ids_off: u32,
    /// Number of field ids
    pub field_ids_size: u32,
    /// Offset of the field ids, 0 when empty
    pub field_ids_off: u32,
    /// Number of method ids
    pub method_ids_size: u32,
    /// Offset of the method ids, 0 when empty
    pub method_ids_off: u32,
    /// Number of class definitions
    pub class_defs_size: u32,
    /// Offset of the class definitions, 0 when empty
    pub class_defs_off: u32,
    /// Size of the data section
    pub data_size: u32,
    /// Offset of the data section
    pub data_off: u32,
}

impl DexHeader {
    /// Read a header from the start of `data`.
    ///
    /// # Arguments
    /// * `data` - The container bytes, at least 0x70 long
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data is too short, or
    /// [`crate::Error::Malformed`] if the magic, header size or endian tag are wrong.
    pub fn read(data: &[u8]) -> Result<DexHeader> {
        if data.len() < HEADER_SIZE as usize {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(data);
        let mut magic = [0u8; 8];
        magic.copy_from_slice(parser.read_bytes(8)?);
        if &magic[..4] != b"dex\n" || magic[7] != 0 {
            return Err(malformed_error!("Invalid DEX magic - {:02x?}", magic));
        }

        let checksum = parser.read_le::<u32>()?;
        let mut signature = [0u8; 20];
        signature.copy_from_slice(parser.read_bytes(20)?);

        let file_size = parser.read_le::<u32>()?;
        let header_size = parser.read_le::<u32>()?;
        if header_size != HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid header size: expected 0x70, got 0x{:x}",
                header_size
            ));
        }

        let endian_tag = parser.read_le::<u32>()?;
        if endian_tag != ENDIAN_CONSTANT {
            return Err(malformed_error!(
                "Unsupported endian tag 0x{:08x}",
                endian_tag
            ));
        }

        Ok(DexHeader {
            magic,
            checksum,
            signature,
            file_size,
            header_size,
            endian_tag,
            link_size: parser.read_le::<u32>()?,
            link_off: parser.read_le::<u32>()?,
            map_off: parser.read_le::<u32>()?,
            string_ids_size: parser.read_le::<u32>()?,
            string_ids_off: parser.read_le::<u32>()?,
            type_ids_size: parser.read_le::<u32>()?,
            type_ids_off: parser.read_le::<u32>()?,
            proto_ids_size: parser.read_le::<u32>()?,
            proto_ids_off: parser.read_le::<u32>()?,
            field_ids_size: parser.read_le::<u32>()?,
            field_ids_off: parser.read_le::<u32>()?,
            method_ids_size: parser.read_le::<u32>()?,
            method_ids_off: parser.read_le::<u32>()?,
            class_defs_size: parser.read_le::<u32>()?,
            class_defs_off: parser.read_le::<u32>()?,
            data_size: parser.read_le::<u32>()?,
            data_off: parser.read_le::<u32>()?,
        })
    }

    /// Write the header into the first 0x70 bytes of `data`.
    ///
    /// Checksum and signature are written as stored; the writer patches them afterwards.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the header.
    pub fn write(&self, data: &mut [u8]) -> Result<()> {
        if data.len() < HEADER_SIZE as usize {
            return Err(OutOfBounds);
        }

        data[..8].copy_from_slice(&self.magic);
        let mut offset = CHECKSUM_OFFSET;
        write_le_at(data, &mut offset, self.checksum)?;
        data[SIGNATURE_OFFSET..SIGNATURE_END].copy_from_slice(&self.signature);
        offset = SIGNATURE_END;

        for value in [
            self.file_size,
            self.header_size,
            self.endian_tag,
            self.link_size,
            self.link_off,
            self.map_off,
            self.string_ids_size,
            self.string_ids_off,
            self.type_ids_size,
            self.type_ids_off,
            self.proto_ids_size,
            self.proto_ids_off,
            self.field_ids_size,
            self.field_ids_off,
            self.method_ids_size,
            self.method_ids_off,
            self.class_defs_size,
            self.class_defs_off,
            self.data_size,
            self.data_off,
        ] {
            write_le_at(data, &mut offset, value)?;
        }

        Ok(())
    }

    /// Returns the numeric format version encoded in the magic, e.g. 35.
    #[must_use]
    pub fn version(&self) -> u16 {
        self.magic[4..7]
            .iter()
            .fold(0u16, |acc, digit| acc * 10 + u16::from(digit.wrapping_sub(b'0') % 10))
    }

    /// Reads the stored checksum of a finished container without parsing the whole header.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data is too short.
    pub fn stored_checksum(data: &[u8]) -> Result<u32> {
        let mut offset = CHECKSUM_OFFSET;
        read_le_at::<u32>(data, &mut offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_digits() {
        assert_eq!(&magic_for_version(35), b"dex\n035\0");
        assert_eq!(&magic_for_version(39), b"dex\n039\0");
    }

    #[test]
    fn write_then_read() {
        let header = DexHeader {
            magic: magic_for_version(35),
            checksum: 0xDEAD_BEEF,
            signature: [7; 20],
            file_size: 0x200,
            header_size: HEADER_SIZE,
            endian_tag: ENDIAN_CONSTANT,
            map_off: 0x1F0,
            string_ids_size: 3,
            string_ids_off: 0x70,
            data_size: 0x184,
            data_off: 0x7C,
            ..Default::default()
        };

        let mut data = vec![0u8; 0x70];
        header.write(&mut data).unwrap();
        assert_eq!(&data[..8], b"dex\n035\0");
        assert_eq!(&data[0x20..0x24], &[0x00, 0x02, 0x00, 0x00]);

        let parsed = DexHeader::read(&data).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.version(), 35);
        assert_eq!(DexHeader::stored_checksum(&data).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn read_rejects_bad_magic() {
        let mut data = vec![0u8; 0x70];
        data[..8].copy_from_slice(b"dey\n035\0");
        assert!(DexHeader::read(&data).is_err());
        assert!(matches!(DexHeader::read(&data[..10]), Err(OutOfBounds)));
    }
}
