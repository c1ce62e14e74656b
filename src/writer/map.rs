//! The map list: an index of every section in the container.

use strum::{Display, FromRepr};

use crate::{utils::to_u32, writer::stream::ByteStream, Result};

/// Item type codes of map list entries.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, FromRepr)]
#[repr(u16)]
pub enum MapItemType {
    Header = 0x0000,
    StringId = 0x0001,
    TypeId = 0x0002,
    ProtoId = 0x0003,
    FieldId = 0x0004,
    MethodId = 0x0005,
    ClassDef = 0x0006,
    CallSiteId = 0x0007,
    MethodHandle = 0x0008,
    MapList = 0x1000,
    TypeList = 0x1001,
    AnnotationSetRefList = 0x1002,
    AnnotationSet = 0x1003,
    ClassData = 0x2000,
    Code = 0x2001,
    StringData = 0x2002,
    DebugInfo = 0x2003,
    Annotation = 0x2004,
    EncodedArray = 0x2005,
    AnnotationsDirectory = 0x2006,
    HiddenApiClassData = 0xF000,
}

/// One map list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapItem {
    /// Section kind
    pub item_type: MapItemType,
    /// Number of items in the section
    pub size: u32,
    /// Offset of the first item
    pub offset: u32,
}

/// Collects the non-empty sections and writes the map list.
#[derive(Debug, Clone, Default)]
pub struct MapList {
    items: Vec<MapItem>,
}

impl MapList {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a section. Empty sections are skipped.
    pub fn add(&mut self, item_type: MapItemType, size: usize, offset: u32) -> Result<()> {
        if size > 0 {
            self.items.push(MapItem {
                item_type,
                size: to_u32(size)?,
                offset,
            });
        }
        Ok(())
    }

    /// Recorded entries in ascending offset order.
    #[must_use]
    pub fn items(&self) -> Vec<MapItem> {
        let mut items = self.items.clone();
        items.sort_by_key(|item| (item.offset, item.item_type));
        items
    }

    /// Writes the map list at the current, 4-byte aligned position, including an entry for the
    /// map itself. Returns the map offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the offset exceeds 32 bits.
    pub fn write(mut self, stream: &mut ByteStream) -> Result<u32> {
        stream.align(4);
        let offset = stream.position()?;
        self.add(MapItemType::MapList, 1, offset)?;

        let items = self.items();
        stream.write_u32(to_u32(items.len())?);
        for item in items {
            stream.write_u16(item.item_type as u16);
            stream.write_u16(0);
            stream.write_u32(item.size);
            stream.write_u32(item.offset);
        }
        Ok(offset)
    }
}
