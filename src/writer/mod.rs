//! DEX container generation.
//!
//! This module provides [`DexWriter`], which turns a class graph into complete, checksummed
//! containers. Generation is a strictly ordered sequence of phases; each phase only consumes
//! values produced by the ones before it, so no offset is ever guessed and patched later.
//!
//! # Generation Process
//!
//! 1. **Discover**: [`SectionManager::discover`] interns every string, type, prototype, field,
//!    method, type list, static value array and annotation reachable from the classes, then
//!    freezes and sorts the pools.
//! 2. **Index layout**: the id sections have fixed record sizes, so their offsets and the start
//!    of the data section follow from the pool sizes alone.
//! 3. **Data**: string data, type lists, static value arrays, annotation items, annotation sets,
//!    set reference lists, annotation directories, code items, class data and the map list are
//!    streamed into the data section in that order.
//! 4. **Index**: string, type, prototype, field and method ids and class definitions are written
//!    with the now known data offsets.
//! 5. **Assemble**: both regions are copied into an [`Output`] and the header is written.
//! 6. **Seal**: the SHA-1 signature over `[32..]` is stored first, then the Adler-32 checksum
//!    over `[12..]`, which covers the signature.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::prelude::*;
//!
//! let class = ClassDef::new("LHello;", AccessFlags::PUBLIC)
//!     .with_superclass("Ljava/lang/Object;")
//!     .with_field(
//!         Field::new("answer", "I", AccessFlags::PUBLIC | AccessFlags::STATIC)
//!             .with_initial_value(EncodedValue::Byte(42)),
//!     );
//!
//! let bytes = DexWriter::new().write(&[class])?;
//! let header = DexHeader::read(&bytes)?;
//! assert_eq!(header.class_defs_size, 1);
//! assert_eq!(header.checksum, dexscope::writer::checksum(&bytes)?);
//! # Ok::<(), dexscope::Error>(())
//! ```

pub mod annotations;
pub mod classes;
pub mod code;
pub mod config;
pub mod map;
pub mod output;
pub mod placement;
pub mod pool;
pub mod sections;
pub mod stream;

pub use config::WriterConfig;
pub use output::Output;
pub use placement::{DexPlacement, SingleDex};
pub use sections::SectionManager;

use std::{collections::HashMap, path::Path};

use log::{debug, trace};
use sha1::{Digest, Sha1};

use crate::{
    file::header::{
        magic_for_version, DexHeader, CHECKSUM_OFFSET, ENDIAN_CONSTANT, HEADER_SIZE,
        SIGNATURE_END, SIGNATURE_OFFSET,
    },
    metadata::{
        class::ClassDef, reference::ReferenceIndexer, types::MethodRef, value::encode_array,
    },
    utils::{mutf8, to_u32},
    writer::{
        annotations::{
            write_annotation_directories, write_annotation_items, write_annotation_set_ref_lists,
            write_annotation_sets,
        },
        classes::{write_class_data, write_class_def, ClassOffsets},
        code::write_code_item,
        map::{MapItemType, MapList},
        placement::partition,
        stream::ByteStream,
    },
    Error, Result,
};

/// Writes class graphs as DEX containers.
///
/// The placement policy only matters for [`DexWriter::write_all`]; [`DexWriter::write`] and
/// [`DexWriter::write_to_file`] put every class into one container.
///
/// # Examples
///
/// ```rust
/// use dexscope::prelude::*;
///
/// let classes = [
///     ClassDef::new("Lapp/Main;", AccessFlags::PUBLIC),
///     ClassDef::new("Llib/Util;", AccessFlags::PUBLIC),
/// ];
///
/// let by_package = |class: &ClassDef| usize::from(class.descriptor.starts_with("Llib/"));
/// let archives = DexWriter::new().with_placement(by_package).write_all(&classes)?;
/// assert_eq!(archives.len(), 2);
/// # Ok::<(), dexscope::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DexWriter<P = SingleDex> {
    config: WriterConfig,
    placement: P,
}

impl DexWriter {
    /// Creates a writer with the default configuration and a single output archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with the given configuration and a single output archive.
    #[must_use]
    pub fn with_config(config: WriterConfig) -> Self {
        DexWriter {
            config,
            placement: SingleDex,
        }
    }
}

impl<P: DexPlacement> DexWriter<P> {
    /// Replaces the placement policy used by [`DexWriter::write_all`].
    #[must_use]
    pub fn with_placement<Q: DexPlacement>(self, placement: Q) -> DexWriter<Q> {
        DexWriter {
            config: self.config,
            placement,
        }
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Writes all classes into one in-memory container.
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] or [`crate::Error::MalformedTryRange`] with
    /// the identity of the offending method or class, [`crate::Error::InvalidOperand`] and
    /// [`crate::Error::Malformed`] for operands and sizes that do not fit their encoding, and
    /// [`crate::Error::UnsupportedEncodedValueType`] for unencodable constants.
    pub fn write(&self, classes: &[ClassDef]) -> Result<Vec<u8>> {
        let classes: Vec<&ClassDef> = classes.iter().collect();
        let image = self.layout(&classes)?;

        let output = Output::create_in_memory(u64::from(image.header.file_size))?;
        let output = image.assemble(output)?;
        output.into_vec(None)
    }

    /// Writes all classes into one container at `path`.
    ///
    /// The file is created only once the layout succeeded, and removed again if assembling
    /// the container fails.
    ///
    /// # Errors
    /// The errors of [`DexWriter::write`], plus [`crate::Error::MmapFailed`] and
    /// [`crate::Error::FinalizationFailed`] for filesystem failures.
    pub fn write_to_file<Q: AsRef<Path>>(&self, path: Q, classes: &[ClassDef]) -> Result<()> {
        let classes: Vec<&ClassDef> = classes.iter().collect();
        let image = self.layout(&classes)?;

        let output = Output::create(&path, u64::from(image.header.file_size))?;
        let output = image.assemble(output)?;
        debug!("Wrote {}", path.as_ref().display());
        output.finalize(None)
    }

    /// Writes one container per archive index the placement assigns classes to, in ascending
    /// index order.
    ///
    /// Every archive has its own pools; a class referencing a class placed elsewhere simply
    /// carries that reference as an external type.
    ///
    /// # Errors
    /// The errors of [`DexWriter::write`], for the first archive that fails.
    pub fn write_all(&self, classes: &[ClassDef]) -> Result<Vec<Vec<u8>>> {
        let groups = partition(&self.placement, classes);
        let mut archives = Vec::with_capacity(groups.len());

        for (archive, members) in groups {
            debug!("Archive {archive}: {} classes", members.len());
            let image = self.layout(&members)?;
            let output = Output::create_in_memory(u64::from(image.header.file_size))?;
            archives.push(image.assemble(output)?.into_vec(None)?);
        }

        Ok(archives)
    }

    fn layout(&self, classes: &[&ClassDef]) -> Result<Image> {
        let mut sections = SectionManager::discover(classes, &self.config)?;
        let index = IndexLayout::new(&sections)?;
        debug!("Data section at {:#x}", index.data_off);

        let data = write_data(&mut sections, &index, &self.config)?;
        let ids = write_index(&sections, &index, &data)?;
        if ids.position()? != index.data_off {
            return Err(malformed_error!(
                "Index sections end at {:#x}, expected {:#x}",
                ids.position()?,
                index.data_off
            ));
        }

        let data_size = to_u32(data.stream.len())?;
        let file_size = index
            .data_off
            .checked_add(data_size)
            .ok_or_else(|| malformed_error!("Container exceeds u32::MAX bytes"))?;
        debug!("Container size {file_size:#x}, data size {data_size:#x}");

        Ok(Image {
            header: index.header(&self.config, data.map_off, data_size, file_size),
            ids,
            data: data.stream,
        })
    }
}

/// Stores the SHA-1 signature and then the Adler-32 checksum of a complete container.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the header.
pub fn seal(data: &mut [u8]) -> Result<()> {
    let digest = signature(data)?;
    data[SIGNATURE_OFFSET..SIGNATURE_END].copy_from_slice(&digest);

    let adler = checksum(data)?;
    data[CHECKSUM_OFFSET..SIGNATURE_OFFSET].copy_from_slice(&adler.to_le_bytes());
    Ok(())
}

/// SHA-1 over everything after the signature field.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the header.
pub fn signature(data: &[u8]) -> Result<[u8; 20]> {
    if data.len() < HEADER_SIZE as usize {
        return Err(Error::OutOfBounds);
    }
    let mut digest = [0u8; 20];
    digest.copy_from_slice(&Sha1::digest(&data[SIGNATURE_END..]));
    Ok(digest)
}

/// Adler-32 over everything after the checksum field.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the header.
pub fn checksum(data: &[u8]) -> Result<u32> {
    if data.len() < HEADER_SIZE as usize {
        return Err(Error::OutOfBounds);
    }
    Ok(adler32::RollingAdler32::from_buffer(&data[SIGNATURE_OFFSET..]).hash())
}

/// Laid out container, waiting to be copied into an output.
struct Image {
    header: DexHeader,
    ids: ByteStream,
    data: ByteStream,
}

impl Image {
    fn assemble(self, mut output: Output) -> Result<Output> {
        output.write_at(u64::from(self.ids.base()), self.ids.as_slice())?;
        output.write_at(u64::from(self.data.base()), self.data.as_slice())?;
        self.header.write(output.as_mut_slice())?;
        seal(output.as_mut_slice())?;
        Ok(output)
    }
}

/// Count and offset of one index section.
#[derive(Debug, Clone, Copy, Default)]
struct IdSection {
    count: u32,
    offset: u32,
}

/// Offsets of the fixed-size index sections, which all precede the data section.
#[derive(Debug, Clone, Copy)]
struct IndexLayout {
    strings: IdSection,
    types: IdSection,
    protos: IdSection,
    fields: IdSection,
    methods: IdSection,
    classes: IdSection,
    call_sites: IdSection,
    method_handles: IdSection,
    data_off: u32,
}

impl IndexLayout {
    fn new(sections: &SectionManager<'_>) -> Result<Self> {
        let mut next = HEADER_SIZE;
        let mut place = |count: usize, record_size: u32| -> Result<IdSection> {
            let count = to_u32(count)?;
            if count == 0 {
                return Ok(IdSection::default());
            }
            let offset = next;
            next = count
                .checked_mul(record_size)
                .and_then(|size| next.checked_add(size))
                .ok_or_else(|| malformed_error!("Index sections exceed u32::MAX bytes"))?;
            Ok(IdSection { count, offset })
        };

        let strings = place(sections.strings.len(), 4)?;
        let types = place(sections.types.len(), 4)?;
        let protos = place(sections.protos.len(), 12)?;
        let fields = place(sections.fields.len(), 8)?;
        let methods = place(sections.methods.len(), 8)?;
        let classes = place(sections.classes().len(), to_u32(classes::CLASS_DEF_SIZE)?)?;
        let call_sites = place(sections.call_sites.len(), 4)?;
        let method_handles = place(sections.method_handles.len(), 8)?;

        Ok(IndexLayout {
            strings,
            types,
            protos,
            fields,
            methods,
            classes,
            call_sites,
            method_handles,
            data_off: next,
        })
    }

    fn add_to_map(&self, map: &mut MapList) -> Result<()> {
        map.add(MapItemType::Header, 1, 0)?;
        for (item_type, section) in [
            (MapItemType::StringId, self.strings),
            (MapItemType::TypeId, self.types),
            (MapItemType::ProtoId, self.protos),
            (MapItemType::FieldId, self.fields),
            (MapItemType::MethodId, self.methods),
            (MapItemType::ClassDef, self.classes),
            (MapItemType::CallSiteId, self.call_sites),
            (MapItemType::MethodHandle, self.method_handles),
        ] {
            map.add(item_type, section.count as usize, section.offset)?;
        }
        Ok(())
    }

    fn header(
        &self,
        config: &WriterConfig,
        map_off: u32,
        data_size: u32,
        file_size: u32,
    ) -> DexHeader {
        DexHeader {
            magic: magic_for_version(config.dex_version),
            checksum: 0,
            signature: [0; 20],
            file_size,
            header_size: HEADER_SIZE,
            endian_tag: ENDIAN_CONSTANT,
            link_size: 0,
            link_off: 0,
            map_off,
            string_ids_size: self.strings.count,
            string_ids_off: self.strings.offset,
            type_ids_size: self.types.count,
            type_ids_off: self.types.offset,
            proto_ids_size: self.protos.count,
            proto_ids_off: self.protos.offset,
            field_ids_size: self.fields.count,
            field_ids_off: self.fields.offset,
            method_ids_size: self.methods.count,
            method_ids_off: self.methods.offset,
            class_defs_size: self.classes.count,
            class_defs_off: self.classes.offset,
            data_size,
            data_off: self.data_off,
        }
    }
}

/// Data section and the offsets the index sections need from it.
struct DataLayout {
    stream: ByteStream,
    string_offsets: Vec<u32>,
    directories: Vec<u32>,
    class_data: Vec<u32>,
    map_off: u32,
}

/// Records the first offset and the number of items of a data section.
#[derive(Default)]
struct Extent {
    first: Option<u32>,
    count: usize,
}

impl Extent {
    fn record(&mut self, offset: u32) {
        self.first.get_or_insert(offset);
        self.count += 1;
    }

    fn add_to_map(&self, map: &mut MapList, item_type: MapItemType) -> Result<()> {
        match self.first {
            Some(offset) => map.add(item_type, self.count, offset),
            None => Ok(()),
        }
    }
}

fn begin_section(stream: &mut ByteStream, name: &str) -> Result<()> {
    stream.align(4);
    debug_assert!(stream.is_aligned(4));
    trace!("Section {name} at {:#x}", stream.position()?);
    Ok(())
}

fn write_data(
    sections: &mut SectionManager<'_>,
    index: &IndexLayout,
    config: &WriterConfig,
) -> Result<DataLayout> {
    let mut stream = ByteStream::new(index.data_off);
    let mut map = MapList::new();
    index.add_to_map(&mut map)?;

    begin_section(&mut stream, "string_data")?;
    let mut strings = Extent::default();
    let mut string_offsets = Vec::with_capacity(sections.strings.len());
    for value in sections.strings.iter() {
        let offset = stream.position()?;
        strings.record(offset);
        string_offsets.push(offset);
        stream.write_uleb128(to_u32(mutf8::utf16_len(value))?);
        stream.write_bytes(&mutf8::encode(value));
        stream.write_u8(0);
    }
    strings.add_to_map(&mut map, MapItemType::StringData)?;

    begin_section(&mut stream, "type_list")?;
    write_type_lists(&mut stream, sections)?;
    map.add(
        MapItemType::TypeList,
        sections.type_lists.len(),
        sections.type_lists.offset_at(0).unwrap_or(0),
    )?;

    begin_section(&mut stream, "encoded_array")?;
    let mut offsets = Vec::with_capacity(sections.encoded_arrays.len());
    for values in sections.encoded_arrays.iter() {
        offsets.push(stream.position()?);
        encode_array(values, &*sections, stream.buffer())?;
    }
    for (item, offset) in offsets.into_iter().enumerate() {
        sections.encoded_arrays.set_offset(to_u32(item)?, offset);
    }
    map.add(
        MapItemType::EncodedArray,
        sections.encoded_arrays.len(),
        sections.encoded_arrays.offset_at(0).unwrap_or(0),
    )?;

    begin_section(&mut stream, "annotation_item")?;
    write_annotation_items(&mut stream, sections)?;
    begin_section(&mut stream, "annotation_set_item")?;
    write_annotation_sets(&mut stream, sections)?;
    begin_section(&mut stream, "annotation_set_ref_list")?;
    write_annotation_set_ref_lists(&mut stream, sections)?;
    for (item_type, count, first) in [
        (
            MapItemType::Annotation,
            sections.annotations.len(),
            sections.annotations.offset_at(0),
        ),
        (
            MapItemType::AnnotationSet,
            sections.annotation_sets.len(),
            sections.annotation_sets.offset_at(0),
        ),
        (
            MapItemType::AnnotationSetRefList,
            sections.annotation_set_ref_lists.len(),
            sections.annotation_set_ref_lists.offset_at(0),
        ),
    ] {
        map.add(item_type, count, first.unwrap_or(0))?;
    }

    let sections: &SectionManager<'_> = sections;

    begin_section(&mut stream, "annotations_directory_item")?;
    let (directories, written) = write_annotation_directories(&mut stream, sections)?;
    if let Some(first) = directories.iter().copied().filter(|offset| *offset != 0).min() {
        map.add(MapItemType::AnnotationsDirectory, written, first)?;
    }

    begin_section(&mut stream, "code_item")?;
    let mut code = Extent::default();
    let mut code_offsets: HashMap<MethodRef, u32> = HashMap::new();
    for class in sections.classes() {
        for method in &class.methods {
            let Some(body) = &method.body else {
                continue;
            };
            let reference = class.method_ref(method);
            let offset = write_code_item(&mut stream, method, body, sections, config)
                .map_err(|e| e.within(&reference.to_string()))?;
            code.record(offset);
            code_offsets.insert(reference, offset);
        }
    }
    code.add_to_map(&mut map, MapItemType::Code)?;

    begin_section(&mut stream, "class_data_item")?;
    let mut class_data_extent = Extent::default();
    let mut class_data = Vec::with_capacity(sections.classes().len());
    for class in sections.classes() {
        let offset = write_class_data(&mut stream, class, sections, &code_offsets)
            .map_err(|e| e.within(&class.descriptor))?;
        if offset != 0 {
            class_data_extent.record(offset);
        }
        class_data.push(offset);
    }
    class_data_extent.add_to_map(&mut map, MapItemType::ClassData)?;

    let map_off = map.write(&mut stream)?;
    debug!(
        "Data section: {} bytes, {} code items, map at {map_off:#x}",
        stream.len(),
        code.count
    );

    Ok(DataLayout {
        stream,
        string_offsets,
        directories,
        class_data,
        map_off,
    })
}

fn write_type_lists(stream: &mut ByteStream, sections: &mut SectionManager<'_>) -> Result<()> {
    let mut offsets = Vec::with_capacity(sections.type_lists.len());
    for list in sections.type_lists.iter() {
        stream.align(4);
        offsets.push(stream.position()?);
        stream.write_u32(to_u32(list.len())?);
        for descriptor in list {
            stream.write_u16(narrow(sections.type_index(descriptor)?, "type")?);
        }
    }

    for (index, offset) in offsets.into_iter().enumerate() {
        sections.type_lists.set_offset(to_u32(index)?, offset);
    }
    Ok(())
}

fn write_index(
    sections: &SectionManager<'_>,
    index: &IndexLayout,
    data: &DataLayout,
) -> Result<ByteStream> {
    let mut stream = ByteStream::new(HEADER_SIZE);

    for offset in &data.string_offsets {
        stream.write_u32(*offset);
    }

    for descriptor in sections.types.iter() {
        stream.write_u32(sections.string_index(descriptor)?);
    }

    for proto in sections.protos.iter() {
        stream.write_u32(sections.string_index(&proto.shorty())?);
        stream.write_u32(sections.type_index(&proto.return_type)?);
        stream.write_u32(if proto.parameters.is_empty() {
            0
        } else {
            sections.type_lists.offset_of(&proto.parameters)?
        });
    }

    for field in sections.fields.iter() {
        stream.write_u16(narrow(sections.type_index(&field.class)?, "type")?);
        stream.write_u16(narrow(sections.type_index(&field.type_)?, "type")?);
        stream.write_u32(sections.string_index(&field.name)?);
    }

    for method in sections.methods.iter() {
        stream.write_u16(narrow(sections.type_index(&method.class)?, "type")?);
        stream.write_u16(narrow(sections.proto_index(&method.proto)?, "proto")?);
        stream.write_u32(sections.string_index(&method.name)?);
    }

    for (position, class) in sections.classes().iter().enumerate() {
        let static_values = class.static_values();
        let offsets = ClassOffsets {
            interfaces: if class.interfaces.is_empty() {
                0
            } else {
                sections.type_lists.offset_of(&class.interfaces)?
            },
            annotations: data.directories[position],
            class_data: data.class_data[position],
            static_values: if static_values.is_empty() {
                0
            } else {
                sections.encoded_arrays.offset_of(&static_values)?
            },
        };
        write_class_def(&mut stream, class, sections, offsets)
            .map_err(|e| e.within(&class.descriptor))?;
    }

    trace!(
        "Index sections: {} strings, {} classes, {} bytes",
        index.strings.count,
        index.classes.count,
        stream.len()
    );
    Ok(stream)
}

/// Narrows a pool index into a 16-bit record field.
fn narrow(index: u32, pool: &str) -> Result<u16> {
    u16::try_from(index)
        .map_err(|_| malformed_error!("{} index {} does not fit 16 bits", pool, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{opcodes, Instruction, Operand},
        metadata::{
            access::AccessFlags,
            class::Field,
            method::{Method, MethodBody},
            reference::{Reference, ReferenceKind},
            types::Proto,
            value::EncodedValue,
        },
    };

    fn header_of(bytes: &[u8]) -> DexHeader {
        DexHeader::read(bytes).unwrap()
    }

    fn sample() -> ClassDef {
        let body = MethodBody::from_instructions([Instruction::new(
            opcodes::RETURN_VOID,
            vec![],
            Operand::None,
        )
        .unwrap()]);
        ClassDef::new("LSample;", AccessFlags::PUBLIC)
            .with_superclass("Ljava/lang/Object;")
            .with_field(
                Field::new("value", "I", AccessFlags::PUBLIC | AccessFlags::STATIC)
                    .with_initial_value(EncodedValue::Byte(42)),
            )
            .with_method(
                Method::new(
                    "voidMethod",
                    Proto::new("V", Vec::<String>::new()),
                    AccessFlags::PUBLIC | AccessFlags::STATIC,
                )
                .with_body(body),
            )
    }

    #[test]
    fn empty_container_has_header_and_map() {
        let bytes = DexWriter::new().write(&[]).unwrap();
        let header = header_of(&bytes);

        assert_eq!(&bytes[..8], b"dex\n035\0");
        assert_eq!(header.file_size as usize, bytes.len());
        assert_eq!(header.data_off, HEADER_SIZE);
        assert_eq!(header.map_off, HEADER_SIZE);
        assert_eq!(header.string_ids_off, 0);
        // map: count, header entry, map entry
        assert_eq!(bytes.len(), 0x70 + 4 + 2 * 12);
    }

    #[test]
    fn header_sections_are_consistent() {
        let bytes = DexWriter::new().write(&[sample()]).unwrap();
        let header = header_of(&bytes);

        assert_eq!(header.string_ids_off, HEADER_SIZE);
        assert_eq!(header.class_defs_size, 1);
        assert_eq!(header.field_ids_size, 1);
        assert_eq!(header.method_ids_size, 1);
        assert_eq!(header.data_size, header.file_size - header.data_off);
        assert_eq!(header.map_off % 4, 0);
        assert_eq!(
            header.data_off,
            header.class_defs_off + 0x20 * header.class_defs_size
        );
    }

    #[test]
    fn seal_matches_recomputation() {
        let bytes = DexWriter::new().write(&[sample()]).unwrap();
        let header = header_of(&bytes);

        assert_eq!(header.signature, signature(&bytes).unwrap());
        assert_eq!(header.checksum, checksum(&bytes).unwrap());
    }

    #[test]
    fn config_version_in_magic() {
        let writer = DexWriter::with_config(WriterConfig::new().with_dex_version(39));
        let bytes = writer.write(&[]).unwrap();
        assert_eq!(&bytes[..8], b"dex\n039\0");
    }

    #[test]
    fn dangling_reference_names_method() {
        let body = MethodBody::from_instructions([Instruction::new(
            opcodes::CONST_STRING,
            vec![0],
            Operand::Reference(Reference::Index {
                kind: ReferenceKind::String,
                index: 7,
            }),
        )
        .unwrap()]);
        let class = ClassDef::new("LA;", AccessFlags::PUBLIC).with_method(
            Method::new(
                "m",
                Proto::new("V", Vec::<String>::new()),
                AccessFlags::STATIC,
            )
            .with_registers(1)
            .with_body(body),
        );

        match DexWriter::new().write(&[class]) {
            Err(Error::DanglingReference(message)) => {
                assert!(message.contains("string@7"), "{message}");
                assert!(message.contains("LA;->m()V"), "{message}");
            }
            other => panic!("expected a dangling reference, got {other:?}"),
        }
    }

    #[test]
    fn write_all_splits_archives() {
        let classes = [
            ClassDef::new("LA;", AccessFlags::PUBLIC),
            ClassDef::new("LB;", AccessFlags::PUBLIC),
        ];
        let writer = DexWriter::new().with_placement(|class: &ClassDef| {
            usize::from(class.descriptor == "LB;")
        });
        let archives = writer.write_all(&classes).unwrap();

        assert_eq!(archives.len(), 2);
        for archive in &archives {
            assert_eq!(header_of(archive).class_defs_size, 1);
        }
    }

    #[test]
    fn write_to_file_matches_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.dex");

        let writer = DexWriter::new();
        writer.write_to_file(&path, &[sample()]).unwrap();
        assert_eq!(
            std::fs::read(&path).unwrap(),
            writer.write(&[sample()]).unwrap()
        );
    }
}
