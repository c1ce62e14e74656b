//! End-to-end tests: build a class graph, write it, and read the container back.
//!
//! The reading side here is deliberately small: it follows header offsets with a [`Parser`]
//! and checks the bytes the writer produced for a single, fully known class.

use dexscope::{prelude::*, writer::map::MapItemType};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One class with a static int field initialized to 42 and a static `voidMethod()` that only
/// returns.
fn hello_class() -> Result<ClassDef> {
    let mut body = MethodBody::new();
    body.push(Instruction::from_mnemonic("return-void", vec![], Operand::None)?);

    Ok(ClassDef::new("LHello;", AccessFlags::PUBLIC)
        .with_superclass("Ljava/lang/Object;")
        .with_source_file("Hello.java")
        .with_field(
            Field::new("value", "I", AccessFlags::PUBLIC | AccessFlags::STATIC)
                .with_initial_value(infer_type(&UntypedValue::Int(42))?),
        )
        .with_method(
            Method::new(
                "voidMethod",
                Proto::new("V", Vec::<String>::new()),
                AccessFlags::PUBLIC | AccessFlags::STATIC,
            )
            .with_body(body),
        ))
}

fn u32_at(bytes: &[u8], offset: u32) -> u32 {
    let at = offset as usize;
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

#[test]
fn single_class_container() -> Result<()> {
    init_logging();
    let bytes = DexWriter::new().write(&[hello_class()?])?;
    let header = DexHeader::read(&bytes)?;

    assert_eq!(header.version(), 35);
    assert_eq!(header.file_size as usize, bytes.len());
    assert_eq!(header.field_ids_size, 1);
    assert_eq!(header.method_ids_size, 1);
    assert_eq!(header.class_defs_size, 1);
    assert_eq!(header.proto_ids_size, 1);

    // class_def: class, flags, superclass, interfaces, source, annotations, data, static values
    let class_def = header.class_defs_off;
    assert_eq!(u32_at(&bytes, class_def + 4), 0x1);
    assert_eq!(u32_at(&bytes, class_def + 12), 0);
    assert_eq!(u32_at(&bytes, class_def + 20), 0);

    let static_values = u32_at(&bytes, class_def + 28) as usize;
    assert_eq!(&bytes[static_values..static_values + 3], [0x01, 0x00, 0x2A]);

    let mut parser = Parser::new(&bytes);
    parser.seek(u32_at(&bytes, class_def + 24) as usize)?;
    let counts: Vec<u32> = (0..4)
        .map(|_| parser.read_uleb128())
        .collect::<Result<_>>()?;
    assert_eq!(counts, [1, 0, 1, 0]);
    assert_eq!(parser.read_uleb128()?, 0);
    assert_eq!(parser.read_uleb128()?, 0x9);
    assert_eq!(parser.read_uleb128()?, 0);
    assert_eq!(parser.read_uleb128()?, 0x9);
    let code_off = parser.read_uleb128()?;
    assert_eq!(code_off % 4, 0);

    parser.seek(code_off as usize)?;
    let registers = parser.read_le::<u16>()?;
    let ins = parser.read_le::<u16>()?;
    let outs = parser.read_le::<u16>()?;
    let tries = parser.read_le::<u16>()?;
    let debug_info = parser.read_le::<u32>()?;
    let insns_size = parser.read_le::<u32>()?;
    assert_eq!((registers, ins, outs, tries), (0, 0, 0, 0));
    assert_eq!(debug_info, 0);
    assert_eq!(insns_size, 1);
    assert_eq!(parser.read_le::<u16>()?, 0x000E);

    Ok(())
}

#[test]
fn string_pool_is_sorted_and_decodable() -> Result<()> {
    let bytes = DexWriter::new().write(&[hello_class()?])?;
    let header = DexHeader::read(&bytes)?;

    let mut parser = Parser::new(&bytes);
    let mut strings = Vec::new();
    for index in 0..header.string_ids_size {
        let data_off = u32_at(&bytes, header.string_ids_off + 4 * index);
        parser.seek(data_off as usize)?;
        let length = parser.read_uleb128()?;
        let value = parser.read_mutf8()?;
        assert_eq!(value.encode_utf16().count(), length as usize);
        strings.push(value);
    }

    let mut sorted = strings.clone();
    sorted.sort();
    assert_eq!(strings, sorted);
    for expected in ["LHello;", "Hello.java", "voidMethod", "value", "V", "I"] {
        assert!(strings.iter().any(|s| s == expected), "missing {expected}");
    }
    Ok(())
}

#[test]
fn map_list_is_sorted_and_complete() -> Result<()> {
    let bytes = DexWriter::new().write(&[hello_class()?])?;
    let header = DexHeader::read(&bytes)?;

    let mut parser = Parser::new(&bytes);
    parser.seek(header.map_off as usize)?;
    let count = parser.read_le::<u32>()?;

    let mut entries = Vec::new();
    for _ in 0..count {
        let item_type = parser.read_le::<u16>()?;
        parser.read_le::<u16>()?;
        let size = parser.read_le::<u32>()?;
        let offset = parser.read_le::<u32>()?;
        entries.push((MapItemType::from_repr(item_type).unwrap(), size, offset));
    }

    assert!(entries.windows(2).all(|pair| pair[0].2 < pair[1].2));
    assert_eq!(entries[0], (MapItemType::Header, 1, 0));
    assert_eq!(entries.last().unwrap().0, MapItemType::MapList);
    for item_type in [
        MapItemType::StringId,
        MapItemType::ClassDef,
        MapItemType::StringData,
        MapItemType::EncodedArray,
        MapItemType::Code,
        MapItemType::ClassData,
    ] {
        assert!(entries.iter().any(|entry| entry.0 == item_type), "{item_type}");
    }
    assert!(!entries.iter().any(|entry| entry.0 == MapItemType::AnnotationSet));
    Ok(())
}

#[test]
fn identical_graphs_produce_identical_bytes() -> Result<()> {
    let writer = DexWriter::new();
    let first = writer.write(&[hello_class()?])?;
    let second = writer.write(&[hello_class()?])?;
    assert_eq!(first, second);

    let header = DexHeader::read(&first)?;
    assert_eq!(header.checksum, dexscope::writer::checksum(&first)?);
    assert_eq!(header.signature, dexscope::writer::signature(&first)?);
    Ok(())
}

#[test]
fn checksum_detects_corruption() -> Result<()> {
    let mut bytes = DexWriter::new().write(&[hello_class()?])?;
    let stored = DexHeader::read(&bytes)?.checksum;

    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert_ne!(dexscope::writer::checksum(&bytes)?, stored);
    Ok(())
}
