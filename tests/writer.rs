//! Writer behavior: section sharing, annotation policy, code item details and output targets.

use dexscope::{
    writer::{map::MapItemType, SectionManager},
    prelude::*,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn u16_at(bytes: &[u8], offset: u32) -> u16 {
    let at = offset as usize;
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_at(bytes: &[u8], offset: u32) -> u32 {
    let at = offset as usize;
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

/// Map list entries as `(type, size, offset)`.
fn map_entries(bytes: &[u8]) -> Result<Vec<(MapItemType, u32, u32)>> {
    let header = DexHeader::read(bytes)?;
    let count = u32_at(bytes, header.map_off);
    Ok((0..count)
        .map(|index| {
            let entry = header.map_off + 4 + index * 12;
            (
                MapItemType::from_repr(u16_at(bytes, entry)).unwrap(),
                u32_at(bytes, entry + 4),
                u32_at(bytes, entry + 8),
            )
        })
        .collect())
}

fn section(bytes: &[u8], item_type: MapItemType) -> Option<(u32, u32)> {
    map_entries(bytes)
        .unwrap()
        .into_iter()
        .find(|entry| entry.0 == item_type)
        .map(|(_, size, offset)| (size, offset))
}

fn marker(descriptor: &str) -> Annotation {
    Annotation::new(
        AnnotationVisibility::Runtime,
        EncodedAnnotation::new(descriptor),
    )
}

fn static_method(name: &str, proto: Proto, body: MethodBody) -> Method {
    Method::new(name, proto, AccessFlags::PUBLIC | AccessFlags::STATIC).with_body(body)
}

fn body_of(instructions: Vec<Instruction>) -> MethodBody {
    MethodBody::from_instructions(instructions)
}

#[test]
fn identical_annotation_sets_are_written_once() -> Result<()> {
    init_logging();
    let class = ClassDef::new("LShared;", AccessFlags::PUBLIC)
        .with_annotation(marker("LMarker;"))
        .with_field(Field::new("a", "I", AccessFlags::PUBLIC).with_annotation(marker("LMarker;")))
        .with_field(Field::new("b", "I", AccessFlags::PUBLIC).with_annotation(marker("LMarker;")));

    let bytes = DexWriter::new().write(&[class])?;
    assert_eq!(section(&bytes, MapItemType::Annotation).map(|s| s.0), Some(1));
    assert_eq!(section(&bytes, MapItemType::AnnotationSet).map(|s| s.0), Some(1));
    assert_eq!(section(&bytes, MapItemType::AnnotationsDirectory).map(|s| s.0), Some(1));

    // Directory: class set, field count, method count, parameter count, then field entries
    let (_, directory) = section(&bytes, MapItemType::AnnotationsDirectory).unwrap();
    let (_, set) = section(&bytes, MapItemType::AnnotationSet).unwrap();
    assert_eq!(u32_at(&bytes, directory), set);
    assert_eq!(u32_at(&bytes, directory + 4), 2);
    assert_eq!(u32_at(&bytes, directory + 20), set);
    assert_eq!(u32_at(&bytes, directory + 28), set);
    Ok(())
}

fn parameter_annotated_class() -> Result<ClassDef> {
    let body = body_of(vec![Instruction::from_mnemonic(
        "return-void",
        vec![],
        Operand::None,
    )?]);
    Ok(ClassDef::new("LParams;", AccessFlags::PUBLIC).with_method(
        static_method("take", Proto::new("V", ["I", "I"]), body)
            .with_registers(2)
            .with_parameter_annotations(vec![vec![marker("LNonNull;")], Vec::new()]),
    ))
}

#[test]
fn unannotated_parameters_use_empty_set() -> Result<()> {
    let bytes = DexWriter::new().write(&[parameter_annotated_class()?])?;

    let (sets, first_set) = section(&bytes, MapItemType::AnnotationSet).unwrap();
    assert_eq!(sets, 2);
    // The empty set comes first
    assert_eq!(u32_at(&bytes, first_set), 0);

    let (_, list) = section(&bytes, MapItemType::AnnotationSetRefList).unwrap();
    assert_eq!(u32_at(&bytes, list), 2);
    assert_ne!(u32_at(&bytes, list + 4), 0);
    assert_eq!(u32_at(&bytes, list + 8), first_set);
    Ok(())
}

#[test]
fn unannotated_parameters_without_empty_set() -> Result<()> {
    let writer = DexWriter::with_config(WriterConfig::new().with_empty_annotation_set(false));
    let bytes = writer.write(&[parameter_annotated_class()?])?;

    let (sets, first_set) = section(&bytes, MapItemType::AnnotationSet).unwrap();
    assert_eq!(sets, 1);
    assert_eq!(u32_at(&bytes, first_set), 1);

    let (_, list) = section(&bytes, MapItemType::AnnotationSetRefList).unwrap();
    assert_eq!(u32_at(&bytes, list + 4), first_set);
    assert_eq!(u32_at(&bytes, list + 8), 0);
    Ok(())
}

#[test]
fn try_items_and_handlers() -> Result<()> {
    let mut body = MethodBody::new();
    let guarded = body.push(Instruction::from_mnemonic("const/4", vec![0], Operand::Literal(1))?);
    body.push(Instruction::from_mnemonic("return-void", vec![], Operand::None)?);
    let typed = body.push(Instruction::from_mnemonic("move-exception", vec![0], Operand::None)?);
    let any = body.push(Instruction::from_mnemonic("return-void", vec![], Operand::None)?);
    body.add_try(
        TryRange::new(guarded, guarded)
            .with_handler(CatchHandler::typed("Ljava/lang/Exception;", typed))
            .with_handler(CatchHandler::catch_all(any)),
    )?;

    let class = ClassDef::new("LTry;", AccessFlags::PUBLIC).with_method(
        static_method("run", Proto::new("V", Vec::<String>::new()), body).with_registers(1),
    );
    let bytes = DexWriter::new().write(&[class])?;

    let (_, code) = section(&bytes, MapItemType::Code).unwrap();
    assert_eq!(u16_at(&bytes, code), 1);
    assert_eq!(u16_at(&bytes, code + 6), 1);
    assert_eq!(u32_at(&bytes, code + 12), 4);

    // Four code units keep the try item aligned without padding
    let try_item = code + 16 + 8;
    assert_eq!(u32_at(&bytes, try_item), 0);
    assert_eq!(u16_at(&bytes, try_item + 4), 1);
    assert_eq!(u16_at(&bytes, try_item + 6), 1);

    // One list: one typed handler plus catch-all, type@1 at address 2, catch-all at 3.
    // Types sort as LTry;, Ljava/lang/Exception;, V.
    let handlers = (try_item + 8) as usize;
    assert_eq!(&bytes[handlers..handlers + 5], [0x01, 0x7F, 0x01, 0x02, 0x03]);
    Ok(())
}

#[test]
fn odd_code_length_is_padded_before_tries() -> Result<()> {
    let mut body = MethodBody::new();
    let only = body.push(Instruction::from_mnemonic("return-void", vec![], Operand::None)?);
    body.add_try(TryRange::new(only, only).with_handler(CatchHandler::catch_all(only)))?;

    let class = ClassDef::new("LPad;", AccessFlags::PUBLIC).with_method(static_method(
        "run",
        Proto::new("V", Vec::<String>::new()),
        body,
    ));
    let bytes = DexWriter::new().write(&[class])?;

    let (_, code) = section(&bytes, MapItemType::Code).unwrap();
    assert_eq!(u32_at(&bytes, code + 12), 1);
    assert_eq!(u16_at(&bytes, code + 18), 0);
    let try_item = code + 20;
    assert_eq!(u32_at(&bytes, try_item), 0);
    assert_eq!(u16_at(&bytes, try_item + 4), 1);
    // catch-all only: size 0 then the address
    let handlers = (try_item + 8) as usize;
    assert_eq!(&bytes[handlers..handlers + 3], [0x01, 0x00, 0x00]);
    Ok(())
}

fn calling_class(parameters: usize, registers: u16) -> Result<ClassDef> {
    let callee = MethodRef::new("LCallee;", "f", Proto::new("V", vec!["I"; parameters]));
    let argument_registers: Vec<u16> = (0..parameters as u16).collect();
    let invoke = if parameters > 5 { "invoke-static/range" } else { "invoke-static" };
    let body = body_of(vec![
        Instruction::from_mnemonic(
            invoke,
            argument_registers,
            Operand::Reference(Reference::Method(callee)),
        )?,
        Instruction::from_mnemonic("return-void", vec![], Operand::None)?,
    ]);
    Ok(ClassDef::new("LCaller;", AccessFlags::PUBLIC).with_method(
        static_method("call", Proto::new("V", Vec::<String>::new()), body)
            .with_registers(registers),
    ))
}

#[test]
fn large_outs_are_promoted_into_registers() -> Result<()> {
    let bytes = DexWriter::new().write(&[calling_class(6, 2)?])?;
    let (_, code) = section(&bytes, MapItemType::Code).unwrap();
    assert_eq!(u16_at(&bytes, code), 6);
    assert_eq!(u16_at(&bytes, code + 4), 6);

    let bytes = DexWriter::new().write(&[calling_class(3, 3)?])?;
    let (_, code) = section(&bytes, MapItemType::Code).unwrap();
    assert_eq!(u16_at(&bytes, code), 3);
    assert_eq!(u16_at(&bytes, code + 4), 3);

    let relaxed = DexWriter::with_config(WriterConfig::new().with_max_outs_promotion(8));
    let bytes = relaxed.write(&[calling_class(6, 2)?])?;
    let (_, code) = section(&bytes, MapItemType::Code).unwrap();
    assert_eq!(u16_at(&bytes, code), 2);
    Ok(())
}

#[test]
fn superclasses_are_written_first() -> Result<()> {
    let base = ClassDef::new("LBase;", AccessFlags::PUBLIC);
    let derived = ClassDef::new("LDerived;", AccessFlags::PUBLIC).with_superclass("LBase;");
    let duplicate = ClassDef::new("LDerived;", AccessFlags::PUBLIC | AccessFlags::FINAL);

    let bytes = DexWriter::new().write(&[derived, base, duplicate])?;
    let header = DexHeader::read(&bytes)?;
    assert_eq!(header.class_defs_size, 2);

    // Types sort as LBase;, LDerived;
    assert_eq!(u32_at(&bytes, header.class_defs_off), 0);
    assert_eq!(u32_at(&bytes, header.class_defs_off + 32), 1);
    assert_eq!(u32_at(&bytes, header.class_defs_off + 32 + 4), 0x1);
    assert_eq!(u32_at(&bytes, header.class_defs_off + 32 + 8), 0);
    Ok(())
}

#[test]
fn placement_splits_archives() -> Result<()> {
    let classes = [
        ClassDef::new("Lapp/Main;", AccessFlags::PUBLIC),
        ClassDef::new("Llib/Util;", AccessFlags::PUBLIC),
        ClassDef::new("Lapp/Other;", AccessFlags::PUBLIC),
    ];
    let writer = DexWriter::new()
        .with_placement(|class: &ClassDef| usize::from(class.descriptor.starts_with("Llib/")));
    let archives = writer.write_all(&classes)?;

    assert_eq!(archives.len(), 2);
    assert_eq!(DexHeader::read(&archives[0])?.class_defs_size, 2);
    assert_eq!(DexHeader::read(&archives[1])?.class_defs_size, 1);

    // Single-container writes ignore the placement
    assert_eq!(DexHeader::read(&writer.write(&classes)?)?.class_defs_size, 3);
    Ok(())
}

#[test]
fn file_output_matches_memory_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("classes.dex");
    let classes = [parameter_annotated_class()?];

    let writer = DexWriter::new();
    writer.write_to_file(&path, &classes)?;
    assert_eq!(std::fs::read(&path)?, writer.write(&classes)?);
    Ok(())
}

#[test]
fn frozen_pools_reject_additions() -> Result<()> {
    let class = parameter_annotated_class()?;
    let mut sections = SectionManager::discover(&[&class], &WriterConfig::default())?;

    assert!(sections.strings.is_frozen());
    assert!(matches!(
        sections.add_string("late"),
        Err(Error::FrozenPoolMutation("string"))
    ));
    assert!(matches!(
        sections.add_type("LLate;"),
        Err(Error::FrozenPoolMutation(_))
    ));
    Ok(())
}

#[test]
fn dangling_references_name_the_method() {
    let body = body_of(vec![Instruction::from_mnemonic(
        "const-string",
        vec![0],
        Operand::Reference(Reference::Index {
            kind: ReferenceKind::String,
            index: 99,
        }),
    )
    .unwrap()]);
    let class = ClassDef::new("LBroken;", AccessFlags::PUBLIC).with_method(
        static_method("load", Proto::new("V", Vec::<String>::new()), body).with_registers(1),
    );

    let error = DexWriter::new().write(&[class]).unwrap_err();
    assert!(error.to_string().contains("LBroken;->load()V"), "{error}");
}

#[test]
fn method_defined_twice_is_rejected() -> Result<()> {
    init_logging();
    let returns = || -> Result<MethodBody> {
        Ok(body_of(vec![Instruction::from_mnemonic(
            "return-void",
            vec![],
            Operand::None,
        )?]))
    };
    let no_args = Proto::new("V", Vec::<String>::new());
    let class = ClassDef::new("LTwice;", AccessFlags::PUBLIC)
        .with_method(static_method("run", no_args.clone(), returns()?))
        .with_method(static_method("run", no_args, returns()?));

    assert!(matches!(
        DexWriter::new().write(&[class]),
        Err(Error::Malformed { .. })
    ));
    Ok(())
}
