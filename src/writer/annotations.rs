//! Annotation items, annotation sets, set reference lists and annotation directories.
//!
//! Each layer refers to the one before it by offset, so they are written in this order:
//! items, sets (offsets of items), set reference lists (offsets of sets) and directories
//! (offsets of sets and reference lists).

use std::collections::HashMap;

use log::trace;

use crate::{
    metadata::{class::ClassDef, reference::ReferenceIndexer},
    utils::to_u32,
    writer::{
        sections::{sorted_set, SectionManager},
        stream::ByteStream,
    },
    Result,
};

/// Writes every annotation item and records its offset.
///
/// # Errors
/// Returns [`crate::Error::DanglingReference`] if an annotation names an unpooled entity.
pub fn write_annotation_items(
    stream: &mut ByteStream,
    sections: &mut SectionManager<'_>,
) -> Result<()> {
    let mut offsets = Vec::with_capacity(sections.annotations.len());
    for annotation in sections.annotations.iter() {
        offsets.push(stream.position()?);
        annotation.encode(&*sections, stream.buffer())?;
    }

    for (index, offset) in offsets.into_iter().enumerate() {
        sections.annotations.set_offset(to_u32(index)?, offset);
    }
    Ok(())
}

/// Writes every annotation set and records its offset.
///
/// # Errors
/// Returns [`crate::Error::DanglingReference`] if a member annotation was not written.
pub fn write_annotation_sets(
    stream: &mut ByteStream,
    sections: &mut SectionManager<'_>,
) -> Result<()> {
    let mut offsets = Vec::with_capacity(sections.annotation_sets.len());
    for set in sections.annotation_sets.iter() {
        stream.align(4);
        offsets.push(stream.position()?);
        stream.write_u32(to_u32(set.len())?);
        for annotation in set {
            stream.write_u32(sections.annotations.offset_of(annotation)?);
        }
    }

    for (index, offset) in offsets.into_iter().enumerate() {
        sections.annotation_sets.set_offset(to_u32(index)?, offset);
    }
    Ok(())
}

/// Writes every annotation set reference list and records its offset.
///
/// Parameters without annotations point at the empty set when one was reserved, otherwise at 0.
///
/// # Errors
/// Returns [`crate::Error::DanglingReference`] if a member set was not written.
pub fn write_annotation_set_ref_lists(
    stream: &mut ByteStream,
    sections: &mut SectionManager<'_>,
) -> Result<()> {
    let empty_set = sections
        .annotation_sets
        .index_of(&Vec::new())
        .and_then(|index| sections.annotation_sets.offset_at(index))
        .unwrap_or(0);

    let mut offsets = Vec::with_capacity(sections.annotation_set_ref_lists.len());
    for list in sections.annotation_set_ref_lists.iter() {
        stream.align(4);
        offsets.push(stream.position()?);
        stream.write_u32(to_u32(list.len())?);
        for set in list {
            stream.write_u32(if set.is_empty() {
                empty_set
            } else {
                sections.annotation_sets.offset_of(set)?
            });
        }
    }

    for (index, offset) in offsets.into_iter().enumerate() {
        sections
            .annotation_set_ref_lists
            .set_offset(to_u32(index)?, offset);
    }
    Ok(())
}

/// Writes the annotation directories of the archive's classes.
///
/// Returns the directory offset of every class, in class order (0 for classes without
/// annotations), and the number of directories written. Directories that only carry class
/// annotations are shared between classes with the same class annotation set.
///
/// # Errors
/// Returns [`crate::Error::DanglingReference`] if a set, member or reference list is missing.
pub fn write_annotation_directories(
    stream: &mut ByteStream,
    sections: &SectionManager<'_>,
) -> Result<(Vec<u32>, usize)> {
    let mut class_only: HashMap<u32, u32> = HashMap::new();
    let mut offsets = Vec::with_capacity(sections.classes().len());
    let mut written = 0;

    for class in sections.classes() {
        let class_set = if class.annotations.is_empty() {
            0
        } else {
            sections
                .annotation_sets
                .offset_of(&sorted_set(&class.annotations))?
        };

        if !class.has_member_annotations() {
            if class_set == 0 {
                offsets.push(0);
                continue;
            }
            if let Some(shared) = class_only.get(&class_set) {
                offsets.push(*shared);
                continue;
            }
        }

        stream.align(4);
        let offset = stream.position()?;
        write_directory(stream, class, class_set, sections)?;
        if !class.has_member_annotations() {
            class_only.insert(class_set, offset);
        }
        trace!("Annotation directory of {} at {offset:#x}", class.descriptor);
        offsets.push(offset);
        written += 1;
    }

    Ok((offsets, written))
}

fn write_directory(
    stream: &mut ByteStream,
    class: &ClassDef,
    class_set: u32,
    sections: &SectionManager<'_>,
) -> Result<()> {
    let mut fields = Vec::new();
    for field in class.fields.iter().filter(|f| !f.annotations.is_empty()) {
        fields.push((
            sections.field_index(&class.field_ref(field))?,
            sections
                .annotation_sets
                .offset_of(&sorted_set(&field.annotations))?,
        ));
    }

    let mut methods = Vec::new();
    let mut parameters = Vec::new();
    for method in &class.methods {
        let index = sections.method_index(&class.method_ref(method))?;
        if !method.annotations.is_empty() {
            methods.push((
                index,
                sections
                    .annotation_sets
                    .offset_of(&sorted_set(&method.annotations))?,
            ));
        }
        if method.has_parameter_annotations() {
            let list: Vec<_> = method
                .parameter_annotations
                .iter()
                .map(|set| sorted_set(set))
                .collect();
            parameters.push((index, sections.annotation_set_ref_lists.offset_of(&list)?));
        }
    }

    fields.sort_unstable();
    methods.sort_unstable();
    parameters.sort_unstable();

    stream.write_u32(class_set);
    stream.write_u32(to_u32(fields.len())?);
    stream.write_u32(to_u32(methods.len())?);
    stream.write_u32(to_u32(parameters.len())?);
    for (index, offset) in fields.iter().chain(&methods).chain(&parameters) {
        stream.write_u32(*index);
        stream.write_u32(*offset);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{
            access::AccessFlags,
            annotation::{Annotation, AnnotationVisibility, EncodedAnnotation},
            method::Method,
            types::Proto,
        },
        writer::config::WriterConfig,
    };

    fn marker(descriptor: &str) -> Annotation {
        Annotation::new(AnnotationVisibility::Runtime, EncodedAnnotation::new(descriptor))
    }

    fn write_all(sections: &mut SectionManager<'_>, stream: &mut ByteStream) -> (Vec<u32>, usize) {
        write_annotation_items(stream, sections).unwrap();
        write_annotation_sets(stream, sections).unwrap();
        write_annotation_set_ref_lists(stream, sections).unwrap();
        write_annotation_directories(stream, sections).unwrap()
    }

    #[test]
    fn class_only_directories_are_shared() {
        let a = ClassDef::new("LA;", AccessFlags::PUBLIC).with_annotation(marker("LM;"));
        let b = ClassDef::new("LB;", AccessFlags::PUBLIC).with_annotation(marker("LM;"));
        let c = ClassDef::new("LC;", AccessFlags::PUBLIC);
        let mut sections =
            SectionManager::discover(&[&a, &b, &c], &WriterConfig::default()).unwrap();

        let mut stream = ByteStream::new(0x1000);
        let (offsets, written) = write_all(&mut sections, &mut stream);

        assert_eq!(written, 1);
        assert_eq!(offsets[0], offsets[1]);
        assert_eq!(offsets[2], 0);
    }

    #[test]
    fn parameter_annotations_use_empty_set() {
        let method = Method::new("m", Proto::new("V", ["I", "I"]), AccessFlags::STATIC)
            .with_parameter_annotations(vec![Vec::new(), vec![marker("LP;")]]);
        let class = ClassDef::new("LA;", AccessFlags::PUBLIC).with_method(method);
        let mut sections = SectionManager::discover(&[&class], &WriterConfig::default()).unwrap();

        let mut stream = ByteStream::new(0x1000);
        let (offsets, written) = write_all(&mut sections, &mut stream);
        assert_eq!(written, 1);

        let empty = sections.annotation_sets.offset_at(0).unwrap();
        let filled = sections.annotation_sets.offset_at(1).unwrap();
        let list = sections.annotation_set_ref_lists.offset_at(0).unwrap();

        let read = |offset: u32| {
            let at = (offset - 0x1000) as usize;
            u32::from_le_bytes(stream.as_slice()[at..at + 4].try_into().unwrap())
        };
        assert_eq!(read(empty), 0);
        assert_eq!(read(list), 2);
        assert_eq!(read(list + 4), empty);
        assert_eq!(read(list + 8), filled);

        let directory = offsets[0];
        assert_eq!(read(directory), 0);
        assert_eq!(read(directory + 12), 1);
        assert_eq!(read(directory + 20), list);
    }
}
