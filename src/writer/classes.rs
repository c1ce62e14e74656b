//! Class ordering, class data items and class definition records.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::{
    file::header::NO_INDEX,
    metadata::{class::ClassDef, reference::ReferenceIndexer, types::MethodRef},
    utils::to_u32,
    writer::{sections::SectionManager, stream::ByteStream},
    Result,
};

/// Size of one class definition record.
pub const CLASS_DEF_SIZE: usize = 0x20;

/// Orders classes so that a superclass or interface defined in the same archive precedes every
/// class that names it. Unrelated classes keep their input order.
///
/// When a descriptor is defined more than once, only the first definition is kept.
#[must_use]
pub fn order_classes<'a>(classes: &[&'a ClassDef]) -> Vec<&'a ClassDef> {
    let mut by_descriptor: HashMap<&str, &'a ClassDef> = HashMap::new();
    let mut unique = Vec::with_capacity(classes.len());
    for &class in classes {
        if by_descriptor.contains_key(class.descriptor.as_str()) {
            warn!(
                "Class {} is defined more than once, keeping the first definition",
                class.descriptor
            );
            continue;
        }
        by_descriptor.insert(class.descriptor.as_str(), class);
        unique.push(class);
    }

    let mut ordered = Vec::with_capacity(unique.len());
    let mut visited = HashSet::new();
    for class in unique {
        visit(class, &by_descriptor, &mut visited, &mut ordered);
    }
    ordered
}

fn visit<'a>(
    class: &'a ClassDef,
    by_descriptor: &HashMap<&str, &'a ClassDef>,
    visited: &mut HashSet<&'a str>,
    ordered: &mut Vec<&'a ClassDef>,
) {
    if !visited.insert(class.descriptor.as_str()) {
        return;
    }

    let supertypes = class.superclass.iter().chain(class.interfaces.iter());
    for supertype in supertypes {
        if let Some(&parent) = by_descriptor.get(supertype.as_str()) {
            visit(parent, by_descriptor, visited, ordered);
        }
    }
    ordered.push(class);
}

/// Writes the class data item of a class: member counts, then encoded fields and methods,
/// each group sorted by pool index with the index written as a difference to the previous one.
///
/// Returns the offset of the item, or 0 for a class without members.
///
/// # Errors
/// Returns [`crate::Error::DanglingReference`] if a member is not pooled.
pub fn write_class_data(
    stream: &mut ByteStream,
    class: &ClassDef,
    sections: &SectionManager<'_>,
    code_offsets: &HashMap<MethodRef, u32>,
) -> Result<u32> {
    if !class.has_members() {
        return Ok(0);
    }

    let mut static_fields = Vec::new();
    let mut instance_fields = Vec::new();
    for field in &class.fields {
        let index = sections.field_index(&class.field_ref(field))?;
        let entry = (index, field.access_flags.bits());
        if field.is_static() {
            static_fields.push(entry);
        } else {
            instance_fields.push(entry);
        }
    }

    let mut direct_methods = Vec::new();
    let mut virtual_methods = Vec::new();
    for method in &class.methods {
        let reference = class.method_ref(method);
        let index = sections.method_index(&reference)?;
        let code_off = code_offsets.get(&reference).copied().unwrap_or(0);
        let entry = (index, method.access_flags.bits(), code_off);
        if method.is_direct() {
            direct_methods.push(entry);
        } else {
            virtual_methods.push(entry);
        }
    }

    for group in [&mut static_fields, &mut instance_fields] {
        group.sort_unstable();
    }
    for group in [&mut direct_methods, &mut virtual_methods] {
        group.sort_unstable();
    }

    let offset = stream.position()?;
    stream.write_uleb128(to_u32(static_fields.len())?);
    stream.write_uleb128(to_u32(instance_fields.len())?);
    stream.write_uleb128(to_u32(direct_methods.len())?);
    stream.write_uleb128(to_u32(virtual_methods.len())?);

    for group in [&static_fields, &instance_fields] {
        let mut previous = 0;
        for &(index, flags) in group {
            stream.write_uleb128(index - previous);
            stream.write_uleb128(flags);
            previous = index;
        }
    }

    for group in [&direct_methods, &virtual_methods] {
        let mut previous = 0;
        for &(index, flags, code_off) in group {
            stream.write_uleb128(index - previous);
            stream.write_uleb128(flags);
            stream.write_uleb128(code_off);
            previous = index;
        }
    }

    Ok(offset)
}

/// Offsets a class definition record points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassOffsets {
    /// Interface type list
    pub interfaces: u32,
    /// Annotations directory
    pub annotations: u32,
    /// Class data item
    pub class_data: u32,
    /// Static values array
    pub static_values: u32,
}

/// Writes a class definition record.
///
/// # Errors
/// Returns [`crate::Error::DanglingReference`] if a named type or string is not pooled.
pub fn write_class_def(
    stream: &mut ByteStream,
    class: &ClassDef,
    sections: &SectionManager<'_>,
    offsets: ClassOffsets,
) -> Result<()> {
    stream.write_u32(sections.type_index(&class.descriptor)?);
    stream.write_u32(class.access_flags.bits());
    stream.write_u32(match &class.superclass {
        Some(superclass) => sections.type_index(superclass)?,
        None => NO_INDEX,
    });
    stream.write_u32(offsets.interfaces);
    stream.write_u32(match &class.source_file {
        Some(source_file) => sections.string_index(source_file)?,
        None => NO_INDEX,
    });
    stream.write_u32(offsets.annotations);
    stream.write_u32(offsets.class_data);
    stream.write_u32(offsets.static_values);
    Ok(())
}
