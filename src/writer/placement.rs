//! Assignment of classes to output archives.

use crate::metadata::class::ClassDef;

/// Decides which output archive a class is written to.
///
/// Archives are numbered from 0. [`crate::writer::DexWriter::write_all`] produces one container
/// per archive index that receives at least one class, in ascending index order.
pub trait DexPlacement {
    /// Archive index of `class`.
    fn archive_for(&self, class: &ClassDef) -> usize;
}

/// Places every class into archive 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleDex;

impl DexPlacement for SingleDex {
    fn archive_for(&self, _class: &ClassDef) -> usize {
        0
    }
}

impl<F: Fn(&ClassDef) -> usize> DexPlacement for F {
    fn archive_for(&self, class: &ClassDef) -> usize {
        self(class)
    }
}

/// Groups `classes` by archive, in ascending archive order. Input order is kept within a group.
pub(crate) fn partition<'a, P: DexPlacement + ?Sized>(
    placement: &P,
    classes: &'a [ClassDef],
) -> Vec<(usize, Vec<&'a ClassDef>)> {
    let mut groups: Vec<(usize, Vec<&'a ClassDef>)> = Vec::new();
    for class in classes {
        let archive = placement.archive_for(class);
        match groups.binary_search_by_key(&archive, |(index, _)| *index) {
            Ok(position) => groups[position].1.push(class),
            Err(position) => groups.insert(position, (archive, vec![class])),
        }
    }
    groups
}
