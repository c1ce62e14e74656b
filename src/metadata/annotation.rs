//! Annotations attached to classes, fields, methods and parameters.

use strum::{Display, FromRepr};

use crate::{
    metadata::{key::StructuralKey, reference::ReferenceIndexer, value::EncodedValue},
    utils::write_uleb128,
    Result,
};

/// Retention of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum AnnotationVisibility {
    /// Visible at build time only
    Build = 0x00,
    /// Visible at runtime
    Runtime = 0x01,
    /// Visible to the runtime system only
    System = 0x02,
}

/// A named element of an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationElement {
    /// Element name
    pub name: String,
    /// Element value
    pub value: EncodedValue,
}

/// An annotation type together with its element values.
///
/// This is the payload of an annotation item, and also the value of a nested annotation inside
/// an [`EncodedValue::Annotation`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedAnnotation {
    /// Type descriptor of the annotation
    pub type_: String,
    /// Elements, in declaration order
    pub elements: Vec<AnnotationElement>,
}

impl EncodedAnnotation {
    /// Creates an annotation without elements.
    pub fn new(type_: impl Into<String>) -> Self {
        EncodedAnnotation {
            type_: type_.into(),
            elements: Vec::new(),
        }
    }

    /// Adds an element.
    #[must_use]
    pub fn with_element(mut self, name: impl Into<String>, value: EncodedValue) -> Self {
        self.elements.push(AnnotationElement {
            name: name.into(),
            value,
        });
        self
    }

    /// Writes the annotation: type index, element count, then `(name index, value)` pairs.
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] for types, names or values that are not
    /// pooled.
    pub fn encode<I: ReferenceIndexer + ?Sized>(
        &self,
        indexer: &I,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        write_uleb128(indexer.type_index(&self.type_)?, out);
        write_uleb128(crate::utils::to_u32(self.elements.len())?, out);
        for element in &self.elements {
            write_uleb128(indexer.string_index(&element.name)?, out);
            element.value.encode(indexer, out)?;
        }
        Ok(())
    }
}

impl StructuralKey for EncodedAnnotation {
    fn write_key(&self, key: &mut Vec<u8>) {
        self.type_.write_key(key);
        self.elements.len().write_key(key);
        for element in &self.elements {
            element.name.write_key(key);
            element.value.write_key(key);
        }
    }
}

/// An annotation with its visibility, as attached to a class, field, method or parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Retention
    pub visibility: AnnotationVisibility,
    /// Type and elements
    pub annotation: EncodedAnnotation,
}

impl Annotation {
    /// Creates an annotation.
    #[must_use]
    pub fn new(visibility: AnnotationVisibility, annotation: EncodedAnnotation) -> Self {
        Annotation {
            visibility,
            annotation,
        }
    }

    /// Type descriptor of the annotation.
    #[must_use]
    pub fn type_descriptor(&self) -> &str {
        &self.annotation.type_
    }

    /// Writes an annotation item: visibility byte followed by the encoded annotation.
    ///
    /// # Errors
    /// See [`EncodedAnnotation::encode`].
    pub fn encode<I: ReferenceIndexer + ?Sized>(
        &self,
        indexer: &I,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        out.push(self.visibility as u8);
        self.annotation.encode(indexer, out)
    }
}

impl StructuralKey for Annotation {
    fn write_key(&self, key: &mut Vec<u8>) {
        key.push(self.visibility as u8);
        self.annotation.write_key(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::types::Proto, Error};

    struct Fixed;

    impl ReferenceIndexer for Fixed {
        fn string_index(&self, value: &str) -> Result<u32> {
            match value {
                "value" => Ok(3),
                _ => Err(Error::DanglingReference(value.to_string())),
            }
        }

        fn type_index(&self, _descriptor: &str) -> Result<u32> {
            Ok(200)
        }

        fn proto_index(&self, _proto: &Proto) -> Result<u32> {
            Ok(1)
        }
    }

    #[test]
    fn encode_annotation_item() {
        let annotation = Annotation::new(
            AnnotationVisibility::Runtime,
            EncodedAnnotation::new("Ltest/Marker;")
                .with_element("value", EncodedValue::Boolean(true)),
        );

        let mut out = Vec::new();
        annotation.encode(&Fixed, &mut out).unwrap();
        assert_eq!(out, [0x01, 0xC8, 0x01, 0x01, 0x03, 0x3F]);
    }

    #[test]
    fn unknown_element_name_dangles() {
        let annotation = EncodedAnnotation::new("LA;").with_element("other", EncodedValue::Null);
        let mut out = Vec::new();
        assert!(matches!(
            annotation.encode(&Fixed, &mut out),
            Err(Error::DanglingReference(_))
        ));
    }

    #[test]
    fn visibility_from_repr() {
        assert_eq!(
            AnnotationVisibility::from_repr(2),
            Some(AnnotationVisibility::System)
        );
        assert_eq!(AnnotationVisibility::from_repr(3), None);
    }
}
