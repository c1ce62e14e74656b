//! Class definitions and their fields.

use crate::metadata::{
    access::AccessFlags,
    annotation::Annotation,
    method::Method,
    types::{FieldRef, MethodRef},
    value::EncodedValue,
};

/// A field defined by a class.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Type descriptor
    pub type_: String,
    /// Access flags
    pub access_flags: AccessFlags,
    /// Initial value of a static field
    pub initial_value: Option<EncodedValue>,
    /// Field annotations
    pub annotations: Vec<Annotation>,
}

impl Field {
    /// Creates a field.
    pub fn new(
        name: impl Into<String>,
        type_: impl Into<String>,
        access_flags: AccessFlags,
    ) -> Self {
        Field {
            name: name.into(),
            type_: type_.into(),
            access_flags,
            initial_value: None,
            annotations: Vec::new(),
        }
    }

    /// Sets the initial value.
    #[must_use]
    pub fn with_initial_value(mut self, value: EncodedValue) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Returns `true` for static fields.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(AccessFlags::STATIC)
    }
}

/// The zero value of a type, used for static fields without an initial value that precede one
/// with a value.
#[must_use]
pub fn default_value(descriptor: &str) -> EncodedValue {
    match descriptor.as_bytes().first() {
        Some(b'Z') => EncodedValue::Boolean(false),
        Some(b'B') => EncodedValue::Byte(0),
        Some(b'S') => EncodedValue::Short(0),
        Some(b'C') => EncodedValue::Char(0),
        Some(b'I') => EncodedValue::Int(0),
        Some(b'J') => EncodedValue::Long(0),
        Some(b'F') => EncodedValue::Float(0.0),
        Some(b'D') => EncodedValue::Double(0.0),
        _ => EncodedValue::Null,
    }
}

/// A class definition.
///
/// Superclass and interfaces are type descriptors; the classes they name may or may not be
/// defined in the same archive.
///
/// # Examples
///
/// ```rust
/// use dexscope::metadata::{
///     access::AccessFlags,
///     class::{ClassDef, Field},
///     value::EncodedValue,
/// };
///
/// let class = ClassDef::new("Lapp/Config;", AccessFlags::PUBLIC)
///     .with_superclass("Ljava/lang/Object;")
///     .with_field(
///         Field::new("LIMIT", "I", AccessFlags::PUBLIC | AccessFlags::STATIC)
///             .with_initial_value(EncodedValue::Byte(42)),
///     );
///
/// assert_eq!(class.static_values(), vec![EncodedValue::Byte(42)]);
/// ```
#[derive(Debug, Clone)]
pub struct ClassDef {
    /// Type descriptor of the class
    pub descriptor: String,
    /// Access flags
    pub access_flags: AccessFlags,
    /// Superclass descriptor, `None` only for the root class
    pub superclass: Option<String>,
    /// Implemented interface descriptors, in declaration order
    pub interfaces: Vec<String>,
    /// Name of the source file
    pub source_file: Option<String>,
    /// Class annotations
    pub annotations: Vec<Annotation>,
    /// Static and instance fields
    pub fields: Vec<Field>,
    /// Direct and virtual methods
    pub methods: Vec<Method>,
}

impl ClassDef {
    /// Creates a class without members.
    pub fn new(descriptor: impl Into<String>, access_flags: AccessFlags) -> Self {
        ClassDef {
            descriptor: descriptor.into(),
            access_flags,
            superclass: None,
            interfaces: Vec::new(),
            source_file: None,
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Sets the superclass.
    #[must_use]
    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Adds an interface.
    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Sets the source file name.
    #[must_use]
    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    /// Adds a class annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Identity of one of this class's fields.
    #[must_use]
    pub fn field_ref(&self, field: &Field) -> FieldRef {
        FieldRef::new(self.descriptor.clone(), field.name.clone(), field.type_.clone())
    }

    /// Identity of one of this class's methods.
    #[must_use]
    pub fn method_ref(&self, method: &Method) -> MethodRef {
        method.reference(&self.descriptor)
    }

    /// Static fields in field pool order.
    ///
    /// Within one class the pool order is by name, then type.
    #[must_use]
    pub fn sorted_static_fields(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.fields.iter().filter(|f| f.is_static()).collect();
        fields.sort_by(|a, b| {
            crate::utils::mutf8::utf16_cmp(&a.name, &b.name)
                .then_with(|| crate::utils::mutf8::utf16_cmp(&a.type_, &b.type_))
        });
        fields
    }

    /// The static values array: initial values of the static fields in pool order.
    ///
    /// Fields without a value that precede one with a value take the zero value of their type;
    /// trailing fields without a value are omitted. An empty result means no array is written.
    #[must_use]
    pub fn static_values(&self) -> Vec<EncodedValue> {
        let fields = self.sorted_static_fields();
        let Some(last) = fields.iter().rposition(|f| f.initial_value.is_some()) else {
            return Vec::new();
        };

        fields[..=last]
            .iter()
            .map(|field| {
                field
                    .initial_value
                    .clone()
                    .unwrap_or_else(|| default_value(&field.type_))
            })
            .collect()
    }

    /// Returns `true` if the class has fields or methods.
    #[must_use]
    pub fn has_members(&self) -> bool {
        !self.fields.is_empty() || !self.methods.is_empty()
    }

    /// Returns `true` if any field, method or parameter carries annotations.
    #[must_use]
    pub fn has_member_annotations(&self) -> bool {
        self.fields.iter().any(|f| !f.annotations.is_empty())
            || self
                .methods
                .iter()
                .any(|m| !m.annotations.is_empty() || m.has_parameter_annotations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::types::Proto;

    #[test]
    fn static_values_fill_gaps_and_trim_tail() {
        let flags = AccessFlags::STATIC;
        let class = ClassDef::new("LC;", AccessFlags::PUBLIC)
            .with_field(Field::new("c", "Z", flags))
            .with_field(Field::new("b", "Ljava/lang/String;", flags))
            .with_field(Field::new("a", "J", flags))
            .with_field(
                Field::new("b", "I", flags).with_initial_value(EncodedValue::Byte(3)),
            )
            .with_field(Field::new("inst", "I", AccessFlags::PRIVATE));

        assert_eq!(
            class.static_values(),
            vec![EncodedValue::Long(0), EncodedValue::Byte(3)]
        );
    }

    #[test]
    fn no_initial_values_no_array() {
        let class = ClassDef::new("LC;", AccessFlags::PUBLIC)
            .with_field(Field::new("a", "I", AccessFlags::STATIC));
        assert!(class.static_values().is_empty());
    }

    #[test]
    fn member_references() {
        let method = Method::new("go", Proto::new("I", ["I"]), AccessFlags::PUBLIC);
        let field = Field::new("n", "I", AccessFlags::PUBLIC);
        let class = ClassDef::new("LA;", AccessFlags::PUBLIC)
            .with_method(method.clone())
            .with_field(field.clone());

        assert_eq!(class.method_ref(&method).to_string(), "LA;->go(I)I");
        assert_eq!(class.field_ref(&field).to_string(), "LA;->n:I");
        assert!(class.has_members());
        assert!(!class.has_member_annotations());
    }
}
