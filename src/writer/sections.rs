//! Pool discovery, freezing and index lookup.
//!
//! [`SectionManager`] walks the class graph of one archive and interns every entity it
//! reaches. Adding an entity also adds everything the entity itself names: a method adds its
//! class type, its name and its prototype, a prototype adds its shorty, its types and its
//! parameter type list, and a type adds its descriptor string.
//!
//! # Phases
//!
//! 1. **Discovery** - [`SectionManager::discover`] visits every class, member, annotation,
//!    static value and instruction reference.
//! 2. **Freeze** - [`SectionManager::freeze`] sorts the indexed pools into format order and
//!    assigns indices. Any later addition fails with [`crate::Error::FrozenPoolMutation`].
//! 3. **Lookup** - the frozen manager implements [`ReferenceIndexer`], which is what the
//!    instruction and encoded value encoders consume.
//!
//! # Ordering
//!
//! Strings and types sort by UTF-16 code units. Prototypes sort by return type index, then
//! parameter type indices; fields by class, name and type index; methods by class, name and
//! prototype index. Data items keep discovery order.

use std::collections::HashSet;

use log::debug;

use crate::{
    metadata::{
        annotation::Annotation,
        class::ClassDef,
        method::Method,
        reference::{Reference, ReferenceIndexer},
        types::{FieldRef, MethodRef, Proto},
        value::EncodedValue,
    },
    utils::mutf8::utf16_cmp,
    writer::{
        classes::order_classes,
        config::WriterConfig,
        pool::{InternTable, Pool},
    },
    Error, Result,
};

/// Every pool of one archive.
pub struct SectionManager<'a> {
    /// String pool
    pub strings: Pool<String>,
    /// Type pool
    pub types: Pool<String>,
    /// Prototype pool
    pub protos: Pool<Proto>,
    /// Field pool
    pub fields: Pool<FieldRef>,
    /// Method pool
    pub methods: Pool<MethodRef>,
    /// Call site pool, never populated
    pub call_sites: Pool<u32>,
    /// Method handle pool, never populated
    pub method_handles: Pool<u32>,
    /// Parameter and interface type lists
    pub type_lists: InternTable<Vec<String>>,
    /// Static value arrays
    pub encoded_arrays: InternTable<Vec<EncodedValue>>,
    /// Annotation items
    pub annotations: InternTable<Annotation>,
    /// Annotation sets, each sorted by annotation type
    pub annotation_sets: InternTable<Vec<Annotation>>,
    /// Per-method parameter annotation lists
    pub annotation_set_ref_lists: InternTable<Vec<Vec<Annotation>>>,
    classes: Vec<&'a ClassDef>,
}

impl<'a> SectionManager<'a> {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        SectionManager {
            strings: Pool::new("string"),
            types: Pool::new("type"),
            protos: Pool::new("proto"),
            fields: Pool::new("field"),
            methods: Pool::new("method"),
            call_sites: Pool::new("call site"),
            method_handles: Pool::new("method handle"),
            type_lists: InternTable::new("type list"),
            encoded_arrays: InternTable::new("encoded array"),
            annotations: InternTable::new("annotation"),
            annotation_sets: InternTable::new("annotation set"),
            annotation_set_ref_lists: InternTable::new("annotation set ref list"),
            classes: Vec::new(),
        }
    }

    /// Discovers every entity reachable from `classes` and freezes the pools.
    ///
    /// Classes are reordered so that superclasses and interfaces defined in the archive come
    /// before the classes that extend them. A descriptor defined twice keeps its first
    /// definition.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a pool outgrows 32-bit indices or a class defines
    /// the same field or method twice.
    pub fn discover(classes: &[&'a ClassDef], config: &WriterConfig) -> Result<Self> {
        let mut sections = Self::new();
        sections.classes = order_classes(classes);

        if config.empty_annotation_set
            && sections
                .classes
                .iter()
                .any(|class| class.methods.iter().any(Method::has_parameter_annotations))
        {
            sections.annotation_sets.intern(Vec::new())?;
        }

        let ordered = sections.classes.clone();
        for class in ordered {
            sections.add_class(class)?;
        }

        sections.freeze()?;
        debug!(
            "Pools frozen: {} strings, {} types, {} protos, {} fields, {} methods, {} classes",
            sections.strings.len(),
            sections.types.len(),
            sections.protos.len(),
            sections.fields.len(),
            sections.methods.len(),
            sections.classes.len()
        );
        Ok(sections)
    }

    /// Classes of the archive in write order.
    #[must_use]
    pub fn classes(&self) -> &[&'a ClassDef] {
        &self.classes
    }

    /// Adds a string.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] after freezing.
    pub fn add_string(&mut self, value: &str) -> Result<()> {
        if self.strings.index_of(value).is_none() {
            self.strings.add(value.to_string())?;
        }
        Ok(())
    }

    /// Adds a type and its descriptor string.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] after freezing.
    pub fn add_type(&mut self, descriptor: &str) -> Result<()> {
        if self.types.index_of(descriptor).is_none() {
            self.types.add(descriptor.to_string())?;
            self.add_string(descriptor)?;
        }
        Ok(())
    }

    /// Adds a list of types, interning it as a type list when non-empty.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] after freezing.
    pub fn add_type_list(&mut self, descriptors: &[String]) -> Result<()> {
        for descriptor in descriptors {
            self.add_type(descriptor)?;
        }
        if !descriptors.is_empty() {
            self.type_lists.intern(descriptors.to_vec())?;
        }
        Ok(())
    }

    /// Adds a prototype, its shorty and its types.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] after freezing.
    pub fn add_proto(&mut self, proto: &Proto) -> Result<()> {
        if self.protos.index_of(proto).is_some() {
            return Ok(());
        }
        self.protos.add(proto.clone())?;
        self.add_string(&proto.shorty())?;
        self.add_type(&proto.return_type)?;
        self.add_type_list(&proto.parameters)
    }

    /// Adds a field, its class, name and type.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] after freezing.
    pub fn add_field(&mut self, field: &FieldRef) -> Result<()> {
        if self.fields.index_of(field).is_some() {
            return Ok(());
        }
        self.fields.add(field.clone())?;
        self.add_type(&field.class)?;
        self.add_string(&field.name)?;
        self.add_type(&field.type_)
    }

    /// Adds a method, its class, name and prototype.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] after freezing.
    pub fn add_method(&mut self, method: &MethodRef) -> Result<()> {
        if self.methods.index_of(method).is_some() {
            return Ok(());
        }
        self.methods.add(method.clone())?;
        self.add_type(&method.class)?;
        self.add_string(&method.name)?;
        self.add_proto(&method.proto)
    }

    /// Adds whatever an instruction reference names.
    ///
    /// Raw indices, call sites and method handles add nothing; they cannot be resolved against
    /// this archive's pools and surface as dangling references when encoded.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] after freezing.
    pub fn add_reference(&mut self, reference: &Reference) -> Result<()> {
        match reference {
            Reference::String(value) => self.add_string(value),
            Reference::Type(descriptor) => self.add_type(descriptor),
            Reference::Field(field) => self.add_field(field),
            Reference::Method(method) => self.add_method(method),
            Reference::Proto(proto) => self.add_proto(proto),
            Reference::CallSite(_) | Reference::MethodHandle(_) | Reference::Index { .. } => Ok(()),
        }
    }

    /// Adds everything an encoded value names, recursively.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] after freezing.
    pub fn add_value(&mut self, value: &EncodedValue) -> Result<()> {
        let mut result = Ok(());
        value.visit(&mut |nested| {
            if result.is_ok() {
                result = self.add_value_shallow(nested);
            }
        });
        result
    }

    fn add_value_shallow(&mut self, value: &EncodedValue) -> Result<()> {
        match value {
            EncodedValue::String(value) => self.add_string(value),
            EncodedValue::Type(descriptor) => self.add_type(descriptor),
            EncodedValue::Field(field) | EncodedValue::Enum(field) => self.add_field(field),
            EncodedValue::Method(method) => self.add_method(method),
            EncodedValue::MethodType(proto) => self.add_proto(proto),
            EncodedValue::Annotation(annotation) => {
                self.add_type(&annotation.type_)?;
                for element in &annotation.elements {
                    self.add_string(&element.name)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Adds an annotation, its type, element names and values, and interns the item.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] after freezing.
    pub fn add_annotation(&mut self, annotation: &Annotation) -> Result<()> {
        self.add_type(annotation.type_descriptor())?;
        for element in &annotation.annotation.elements {
            self.add_string(&element.name)?;
            self.add_value(&element.value)?;
        }
        self.annotations.intern(annotation.clone())?;
        Ok(())
    }

    /// Adds the annotations of a set and interns the set. Returns the sorted set.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] after freezing.
    pub fn add_annotation_set(&mut self, annotations: &[Annotation]) -> Result<Vec<Annotation>> {
        for annotation in annotations {
            self.add_annotation(annotation)?;
        }
        let set = sorted_set(annotations);
        if !set.is_empty() {
            self.annotation_sets.intern(set.clone())?;
        }
        Ok(set)
    }

    fn add_class(&mut self, class: &ClassDef) -> Result<()> {
        self.add_type(&class.descriptor)?;
        if let Some(superclass) = &class.superclass {
            self.add_type(superclass)?;
        }
        self.add_type_list(&class.interfaces)?;
        if let Some(source_file) = &class.source_file {
            self.add_string(source_file)?;
        }
        self.add_annotation_set(&class.annotations)?;

        let static_values = class.static_values();
        if !static_values.is_empty() {
            for value in &static_values {
                self.add_value(value)?;
            }
            self.encoded_arrays.intern(static_values)?;
        }

        let mut defined_fields = HashSet::with_capacity(class.fields.len());
        for field in &class.fields {
            let reference = class.field_ref(field);
            if !defined_fields.insert(reference.clone()) {
                return Err(malformed_error!("Field {} is defined more than once", reference));
            }
            self.add_field(&reference)?;
            self.add_annotation_set(&field.annotations)?;
        }

        let mut defined_methods = HashSet::with_capacity(class.methods.len());
        for method in &class.methods {
            let reference = class.method_ref(method);
            if !defined_methods.insert(reference.clone()) {
                return Err(malformed_error!("Method {} is defined more than once", reference));
            }
            self.add_method(&reference)?;
            self.add_annotation_set(&method.annotations)?;

            if method.has_parameter_annotations() {
                let mut list = Vec::with_capacity(method.parameter_annotations.len());
                for annotations in &method.parameter_annotations {
                    list.push(self.add_annotation_set(annotations)?);
                }
                self.annotation_set_ref_lists.intern(list)?;
            }

            if let Some(body) = &method.body {
                for instruction in body.instructions() {
                    for reference in instruction.references() {
                        self.add_reference(reference)?;
                    }
                }
                for range in body.tries() {
                    for handler in &range.handlers {
                        if let Some(exception_type) = &handler.exception_type {
                            self.add_type(exception_type)?;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Sorts the indexed pools and freezes every table.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a pool outgrows 32-bit indices.
    pub fn freeze(&mut self) -> Result<()> {
        self.strings.freeze_with(|a, b| utf16_cmp(a, b))?;
        self.types.freeze_with(|a, b| utf16_cmp(a, b))?;

        let types = &self.types;
        let type_index = |descriptor: &String| types.index_of(descriptor).unwrap_or(u32::MAX);
        self.protos.freeze_by(|proto| {
            (
                type_index(&proto.return_type),
                proto.parameters.iter().map(type_index).collect::<Vec<_>>(),
            )
        })?;

        let strings = &self.strings;
        let string_index = |value: &String| strings.index_of(value).unwrap_or(u32::MAX);
        self.fields.freeze_by(|field| {
            (
                type_index(&field.class),
                string_index(&field.name),
                type_index(&field.type_),
            )
        })?;

        let protos = &self.protos;
        self.methods.freeze_by(|method| {
            (
                type_index(&method.class),
                string_index(&method.name),
                protos.index_of(&method.proto).unwrap_or(u32::MAX),
            )
        })?;

        self.call_sites.freeze_by(|index| *index)?;
        self.method_handles.freeze_by(|index| *index)?;

        self.type_lists.freeze();
        self.encoded_arrays.freeze();
        self.annotations.freeze();
        self.annotation_sets.freeze();
        self.annotation_set_ref_lists.freeze();
        Ok(())
    }
}

impl Default for SectionManager<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorts a set's annotations by type, which is type index order.
#[must_use]
pub fn sorted_set(annotations: &[Annotation]) -> Vec<Annotation> {
    let mut set = annotations.to_vec();
    set.sort_by(|a, b| utf16_cmp(a.type_descriptor(), b.type_descriptor()));
    set
}

impl ReferenceIndexer for SectionManager<'_> {
    fn string_index(&self, value: &str) -> Result<u32> {
        self.strings
            .index_of(value)
            .ok_or_else(|| Error::DanglingReference(format!("string {value:?}")))
    }

    fn type_index(&self, descriptor: &str) -> Result<u32> {
        self.types
            .index_of(descriptor)
            .ok_or_else(|| Error::DanglingReference(format!("type {descriptor}")))
    }

    fn proto_index(&self, proto: &Proto) -> Result<u32> {
        self.protos
            .index_of(proto)
            .ok_or_else(|| Error::DanglingReference(format!("proto {proto}")))
    }

    fn field_index(&self, field: &FieldRef) -> Result<u32> {
        self.fields
            .index_of(field)
            .ok_or_else(|| Error::DanglingReference(format!("field {field}")))
    }

    fn method_index(&self, method: &MethodRef) -> Result<u32> {
        self.methods
            .index_of(method)
            .ok_or_else(|| Error::DanglingReference(format!("method {method}")))
    }

    fn call_site_index(&self, index: u32) -> Result<u32> {
        self.call_sites
            .index_of(&index)
            .ok_or_else(|| Error::DanglingReference(format!("call_site@{index}")))
    }

    fn method_handle_index(&self, index: u32) -> Result<u32> {
        self.method_handles
            .index_of(&index)
            .ok_or_else(|| Error::DanglingReference(format!("method_handle@{index}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{opcodes, Instruction, Operand},
        metadata::{
            access::AccessFlags,
            annotation::{AnnotationVisibility, EncodedAnnotation},
            class::Field,
            method::MethodBody,
        },
    };

    fn class_with_call() -> ClassDef {
        let callee = MethodRef::new("Ljava/io/PrintStream;", "println", Proto::new("V", ["I"]));
        let mut body = MethodBody::new();
        body.push(
            Instruction::new(
                opcodes::INVOKE_VIRTUAL,
                vec![0, 1],
                Operand::Reference(Reference::Method(callee)),
            )
            .unwrap(),
        );
        body.push(Instruction::new(opcodes::RETURN_VOID, vec![], Operand::None).unwrap());

        ClassDef::new("LMain;", AccessFlags::PUBLIC)
            .with_superclass("Ljava/lang/Object;")
            .with_field(Field::new("count", "I", AccessFlags::PRIVATE))
            .with_method(
                Method::new("run", Proto::new("V", Vec::<String>::new()), AccessFlags::PUBLIC)
                    .with_registers(2)
                    .with_body(body),
            )
    }

    #[test]
    fn discovery_closes_over_references() {
        let class = class_with_call();
        let sections = SectionManager::discover(&[&class], &WriterConfig::default()).unwrap();

        for value in ["LMain;", "Ljava/lang/Object;", "Ljava/io/PrintStream;", "I", "V"] {
            assert!(sections.type_index(value).is_ok(), "{value}");
            assert!(sections.string_index(value).is_ok(), "{value}");
        }
        for value in ["println", "run", "count", "VI"] {
            assert!(sections.string_index(value).is_ok(), "{value}");
        }
        assert_eq!(sections.methods.len(), 2);
        assert_eq!(sections.protos.len(), 2);
        assert_eq!(sections.type_lists.len(), 1);
    }

    #[test]
    fn duplicate_members_rejected() {
        let run = || Method::new("run", Proto::new("V", Vec::<String>::new()), AccessFlags::PUBLIC);
        let methods = ClassDef::new("LTwice;", AccessFlags::PUBLIC)
            .with_method(run())
            .with_method(Method::new(
                "run",
                Proto::new("V", Vec::<String>::new()),
                AccessFlags::PRIVATE,
            ));
        let err = SectionManager::discover(&[&methods], &WriterConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("LTwice;->run()V"), "{err}");

        let fields = ClassDef::new("LTwice;", AccessFlags::PUBLIC)
            .with_field(Field::new("count", "I", AccessFlags::PRIVATE))
            .with_field(Field::new("count", "I", AccessFlags::STATIC));
        assert!(matches!(
            SectionManager::discover(&[&fields], &WriterConfig::default()),
            Err(Error::Malformed { .. })
        ));

        // Overloads differ by prototype
        let overloads = ClassDef::new("LTwice;", AccessFlags::PUBLIC)
            .with_method(run())
            .with_method(Method::new("run", Proto::new("V", ["I"]), AccessFlags::PUBLIC));
        assert!(SectionManager::discover(&[&overloads], &WriterConfig::default()).is_ok());
    }

    #[test]
    fn pools_sorted_after_freeze() {
        let class = class_with_call();
        let sections = SectionManager::discover(&[&class], &WriterConfig::default()).unwrap();

        let strings: Vec<&String> = sections.strings.iter().collect();
        let mut sorted = strings.clone();
        sorted.sort_by(|a, b| utf16_cmp(a, b));
        assert_eq!(strings, sorted);

        let methods: Vec<&MethodRef> = sections.methods.iter().collect();
        assert_eq!(methods[0].class, "LMain;");
        assert_eq!(methods[1].class, "Ljava/io/PrintStream;");
    }

    #[test]
    fn frozen_manager_rejects_new_entities() {
        let class = class_with_call();
        let mut sections = SectionManager::discover(&[&class], &WriterConfig::default()).unwrap();

        assert!(sections.add_string("run").is_ok());
        assert!(matches!(
            sections.add_string("new"),
            Err(Error::FrozenPoolMutation("string"))
        ));
        assert!(matches!(
            sections.string_index("new"),
            Err(Error::DanglingReference(_))
        ));
    }

    #[test]
    fn annotation_sets_interned_by_content() {
        let marker = |name: &str| {
            Annotation::new(AnnotationVisibility::Runtime, EncodedAnnotation::new(name))
        };
        let a = ClassDef::new("LA;", AccessFlags::PUBLIC)
            .with_annotation(marker("LX;"))
            .with_annotation(marker("LW;"));
        let b = ClassDef::new("LB;", AccessFlags::PUBLIC)
            .with_annotation(marker("LW;"))
            .with_annotation(marker("LX;"));

        let sections = SectionManager::discover(&[&a, &b], &WriterConfig::default()).unwrap();
        assert_eq!(sections.annotation_sets.len(), 1);
        assert_eq!(sections.annotations.len(), 2);
    }

    #[test]
    fn empty_set_reserved_for_parameter_annotations() {
        let annotated = Method::new("m", Proto::new("V", ["I", "I"]), AccessFlags::STATIC)
            .with_parameter_annotations(vec![
                Vec::new(),
                vec![Annotation::new(
                    AnnotationVisibility::Build,
                    EncodedAnnotation::new("LP;"),
                )],
            ]);
        let class = ClassDef::new("LA;", AccessFlags::PUBLIC).with_method(annotated);

        let sections = SectionManager::discover(&[&class], &WriterConfig::default()).unwrap();
        assert_eq!(sections.annotation_sets.index_of(&Vec::new()), Some(0));
        assert_eq!(sections.annotation_set_ref_lists.len(), 1);

        let config = WriterConfig::new().with_empty_annotation_set(false);
        let sections = SectionManager::discover(&[&class], &config).unwrap();
        assert_eq!(sections.annotation_sets.index_of(&Vec::new()), None);
    }
}
