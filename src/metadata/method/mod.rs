//! Methods, their editable bodies and exception tables.
//!
//! # Key Components
//!
//! - [`Method`] - A method definition: name, prototype, flags, annotations and optional body
//! - [`MethodBody`] - The mutable instruction sequence, labels and try ranges
//! - [`InstructionId`] - Generation-checked handle to an instruction in a body
//! - [`TryRange`] / [`CatchHandler`] - Protected ranges and their handlers

mod body;
mod exceptions;

pub use body::{InstructionId, MethodBody};
pub use exceptions::{CatchHandler, HandlerList, ResolvedTry, TryRange};

use crate::{
    metadata::{
        access::AccessFlags,
        annotation::Annotation,
        types::{MethodRef, Proto},
    },
    Result,
};

/// A method defined by a class.
///
/// The defining class is not stored; [`crate::metadata::class::ClassDef::method_ref`] builds the
/// full identity.
#[derive(Debug, Clone)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Prototype
    pub proto: Proto,
    /// Access flags
    pub access_flags: AccessFlags,
    /// Number of registers the body uses, including parameters
    pub registers: u16,
    /// Code, absent for abstract and native methods
    pub body: Option<MethodBody>,
    /// Method annotations
    pub annotations: Vec<Annotation>,
    /// Annotations per parameter, in parameter order
    pub parameter_annotations: Vec<Vec<Annotation>>,
}

impl Method {
    /// Creates a method without a body.
    pub fn new(name: impl Into<String>, proto: Proto, access_flags: AccessFlags) -> Self {
        Method {
            name: name.into(),
            proto,
            access_flags,
            registers: 0,
            body: None,
            annotations: Vec::new(),
            parameter_annotations: Vec::new(),
        }
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the register count.
    #[must_use]
    pub fn with_registers(mut self, registers: u16) -> Self {
        self.registers = registers;
        self
    }

    /// Adds a method annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Sets the per-parameter annotations.
    #[must_use]
    pub fn with_parameter_annotations(mut self, annotations: Vec<Vec<Annotation>>) -> Self {
        self.parameter_annotations = annotations;
        self
    }

    /// Returns `true` for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(AccessFlags::STATIC)
    }

    /// Returns `true` for static, private and constructor methods.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.access_flags.is_direct_method()
    }

    /// Registers holding incoming arguments: the parameters plus `this` for instance methods.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the count does not fit 16 bits.
    pub fn ins_count(&self) -> Result<u16> {
        self.proto
            .parameter_registers()?
            .checked_add(u16::from(!self.is_static()))
            .ok_or_else(|| malformed_error!("{} takes more than 65535 argument registers", self.name))
    }

    /// Returns `true` if any parameter carries annotations.
    #[must_use]
    pub fn has_parameter_annotations(&self) -> bool {
        self.parameter_annotations.iter().any(|set| !set.is_empty())
    }

    /// Builds the identity of this method as defined by `class`.
    #[must_use]
    pub fn reference(&self, class: &str) -> MethodRef {
        MethodRef::new(class, self.name.clone(), self.proto.clone())
    }
}
