//! Pool references carried by instructions and encoded values.
//!
//! An instruction that names a string, type, field, method, prototype, call site or method
//! handle holds a [`Reference`]. References built by callers are semantic (`Reference::Method`
//! holds a full [`MethodRef`]); references produced by the decoder are raw pool indices
//! ([`Reference::Index`]) until something resolves them.
//!
//! Turning a reference back into an index is the job of a [`ReferenceIndexer`]. The writer's
//! frozen pools implement it for semantic references; [`RawIndices`] implements it for raw
//! indices only, which is enough to re-encode a decoded stream unchanged.

use std::fmt;

use strum::Display;

use crate::{
    metadata::types::{FieldRef, MethodRef, Proto},
    Error, Result,
};

/// The pool a reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum ReferenceKind {
    /// String pool
    #[strum(serialize = "string")]
    String,
    /// Type pool
    #[strum(serialize = "type")]
    Type,
    /// Field pool
    #[strum(serialize = "field")]
    Field,
    /// Method pool
    #[strum(serialize = "method")]
    Method,
    /// Prototype pool
    #[strum(serialize = "proto")]
    Proto,
    /// Call site pool
    #[strum(serialize = "call site")]
    CallSite,
    /// Method handle pool
    #[strum(serialize = "method handle")]
    MethodHandle,
}

/// A reference from an instruction into one of the pools.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// A string constant
    String(String),
    /// A type descriptor
    Type(String),
    /// A field
    Field(FieldRef),
    /// A method
    Method(MethodRef),
    /// A prototype
    Proto(Proto),
    /// A call site, by index
    CallSite(u32),
    /// A method handle, by index
    MethodHandle(u32),
    /// A raw pool index that has not been resolved to a semantic value
    Index {
        /// Pool the index points into
        kind: ReferenceKind,
        /// Index within that pool
        index: u32,
    },
}

impl Reference {
    /// Returns the pool this reference points into.
    #[must_use]
    pub fn kind(&self) -> ReferenceKind {
        match self {
            Reference::String(_) => ReferenceKind::String,
            Reference::Type(_) => ReferenceKind::Type,
            Reference::Field(_) => ReferenceKind::Field,
            Reference::Method(_) => ReferenceKind::Method,
            Reference::Proto(_) => ReferenceKind::Proto,
            Reference::CallSite(_) => ReferenceKind::CallSite,
            Reference::MethodHandle(_) => ReferenceKind::MethodHandle,
            Reference::Index { kind, .. } => *kind,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::String(value) => write!(f, "string {value:?}"),
            Reference::Type(descriptor) => write!(f, "type {descriptor}"),
            Reference::Field(field) => write!(f, "field {field}"),
            Reference::Method(method) => write!(f, "method {method}"),
            Reference::Proto(proto) => write!(f, "proto {proto}"),
            Reference::CallSite(index) => write!(f, "call_site@{index}"),
            Reference::MethodHandle(index) => write!(f, "method_handle@{index}"),
            Reference::Index { kind, index } => write!(f, "{kind}@{index}"),
        }
    }
}

/// Resolves references to pool indices.
///
/// Every lookup fails with [`crate::Error::DanglingReference`] when the value is not present.
/// Implementors override the lookups for the kinds they hold; the defaults reject everything.
pub trait ReferenceIndexer {
    /// Index of a string
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the string is not pooled.
    fn string_index(&self, value: &str) -> Result<u32> {
        Err(Error::DanglingReference(format!("string {value:?}")))
    }

    /// Index of a type descriptor
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the type is not pooled.
    fn type_index(&self, descriptor: &str) -> Result<u32> {
        Err(Error::DanglingReference(format!("type {descriptor}")))
    }

    /// Index of a prototype
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the prototype is not pooled.
    fn proto_index(&self, proto: &Proto) -> Result<u32> {
        Err(Error::DanglingReference(format!("proto {proto}")))
    }

    /// Index of a field
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the field is not pooled.
    fn field_index(&self, field: &FieldRef) -> Result<u32> {
        Err(Error::DanglingReference(format!("field {field}")))
    }

    /// Index of a method
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the method is not pooled.
    fn method_index(&self, method: &MethodRef) -> Result<u32> {
        Err(Error::DanglingReference(format!("method {method}")))
    }

    /// Index of a call site
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the call site does not exist.
    fn call_site_index(&self, index: u32) -> Result<u32> {
        Err(Error::DanglingReference(format!("call_site@{index}")))
    }

    /// Index of a method handle
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the method handle does not exist.
    fn method_handle_index(&self, index: u32) -> Result<u32> {
        Err(Error::DanglingReference(format!("method_handle@{index}")))
    }

    /// Passes through an unresolved raw index.
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] unless the indexer accepts raw indices.
    fn raw_index(&self, kind: ReferenceKind, index: u32) -> Result<u32> {
        Err(Error::DanglingReference(format!("{kind}@{index}")))
    }

    /// Resolves any reference by dispatching on its kind.
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the reference cannot be resolved.
    fn index_of(&self, reference: &Reference) -> Result<u32> {
        match reference {
            Reference::String(value) => self.string_index(value),
            Reference::Type(descriptor) => self.type_index(descriptor),
            Reference::Field(field) => self.field_index(field),
            Reference::Method(method) => self.method_index(method),
            Reference::Proto(proto) => self.proto_index(proto),
            Reference::CallSite(index) => self.call_site_index(*index),
            Reference::MethodHandle(index) => self.method_handle_index(*index),
            Reference::Index { kind, index } => self.raw_index(*kind, *index),
        }
    }
}

/// An indexer that accepts raw indices unchanged and rejects semantic references.
///
/// Used to re-encode instructions that came out of the decoder.
///
/// # Examples
///
/// ```rust
/// use dexscope::metadata::reference::{RawIndices, Reference, ReferenceIndexer, ReferenceKind};
///
/// let raw = Reference::Index { kind: ReferenceKind::String, index: 7 };
/// assert_eq!(RawIndices.index_of(&raw)?, 7);
/// assert!(RawIndices.index_of(&Reference::String("a".into())).is_err());
/// # Ok::<(), dexscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RawIndices;

impl ReferenceIndexer for RawIndices {
    fn raw_index(&self, _kind: ReferenceKind, index: u32) -> Result<u32> {
        Ok(index)
    }
}
