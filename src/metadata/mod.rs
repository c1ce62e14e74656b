//! The class graph: classes, members, method bodies and the constants they reference.
//!
//! Everything in this module is a semantic value. Pool indices appear only in
//! [`reference::Reference::Index`], produced by the decoder for instructions that have not been
//! resolved; the writer assigns indices when it freezes its pools.
//!
//! # Key Components
//!
//! - [`class::ClassDef`] / [`class::Field`] / [`method::Method`] - The class graph
//! - [`method::MethodBody`] - Editable instruction sequence with labels and try ranges
//! - [`value::EncodedValue`] - Typed constants, with [`value::infer_type`] for untyped input
//! - [`annotation::Annotation`] - Annotations and their visibility
//! - [`types`] - Identities of prototypes, fields and methods
//! - [`reference`] - Instruction references and the [`reference::ReferenceIndexer`] seam
//! - [`key::StructuralKey`] - Canonical byte keys for content interning

pub mod access;
pub mod annotation;
pub mod class;
pub mod key;
pub mod method;
pub mod reference;
pub mod types;
pub mod value;
