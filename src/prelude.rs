//! # dexscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dexscope library. Import this module to get quick access to everything needed to
//! build, edit and write a class graph.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dexscope operations
pub use crate::Error;

/// The result type used throughout dexscope
pub use crate::Result;

/// Cursor based reader
pub use crate::Parser;

/// Container header
pub use crate::file::header::DexHeader;

// ================================================================================================
// Bytecode
// ================================================================================================

/// Instruction model
pub use crate::assembly::{Format, Instruction, Operand};

/// Decoder and encoder
pub use crate::assembly::{
    decode_instruction, decode_stream, encode_instruction, InstructionEncoder,
};

/// Opcode constants
pub use crate::assembly::opcodes;

// ================================================================================================
// Class Graph
// ================================================================================================

/// Classes and their members
pub use crate::metadata::{
    access::AccessFlags,
    class::{ClassDef, Field},
    method::{CatchHandler, InstructionId, Method, MethodBody, TryRange},
};

/// Member and prototype identities
pub use crate::metadata::types::{FieldRef, MethodRef, Proto};

/// Instruction references and index resolution
pub use crate::metadata::reference::{RawIndices, Reference, ReferenceIndexer, ReferenceKind};

/// Constants and annotations
pub use crate::metadata::{
    annotation::{Annotation, AnnotationElement, AnnotationVisibility, EncodedAnnotation},
    value::{infer_type, EncodedValue, UntypedValue},
};

// ================================================================================================
// Writer
// ================================================================================================

/// Container generation
pub use crate::writer::{DexPlacement, DexWriter, SingleDex, WriterConfig};
