//! The static Dalvik instruction table.
//!
//! [`OPERATIONS`] maps each of the 256 opcode bytes to an [`OperationSpec`]: the mnemonic, the
//! [`Format`] that fixes how operands are packed into code units, and the pools the instruction
//! references. Unassigned opcodes carry an empty mnemonic and the `10x` format; the decoder
//! rejects them.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::assembly::{Format, OPERATIONS};
//!
//! let spec = &OPERATIONS[0x71];
//! assert_eq!(spec.mnemonic, "invoke-static");
//! assert_eq!(spec.format, Format::F35c);
//! assert_eq!(spec.format.width(), 3);
//! ```

use strum::{Display, EnumString};

use crate::metadata::reference::ReferenceKind;

/// Instruction formats, named after the Dalvik format identifiers.
///
/// The first digit of a format name is its width in code units, the second the number of
/// registers, the trailing letter the operand kind. The three payload variants are the
/// pseudo-instructions that hold switch tables and array data.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Format {
    #[strum(serialize = "10x")]
    F10x,
    #[strum(serialize = "12x")]
    F12x,
    #[strum(serialize = "11n")]
    F11n,
    #[strum(serialize = "11x")]
    F11x,
    #[strum(serialize = "10t")]
    F10t,
    #[strum(serialize = "20t")]
    F20t,
    #[strum(serialize = "22x")]
    F22x,
    #[strum(serialize = "21t")]
    F21t,
    #[strum(serialize = "21s")]
    F21s,
    #[strum(serialize = "21h")]
    F21h,
    #[strum(serialize = "21c")]
    F21c,
    #[strum(serialize = "23x")]
    F23x,
    #[strum(serialize = "22b")]
    F22b,
    #[strum(serialize = "22t")]
    F22t,
    #[strum(serialize = "22s")]
    F22s,
    #[strum(serialize = "22c")]
    F22c,
    #[strum(serialize = "32x")]
    F32x,
    #[strum(serialize = "30t")]
    F30t,
    #[strum(serialize = "31t")]
    F31t,
    #[strum(serialize = "31i")]
    F31i,
    #[strum(serialize = "31c")]
    F31c,
    #[strum(serialize = "35c")]
    F35c,
    #[strum(serialize = "3rc")]
    F3rc,
    #[strum(serialize = "45cc")]
    F45cc,
    #[strum(serialize = "4rcc")]
    F4rcc,
    #[strum(serialize = "51l")]
    F51l,
    #[strum(serialize = "packed-switch-payload")]
    PackedSwitchPayload,
    #[strum(serialize = "sparse-switch-payload")]
    SparseSwitchPayload,
    #[strum(serialize = "fill-array-data-payload")]
    FillArrayDataPayload,
}

impl Format {
    /// Width of an instruction of this format in 16-bit code units.
    ///
    /// Payload widths depend on their tables and are computed by
    /// [`crate::assembly::Instruction::width`]; for them this returns the fixed header width.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Format::F10x | Format::F12x | Format::F11n | Format::F11x | Format::F10t => 1,
            Format::F20t
            | Format::F22x
            | Format::F21t
            | Format::F21s
            | Format::F21h
            | Format::F21c
            | Format::F23x
            | Format::F22b
            | Format::F22t
            | Format::F22s
            | Format::F22c
            | Format::SparseSwitchPayload => 2,
            Format::F32x
            | Format::F30t
            | Format::F31t
            | Format::F31i
            | Format::F31c
            | Format::F35c
            | Format::F3rc => 3,
            Format::F45cc
            | Format::F4rcc
            | Format::PackedSwitchPayload
            | Format::FillArrayDataPayload => 4,
            Format::F51l => 5,
        }
    }

    /// Returns `true` for the three payload pseudo-formats.
    #[must_use]
    pub const fn is_payload(self) -> bool {
        matches!(
            self,
            Format::PackedSwitchPayload | Format::SparseSwitchPayload | Format::FillArrayDataPayload
        )
    }

    /// Returns `true` for formats whose operand is a branch delta.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            Format::F10t | Format::F20t | Format::F30t | Format::F21t | Format::F22t | Format::F31t
        )
    }

    /// Returns `true` for the invoke-style formats that carry an argument register list.
    #[must_use]
    pub const fn is_invoke(self) -> bool {
        matches!(
            self,
            Format::F35c | Format::F3rc | Format::F45cc | Format::F4rcc
        )
    }
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    /// Mnemonic, empty for unassigned opcodes
    pub mnemonic: &'static str,
    /// Operand layout
    pub format: Format,
    /// Pools referenced by the operand, in encoding order
    pub references: &'static [ReferenceKind],
}

impl OperationSpec {
    /// Returns `true` if the opcode is assigned.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        !self.mnemonic.is_empty()
    }
}

const fn op(mnemonic: &'static str, format: Format) -> OperationSpec {
    OperationSpec {
        mnemonic,
        format,
        references: &[],
    }
}

const fn op_ref(
    mnemonic: &'static str,
    format: Format,
    references: &'static [ReferenceKind],
) -> OperationSpec {
    OperationSpec {
        mnemonic,
        format,
        references,
    }
}

const UNUSED: OperationSpec = op("", Format::F10x);

/// The instruction table, indexed by opcode byte.
pub static OPERATIONS: [OperationSpec; 256] = [
    // Moves and returns
    op("nop", Format::F10x), // 0x00
    op("move", Format::F12x), // 0x01
    op("move/from16", Format::F22x), // 0x02
    op("move/16", Format::F32x), // 0x03
    op("move-wide", Format::F12x), // 0x04
    op("move-wide/from16", Format::F22x), // 0x05
    op("move-wide/16", Format::F32x), // 0x06
    op("move-object", Format::F12x), // 0x07
    op("move-object/from16", Format::F22x), // 0x08
    op("move-object/16", Format::F32x), // 0x09
    op("move-result", Format::F11x), // 0x0a
    op("move-result-wide", Format::F11x), // 0x0b
    op("move-result-object", Format::F11x), // 0x0c
    op("move-exception", Format::F11x), // 0x0d
    op("return-void", Format::F10x), // 0x0e
    op("return", Format::F11x), // 0x0f
    op("return-wide", Format::F11x), // 0x10
    op("return-object", Format::F11x), // 0x11
    // Constants
    op("const/4", Format::F11n), // 0x12
    op("const/16", Format::F21s), // 0x13
    op("const", Format::F31i), // 0x14
    op("const/high16", Format::F21h), // 0x15
    op("const-wide/16", Format::F21s), // 0x16
    op("const-wide/32", Format::F31i), // 0x17
    op("const-wide", Format::F51l), // 0x18
    op("const-wide/high16", Format::F21h), // 0x19
    op_ref("const-string", Format::F21c, &[ReferenceKind::String]), // 0x1a
    op_ref("const-string/jumbo", Format::F31c, &[ReferenceKind::String]), // 0x1b
    op_ref("const-class", Format::F21c, &[ReferenceKind::Type]), // 0x1c
    // Monitors, type checks and arrays
    op("monitor-enter", Format::F11x), // 0x1d
    op("monitor-exit", Format::F11x), // 0x1e
    op_ref("check-cast", Format::F21c, &[ReferenceKind::Type]), // 0x1f
    op_ref("instance-of", Format::F22c, &[ReferenceKind::Type]), // 0x20
    op("array-length", Format::F12x), // 0x21
    op_ref("new-instance", Format::F21c, &[ReferenceKind::Type]), // 0x22
    op_ref("new-array", Format::F22c, &[ReferenceKind::Type]), // 0x23
    op_ref("filled-new-array", Format::F35c, &[ReferenceKind::Type]), // 0x24
    op_ref("filled-new-array/range", Format::F3rc, &[ReferenceKind::Type]), // 0x25
    op("fill-array-data", Format::F31t), // 0x26
    // Control flow
    op("throw", Format::F11x), // 0x27
    op("goto", Format::F10t), // 0x28
    op("goto/16", Format::F20t), // 0x29
    op("goto/32", Format::F30t), // 0x2a
    op("packed-switch", Format::F31t), // 0x2b
    op("sparse-switch", Format::F31t), // 0x2c
    // Comparisons
    op("cmpl-float", Format::F23x), // 0x2d
    op("cmpg-float", Format::F23x), // 0x2e
    op("cmpl-double", Format::F23x), // 0x2f
    op("cmpg-double", Format::F23x), // 0x30
    op("cmp-long", Format::F23x), // 0x31
    // Conditional branches
    op("if-eq", Format::F22t), // 0x32
    op("if-ne", Format::F22t), // 0x33
    op("if-lt", Format::F22t), // 0x34
    op("if-ge", Format::F22t), // 0x35
    op("if-gt", Format::F22t), // 0x36
    op("if-le", Format::F22t), // 0x37
    op("if-eqz", Format::F21t), // 0x38
    op("if-nez", Format::F21t), // 0x39
    op("if-ltz", Format::F21t), // 0x3a
    op("if-gez", Format::F21t), // 0x3b
    op("if-gtz", Format::F21t), // 0x3c
    op("if-lez", Format::F21t), // 0x3d
    UNUSED, // 0x3e
    UNUSED, // 0x3f
    UNUSED, // 0x40
    UNUSED, // 0x41
    UNUSED, // 0x42
    UNUSED, // 0x43
    // Array access
    op("aget", Format::F23x), // 0x44
    op("aget-wide", Format::F23x), // 0x45
    op("aget-object", Format::F23x), // 0x46
    op("aget-boolean", Format::F23x), // 0x47
    op("aget-byte", Format::F23x), // 0x48
    op("aget-char", Format::F23x), // 0x49
    op("aget-short", Format::F23x), // 0x4a
    op("aput", Format::F23x), // 0x4b
    op("aput-wide", Format::F23x), // 0x4c
    op("aput-object", Format::F23x), // 0x4d
    op("aput-boolean", Format::F23x), // 0x4e
    op("aput-byte", Format::F23x), // 0x4f
    op("aput-char", Format::F23x), // 0x50
    op("aput-short", Format::F23x), // 0x51
    // Instance field access
    op_ref("iget", Format::F22c, &[ReferenceKind::Field]), // 0x52
    op_ref("iget-wide", Format::F22c, &[ReferenceKind::Field]), // 0x53
    op_ref("iget-object", Format::F22c, &[ReferenceKind::Field]), // 0x54
    op_ref("iget-boolean", Format::F22c, &[ReferenceKind::Field]), // 0x55
    op_ref("iget-byte", Format::F22c, &[ReferenceKind::Field]), // 0x56
    op_ref("iget-char", Format::F22c, &[ReferenceKind::Field]), // 0x57
    op_ref("iget-short", Format::F22c, &[ReferenceKind::Field]), // 0x58
    op_ref("iput", Format::F22c, &[ReferenceKind::Field]), // 0x59
    op_ref("iput-wide", Format::F22c, &[ReferenceKind::Field]), // 0x5a
    op_ref("iput-object", Format::F22c, &[ReferenceKind::Field]), // 0x5b
    op_ref("iput-boolean", Format::F22c, &[ReferenceKind::Field]), // 0x5c
    op_ref("iput-byte", Format::F22c, &[ReferenceKind::Field]), // 0x5d
    op_ref("iput-char", Format::F22c, &[ReferenceKind::Field]), // 0x5e
    op_ref("iput-short", Format::F22c, &[ReferenceKind::Field]), // 0x5f
    // Static field access
    op_ref("sget", Format::F21c, &[ReferenceKind::Field]), // 0x60
    op_ref("sget-wide", Format::F21c, &[ReferenceKind::Field]), // 0x61
    op_ref("sget-object", Format::F21c, &[ReferenceKind::Field]), // 0x62
    op_ref("sget-boolean", Format::F21c, &[ReferenceKind::Field]), // 0x63
    op_ref("sget-byte", Format::F21c, &[ReferenceKind::Field]), // 0x64
    op_ref("sget-char", Format::F21c, &[ReferenceKind::Field]), // 0x65
    op_ref("sget-short", Format::F21c, &[ReferenceKind::Field]), // 0x66
    op_ref("sput", Format::F21c, &[ReferenceKind::Field]), // 0x67
    op_ref("sput-wide", Format::F21c, &[ReferenceKind::Field]), // 0x68
    op_ref("sput-object", Format::F21c, &[ReferenceKind::Field]), // 0x69
    op_ref("sput-boolean", Format::F21c, &[ReferenceKind::Field]), // 0x6a
    op_ref("sput-byte", Format::F21c, &[ReferenceKind::Field]), // 0x6b
    op_ref("sput-char", Format::F21c, &[ReferenceKind::Field]), // 0x6c
    op_ref("sput-short", Format::F21c, &[ReferenceKind::Field]), // 0x6d
    // Invokes
    op_ref("invoke-virtual", Format::F35c, &[ReferenceKind::Method]), // 0x6e
    op_ref("invoke-super", Format::F35c, &[ReferenceKind::Method]), // 0x6f
    op_ref("invoke-direct", Format::F35c, &[ReferenceKind::Method]), // 0x70
    op_ref("invoke-static", Format::F35c, &[ReferenceKind::Method]), // 0x71
    op_ref("invoke-interface", Format::F35c, &[ReferenceKind::Method]), // 0x72
    UNUSED, // 0x73
    op_ref("invoke-virtual/range", Format::F3rc, &[ReferenceKind::Method]), // 0x74
    op_ref("invoke-super/range", Format::F3rc, &[ReferenceKind::Method]), // 0x75
    op_ref("invoke-direct/range", Format::F3rc, &[ReferenceKind::Method]), // 0x76
    op_ref("invoke-static/range", Format::F3rc, &[ReferenceKind::Method]), // 0x77
    op_ref("invoke-interface/range", Format::F3rc, &[ReferenceKind::Method]), // 0x78
    UNUSED, // 0x79
    UNUSED, // 0x7a
    // Unary operations
    op("neg-int", Format::F12x), // 0x7b
    op("not-int", Format::F12x), // 0x7c
    op("neg-long", Format::F12x), // 0x7d
    op("not-long", Format::F12x), // 0x7e
    op("neg-float", Format::F12x), // 0x7f
    op("neg-double", Format::F12x), // 0x80
    op("int-to-long", Format::F12x), // 0x81
    op("int-to-float", Format::F12x), // 0x82
    op("int-to-double", Format::F12x), // 0x83
    op("long-to-int", Format::F12x), // 0x84
    op("long-to-float", Format::F12x), // 0x85
    op("long-to-double", Format::F12x), // 0x86
    op("float-to-int", Format::F12x), // 0x87
    op("float-to-long", Format::F12x), // 0x88
    op("float-to-double", Format::F12x), // 0x89
    op("double-to-int", Format::F12x), // 0x8a
    op("double-to-long", Format::F12x), // 0x8b
    op("double-to-float", Format::F12x), // 0x8c
    op("int-to-byte", Format::F12x), // 0x8d
    op("int-to-char", Format::F12x), // 0x8e
    op("int-to-short", Format::F12x), // 0x8f
    // Binary operations
    op("add-int", Format::F23x), // 0x90
    op("sub-int", Format::F23x), // 0x91
    op("mul-int", Format::F23x), // 0x92
    op("div-int", Format::F23x), // 0x93
    op("rem-int", Format::F23x), // 0x94
    op("and-int", Format::F23x), // 0x95
    op("or-int", Format::F23x), // 0x96
    op("xor-int", Format::F23x), // 0x97
    op("shl-int", Format::F23x), // 0x98
    op("shr-int", Format::F23x), // 0x99
    op("ushr-int", Format::F23x), // 0x9a
    op("add-long", Format::F23x), // 0x9b
    op("sub-long", Format::F23x), // 0x9c
    op("mul-long", Format::F23x), // 0x9d
    op("div-long", Format::F23x), // 0x9e
    op("rem-long", Format::F23x), // 0x9f
    op("and-long", Format::F23x), // 0xa0
    op("or-long", Format::F23x), // 0xa1
    op("xor-long", Format::F23x), // 0xa2
    op("shl-long", Format::F23x), // 0xa3
    op("shr-long", Format::F23x), // 0xa4
    op("ushr-long", Format::F23x), // 0xa5
    op("add-float", Format::F23x), // 0xa6
    op("sub-float", Format::F23x), // 0xa7
    op("mul-float", Format::F23x), // 0xa8
    op("div-float", Format::F23x), // 0xa9
    op("rem-float", Format::F23x), // 0xaa
    op("add-double", Format::F23x), // 0xab
    op("sub-double", Format::F23x), // 0xac
    op("mul-double", Format::F23x), // 0xad
    op("div-double", Format::F23x), // 0xae
    op("rem-double", Format::F23x), // 0xaf
    // Binary operations, two-address form
    op("add-int/2addr", Format::F12x), // 0xb0
    op("sub-int/2addr", Format::F12x), // 0xb1
    op("mul-int/2addr", Format::F12x), // 0xb2
    op("div-int/2addr", Format::F12x), // 0xb3
    op("rem-int/2addr", Format::F12x), // 0xb4
    op("and-int/2addr", Format::F12x), // 0xb5
    op("or-int/2addr", Format::F12x), // 0xb6
    op("xor-int/2addr", Format::F12x), // 0xb7
    op("shl-int/2addr", Format::F12x), // 0xb8
    op("shr-int/2addr", Format::F12x), // 0xb9
    op("ushr-int/2addr", Format::F12x), // 0xba
    op("add-long/2addr", Format::F12x), // 0xbb
    op("sub-long/2addr", Format::F12x), // 0xbc
    op("mul-long/2addr", Format::F12x), // 0xbd
    op("div-long/2addr", Format::F12x), // 0xbe
    op("rem-long/2addr", Format::F12x), // 0xbf
    op("and-long/2addr", Format::F12x), // 0xc0
    op("or-long/2addr", Format::F12x), // 0xc1
    op("xor-long/2addr", Format::F12x), // 0xc2
    op("shl-long/2addr", Format::F12x), // 0xc3
    op("shr-long/2addr", Format::F12x), // 0xc4
    op("ushr-long/2addr", Format::F12x), // 0xc5
    op("add-float/2addr", Format::F12x), // 0xc6
    op("sub-float/2addr", Format::F12x), // 0xc7
    op("mul-float/2addr", Format::F12x), // 0xc8
    op("div-float/2addr", Format::F12x), // 0xc9
    op("rem-float/2addr", Format::F12x), // 0xca
    op("add-double/2addr", Format::F12x), // 0xcb
    op("sub-double/2addr", Format::F12x), // 0xcc
    op("mul-double/2addr", Format::F12x), // 0xcd
    op("div-double/2addr", Format::F12x), // 0xce
    op("rem-double/2addr", Format::F12x), // 0xcf
    // Literal operations
    op("add-int/lit16", Format::F22s), // 0xd0
    op("rsub-int", Format::F22s), // 0xd1
    op("mul-int/lit16", Format::F22s), // 0xd2
    op("div-int/lit16", Format::F22s), // 0xd3
    op("rem-int/lit16", Format::F22s), // 0xd4
    op("and-int/lit16", Format::F22s), // 0xd5
    op("or-int/lit16", Format::F22s), // 0xd6
    op("xor-int/lit16", Format::F22s), // 0xd7
    op("add-int/lit8", Format::F22b), // 0xd8
    op("rsub-int/lit8", Format::F22b), // 0xd9
    op("mul-int/lit8", Format::F22b), // 0xda
    op("div-int/lit8", Format::F22b), // 0xdb
    op("rem-int/lit8", Format::F22b), // 0xdc
    op("and-int/lit8", Format::F22b), // 0xdd
    op("or-int/lit8", Format::F22b), // 0xde
    op("xor-int/lit8", Format::F22b), // 0xdf
    op("shl-int/lit8", Format::F22b), // 0xe0
    op("shr-int/lit8", Format::F22b), // 0xe1
    op("ushr-int/lit8", Format::F22b), // 0xe2
    UNUSED, // 0xe3
    UNUSED, // 0xe4
    UNUSED, // 0xe5
    UNUSED, // 0xe6
    UNUSED, // 0xe7
    UNUSED, // 0xe8
    UNUSED, // 0xe9
    UNUSED, // 0xea
    UNUSED, // 0xeb
    UNUSED, // 0xec
    UNUSED, // 0xed
    UNUSED, // 0xee
    UNUSED, // 0xef
    UNUSED, // 0xf0
    UNUSED, // 0xf1
    UNUSED, // 0xf2
    UNUSED, // 0xf3
    UNUSED, // 0xf4
    UNUSED, // 0xf5
    UNUSED, // 0xf6
    UNUSED, // 0xf7
    UNUSED, // 0xf8
    UNUSED, // 0xf9
    // Method handles, call sites and polymorphic invokes
    op_ref("invoke-polymorphic", Format::F45cc, &[ReferenceKind::Method, ReferenceKind::Proto]), // 0xfa
    op_ref("invoke-polymorphic/range", Format::F4rcc, &[ReferenceKind::Method, ReferenceKind::Proto]), // 0xfb
    op_ref("invoke-custom", Format::F35c, &[ReferenceKind::CallSite]), // 0xfc
    op_ref("invoke-custom/range", Format::F3rc, &[ReferenceKind::CallSite]), // 0xfd
    op_ref("const-method-handle", Format::F21c, &[ReferenceKind::MethodHandle]), // 0xfe
    op_ref("const-method-type", Format::F21c, &[ReferenceKind::Proto]), // 0xff
];
