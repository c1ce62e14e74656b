//! Dalvik opcode byte constants.
//!
//! This module provides the raw byte values for every assigned Dalvik opcode. Opcodes are named
//! after their mnemonic with `-` and `/` replaced by `_` (e.g. [`INVOKE_STATIC`] = `0x71`,
//! [`CONST_STRING_JUMBO`] = `0x1B`).
//!
//! Payload pseudo-instructions share the [`NOP`] opcode and are identified by the full first code
//! unit, see [`PACKED_SWITCH_PAYLOAD`], [`SPARSE_SWITCH_PAYLOAD`] and [`FILL_ARRAY_DATA_PAYLOAD`].
#![allow(missing_docs)]

// ── Payload identifiers (full first code unit) ─────────────────────────────

pub const PACKED_SWITCH_PAYLOAD: u16 = 0x0100;
pub const SPARSE_SWITCH_PAYLOAD: u16 = 0x0200;
pub const FILL_ARRAY_DATA_PAYLOAD: u16 = 0x0300;

// ── Single-byte opcodes (0x00 – 0xFF) ──────────────────────────────────────

// Moves and returns
pub const NOP: u8 = 0x00;
pub const MOVE: u8 = 0x01;
pub const MOVE_FROM16: u8 = 0x02;
pub const MOVE_16: u8 = 0x03;
pub const MOVE_WIDE: u8 = 0x04;
pub const MOVE_WIDE_FROM16: u8 = 0x05;
pub const MOVE_WIDE_16: u8 = 0x06;
pub const MOVE_OBJECT: u8 = 0x07;
pub const MOVE_OBJECT_FROM16: u8 = 0x08;
pub const MOVE_OBJECT_16: u8 = 0x09;
pub const MOVE_RESULT: u8 = 0x0A;
pub const MOVE_RESULT_WIDE: u8 = 0x0B;
pub const MOVE_RESULT_OBJECT: u8 = 0x0C;
pub const MOVE_EXCEPTION: u8 = 0x0D;
pub const RETURN_VOID: u8 = 0x0E;
pub const RETURN: u8 = 0x0F;
pub const RETURN_WIDE: u8 = 0x10;
pub const RETURN_OBJECT: u8 = 0x11;

// Constants
pub const CONST_4: u8 = 0x12;
pub const CONST_16: u8 = 0x13;
pub const CONST: u8 = 0x14;
pub const CONST_HIGH16: u8 = 0x15;
pub const CONST_WIDE_16: u8 = 0x16;
pub const CONST_WIDE_32: u8 = 0x17;
pub const CONST_WIDE: u8 = 0x18;
pub const CONST_WIDE_HIGH16: u8 = 0x19;
pub const CONST_STRING: u8 = 0x1A;
pub const CONST_STRING_JUMBO: u8 = 0x1B;
pub const CONST_CLASS: u8 = 0x1C;

// Monitors, type checks and arrays
pub const MONITOR_ENTER: u8 = 0x1D;
pub const MONITOR_EXIT: u8 = 0x1E;
pub const CHECK_CAST: u8 = 0x1F;
pub const INSTANCE_OF: u8 = 0x20;
pub const ARRAY_LENGTH: u8 = 0x21;
pub const NEW_INSTANCE: u8 = 0x22;
pub const NEW_ARRAY: u8 = 0x23;
pub const FILLED_NEW_ARRAY: u8 = 0x24;
pub const FILLED_NEW_ARRAY_RANGE: u8 = 0x25;
pub const FILL_ARRAY_DATA: u8 = 0x26;

// Control flow
pub const THROW: u8 = 0x27;
pub const GOTO: u8 = 0x28;
pub const GOTO_16: u8 = 0x29;
pub const GOTO_32: u8 = 0x2A;
pub const PACKED_SWITCH: u8 = 0x2B;
pub const SPARSE_SWITCH: u8 = 0x2C;

// Comparisons
pub const CMPL_FLOAT: u8 = 0x2D;
pub const CMPG_FLOAT: u8 = 0x2E;
pub const CMPL_DOUBLE: u8 = 0x2F;
pub const CMPG_DOUBLE: u8 = 0x30;
pub const CMP_LONG: u8 = 0x31;

// Conditional branches
pub const IF_EQ: u8 = 0x32;
pub const IF_NE: u8 = 0x33;
pub const IF_LT: u8 = 0x34;
pub const IF_GE: u8 = 0x35;
pub const IF_GT: u8 = 0x36;
pub const IF_LE: u8 = 0x37;
pub const IF_EQZ: u8 = 0x38;
pub const IF_NEZ: u8 = 0x39;
pub const IF_LTZ: u8 = 0x3A;
pub const IF_GEZ: u8 = 0x3B;
pub const IF_GTZ: u8 = 0x3C;
pub const IF_LEZ: u8 = 0x3D;

// Array access
pub const AGET: u8 = 0x44;
pub const AGET_WIDE: u8 = 0x45;
pub const AGET_OBJECT: u8 = 0x46;
pub const AGET_BOOLEAN: u8 = 0x47;
pub const AGET_BYTE: u8 = 0x48;
pub const AGET_CHAR: u8 = 0x49;
pub const AGET_SHORT: u8 = 0x4A;
pub const APUT: u8 = 0x4B;
pub const APUT_WIDE: u8 = 0x4C;
pub const APUT_OBJECT: u8 = 0x4D;
pub const APUT_BOOLEAN: u8 = 0x4E;
pub const APUT_BYTE: u8 = 0x4F;
pub const APUT_CHAR: u8 = 0x50;
pub const APUT_SHORT: u8 = 0x51;

// Instance field access
pub const IGET: u8 = 0x52;
pub const IGET_WIDE: u8 = 0x53;
pub const IGET_OBJECT: u8 = 0x54;
pub const IGET_BOOLEAN: u8 = 0x55;
pub const IGET_BYTE: u8 = 0x56;
pub const IGET_CHAR: u8 = 0x57;
pub const IGET_SHORT: u8 = 0x58;
pub const IPUT: u8 = 0x59;
pub const IPUT_WIDE: u8 = 0x5A;
pub const IPUT_OBJECT: u8 = 0x5B;
pub const IPUT_BOOLEAN: u8 = 0x5C;
pub const IPUT_BYTE: u8 = 0x5D;
pub const IPUT_CHAR: u8 = 0x5E;
pub const IPUT_SHORT: u8 = 0x5F;

// Static field access
pub const SGET: u8 = 0x60;
pub const SGET_WIDE: u8 = 0x61;
pub const SGET_OBJECT: u8 = 0x62;
pub const SGET_BOOLEAN: u8 = 0x63;
pub const SGET_BYTE: u8 = 0x64;
pub const SGET_CHAR: u8 = 0x65;
pub const SGET_SHORT: u8 = 0x66;
pub const SPUT: u8 = 0x67;
pub const SPUT_WIDE: u8 = 0x68;
pub const SPUT_OBJECT: u8 = 0x69;
pub const SPUT_BOOLEAN: u8 = 0x6A;
pub const SPUT_BYTE: u8 = 0x6B;
pub const SPUT_CHAR: u8 = 0x6C;
pub const SPUT_SHORT: u8 = 0x6D;

// Invokes
pub const INVOKE_VIRTUAL: u8 = 0x6E;
pub const INVOKE_SUPER: u8 = 0x6F;
pub const INVOKE_DIRECT: u8 = 0x70;
pub const INVOKE_STATIC: u8 = 0x71;
pub const INVOKE_INTERFACE: u8 = 0x72;
pub const INVOKE_VIRTUAL_RANGE: u8 = 0x74;
pub const INVOKE_SUPER_RANGE: u8 = 0x75;
pub const INVOKE_DIRECT_RANGE: u8 = 0x76;
pub const INVOKE_STATIC_RANGE: u8 = 0x77;
pub const INVOKE_INTERFACE_RANGE: u8 = 0x78;

// Unary operations
pub const NEG_INT: u8 = 0x7B;
pub const NOT_INT: u8 = 0x7C;
pub const NEG_LONG: u8 = 0x7D;
pub const NOT_LONG: u8 = 0x7E;
pub const NEG_FLOAT: u8 = 0x7F;
pub const NEG_DOUBLE: u8 = 0x80;
pub const INT_TO_LONG: u8 = 0x81;
pub const INT_TO_FLOAT: u8 = 0x82;
pub const INT_TO_DOUBLE: u8 = 0x83;
pub const LONG_TO_INT: u8 = 0x84;
pub const LONG_TO_FLOAT: u8 = 0x85;
pub const LONG_TO_DOUBLE: u8 = 0x86;
pub const FLOAT_TO_INT: u8 = 0x87;
pub const FLOAT_TO_LONG: u8 = 0x88;
pub const FLOAT_TO_DOUBLE: u8 = 0x89;
pub const DOUBLE_TO_INT: u8 = 0x8A;
pub const DOUBLE_TO_LONG: u8 = 0x8B;
pub const DOUBLE_TO_FLOAT: u8 = 0x8C;
pub const INT_TO_BYTE: u8 = 0x8D;
pub const INT_TO_CHAR: u8 = 0x8E;
pub const INT_TO_SHORT: u8 = 0x8F;

// Binary operations
pub const ADD_INT: u8 = 0x90;
pub const SUB_INT: u8 = 0x91;
pub const MUL_INT: u8 = 0x92;
pub const DIV_INT: u8 = 0x93;
pub const REM_INT: u8 = 0x94;
pub const AND_INT: u8 = 0x95;
pub const OR_INT: u8 = 0x96;
pub const XOR_INT: u8 = 0x97;
pub const SHL_INT: u8 = 0x98;
pub const SHR_INT: u8 = 0x99;
pub const USHR_INT: u8 = 0x9A;
pub const ADD_LONG: u8 = 0x9B;
pub const SUB_LONG: u8 = 0x9C;
pub const MUL_LONG: u8 = 0x9D;
pub const DIV_LONG: u8 = 0x9E;
pub const REM_LONG: u8 = 0x9F;
pub const AND_LONG: u8 = 0xA0;
pub const OR_LONG: u8 = 0xA1;
pub const XOR_LONG: u8 = 0xA2;
pub const SHL_LONG: u8 = 0xA3;
pub const SHR_LONG: u8 = 0xA4;
pub const USHR_LONG: u8 = 0xA5;
pub const ADD_FLOAT: u8 = 0xA6;
pub const SUB_FLOAT: u8 = 0xA7;
pub const MUL_FLOAT: u8 = 0xA8;
pub const DIV_FLOAT: u8 = 0xA9;
pub const REM_FLOAT: u8 = 0xAA;
pub const ADD_DOUBLE: u8 = 0xAB;
pub const SUB_DOUBLE: u8 = 0xAC;
pub const MUL_DOUBLE: u8 = 0xAD;
pub const DIV_DOUBLE: u8 = 0xAE;
pub const REM_DOUBLE: u8 = 0xAF;

// Binary operations, two-address form
pub const ADD_INT_2ADDR: u8 = 0xB0;
pub const SUB_INT_2ADDR: u8 = 0xB1;
pub const MUL_INT_2ADDR: u8 = 0xB2;
pub const DIV_INT_2ADDR: u8 = 0xB3;
pub const REM_INT_2ADDR: u8 = 0xB4;
pub const AND_INT_2ADDR: u8 = 0xB5;
pub const OR_INT_2ADDR: u8 = 0xB6;
pub const XOR_INT_2ADDR: u8 = 0xB7;
pub const SHL_INT_2ADDR: u8 = 0xB8;
pub const SHR_INT_2ADDR: u8 = 0xB9;
pub const USHR_INT_2ADDR: u8 = 0xBA;
pub const ADD_LONG_2ADDR: u8 = 0xBB;
pub const SUB_LONG_2ADDR: u8 = 0xBC;
pub const MUL_LONG_2ADDR: u8 = 0xBD;
pub const DIV_LONG_2ADDR: u8 = 0xBE;
pub const REM_LONG_2ADDR: u8 = 0xBF;
pub const AND_LONG_2ADDR: u8 = 0xC0;
pub const OR_LONG_2ADDR: u8 = 0xC1;
pub const XOR_LONG_2ADDR: u8 = 0xC2;
pub const SHL_LONG_2ADDR: u8 = 0xC3;
pub const SHR_LONG_2ADDR: u8 = 0xC4;
pub const USHR_LONG_2ADDR: u8 = 0xC5;
pub const ADD_FLOAT_2ADDR: u8 = 0xC6;
pub const SUB_FLOAT_2ADDR: u8 = 0xC7;
pub const MUL_FLOAT_2ADDR: u8 = 0xC8;
pub const DIV_FLOAT_2ADDR: u8 = 0xC9;
pub const REM_FLOAT_2ADDR: u8 = 0xCA;
pub const ADD_DOUBLE_2ADDR: u8 = 0xCB;
pub const SUB_DOUBLE_2ADDR: u8 = 0xCC;
pub const MUL_DOUBLE_2ADDR: u8 = 0xCD;
pub const DIV_DOUBLE_2ADDR: u8 = 0xCE;
pub const REM_DOUBLE_2ADDR: u8 = 0xCF;

// Literal operations
pub const ADD_INT_LIT16: u8 = 0xD0;
pub const RSUB_INT: u8 = 0xD1;
pub const MUL_INT_LIT16: u8 = 0xD2;
pub const DIV_INT_LIT16: u8 = 0xD3;
pub const REM_INT_LIT16: u8 = 0xD4;
pub const AND_INT_LIT16: u8 = 0xD5;
pub const OR_INT_LIT16: u8 = 0xD6;
pub const XOR_INT_LIT16: u8 = 0xD7;
pub const ADD_INT_LIT8: u8 = 0xD8;
pub const RSUB_INT_LIT8: u8 = 0xD9;
pub const MUL_INT_LIT8: u8 = 0xDA;
pub const DIV_INT_LIT8: u8 = 0xDB;
pub const REM_INT_LIT8: u8 = 0xDC;
pub const AND_INT_LIT8: u8 = 0xDD;
pub const OR_INT_LIT8: u8 = 0xDE;
pub const XOR_INT_LIT8: u8 = 0xDF;
pub const SHL_INT_LIT8: u8 = 0xE0;
pub const SHR_INT_LIT8: u8 = 0xE1;
pub const USHR_INT_LIT8: u8 = 0xE2;

// Method handles, call sites and polymorphic invokes
pub const INVOKE_POLYMORPHIC: u8 = 0xFA;
pub const INVOKE_POLYMORPHIC_RANGE: u8 = 0xFB;
pub const INVOKE_CUSTOM: u8 = 0xFC;
pub const INVOKE_CUSTOM_RANGE: u8 = 0xFD;
pub const CONST_METHOD_HANDLE: u8 = 0xFE;
pub const CONST_METHOD_TYPE: u8 = 0xFF;
