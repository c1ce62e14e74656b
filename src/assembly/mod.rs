//! Dalvik bytecode model, decoder and encoder.
//!
//! This module covers the instruction level of a DEX container: the static opcode table, the
//! structured instruction representation, and the codec between instructions and 16-bit code
//! units.
//!
//! # Key Types
//! - [`Instruction`] - A decoded or constructed instruction
//! - [`Operand`] - Literal, branch, pool reference or payload table
//! - [`Format`] - Operand layout of an opcode
//! - [`OperationSpec`] / [`OPERATIONS`] - The 256-entry opcode table
//! - [`InstructionEncoder`] - Appends encoded instructions to a code unit buffer
//!
//! # Main Functions
//! - [`decode_instruction`] - Decode a single instruction
//! - [`decode_stream`] - Decode a sequence of instructions
//! - [`encode_instruction`] - Encode a single instruction
//!
//! # Example
//! ```rust
//! use dexscope::assembly::{decode_stream, encode_instruction};
//! use dexscope::metadata::reference::RawIndices;
//!
//! // invoke-static {v0, v1}, method@2 ; return-void
//! let code = [0x2071, 0x0002, 0x0010, 0x000E];
//! let instructions = decode_stream(&code)?;
//!
//! let mut units = Vec::new();
//! for instruction in &instructions {
//!     units.extend(encode_instruction(instruction, &RawIndices)?);
//! }
//! assert_eq!(units, code);
//! # Ok::<(), dexscope::Error>(())
//! ```

mod decoder;
mod encoder;
mod instruction;
mod instructions;
pub mod opcodes;

pub use decoder::{decode_instruction, decode_stream, units_from_bytes};
pub use encoder::{encode_instruction, opcode_for_mnemonic, InstructionEncoder};
pub use instruction::{Instruction, Operand};
pub use instructions::{Format, OperationSpec, OPERATIONS};
