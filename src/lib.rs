// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'writer/output.rs' uses mmap to map the output file into memory

//! # dexscope
//!
//! [![Crates.io](https://img.shields.io/crates/v/dexscope.svg)](https://crates.io/crates/dexscope)
//! [![Documentation](https://docs.rs/dexscope/badge.svg)](https://docs.rs/dexscope)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/dexscope/blob/main/LICENSE-APACHE)
//!
//! A framework for decoding, editing and re-serializing Dalvik executable (DEX) containers.
//! Built in pure Rust, `dexscope` models the Dalvik instruction set, lets you edit method bodies
//! without breaking branch targets or exception ranges, and writes class graphs back out as
//! byte-for-byte deterministic containers with valid checksums.
//!
//! ## Features
//!
//! - **Complete instruction table** - All 256 opcodes with their operand layouts, including the
//!   switch and array payload pseudo-instructions
//! - **Lossless codec** - Decoding then encoding a valid stream reproduces it exactly
//! - **Safe editing** - Generation-checked instruction handles, labels and try ranges that
//!   survive instruction removal
//! - **Deterministic writer** - Identical class graphs always produce identical bytes
//!
//! ## Quick Start
//!
//! ```rust
//! use dexscope::prelude::*;
//!
//! let mut body = MethodBody::new();
//! body.push(Instruction::from_mnemonic("return-void", vec![], Operand::None)?);
//!
//! let class = ClassDef::new("LHello;", AccessFlags::PUBLIC)
//!     .with_superclass("Ljava/lang/Object;")
//!     .with_method(
//!         Method::new(
//!             "run",
//!             Proto::new("V", Vec::<String>::new()),
//!             AccessFlags::PUBLIC | AccessFlags::STATIC,
//!         )
//!         .with_body(body),
//!     );
//!
//! let bytes = DexWriter::new().write(&[class])?;
//! assert_eq!(&bytes[..8], b"dex\n035\0");
//! # Ok::<(), dexscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `dexscope` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`assembly`] - Opcode table, instruction model, decoder and encoder
//! - [`metadata`] - Class graph, method bodies, encoded values and annotations
//! - [`writer`] - Pool discovery, layout and container generation
//! - [`file`] - Header and byte level reading primitives
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never installs a logger.
//! The writer reports its phases at `debug` level and individual items at `trace` level.

#[macro_use]
pub(crate) mod error;

/// Header parsing and byte level reading.
pub mod file;

/// LEB128, MUTF-8 and checked arithmetic helpers.
pub mod utils;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dexscope::prelude::*;
///
/// let units = [0x000E];
/// let instructions = decode_stream(&units)?;
/// assert_eq!(instructions[0].mnemonic(), "return-void");
/// # Ok::<(), dexscope::Error>(())
/// ```
pub mod prelude;

/// Dalvik bytecode: the opcode table, instructions, and the decoder and encoder.
///
/// # Key Types
///
/// - [`assembly::Instruction`] - A decoded or constructed instruction
/// - [`assembly::Operand`] - Literal, branch, pool reference or payload table
/// - [`assembly::Format`] - Operand layout of an opcode
///
/// # Main Functions
///
/// - [`assembly::decode_instruction`] - Decode a single instruction
/// - [`assembly::decode_stream`] - Decode a sequence of instructions
/// - [`assembly::encode_instruction`] - Encode a single instruction
pub mod assembly;

/// The class graph written into containers.
pub mod metadata;

/// Container generation.
///
/// See [`writer::DexWriter`] for the entry point and [`writer::WriterConfig`] for its options.
pub mod writer;

/// `dexscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dexscope` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use dexscope::{assembly::decode_instruction, Error};
///
/// match decode_instruction(&[0x003E], 0) {
///     Err(Error::UnknownOpcode { opcode, .. }) => assert_eq!(opcode, 0x3E),
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub use error::Error;

/// Cursor based reader over a byte slice.
///
/// # Example
///
/// ```rust
/// use dexscope::Parser;
///
/// let mut parser = Parser::new(&[0xE5, 0x8E, 0x26]);
/// assert_eq!(parser.read_uleb128()?, 624_485);
/// # Ok::<(), dexscope::Error>(())
/// ```
pub use file::parser::Parser;
