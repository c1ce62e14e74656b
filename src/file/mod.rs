//! Binary container primitives.
//!
//! This module holds the byte level building blocks shared by the decoder and the writer:
//!
//! - [`crate::file::io`] - Little-endian reads and writes at byte offsets
//! - [`crate::file::parser::Parser`] - Cursor based reader with LEB128 and MUTF-8 support
//! - [`crate::file::header::DexHeader`] - The fixed header at the start of every container
//!
//! # Examples
//!
//! ```rust
//! use dexscope::{file::header::DexHeader, writer::DexWriter};
//!
//! let bytes = DexWriter::new().write(&[])?;
//! let header = DexHeader::read(&bytes)?;
//! assert_eq!(header.file_size as usize, bytes.len());
//! # Ok::<(), dexscope::Error>(())
//! ```

pub mod header;
pub mod io;
pub mod parser;
