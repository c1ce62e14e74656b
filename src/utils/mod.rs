//! Shared encoding helpers.
//!
//! - [`crate::utils::leb128`] - ULEB128/SLEB128 writers
//! - [`crate::utils::mutf8`] - Modified UTF-8 string encoding
//! - [`crate::utils::math`] - Checked narrowing and alignment

pub mod leb128;
pub mod math;
pub mod mutf8;

pub use leb128::{uleb128_size, write_sleb128, write_uleb128};
pub use math::{align_to, pad_to, to_u16, to_u32};
