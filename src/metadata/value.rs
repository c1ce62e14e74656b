//! Encoded values: the tagged constant format used for static field initializers, annotation
//! elements and call site arguments.
//!
//! # Key Components
//!
//! - [`EncodedValue`] - A typed constant
//! - [`ValueType`] - The five-bit type tag written in the header byte
//! - [`UntypedValue`] / [`infer_type`] - Picks an encoded type for a value without one
//!
//! # Encoding
//!
//! Every value starts with a header byte `(value_arg << 5) | value_type`. Integers are written
//! in the fewest little-endian bytes that preserve the value (sign-extended for signed types,
//! zero-extended for `char` and pool indices), with `value_arg` holding the byte count minus
//! one. Floating point values keep their high-order bytes and drop trailing zero bytes from the
//! low end. Booleans store their value in `value_arg` and have no payload.
//!
//! ```rust
//! use dexscope::metadata::reference::RawIndices;
//! use dexscope::metadata::value::{infer_type, EncodedValue, UntypedValue};
//!
//! let value = infer_type(&UntypedValue::Int(200))?;
//! assert_eq!(value, EncodedValue::Byte(-56));
//!
//! let mut out = Vec::new();
//! value.encode(&RawIndices, &mut out)?;
//! assert_eq!(out, [0x00, 0xC8]);
//! # Ok::<(), dexscope::Error>(())
//! ```

use strum::{Display, FromRepr};

use crate::{
    metadata::{
        annotation::EncodedAnnotation,
        key::StructuralKey,
        reference::ReferenceIndexer,
        types::{FieldRef, MethodRef, Proto},
    },
    utils::{to_u32, write_uleb128},
    Error, Result,
};

/// Type tags of encoded values.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum ValueType {
    Byte = 0x00,
    Short = 0x02,
    Char = 0x03,
    Int = 0x04,
    Long = 0x06,
    Float = 0x10,
    Double = 0x11,
    MethodType = 0x15,
    MethodHandle = 0x16,
    String = 0x17,
    Type = 0x18,
    Field = 0x19,
    Method = 0x1A,
    Enum = 0x1B,
    Array = 0x1C,
    Annotation = 0x1D,
    Null = 0x1E,
    Boolean = 0x1F,
}

/// A typed constant.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedValue {
    /// Signed 8-bit integer
    Byte(i8),
    /// Signed 16-bit integer
    Short(i16),
    /// Unsigned 16-bit character
    Char(u16),
    /// Signed 32-bit integer
    Int(i32),
    /// Signed 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// A method prototype
    MethodType(Proto),
    /// A method handle, by index
    MethodHandle(u32),
    /// A string constant
    String(String),
    /// A type descriptor
    Type(String),
    /// A field
    Field(FieldRef),
    /// A method
    Method(MethodRef),
    /// An enum constant, named by its field
    Enum(FieldRef),
    /// Nested values
    Array(Vec<EncodedValue>),
    /// A nested annotation
    Annotation(EncodedAnnotation),
    /// The null reference
    Null,
    /// A boolean
    Boolean(bool),
}

impl EncodedValue {
    /// Returns the type tag of this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            EncodedValue::Byte(_) => ValueType::Byte,
            EncodedValue::Short(_) => ValueType::Short,
            EncodedValue::Char(_) => ValueType::Char,
            EncodedValue::Int(_) => ValueType::Int,
            EncodedValue::Long(_) => ValueType::Long,
            EncodedValue::Float(_) => ValueType::Float,
            EncodedValue::Double(_) => ValueType::Double,
            EncodedValue::MethodType(_) => ValueType::MethodType,
            EncodedValue::MethodHandle(_) => ValueType::MethodHandle,
            EncodedValue::String(_) => ValueType::String,
            EncodedValue::Type(_) => ValueType::Type,
            EncodedValue::Field(_) => ValueType::Field,
            EncodedValue::Method(_) => ValueType::Method,
            EncodedValue::Enum(_) => ValueType::Enum,
            EncodedValue::Array(_) => ValueType::Array,
            EncodedValue::Annotation(_) => ValueType::Annotation,
            EncodedValue::Null => ValueType::Null,
            EncodedValue::Boolean(_) => ValueType::Boolean,
        }
    }

    /// Writes this value: header byte followed by its payload.
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if a referenced entity is not pooled.
    pub fn encode<I: ReferenceIndexer + ?Sized>(
        &self,
        indexer: &I,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let tag = self.value_type();
        match self {
            EncodedValue::Byte(value) => {
                out.push(header(tag, 0));
                out.push(value.to_le_bytes()[0]);
            }
            EncodedValue::Short(value) => write_signed(tag, i64::from(*value), out),
            EncodedValue::Int(value) => write_signed(tag, i64::from(*value), out),
            EncodedValue::Long(value) => write_signed(tag, *value, out),
            EncodedValue::Char(value) => write_unsigned(tag, u64::from(*value), out),
            EncodedValue::Float(value) => write_right_zero_extended(tag, &value.to_le_bytes(), out),
            EncodedValue::Double(value) => {
                write_right_zero_extended(tag, &value.to_le_bytes(), out);
            }
            EncodedValue::MethodType(proto) => {
                write_unsigned(tag, u64::from(indexer.proto_index(proto)?), out);
            }
            EncodedValue::MethodHandle(index) => {
                write_unsigned(tag, u64::from(indexer.method_handle_index(*index)?), out);
            }
            EncodedValue::String(value) => {
                write_unsigned(tag, u64::from(indexer.string_index(value)?), out);
            }
            EncodedValue::Type(descriptor) => {
                write_unsigned(tag, u64::from(indexer.type_index(descriptor)?), out);
            }
            EncodedValue::Field(field) | EncodedValue::Enum(field) => {
                write_unsigned(tag, u64::from(indexer.field_index(field)?), out);
            }
            EncodedValue::Method(method) => {
                write_unsigned(tag, u64::from(indexer.method_index(method)?), out);
            }
            EncodedValue::Array(values) => {
                out.push(header(tag, 0));
                encode_array(values, indexer, out)?;
            }
            EncodedValue::Annotation(annotation) => {
                out.push(header(tag, 0));
                annotation.encode(indexer, out)?;
            }
            EncodedValue::Null => out.push(header(tag, 0)),
            EncodedValue::Boolean(value) => out.push(header(tag, u8::from(*value))),
        }
        Ok(())
    }

    /// Visits this value and every nested value, depth first.
    pub fn visit<'a>(&'a self, visitor: &mut impl FnMut(&'a EncodedValue)) {
        visitor(self);
        match self {
            EncodedValue::Array(values) => {
                for value in values {
                    value.visit(visitor);
                }
            }
            EncodedValue::Annotation(annotation) => {
                for element in &annotation.elements {
                    element.value.visit(visitor);
                }
            }
            _ => {}
        }
    }
}

/// Writes an encoded array body: ULEB128 count followed by the values.
///
/// # Errors
/// See [`EncodedValue::encode`].
pub fn encode_array<I: ReferenceIndexer + ?Sized>(
    values: &[EncodedValue],
    indexer: &I,
    out: &mut Vec<u8>,
) -> Result<()> {
    write_uleb128(to_u32(values.len())?, out);
    for value in values {
        value.encode(indexer, out)?;
    }
    Ok(())
}

fn header(tag: ValueType, arg: u8) -> u8 {
    arg << 5 | tag as u8
}

/// Smallest little-endian prefix of `value` that sign-extends back to it.
fn write_signed(tag: ValueType, value: i64, out: &mut Vec<u8>) {
    let bytes = value.to_le_bytes();
    let mut len = 8;
    while len > 1 {
        let top = bytes[len - 1];
        let next_sign = bytes[len - 2] & 0x80;
        if (top == 0x00 && next_sign == 0) || (top == 0xFF && next_sign != 0) {
            len -= 1;
        } else {
            break;
        }
    }
    push_payload(tag, &bytes[..len], out);
}

/// Smallest little-endian prefix of `value` that zero-extends back to it.
fn write_unsigned(tag: ValueType, value: u64, out: &mut Vec<u8>) {
    let bytes = value.to_le_bytes();
    let len = bytes.iter().rposition(|b| *b != 0).map_or(1, |last| last + 1);
    push_payload(tag, &bytes[..len], out);
}

/// High-order bytes of a floating point value, dropping zero bytes from the low end.
fn write_right_zero_extended(tag: ValueType, le_bytes: &[u8], out: &mut Vec<u8>) {
    let skip = le_bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(le_bytes.len() - 1);
    push_payload(tag, &le_bytes[skip..], out);
}

#[allow(clippy::cast_possible_truncation)]
fn push_payload(tag: ValueType, payload: &[u8], out: &mut Vec<u8>) {
    out.push(header(tag, (payload.len() - 1) as u8));
    out.extend_from_slice(payload);
}

impl StructuralKey for EncodedValue {
    fn write_key(&self, key: &mut Vec<u8>) {
        key.push(self.value_type() as u8);
        match self {
            EncodedValue::Byte(value) => key.extend_from_slice(&value.to_le_bytes()),
            EncodedValue::Short(value) => key.extend_from_slice(&value.to_le_bytes()),
            EncodedValue::Char(value) => key.extend_from_slice(&value.to_le_bytes()),
            EncodedValue::Int(value) => key.extend_from_slice(&value.to_le_bytes()),
            EncodedValue::Long(value) => key.extend_from_slice(&value.to_le_bytes()),
            EncodedValue::Float(value) => key.extend_from_slice(&value.to_bits().to_le_bytes()),
            EncodedValue::Double(value) => key.extend_from_slice(&value.to_bits().to_le_bytes()),
            EncodedValue::MethodType(proto) => proto.write_key(key),
            EncodedValue::MethodHandle(index) => index.write_key(key),
            EncodedValue::String(value) | EncodedValue::Type(value) => value.write_key(key),
            EncodedValue::Field(field) | EncodedValue::Enum(field) => field.write_key(key),
            EncodedValue::Method(method) => method.write_key(key),
            EncodedValue::Array(values) => values.write_key(key),
            EncodedValue::Annotation(annotation) => annotation.write_key(key),
            EncodedValue::Null => {}
            EncodedValue::Boolean(value) => key.push(u8::from(*value)),
        }
    }
}

/// A host value without an encoded type, input to [`infer_type`].
#[derive(Debug, Clone, PartialEq)]
pub enum UntypedValue {
    /// No value
    Null,
    /// A boolean
    Bool(bool),
    /// An integer of arbitrary magnitude
    Int(i128),
    /// A floating point number
    Float(f64),
    /// A string
    Str(String),
    /// A sequence of values
    List(Vec<UntypedValue>),
    /// A method
    Method(MethodRef),
    /// A field
    Field(FieldRef),
    /// An annotation
    Annotation(EncodedAnnotation),
    /// A keyed map, which has no encoded form
    Map(Vec<(String, UntypedValue)>),
}

/// Picks an encoded type for an untyped value.
///
/// - Non-negative integers use the narrowest of Byte (`0..=0xFF`), Short (`..=0x7FFF`),
///   Int (`..=0xFFFF_FFFF`) and Long. The value is reinterpreted in the chosen width, so `200`
///   becomes `Byte(-56)`. Negative integers are always Long.
/// - Floats are Double. Strings are String, including single characters.
/// - Lists become arrays of inferred elements.
///
/// # Errors
/// Returns [`crate::Error::UnsupportedEncodedValueType`] for maps and for integers outside the
/// signed 64-bit range.
///
/// # Examples
///
/// ```rust
/// use dexscope::metadata::value::{infer_type, EncodedValue, UntypedValue};
///
/// let list = UntypedValue::List(vec![
///     UntypedValue::Int(1),
///     UntypedValue::Str("a".into()),
///     UntypedValue::Null,
/// ]);
/// assert_eq!(
///     infer_type(&list)?,
///     EncodedValue::Array(vec![
///         EncodedValue::Byte(1),
///         EncodedValue::String("a".into()),
///         EncodedValue::Null,
///     ])
/// );
/// # Ok::<(), dexscope::Error>(())
/// ```
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
pub fn infer_type(value: &UntypedValue) -> Result<EncodedValue> {
    Ok(match value {
        UntypedValue::Null => EncodedValue::Null,
        UntypedValue::Bool(value) => EncodedValue::Boolean(*value),
        UntypedValue::Int(value) => {
            let value = *value;
            match value {
                0..=0xFF => EncodedValue::Byte(value as u8 as i8),
                0x100..=0x7FFF => EncodedValue::Short(value as i16),
                0x8000..=0xFFFF_FFFF => EncodedValue::Int(value as u32 as i32),
                _ => EncodedValue::Long(i64::try_from(value).map_err(|_| {
                    Error::UnsupportedEncodedValueType(format!(
                        "integer {value} exceeds 64 bits"
                    ))
                })?),
            }
        }
        UntypedValue::Float(value) => EncodedValue::Double(*value),
        UntypedValue::Str(value) => EncodedValue::String(value.clone()),
        UntypedValue::List(values) => {
            EncodedValue::Array(values.iter().map(infer_type).collect::<Result<Vec<_>>>()?)
        }
        UntypedValue::Method(method) => EncodedValue::Method(method.clone()),
        UntypedValue::Field(field) => EncodedValue::Field(field.clone()),
        UntypedValue::Annotation(annotation) => EncodedValue::Annotation(annotation.clone()),
        UntypedValue::Map(entries) => {
            return Err(Error::UnsupportedEncodedValueType(format!(
                "map with {} entries has no annotation type",
                entries.len()
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::reference::RawIndices;

    fn encoded(value: &EncodedValue) -> Vec<u8> {
        let mut out = Vec::new();
        value.encode(&RawIndices, &mut out).unwrap();
        out
    }

    struct Indices;

    impl ReferenceIndexer for Indices {
        fn string_index(&self, _value: &str) -> Result<u32> {
            Ok(0x1234)
        }

        fn type_index(&self, _descriptor: &str) -> Result<u32> {
            Ok(0)
        }
    }

    #[test]
    fn infer_thresholds() {
        let cases = [
            (0, EncodedValue::Byte(0)),
            (200, EncodedValue::Byte(-56)),
            (0x100, EncodedValue::Short(0x100)),
            (0x7FFF, EncodedValue::Short(0x7FFF)),
            (0x8000, EncodedValue::Int(0x8000)),
            (0xFFFF_FFFF, EncodedValue::Int(-1)),
            (0x1_0000_0000, EncodedValue::Long(0x1_0000_0000)),
            (-1, EncodedValue::Long(-1)),
        ];
        for (input, expected) in cases {
            assert_eq!(infer_type(&UntypedValue::Int(input)).unwrap(), expected, "{input}");
        }
    }

    #[test]
    fn infer_rejects_unsupported() {
        assert!(matches!(
            infer_type(&UntypedValue::Int(i128::from(i64::MAX) + 1)),
            Err(Error::UnsupportedEncodedValueType(_))
        ));
        assert!(matches!(
            infer_type(&UntypedValue::Map(vec![("k".into(), UntypedValue::Null)])),
            Err(Error::UnsupportedEncodedValueType(_))
        ));
    }

    #[test]
    fn infer_single_char_string_and_float() {
        assert_eq!(
            infer_type(&UntypedValue::Str("x".into())).unwrap(),
            EncodedValue::String("x".into())
        );
        assert_eq!(
            infer_type(&UntypedValue::Float(0.5)).unwrap(),
            EncodedValue::Double(0.5)
        );
    }

    #[test]
    fn signed_minimal_width() {
        assert_eq!(encoded(&EncodedValue::Byte(42)), [0x00, 0x2A]);
        assert_eq!(encoded(&EncodedValue::Short(-1)), [0x02, 0xFF]);
        assert_eq!(encoded(&EncodedValue::Short(0x80)), [0x22, 0x80, 0x00]);
        assert_eq!(encoded(&EncodedValue::Int(-129)), [0x24, 0x7F, 0xFF]);
        assert_eq!(encoded(&EncodedValue::Int(0x8000)), [0x44, 0x00, 0x80, 0x00]);
        assert_eq!(
            encoded(&EncodedValue::Long(i64::MIN)),
            [0xE6, 0, 0, 0, 0, 0, 0, 0, 0x80]
        );
    }

    #[test]
    fn char_zero_extends() {
        assert_eq!(encoded(&EncodedValue::Char(0xFF)), [0x03, 0xFF]);
        assert_eq!(encoded(&EncodedValue::Char(0)), [0x03, 0x00]);
    }

    #[test]
    fn floats_drop_low_zero_bytes() {
        assert_eq!(encoded(&EncodedValue::Float(1.0)), [0x30, 0x80, 0x3F]);
        assert_eq!(encoded(&EncodedValue::Double(0.0)), [0x11, 0x00]);
        assert_eq!(encoded(&EncodedValue::Double(2.0)), [0x11, 0x40]);
    }

    #[test]
    fn references_and_markers() {
        let mut out = Vec::new();
        EncodedValue::String("s".into())
            .encode(&Indices, &mut out)
            .unwrap();
        assert_eq!(out, [0x37, 0x34, 0x12]);

        assert_eq!(encoded(&EncodedValue::Null), [0x1E]);
        assert_eq!(encoded(&EncodedValue::Boolean(true)), [0x3F]);
        assert_eq!(encoded(&EncodedValue::Boolean(false)), [0x1F]);
    }

    #[test]
    fn nested_array() {
        let value = EncodedValue::Array(vec![EncodedValue::Byte(1), EncodedValue::Null]);
        assert_eq!(encoded(&value), [0x1C, 0x02, 0x00, 0x01, 0x1E]);

        let mut seen = 0;
        value.visit(&mut |_| seen += 1);
        assert_eq!(seen, 3);
    }

    #[test]
    fn float_keys_distinguish_signed_zero() {
        assert_ne!(
            EncodedValue::Double(0.0).structural_key(),
            EncodedValue::Double(-0.0).structural_key()
        );
    }
}
