//! Canonical byte keys for structural interning.
//!
//! Data items such as annotation sets, encoded arrays and catch handler lists are deduplicated by
//! content. Their constituents (floating point constants in particular) do not implement `Eq` or
//! `Hash`, so each internable value writes a canonical, self-delimiting byte key instead; two
//! values intern to the same slot exactly when their keys are equal.

use crate::metadata::types::{FieldRef, MethodRef, Proto};

/// A value with a canonical byte key.
pub trait StructuralKey {
    /// Appends the key of `self` to `key`.
    ///
    /// Keys must be self-delimiting: concatenating the keys of a sequence must not be ambiguous.
    fn write_key(&self, key: &mut Vec<u8>);

    /// Returns the key of `self`.
    fn structural_key(&self) -> Vec<u8> {
        let mut key = Vec::new();
        self.write_key(&mut key);
        key
    }
}

impl StructuralKey for str {
    fn write_key(&self, key: &mut Vec<u8>) {
        self.len().write_key(key);
        key.extend_from_slice(self.as_bytes());
    }
}

impl StructuralKey for String {
    fn write_key(&self, key: &mut Vec<u8>) {
        self.as_str().write_key(key);
    }
}

impl StructuralKey for u32 {
    fn write_key(&self, key: &mut Vec<u8>) {
        key.extend_from_slice(&self.to_le_bytes());
    }
}

impl StructuralKey for usize {
    fn write_key(&self, key: &mut Vec<u8>) {
        key.extend_from_slice(&(*self as u64).to_le_bytes());
    }
}

impl<T: StructuralKey> StructuralKey for [T] {
    fn write_key(&self, key: &mut Vec<u8>) {
        self.len().write_key(key);
        for item in self {
            item.write_key(key);
        }
    }
}

impl<T: StructuralKey> StructuralKey for Vec<T> {
    fn write_key(&self, key: &mut Vec<u8>) {
        self.as_slice().write_key(key);
    }
}

impl<T: StructuralKey> StructuralKey for Option<T> {
    fn write_key(&self, key: &mut Vec<u8>) {
        match self {
            Some(value) => {
                key.push(1);
                value.write_key(key);
            }
            None => key.push(0),
        }
    }
}

impl StructuralKey for Proto {
    fn write_key(&self, key: &mut Vec<u8>) {
        self.return_type.write_key(key);
        self.parameters.write_key(key);
    }
}

impl StructuralKey for FieldRef {
    fn write_key(&self, key: &mut Vec<u8>) {
        self.class.write_key(key);
        self.name.write_key(key);
        self.type_.write_key(key);
    }
}

impl StructuralKey for MethodRef {
    fn write_key(&self, key: &mut Vec<u8>) {
        self.class.write_key(key);
        self.name.write_key(key);
        self.proto.write_key(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_self_delimiting() {
        let split = vec!["ab".to_string(), "c".to_string()];
        let joined = vec!["a".to_string(), "bc".to_string()];
        assert_ne!(split.structural_key(), joined.structural_key());
    }

    #[test]
    fn equal_values_equal_keys() {
        let a = MethodRef::new("LA;", "m", Proto::new("V", ["I"]));
        let b = MethodRef::new("LA;", "m", Proto::new("V", ["I"]));
        assert_eq!(a.structural_key(), b.structural_key());
        assert_ne!(
            Some(1u32).structural_key(),
            None::<u32>.structural_key()
        );
    }
}
