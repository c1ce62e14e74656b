//! Semantic identities for prototypes, fields and methods.
//!
//! Pool entities are keyed by value: two independently built [`MethodRef`]s that name the same
//! class, method name and prototype are the same method as far as the writer is concerned.
//! Types are plain descriptor strings (`I`, `Ljava/lang/String;`, `[B`).

use std::fmt;

use crate::Result;

/// Returns the number of registers a value of the given type descriptor occupies.
///
/// `J` (long) and `D` (double) take a register pair, everything else a single register.
#[must_use]
pub fn register_width(descriptor: &str) -> u16 {
    match descriptor.as_bytes().first() {
        Some(b'J' | b'D') => 2,
        _ => 1,
    }
}

/// A method prototype: return type and parameter types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Proto {
    /// Return type descriptor
    pub return_type: String,
    /// Parameter type descriptors, in declaration order
    pub parameters: Vec<String>,
}

impl Proto {
    /// Creates a prototype from a return type and parameter types.
    pub fn new<R: Into<String>, P: Into<String>>(
        return_type: R,
        parameters: impl IntoIterator<Item = P>,
    ) -> Self {
        Proto {
            return_type: return_type.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the shorty descriptor of this prototype.
    ///
    /// Every reference or array type collapses to `L`; primitives keep their letter.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dexscope::metadata::types::Proto;
    ///
    /// let proto = Proto::new("V", ["I", "[J", "Ljava/lang/String;"]);
    /// assert_eq!(proto.shorty(), "VILL");
    /// ```
    #[must_use]
    pub fn shorty(&self) -> String {
        std::iter::once(&self.return_type)
            .chain(self.parameters.iter())
            .map(|descriptor| match descriptor.as_bytes().first() {
                Some(b'[' | b'L') | None => 'L',
                Some(&c) => char::from(c),
            })
            .collect()
    }

    /// Number of registers the parameters occupy, not counting `this`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the count does not fit 16 bits.
    pub fn parameter_registers(&self) -> Result<u16> {
        self.parameters.iter().try_fold(0u16, |total, parameter| {
            total
                .checked_add(register_width(parameter))
                .ok_or_else(|| malformed_error!("{} parameters exceed 65535 registers", self.parameters.len()))
        })
    }
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", self.parameters.concat(), self.return_type)
    }
}

/// A field identity: defining class, name and type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    /// Descriptor of the defining class
    pub class: String,
    /// Field name
    pub name: String,
    /// Type descriptor of the field
    pub type_: String,
}

impl FieldRef {
    /// Creates a field reference.
    pub fn new(
        class: impl Into<String>,
        name: impl Into<String>,
        type_: impl Into<String>,
    ) -> Self {
        FieldRef {
            class: class.into(),
            name: name.into(),
            type_: type_.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:{}", self.class, self.name, self.type_)
    }
}

/// A method identity: defining class, name and prototype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    /// Descriptor of the defining class
    pub class: String,
    /// Method name
    pub name: String,
    /// Prototype of the method
    pub proto: Proto,
}

impl MethodRef {
    /// Creates a method reference.
    pub fn new(class: impl Into<String>, name: impl Into<String>, proto: Proto) -> Self {
        MethodRef {
            class: class.into(),
            name: name.into(),
            proto,
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}{}", self.class, self.name, self.proto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorty_collapses_references() {
        assert_eq!(Proto::new("V", Vec::<String>::new()).shorty(), "V");
        assert_eq!(Proto::new("[I", ["Z", "D"]).shorty(), "LZD");
    }

    #[test]
    fn wide_parameters_take_two_registers() {
        let proto = Proto::new("V", ["J", "I", "D", "Ljava/lang/Object;"]);
        assert_eq!(proto.parameter_registers().unwrap(), 6);
    }

    #[test]
    fn parameter_register_overflow() {
        let fits = Proto::new("V", vec!["J"; 32767].into_iter().chain(["I"]));
        assert_eq!(fits.parameter_registers().unwrap(), u16::MAX);

        let overflows = Proto::new("V", vec!["D"; 32768]);
        assert!(matches!(
            overflows.parameter_registers(),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn display_uses_descriptor_syntax() {
        let method = MethodRef::new("LFoo;", "bar", Proto::new("V", ["I", "J"]));
        assert_eq!(method.to_string(), "LFoo;->bar(IJ)V");

        let field = FieldRef::new("LFoo;", "count", "I");
        assert_eq!(field.to_string(), "LFoo;->count:I");
    }
}
