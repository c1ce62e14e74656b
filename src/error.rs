use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure is fatal for the operation that produced it: the library never retries and
/// never substitutes a default. Errors raised while writing a container carry the identity of
/// the class or method being written so that the offending input can be located.
///
/// # Error Categories
///
/// ## Bytecode Errors
/// - [`Error::UnknownOpcode`] - An opcode without a table entry was decoded
/// - [`Error::Malformed`] - Corrupted input or an operand that does not fit its layout
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
/// - [`Error::InvalidMnemonic`] - An instruction was requested by an unknown mnemonic
///
/// ## Editing Errors
/// - [`Error::DuplicateLabel`] - A label name was registered twice in one method
/// - [`Error::InstructionNotFound`] - A handle refers to a removed or foreign instruction
/// - [`Error::InvalidOperand`] - An operand replacement would change the instruction layout
///
/// ## Writing Errors
/// - [`Error::DanglingReference`] - A reference has no entity in the target pools
/// - [`Error::FrozenPoolMutation`] - Discovery was attempted after the pools were frozen
/// - [`Error::MalformedTryRange`] - A try range starts past the code or has no handlers
/// - [`Error::UnsupportedEncodedValueType`] - A host value has no encoded value mapping
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::MmapFailed`] - Output buffer creation or access failed
/// - [`Error::FinalizationFailed`] - Output could not be finalized
///
/// # Examples
///
/// ```rust,no_run
/// use dexscope::{Error, writer::DexWriter};
///
/// match DexWriter::new().write(&[]) {
///     Ok(bytes) => println!("wrote {} bytes", bytes.len()),
///     Err(Error::DanglingReference(reference)) => eprintln!("unresolved: {reference}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged, or a value does not fit the binary layout it is written into.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted.
    ///
    /// Raised when a code unit stream or byte buffer ends in the middle of an item.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// An opcode without an entry in the instruction table was decoded.
    ///
    /// The remainder of the stream cannot be trusted once this happens, since the width
    /// of the unknown instruction is not known.
    #[error("Unknown opcode 0x{opcode:02x} at code unit {offset}")]
    UnknownOpcode {
        /// The offending opcode byte
        opcode: u8,
        /// Offset of the instruction in code units
        offset: usize,
    },

    /// A reference could not be resolved against the pools of the container being written.
    ///
    /// The message names the reference and, when raised by the writer, the method or class
    /// that holds it.
    #[error("Dangling reference - {0}")]
    DanglingReference(String),

    /// A label with the same name already exists in this method body.
    #[error("Duplicate label - {0}")]
    DuplicateLabel(String),

    /// An entity was added to a pool after the pool was frozen.
    ///
    /// The associated value names the pool.
    #[error("Attempted to add to the frozen {0} pool")]
    FrozenPoolMutation(&'static str),

    /// A try range starts beyond the code of its method, or has no handlers.
    #[error("Malformed try range - {0}")]
    MalformedTryRange(String),

    /// A host value has no encoded value representation.
    #[error("Unsupported encoded value type - {0}")]
    UnsupportedEncodedValueType(String),

    /// No opcode has this mnemonic.
    #[error("Invalid mnemonic - {0}")]
    InvalidMnemonic(String),

    /// An operand does not match the layout of the instruction it is applied to.
    #[error("Invalid operand - {0}")]
    InvalidOperand(String),

    /// The instruction handle does not refer to a live instruction of this method body.
    #[error("Instruction not found in method body")]
    InstructionNotFound,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// The output buffer could not be created or accessed.
    #[error("Output buffer error - {0}")]
    MmapFailed(String),

    /// The output could not be finalized.
    #[error("Output finalization failed - {0}")]
    FinalizationFailed(String),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Attaches the identity of the item being written to reference and try range errors.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn within(self, context: &str) -> Self {
        match self {
            Error::DanglingReference(message) => {
                Error::DanglingReference(format!("{message} (in {context})"))
            }
            Error::MalformedTryRange(message) => {
                Error::MalformedTryRange(format!("{message} (in {context})"))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_adds_context() {
        let err = Error::DanglingReference("string \"a\"".to_string()).within("LFoo;->bar()V");
        assert_eq!(
            err.to_string(),
            "Dangling reference - string \"a\" (in LFoo;->bar()V)"
        );

        let err = Error::OutOfBounds.within("LFoo;");
        assert!(matches!(err, Error::OutOfBounds));
    }

    #[test]
    fn test_malformed_macro_records_location() {
        let err = malformed_error!("register v{} does not fit", 16);
        match err {
            Error::Malformed { message, file, .. } => {
                assert_eq!(message, "register v16 does not fit");
                assert!(file.ends_with("error.rs"));
            }
            _ => panic!("expected Malformed"),
        }
    }
}
