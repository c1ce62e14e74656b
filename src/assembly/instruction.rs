//! Decoded Dalvik instruction representation.
//!
//! This module defines [`crate::assembly::instruction::Instruction`] and its
//! [`crate::assembly::instruction::Operand`]. An instruction is a plain value: opcode, format,
//! register list and operand. It carries no position or identity; the method editor
//! ([`crate::metadata::method::MethodBody`]) hands out handles for that.
//!
//! # Key Components
//!
//! - [`crate::assembly::instruction::Instruction`] - One decoded or constructed instruction
//! - [`crate::assembly::instruction::Operand`] - Literal, branch, reference or payload operand
//!
//! # Registers
//!
//! Registers are stored as the full list of register numbers the instruction names, in
//! encoding order. For range formats (`3rc`, `4rcc`) the list is the expanded contiguous range.
//! Wide values occupy a register pair but are named by their first register only, as in the
//! encoding.
//!
//! # Usage Examples
//!
//! ```rust
//! use dexscope::assembly::{Instruction, Operand};
//!
//! let insn = Instruction::from_mnemonic("const/16", vec![0], Operand::Literal(200))?;
//! assert_eq!(insn.opcode, 0x13);
//! assert_eq!(insn.width(), 2);
//! # Ok::<(), dexscope::Error>(())
//! ```

use crate::{
    assembly::{encoder::opcode_for_mnemonic, instructions::OPERATIONS, opcodes, Format},
    metadata::reference::{Reference, ReferenceKind},
    Error, Result,
};

/// The operand of an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// No operand
    None,
    /// Signed literal. For the `21h` formats this is the full value, low bits zero.
    Literal(i64),
    /// Branch delta in code units, relative to the start of the instruction
    Branch(i32),
    /// A single pool reference
    Reference(Reference),
    /// Callee method and prototype of a polymorphic invoke
    DualReference(Reference, Reference),
    /// Packed switch table
    PackedSwitch {
        /// Key of the first target
        first_key: i32,
        /// Branch deltas relative to the switch instruction
        targets: Vec<i32>,
    },
    /// Sparse switch table
    SparseSwitch {
        /// Sorted keys
        keys: Vec<i32>,
        /// Branch deltas relative to the switch instruction, one per key
        targets: Vec<i32>,
    },
    /// Array data for `fill-array-data`
    ArrayData {
        /// Width of one element in bytes
        element_width: u16,
        /// Raw little-endian element bytes
        data: Vec<u8>,
    },
}

/// A single Dalvik instruction.
///
/// # Examples
///
/// ```rust
/// use dexscope::assembly::{opcodes, Format, Instruction, Operand};
/// use dexscope::metadata::reference::Reference;
///
/// let insn = Instruction::new(
///     opcodes::CONST_STRING,
///     vec![1],
///     Operand::Reference(Reference::String("hello".into())),
/// )?;
/// assert_eq!(insn.format, Format::F21c);
/// assert_eq!(insn.mnemonic(), "const-string");
/// # Ok::<(), dexscope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// Opcode byte, `0x00` for payloads
    pub opcode: u8,
    /// Operand layout
    pub format: Format,
    /// Register numbers, in encoding order
    pub registers: Vec<u16>,
    /// Operand
    pub operand: Operand,
}

impl Instruction {
    /// Builds an instruction for `opcode`, checking the operand against the opcode's format.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnknownOpcode`] (with offset 0) for unassigned opcodes and
    /// [`crate::Error::InvalidOperand`] if the operand does not fit the format.
    pub fn new(opcode: u8, registers: Vec<u16>, operand: Operand) -> Result<Self> {
        let spec = &OPERATIONS[opcode as usize];
        if !spec.is_assigned() {
            return Err(Error::UnknownOpcode { opcode, offset: 0 });
        }

        let instruction = Instruction {
            opcode,
            format: spec.format,
            registers,
            operand,
        };
        instruction.check_operand(&instruction.operand)?;
        Ok(instruction)
    }

    /// Builds an instruction by mnemonic.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidMnemonic`] if no opcode has this mnemonic, or the errors of
    /// [`Instruction::new`].
    pub fn from_mnemonic(mnemonic: &str, registers: Vec<u16>, operand: Operand) -> Result<Self> {
        let opcode = opcode_for_mnemonic(mnemonic)?;
        Self::new(opcode, registers, operand)
    }

    /// A one code unit `nop`.
    #[must_use]
    pub fn nop() -> Self {
        Instruction {
            opcode: opcodes::NOP,
            format: Format::F10x,
            registers: Vec::new(),
            operand: Operand::None,
        }
    }

    /// A `packed-switch-payload` pseudo-instruction.
    #[must_use]
    pub fn packed_switch_payload(first_key: i32, targets: Vec<i32>) -> Self {
        Instruction {
            opcode: opcodes::NOP,
            format: Format::PackedSwitchPayload,
            registers: Vec::new(),
            operand: Operand::PackedSwitch { first_key, targets },
        }
    }

    /// A `sparse-switch-payload` pseudo-instruction. Keys must be sorted.
    #[must_use]
    pub fn sparse_switch_payload(keys: Vec<i32>, targets: Vec<i32>) -> Self {
        Instruction {
            opcode: opcodes::NOP,
            format: Format::SparseSwitchPayload,
            registers: Vec::new(),
            operand: Operand::SparseSwitch { keys, targets },
        }
    }

    /// A `fill-array-data-payload` pseudo-instruction.
    #[must_use]
    pub fn array_data_payload(element_width: u16, data: Vec<u8>) -> Self {
        Instruction {
            opcode: opcodes::NOP,
            format: Format::FillArrayDataPayload,
            registers: Vec::new(),
            operand: Operand::ArrayData {
                element_width,
                data,
            },
        }
    }

    /// Returns the mnemonic, or the payload name for pseudo-instructions.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match self.format {
            Format::PackedSwitchPayload => "packed-switch-payload",
            Format::SparseSwitchPayload => "sparse-switch-payload",
            Format::FillArrayDataPayload => "fill-array-data-payload",
            _ => OPERATIONS[self.opcode as usize].mnemonic,
        }
    }

    /// Width of the instruction in code units.
    #[must_use]
    pub fn width(&self) -> usize {
        match &self.operand {
            Operand::PackedSwitch { targets, .. } => 4 + targets.len() * 2,
            Operand::SparseSwitch { keys, .. } => 2 + keys.len() * 4,
            Operand::ArrayData { data, .. } => 4 + data.len().div_ceil(2),
            _ => self.format.width(),
        }
    }

    /// Returns `true` for switch tables and array data.
    #[must_use]
    pub fn is_payload(&self) -> bool {
        self.format.is_payload()
    }

    /// Returns the pool references held by this instruction, in encoding order.
    #[must_use]
    pub fn references(&self) -> Vec<&Reference> {
        match &self.operand {
            Operand::Reference(reference) => vec![reference],
            Operand::DualReference(first, second) => vec![first, second],
            _ => Vec::new(),
        }
    }

    /// Number of argument registers for invoke formats, counting the expanded range.
    #[must_use]
    pub fn argument_registers(&self) -> u16 {
        if self.format.is_invoke() {
            u16::try_from(self.registers.len()).unwrap_or(u16::MAX)
        } else {
            0
        }
    }

    /// Checks that `operand` fits this instruction's format without changing its width.
    ///
    /// Literal and branch ranges are checked against the bits the format provides, and reference
    /// kinds against the instruction table.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidOperand`] describing the mismatch.
    pub fn check_operand(&self, operand: &Operand) -> Result<()> {
        let fits = match (self.format, operand) {
            (
                Format::F10x
                | Format::F12x
                | Format::F11x
                | Format::F22x
                | Format::F23x
                | Format::F32x,
                Operand::None,
            ) => true,
            (Format::F11n, Operand::Literal(value)) => (-8..=7).contains(value),
            (Format::F21s | Format::F22s, Operand::Literal(value)) => {
                i16::try_from(*value).is_ok()
            }
            (Format::F22b, Operand::Literal(value)) => i8::try_from(*value).is_ok(),
            (Format::F31i, Operand::Literal(value)) => i32::try_from(*value).is_ok(),
            (Format::F21h, Operand::Literal(value)) => {
                let shift = self.high16_shift();
                value & ((1i64 << shift) - 1) == 0 && i16::try_from(value >> shift).is_ok()
            }
            (Format::F51l, Operand::Literal(_)) => true,
            (Format::F10t, Operand::Branch(delta)) => i8::try_from(*delta).is_ok(),
            (Format::F20t | Format::F21t | Format::F22t, Operand::Branch(delta)) => {
                i16::try_from(*delta).is_ok()
            }
            (Format::F30t | Format::F31t, Operand::Branch(_)) => true,
            (
                Format::F21c | Format::F22c | Format::F31c | Format::F35c | Format::F3rc,
                Operand::Reference(reference),
            ) => self.expected_references().first() == Some(&reference.kind()),
            (Format::F45cc | Format::F4rcc, Operand::DualReference(first, second)) => {
                self.expected_references() == [first.kind(), second.kind()]
            }
            (Format::PackedSwitchPayload, Operand::PackedSwitch { .. })
            | (Format::SparseSwitchPayload, Operand::SparseSwitch { .. })
            | (Format::FillArrayDataPayload, Operand::ArrayData { .. }) => true,
            _ => false,
        };

        if !fits {
            return Err(Error::InvalidOperand(format!(
                "{operand:?} does not fit {} ({})",
                self.mnemonic(),
                self.format
            )));
        }

        if let Operand::SparseSwitch { keys, targets } = operand {
            if keys.len() != targets.len() {
                return Err(Error::InvalidOperand(format!(
                    "sparse switch has {} keys but {} targets",
                    keys.len(),
                    targets.len()
                )));
            }
        }

        if let Operand::ArrayData {
            element_width,
            data,
        } = operand
        {
            if !is_element_width(*element_width) || data.len() % usize::from(*element_width) != 0 {
                return Err(Error::InvalidOperand(format!(
                    "array data of {} bytes does not hold {}-byte elements",
                    data.len(),
                    element_width
                )));
            }
        }

        Ok(())
    }

    pub(crate) fn expected_references(&self) -> &'static [ReferenceKind] {
        if self.format.is_payload() {
            return &[];
        }
        OPERATIONS[self.opcode as usize].references
    }

    /// Left shift applied to the 16-bit literal of a `21h` instruction.
    pub(crate) fn high16_shift(&self) -> u32 {
        if self.opcode == opcodes::CONST_WIDE_HIGH16 {
            48
        } else {
            16
        }
    }
}

/// Whether `width` is a valid `fill-array-data` element size.
pub(crate) fn is_element_width(width: u16) -> bool {
    matches!(width, 1 | 2 | 4 | 8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::types::{MethodRef, Proto};

    #[test]
    fn payload_widths() {
        assert_eq!(Instruction::packed_switch_payload(0, vec![3, 5]).width(), 8);
        assert_eq!(
            Instruction::sparse_switch_payload(vec![1, 10], vec![3, 5]).width(),
            10
        );
        assert_eq!(Instruction::array_data_payload(1, vec![1, 2, 3]).width(), 6);
        assert_eq!(Instruction::array_data_payload(4, vec![0; 8]).width(), 8);
    }

    #[test]
    fn new_rejects_unassigned_opcode() {
        assert!(matches!(
            Instruction::new(0x3E, Vec::new(), Operand::None),
            Err(Error::UnknownOpcode { opcode: 0x3E, .. })
        ));
    }

    #[test]
    fn from_mnemonic_unknown() {
        assert!(matches!(
            Instruction::from_mnemonic("jump", Vec::new(), Operand::None),
            Err(Error::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn literal_ranges() {
        assert!(Instruction::new(opcodes::CONST_4, vec![0], Operand::Literal(7)).is_ok());
        assert!(Instruction::new(opcodes::CONST_4, vec![0], Operand::Literal(8)).is_err());
        let high16 = |value| Instruction::new(opcodes::CONST_HIGH16, vec![0], Operand::Literal(value));
        assert!(high16(0x1234_0000).is_ok());
        assert!(high16(0x1234_0001).is_err());
        assert!(Instruction::new(
            opcodes::CONST_WIDE_HIGH16,
            vec![0],
            Operand::Literal(-0x4000_0000_0000_0000)
        )
        .is_ok());
    }

    #[test]
    fn reference_kind_must_match_table() {
        let method = MethodRef::new("LFoo;", "bar", Proto::new("V", Vec::<String>::new()));
        let invoke = Instruction::new(
            opcodes::INVOKE_STATIC,
            Vec::new(),
            Operand::Reference(Reference::Method(method.clone())),
        )
        .unwrap();
        assert_eq!(invoke.references().len(), 1);

        assert!(matches!(
            Instruction::new(
                opcodes::CONST_STRING,
                vec![0],
                Operand::Reference(Reference::Method(method)),
            ),
            Err(Error::InvalidOperand(_))
        ));
    }

    #[test]
    fn polymorphic_needs_method_and_proto() {
        let method = MethodRef::new(
            "Ljava/lang/invoke/MethodHandle;",
            "invoke",
            Proto::new("Ljava/lang/Object;", ["[Ljava/lang/Object;"]),
        );
        let insn = Instruction::new(
            opcodes::INVOKE_POLYMORPHIC,
            vec![0, 1],
            Operand::DualReference(
                Reference::Method(method),
                Reference::Proto(Proto::new("V", ["I"])),
            ),
        )
        .unwrap();
        assert_eq!(insn.width(), 4);
        assert_eq!(insn.argument_registers(), 2);
    }
}
