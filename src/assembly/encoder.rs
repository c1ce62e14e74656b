//! Dalvik instruction encoding.
//!
//! This module is the reverse of [`crate::assembly::decode_instruction`]: it packs structured
//! [`crate::assembly::Instruction`] values into 16-bit code units using the same
//! [`crate::assembly::OPERATIONS`] table. Pool references are turned into indices through a
//! [`crate::metadata::reference::ReferenceIndexer`], so the same instruction can be encoded
//! against the raw indices it was decoded with or against the frozen pools of a writer.
//!
//! # Key Components
//!
//! - [`InstructionEncoder`] - Appends encoded instructions to a code unit buffer
//! - [`encode_instruction`] - Encodes one instruction
//! - Reverse mnemonic lookup generated from the instruction table
//!
//! # Usage Examples
//!
//! ```rust
//! use dexscope::assembly::{Instruction, InstructionEncoder, Operand};
//! use dexscope::metadata::reference::RawIndices;
//!
//! let mut encoder = InstructionEncoder::new(&RawIndices);
//! encoder.emit(&Instruction::from_mnemonic("const/4", vec![1], Operand::Literal(-1))?)?;
//! encoder.emit(&Instruction::from_mnemonic("return", vec![1], Operand::None)?)?;
//!
//! assert_eq!(encoder.finalize(), vec![0xF112, 0x010F]);
//! # Ok::<(), dexscope::Error>(())
//! ```
//!
//! # Errors
//!
//! Operands that do not fit their format (a register above 15 in a 4-bit slot, a literal out of
//! range, a non-contiguous register range, more than five registers in a `35c`) are
//! [`crate::Error::Malformed`]. References the indexer cannot resolve are
//! [`crate::Error::DanglingReference`].

use std::{collections::HashMap, sync::OnceLock};

use crate::{
    assembly::{
        instruction::{is_element_width, Instruction, Operand},
        instructions::{Format, OPERATIONS},
        opcodes,
    },
    metadata::reference::{Reference, ReferenceIndexer},
    Error, Result,
};

/// Reverse lookup table mapping mnemonics to opcode bytes, built on first use from
/// [`OPERATIONS`].
static MNEMONIC_TO_OPCODE: OnceLock<HashMap<&'static str, u8>> = OnceLock::new();

fn get_mnemonic_lookup() -> &'static HashMap<&'static str, u8> {
    MNEMONIC_TO_OPCODE.get_or_init(|| {
        let mut map = HashMap::new();
        for (opcode, spec) in (0u8..=u8::MAX).zip(OPERATIONS.iter()) {
            if spec.is_assigned() {
                map.insert(spec.mnemonic, opcode);
            }
        }
        map
    })
}

/// Returns the opcode byte for a mnemonic.
///
/// # Errors
/// Returns [`crate::Error::InvalidMnemonic`] if no opcode has this mnemonic.
pub fn opcode_for_mnemonic(mnemonic: &str) -> Result<u8> {
    get_mnemonic_lookup()
        .get(mnemonic)
        .copied()
        .ok_or_else(|| Error::InvalidMnemonic(mnemonic.to_string()))
}

/// Appends encoded instructions to a code unit buffer.
pub struct InstructionEncoder<'a, I: ReferenceIndexer + ?Sized> {
    units: Vec<u16>,
    indexer: &'a I,
}

impl<'a, I: ReferenceIndexer + ?Sized> InstructionEncoder<'a, I> {
    /// Creates an encoder that resolves references through `indexer`.
    pub fn new(indexer: &'a I) -> Self {
        InstructionEncoder {
            units: Vec::new(),
            indexer,
        }
    }

    /// Encodes `instruction` and appends it.
    ///
    /// On error nothing is appended.
    ///
    /// # Errors
    /// See the module documentation.
    pub fn emit(&mut self, instruction: &Instruction) -> Result<()> {
        let start = self.units.len();
        if let Err(error) = write_instruction(instruction, self.indexer, &mut self.units) {
            self.units.truncate(start);
            return Err(error);
        }
        Ok(())
    }

    /// Current position in code units.
    #[must_use]
    pub fn position(&self) -> usize {
        self.units.len()
    }

    /// Returns the encoded code units.
    #[must_use]
    pub fn finalize(self) -> Vec<u16> {
        self.units
    }
}

/// Encodes a single instruction into code units.
///
/// # Errors
/// See the module documentation.
pub fn encode_instruction<I: ReferenceIndexer + ?Sized>(
    instruction: &Instruction,
    indexer: &I,
) -> Result<Vec<u16>> {
    let mut units = Vec::with_capacity(instruction.width());
    write_instruction(instruction, indexer, &mut units)?;
    Ok(units)
}

fn write_instruction<I: ReferenceIndexer + ?Sized>(
    instruction: &Instruction,
    indexer: &I,
    out: &mut Vec<u16>,
) -> Result<()> {
    let op = u16::from(instruction.opcode);
    let regs = &instruction.registers;
    let start = out.len();

    match instruction.format {
        Format::F10x => {
            expect_registers(instruction, 0)?;
            out.push(op);
        }
        Format::F12x => {
            expect_registers(instruction, 2)?;
            out.push(op | nibble(regs[0])? << 8 | nibble(regs[1])? << 12);
        }
        Format::F11n => {
            expect_registers(instruction, 1)?;
            let value = literal(instruction, -8, 7)?;
            #[allow(clippy::cast_sign_loss)]
            let bits = (value & 0xF) as u16;
            out.push(op | nibble(regs[0])? << 8 | bits << 12);
        }
        Format::F11x => {
            expect_registers(instruction, 1)?;
            out.push(op | byte(regs[0])? << 8);
        }
        Format::F10t => {
            expect_registers(instruction, 0)?;
            let delta = branch(instruction, i64::from(i8::MIN), i64::from(i8::MAX))?;
            #[allow(clippy::cast_sign_loss)]
            let bits = (delta & 0xFF) as u16;
            out.push(op | bits << 8);
        }
        Format::F20t => {
            expect_registers(instruction, 0)?;
            out.push(op);
            out.push(low16(branch(instruction, i64::from(i16::MIN), i64::from(i16::MAX))?));
        }
        Format::F22x => {
            expect_registers(instruction, 2)?;
            out.push(op | byte(regs[0])? << 8);
            out.push(regs[1]);
        }
        Format::F21t => {
            expect_registers(instruction, 1)?;
            out.push(op | byte(regs[0])? << 8);
            out.push(low16(branch(instruction, i64::from(i16::MIN), i64::from(i16::MAX))?));
        }
        Format::F21s => {
            expect_registers(instruction, 1)?;
            out.push(op | byte(regs[0])? << 8);
            out.push(low16(literal(instruction, i64::from(i16::MIN), i64::from(i16::MAX))?));
        }
        Format::F21h => {
            expect_registers(instruction, 1)?;
            let shift = instruction.high16_shift();
            let value = literal(instruction, i64::MIN, i64::MAX)?;
            if value & ((1i64 << shift) - 1) != 0 || i16::try_from(value >> shift).is_err() {
                return Err(malformed_error!(
                    "{} literal 0x{:x} has bits outside the high 16",
                    instruction.mnemonic(),
                    value
                ));
            }
            out.push(op | byte(regs[0])? << 8);
            out.push(low16(value >> shift));
        }
        Format::F21c => {
            expect_registers(instruction, 1)?;
            let index = narrow_index(reference_index(instruction, indexer, 0)?)?;
            out.push(op | byte(regs[0])? << 8);
            out.push(index);
        }
        Format::F23x => {
            expect_registers(instruction, 3)?;
            out.push(op | byte(regs[0])? << 8);
            out.push(byte(regs[1])? | byte(regs[2])? << 8);
        }
        Format::F22b => {
            expect_registers(instruction, 2)?;
            let value = literal(instruction, i64::from(i8::MIN), i64::from(i8::MAX))?;
            out.push(op | byte(regs[0])? << 8);
            out.push(byte(regs[1])? | (low16(value) & 0xFF) << 8);
        }
        Format::F22t => {
            expect_registers(instruction, 2)?;
            out.push(op | nibble(regs[0])? << 8 | nibble(regs[1])? << 12);
            out.push(low16(branch(instruction, i64::from(i16::MIN), i64::from(i16::MAX))?));
        }
        Format::F22s => {
            expect_registers(instruction, 2)?;
            out.push(op | nibble(regs[0])? << 8 | nibble(regs[1])? << 12);
            out.push(low16(literal(instruction, i64::from(i16::MIN), i64::from(i16::MAX))?));
        }
        Format::F22c => {
            expect_registers(instruction, 2)?;
            let index = narrow_index(reference_index(instruction, indexer, 0)?)?;
            out.push(op | nibble(regs[0])? << 8 | nibble(regs[1])? << 12);
            out.push(index);
        }
        Format::F32x => {
            expect_registers(instruction, 2)?;
            out.extend_from_slice(&[op, regs[0], regs[1]]);
        }
        Format::F30t => {
            expect_registers(instruction, 0)?;
            out.push(op);
            push_u32(out, branch(instruction, i64::from(i32::MIN), i64::from(i32::MAX))?);
        }
        Format::F31t => {
            expect_registers(instruction, 1)?;
            out.push(op | byte(regs[0])? << 8);
            push_u32(out, branch(instruction, i64::from(i32::MIN), i64::from(i32::MAX))?);
        }
        Format::F31i => {
            expect_registers(instruction, 1)?;
            out.push(op | byte(regs[0])? << 8);
            push_u32(out, literal(instruction, i64::from(i32::MIN), i64::from(i32::MAX))?);
        }
        Format::F31c => {
            expect_registers(instruction, 1)?;
            let index = reference_index(instruction, indexer, 0)?;
            out.push(op | byte(regs[0])? << 8);
            push_u32(out, i64::from(index));
        }
        Format::F35c | Format::F45cc => {
            let (head, tail) = packed_registers(instruction)?;
            let index = narrow_index(reference_index(instruction, indexer, 0)?)?;
            out.extend_from_slice(&[op | head, index, tail]);
            if instruction.format == Format::F45cc {
                out.push(narrow_index(reference_index(instruction, indexer, 1)?)?);
            }
        }
        Format::F3rc | Format::F4rcc => {
            let (count, first) = register_range(instruction)?;
            let index = narrow_index(reference_index(instruction, indexer, 0)?)?;
            out.extend_from_slice(&[op | count << 8, index, first]);
            if instruction.format == Format::F4rcc {
                out.push(narrow_index(reference_index(instruction, indexer, 1)?)?);
            }
        }
        Format::F51l => {
            expect_registers(instruction, 1)?;
            let value = literal(instruction, i64::MIN, i64::MAX)?;
            out.push(op | byte(regs[0])? << 8);
            for shift in [0, 16, 32, 48] {
                out.push(low16(value >> shift));
            }
        }
        Format::PackedSwitchPayload => {
            let Operand::PackedSwitch { first_key, targets } = &instruction.operand else {
                return Err(operand_mismatch(instruction));
            };
            out.push(opcodes::PACKED_SWITCH_PAYLOAD);
            out.push(table_size(targets.len())?);
            push_u32(out, i64::from(*first_key));
            for target in targets {
                push_u32(out, i64::from(*target));
            }
        }
        Format::SparseSwitchPayload => {
            let Operand::SparseSwitch { keys, targets } = &instruction.operand else {
                return Err(operand_mismatch(instruction));
            };
            if keys.len() != targets.len() {
                return Err(malformed_error!(
                    "sparse switch has {} keys and {} targets",
                    keys.len(),
                    targets.len()
                ));
            }
            out.push(opcodes::SPARSE_SWITCH_PAYLOAD);
            out.push(table_size(keys.len())?);
            for value in keys.iter().chain(targets.iter()) {
                push_u32(out, i64::from(*value));
            }
        }
        Format::FillArrayDataPayload => {
            let Operand::ArrayData {
                element_width,
                data,
            } = &instruction.operand
            else {
                return Err(operand_mismatch(instruction));
            };
            if !is_element_width(*element_width) || data.len() % usize::from(*element_width) != 0 {
                return Err(malformed_error!(
                    "array data of {} bytes does not hold {}-byte elements",
                    data.len(),
                    element_width
                ));
            }
            let count = u32::try_from(data.len() / usize::from(*element_width))
                .map_err(|_| malformed_error!("array data too large"))?;
            out.push(opcodes::FILL_ARRAY_DATA_PAYLOAD);
            out.push(*element_width);
            push_u32(out, i64::from(count));
            for pair in data.chunks(2) {
                let high = pair.get(1).copied().unwrap_or(0);
                out.push(u16::from_le_bytes([pair[0], high]));
            }
        }
    }

    debug_assert_eq!(out.len() - start, instruction.width());
    Ok(())
}

fn operand_mismatch(instruction: &Instruction) -> Error {
    malformed_error!(
        "{:?} does not fit {} ({})",
        instruction.operand,
        instruction.mnemonic(),
        instruction.format
    )
}

fn expect_registers(instruction: &Instruction, count: usize) -> Result<()> {
    if instruction.registers.len() != count {
        return Err(malformed_error!(
            "{} takes {} registers, got {}",
            instruction.mnemonic(),
            count,
            instruction.registers.len()
        ));
    }
    Ok(())
}

fn nibble(register: u16) -> Result<u16> {
    if register > 0xF {
        return Err(malformed_error!(
            "register v{} does not fit in 4 bits",
            register
        ));
    }
    Ok(register)
}

fn byte(register: u16) -> Result<u16> {
    if register > 0xFF {
        return Err(malformed_error!(
            "register v{} does not fit in 8 bits",
            register
        ));
    }
    Ok(register)
}

fn literal(instruction: &Instruction, min: i64, max: i64) -> Result<i64> {
    match instruction.operand {
        Operand::Literal(value) if (min..=max).contains(&value) => Ok(value),
        Operand::Literal(value) => Err(malformed_error!(
            "literal {} out of range for {}",
            value,
            instruction.mnemonic()
        )),
        _ => Err(operand_mismatch(instruction)),
    }
}

fn branch(instruction: &Instruction, min: i64, max: i64) -> Result<i64> {
    match instruction.operand {
        Operand::Branch(delta) if (min..=max).contains(&i64::from(delta)) => Ok(i64::from(delta)),
        Operand::Branch(delta) => Err(malformed_error!(
            "branch delta {} out of range for {}",
            delta,
            instruction.mnemonic()
        )),
        _ => Err(operand_mismatch(instruction)),
    }
}

fn reference_index<I: ReferenceIndexer + ?Sized>(
    instruction: &Instruction,
    indexer: &I,
    position: usize,
) -> Result<u32> {
    let reference: &Reference = match (&instruction.operand, position) {
        (Operand::Reference(reference), 0) | (Operand::DualReference(reference, _), 0) => {
            reference
        }
        (Operand::DualReference(_, reference), 1) => reference,
        _ => return Err(operand_mismatch(instruction)),
    };

    let expected = instruction.expected_references().get(position).copied();
    if expected != Some(reference.kind()) {
        return Err(malformed_error!(
            "{} expects a {:?} reference, got {}",
            instruction.mnemonic(),
            expected,
            reference
        ));
    }

    indexer.index_of(reference)
}

fn narrow_index(index: u32) -> Result<u16> {
    u16::try_from(index).map_err(|_| malformed_error!("pool index {} exceeds 16 bits", index))
}

fn table_size(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| malformed_error!("switch table of {} entries", len))
}

/// Packs up to five registers into the `A|G` nibbles of the first unit and the `F|E|D|C` unit.
fn packed_registers(instruction: &Instruction) -> Result<(u16, u16)> {
    let regs = &instruction.registers;
    if regs.len() > 5 {
        return Err(malformed_error!(
            "{} takes at most 5 registers, got {}",
            instruction.mnemonic(),
            regs.len()
        ));
    }

    let mut tail = 0u16;
    for (slot, register) in regs.iter().take(4).enumerate() {
        tail |= nibble(*register)? << (slot * 4);
    }
    let g = match regs.get(4) {
        Some(register) => nibble(*register)?,
        None => 0,
    };

    let count = u16::try_from(regs.len()).unwrap_or(0);
    Ok((count << 12 | g << 8, tail))
}

fn register_range(instruction: &Instruction) -> Result<(u16, u16)> {
    let regs = &instruction.registers;
    let count = u16::try_from(regs.len())
        .ok()
        .filter(|count| *count <= 0xFF)
        .ok_or_else(|| malformed_error!("register range of {} exceeds 255", regs.len()))?;

    let first = regs.first().copied().unwrap_or(0);
    let contiguous = regs
        .iter()
        .enumerate()
        .all(|(offset, register)| u32::from(*register) == u32::from(first) + offset as u32);
    if !contiguous {
        return Err(malformed_error!(
            "{} registers {:?} are not contiguous",
            instruction.mnemonic(),
            regs
        ));
    }

    Ok((count, first))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn low16(value: i64) -> u16 {
    (value & 0xFFFF) as u16
}

fn push_u32(out: &mut Vec<u16>, value: i64) {
    out.push(low16(value));
    out.push(low16(value >> 16));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::reference::{RawIndices, ReferenceKind};

    fn raw(kind: ReferenceKind, index: u32) -> Operand {
        Operand::Reference(Reference::Index { kind, index })
    }

    #[test]
    fn encode_35c_packs_nibbles() {
        let insn = Instruction::new(
            opcodes::INVOKE_VIRTUAL,
            vec![1, 2, 3, 4, 5],
            raw(ReferenceKind::Method, 0x1234),
        )
        .unwrap();
        let units = encode_instruction(&insn, &RawIndices).unwrap();
        assert_eq!(units, vec![0x556E, 0x1234, 0x4321]);
    }

    #[test]
    fn encode_3rc_range() {
        let insn = Instruction::new(
            opcodes::INVOKE_STATIC_RANGE,
            vec![16, 17, 18],
            raw(ReferenceKind::Method, 7),
        )
        .unwrap();
        assert_eq!(
            encode_instruction(&insn, &RawIndices).unwrap(),
            vec![0x0377, 7, 16]
        );
    }

    #[test]
    fn encode_rejects_non_contiguous_range() {
        let insn = Instruction::new(
            opcodes::INVOKE_STATIC_RANGE,
            vec![1, 3],
            raw(ReferenceKind::Method, 0),
        )
        .unwrap();
        assert!(matches!(
            encode_instruction(&insn, &RawIndices),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn encode_rejects_wide_register_in_nibble() {
        let insn = Instruction::new(opcodes::MOVE, vec![16, 1], Operand::None).unwrap();
        assert!(matches!(
            encode_instruction(&insn, &RawIndices),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn encode_rejects_six_registers() {
        let insn = Instruction {
            opcode: opcodes::INVOKE_STATIC,
            format: Format::F35c,
            registers: vec![0, 1, 2, 3, 4, 5],
            operand: raw(ReferenceKind::Method, 0),
        };
        assert!(encode_instruction(&insn, &RawIndices).is_err());
    }

    #[test]
    fn encode_literal_forms() {
        let insn = Instruction::new(opcodes::CONST_WIDE_HIGH16, vec![2], Operand::Literal(
            0x4000_0000_0000_0000,
        ))
        .unwrap();
        assert_eq!(
            encode_instruction(&insn, &RawIndices).unwrap(),
            vec![0x0219, 0x4000]
        );

        let insn =
            Instruction::new(opcodes::CONST_WIDE, vec![0], Operand::Literal(-2)).unwrap();
        assert_eq!(
            encode_instruction(&insn, &RawIndices).unwrap(),
            vec![0x0018, 0xFFFE, 0xFFFF, 0xFFFF, 0xFFFF]
        );
    }

    #[test]
    fn encode_array_data_pads_odd_length() {
        let insn = Instruction::array_data_payload(1, vec![1, 2, 3]);
        assert_eq!(
            encode_instruction(&insn, &RawIndices).unwrap(),
            vec![0x0300, 1, 3, 0, 0x0201, 0x0003]
        );
    }

    #[test]
    fn semantic_reference_needs_indexer() {
        let insn = Instruction::new(
            opcodes::CONST_STRING,
            vec![0],
            Operand::Reference(Reference::String("x".into())),
        )
        .unwrap();
        assert!(matches!(
            encode_instruction(&insn, &RawIndices),
            Err(Error::DanglingReference(_))
        ));
    }

    #[test]
    fn encoder_discards_failed_instruction() {
        let mut encoder = InstructionEncoder::new(&RawIndices);
        encoder.emit(&Instruction::nop()).unwrap();
        let bad = Instruction::new(opcodes::MOVE, vec![16, 1], Operand::None).unwrap();
        assert!(encoder.emit(&bad).is_err());
        assert_eq!(encoder.position(), 1);
    }

    #[test]
    fn mnemonic_lookup() {
        assert_eq!(opcode_for_mnemonic("invoke-custom/range").unwrap(), 0xFD);
        assert_eq!(opcode_for_mnemonic("nop").unwrap(), 0x00);
        assert!(opcode_for_mnemonic("").is_err());
    }
}
