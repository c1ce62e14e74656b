//! Dalvik instruction decoding.
//!
//! This module turns 16-bit code units into [`crate::assembly::Instruction`] values using the
//! static [`crate::assembly::OPERATIONS`] table. Pool indices are not resolved: every reference
//! operand decodes to [`crate::metadata::reference::Reference::Index`] with the pool kind taken
//! from the table.
//!
//! # Key Components
//!
//! - [`decode_instruction`] - Decodes the instruction starting at a code unit index
//! - [`decode_stream`] - Decodes a complete instruction stream
//! - [`units_from_bytes`] - Reads little-endian code units from a byte buffer
//!
//! # Examples
//!
//! ```rust
//! use dexscope::assembly::{decode_stream, Operand};
//!
//! // const/4 v0, #1 ; return v0
//! let code = [0x1012, 0x000F];
//! let instructions = decode_stream(&code)?;
//! assert_eq!(instructions.len(), 2);
//! assert_eq!(instructions[0].mnemonic(), "const/4");
//! assert_eq!(instructions[0].operand, Operand::Literal(1));
//! # Ok::<(), dexscope::Error>(())
//! ```
//!
//! # Errors
//!
//! - An opcode without a table entry is [`crate::Error::UnknownOpcode`], with the code unit
//!   offset of the instruction.
//! - A stream that ends inside an instruction is [`crate::Error::OutOfBounds`].
//! - Bits a format leaves unused must be zero, so every accepted stream re-encodes to the same
//!   code units. Anything else is [`crate::Error::Malformed`].

use crate::{
    assembly::{
        instruction::{is_element_width, Instruction, Operand},
        instructions::{Format, OPERATIONS},
        opcodes,
    },
    file::parser::Parser,
    metadata::reference::{Reference, ReferenceKind},
    Error::{self, OutOfBounds},
    Result,
};

/// Decodes the instruction that starts at `index`.
///
/// Returns the instruction and the number of code units it occupies.
///
/// # Arguments
/// * `units` - The code unit stream
/// * `index` - Offset of the instruction in code units
///
/// # Errors
/// Returns [`crate::Error::UnknownOpcode`] for unassigned opcodes,
/// [`crate::Error::OutOfBounds`] if the stream is truncated, and [`crate::Error::Malformed`]
/// for invalid payload identifiers, register counts, array element widths and nonzero unused
/// bits.
///
/// # Examples
///
/// ```rust
/// use dexscope::assembly::{decode_instruction, Operand};
/// use dexscope::metadata::reference::{Reference, ReferenceKind};
///
/// // const-string v1, string@5
/// let code = [0x011A, 0x0005];
/// let (insn, width) = decode_instruction(&code, 0)?;
///
/// assert_eq!(width, 2);
/// assert_eq!(insn.registers, vec![1]);
/// assert_eq!(
///     insn.operand,
///     Operand::Reference(Reference::Index { kind: ReferenceKind::String, index: 5 })
/// );
/// # Ok::<(), dexscope::Error>(())
/// ```
pub fn decode_instruction(units: &[u16], index: usize) -> Result<(Instruction, usize)> {
    let first = *units.get(index).ok_or(OutOfBounds)?;
    #[allow(clippy::cast_possible_truncation)]
    let opcode = (first & 0xFF) as u8;

    if opcode == opcodes::NOP && first != 0 {
        return decode_payload(units, index, first);
    }

    let spec = &OPERATIONS[opcode as usize];
    if !spec.is_assigned() {
        return Err(Error::UnknownOpcode {
            opcode,
            offset: index,
        });
    }

    let width = spec.format.width();
    let Some(code) = units.get(index..index + width) else {
        return Err(OutOfBounds);
    };

    let a_nibble = (first >> 8) & 0xF;
    let b_nibble = first >> 12;
    let aa = first >> 8;

    let unused = |bits: u32| -> Result<()> {
        if bits == 0 {
            Ok(())
        } else {
            Err(malformed_error!(
                "{} at {} sets unused operand bits 0x{:x}",
                spec.mnemonic,
                index,
                bits
            ))
        }
    };

    let reference = |position: usize, raw: u32| -> Operand {
        Operand::Reference(Reference::Index {
            kind: spec.references[position],
            index: raw,
        })
    };

    let (registers, operand) = match spec.format {
        Format::F10x => {
            unused(u32::from(aa))?;
            (Vec::new(), Operand::None)
        }
        Format::F12x => (vec![a_nibble, b_nibble], Operand::None),
        Format::F11n => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let literal = ((b_nibble as i8) << 4) >> 4;
            (vec![a_nibble], Operand::Literal(i64::from(literal)))
        }
        Format::F11x => (vec![aa], Operand::None),
        Format::F10t => (Vec::new(), Operand::Branch(i32::from(signed8(aa)))),
        Format::F20t => {
            unused(u32::from(aa))?;
            (Vec::new(), Operand::Branch(i32::from(signed16(code[1]))))
        }
        Format::F22x => (vec![aa, code[1]], Operand::None),
        Format::F21t => (vec![aa], Operand::Branch(i32::from(signed16(code[1])))),
        Format::F21s => (vec![aa], Operand::Literal(i64::from(signed16(code[1])))),
        Format::F21h => {
            let shift = if opcode == opcodes::CONST_WIDE_HIGH16 {
                48
            } else {
                16
            };
            (
                vec![aa],
                Operand::Literal(i64::from(signed16(code[1])) << shift),
            )
        }
        Format::F21c => (vec![aa], reference(0, u32::from(code[1]))),
        Format::F23x => (vec![aa, code[1] & 0xFF, code[1] >> 8], Operand::None),
        Format::F22b => (
            vec![aa, code[1] & 0xFF],
            Operand::Literal(i64::from(signed8(code[1] >> 8))),
        ),
        Format::F22t => (
            vec![a_nibble, b_nibble],
            Operand::Branch(i32::from(signed16(code[1]))),
        ),
        Format::F22s => (
            vec![a_nibble, b_nibble],
            Operand::Literal(i64::from(signed16(code[1]))),
        ),
        Format::F22c => (vec![a_nibble, b_nibble], reference(0, u32::from(code[1]))),
        Format::F32x => {
            unused(u32::from(aa))?;
            (vec![code[1], code[2]], Operand::None)
        }
        Format::F30t => {
            unused(u32::from(aa))?;
            (Vec::new(), Operand::Branch(signed32(code[1], code[2])))
        }
        Format::F31t => (vec![aa], Operand::Branch(signed32(code[1], code[2]))),
        Format::F31i => (
            vec![aa],
            Operand::Literal(i64::from(signed32(code[1], code[2]))),
        ),
        Format::F31c => (
            vec![aa],
            reference(0, u32::from(code[1]) | u32::from(code[2]) << 16),
        ),
        Format::F35c | Format::F45cc => {
            let count = usize::from(b_nibble);
            if count > 5 {
                return Err(malformed_error!(
                    "{} at {} names {} registers",
                    spec.mnemonic,
                    index,
                    count
                ));
            }
            let packed = u32::from(code[2]) | u32::from(a_nibble) << 16;
            unused(packed >> (4 * count))?;
            let slots = [
                code[2] & 0xF,
                (code[2] >> 4) & 0xF,
                (code[2] >> 8) & 0xF,
                code[2] >> 12,
                a_nibble,
            ];
            let operand = if spec.format == Format::F45cc {
                dual_reference(spec.references, code[1], code[3])
            } else {
                reference(0, u32::from(code[1]))
            };
            (slots[..count].to_vec(), operand)
        }
        Format::F3rc | Format::F4rcc => {
            let first_register = code[2];
            let registers = (0..aa)
                .map(|offset| {
                    first_register
                        .checked_add(offset)
                        .ok_or_else(|| malformed_error!("register range overflows at {}", index))
                })
                .collect::<Result<Vec<_>>>()?;
            let operand = if spec.format == Format::F4rcc {
                dual_reference(spec.references, code[1], code[3])
            } else {
                reference(0, u32::from(code[1]))
            };
            (registers, operand)
        }
        Format::F51l => {
            let value = code[1..5]
                .iter()
                .rev()
                .fold(0u64, |acc, unit| acc << 16 | u64::from(*unit));
            #[allow(clippy::cast_possible_wrap)]
            let literal = value as i64;
            (vec![aa], Operand::Literal(literal))
        }
        Format::PackedSwitchPayload
        | Format::SparseSwitchPayload
        | Format::FillArrayDataPayload => {
            return Err(malformed_error!("payload format for opcode 0x{:02x}", opcode))
        }
    };

    Ok((
        Instruction {
            opcode,
            format: spec.format,
            registers,
            operand,
        },
        width,
    ))
}

/// Decodes every instruction in `units`, in order.
///
/// # Errors
/// Fails on the first instruction that cannot be decoded; see [`decode_instruction`].
pub fn decode_stream(units: &[u16]) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut index = 0;
    while index < units.len() {
        let (instruction, width) = decode_instruction(units, index)?;
        instructions.push(instruction);
        index += width;
    }
    Ok(instructions)
}

/// Reads little-endian code units from a byte buffer.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the buffer has an odd length.
pub fn units_from_bytes(bytes: &[u8]) -> Result<Vec<u16>> {
    if bytes.len() % 2 != 0 {
        return Err(malformed_error!(
            "instruction stream of {} bytes is not a whole number of code units",
            bytes.len()
        ));
    }

    let mut parser = Parser::new(bytes);
    let mut units = Vec::with_capacity(bytes.len() / 2);
    while parser.has_more_data() {
        units.push(parser.read_le::<u16>()?);
    }
    Ok(units)
}

fn decode_payload(units: &[u16], index: usize, ident: u16) -> Result<(Instruction, usize)> {
    let header = |len: usize| units.get(index..index + len).ok_or(OutOfBounds);

    match ident {
        opcodes::PACKED_SWITCH_PAYLOAD => {
            let head = header(4)?;
            let size = usize::from(head[1]);
            let first_key = signed32(head[2], head[3]);
            let body = header(4 + size * 2)?;
            let targets = body[4..]
                .chunks_exact(2)
                .map(|pair| signed32(pair[0], pair[1]))
                .collect();
            let instruction = Instruction::packed_switch_payload(first_key, targets);
            Ok((instruction, 4 + size * 2))
        }
        opcodes::SPARSE_SWITCH_PAYLOAD => {
            let head = header(2)?;
            let size = usize::from(head[1]);
            let body = header(2 + size * 4)?;
            let values: Vec<i32> = body[2..]
                .chunks_exact(2)
                .map(|pair| signed32(pair[0], pair[1]))
                .collect();
            let (keys, targets) = values.split_at(size);
            let instruction = Instruction::sparse_switch_payload(keys.to_vec(), targets.to_vec());
            Ok((instruction, 2 + size * 4))
        }
        opcodes::FILL_ARRAY_DATA_PAYLOAD => {
            let head = header(4)?;
            let element_width = head[1];
            if !is_element_width(element_width) {
                return Err(malformed_error!(
                    "array data at {} has {}-byte elements",
                    index,
                    element_width
                ));
            }
            let count = u32::from(head[2]) | u32::from(head[3]) << 16;
            let byte_len = usize::try_from(count)
                .ok()
                .and_then(|count| count.checked_mul(usize::from(element_width)))
                .ok_or_else(|| malformed_error!("array data at {} is too large", index))?;
            let width = 4 + byte_len.div_ceil(2);
            let body = header(width)?;
            let mut data: Vec<u8> = body[4..].iter().flat_map(|unit| unit.to_le_bytes()).collect();
            if data.get(byte_len).is_some_and(|padding| *padding != 0) {
                return Err(malformed_error!("array data at {} has nonzero padding", index));
            }
            data.truncate(byte_len);
            Ok((Instruction::array_data_payload(element_width, data), width))
        }
        _ => Err(malformed_error!(
            "Invalid payload identifier 0x{:04x} at {}",
            ident,
            index
        )),
    }
}

fn dual_reference(
    kinds: &[ReferenceKind],
    first: u16,
    second: u16,
) -> Operand {
    Operand::DualReference(
        Reference::Index {
            kind: kinds[0],
            index: u32::from(first),
        },
        Reference::Index {
            kind: kinds[1],
            index: u32::from(second),
        },
    )
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn signed8(value: u16) -> i8 {
    (value & 0xFF) as u8 as i8
}

#[allow(clippy::cast_possible_wrap)]
fn signed16(value: u16) -> i16 {
    value as i16
}

#[allow(clippy::cast_possible_wrap)]
fn signed32(low: u16, high: u16) -> i32 {
    (u32::from(low) | u32::from(high) << 16) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::encoder::encode_instruction,
        metadata::reference::RawIndices,
    };

    #[test]
    fn decode_instruction_basic() {
        // move-object/from16 v3, v300
        let (insn, width) = decode_instruction(&[0x0308, 300], 0).unwrap();
        assert_eq!(width, 2);
        assert_eq!(insn.mnemonic(), "move-object/from16");
        assert_eq!(insn.registers, vec![3, 300]);
        assert_eq!(insn.operand, Operand::None);
    }

    #[test]
    fn decode_sign_extends() {
        let (insn, _) = decode_instruction(&[0xF012], 0).unwrap();
        assert_eq!(insn.operand, Operand::Literal(-1));

        let (insn, _) = decode_instruction(&[0xFE28], 0).unwrap();
        assert_eq!(insn.operand, Operand::Branch(-2));

        let (insn, _) = decode_instruction(&[0x0015, 0x8000], 0).unwrap();
        assert_eq!(insn.operand, Operand::Literal(-0x8000_0000));
    }

    #[test]
    fn decode_unknown_opcode_reports_offset() {
        let result = decode_stream(&[0x0000, 0x0000, 0x003E]);
        assert!(matches!(
            result,
            Err(Error::UnknownOpcode {
                opcode: 0x3E,
                offset: 2
            })
        ));
    }

    #[test]
    fn decode_truncated() {
        assert!(matches!(
            decode_instruction(&[0x011A], 0),
            Err(Error::OutOfBounds)
        ));
        assert!(matches!(
            decode_instruction(&[0x0100, 2, 0, 0, 5, 0], 0),
            Err(Error::OutOfBounds)
        ));
    }

    #[test]
    fn decode_polymorphic() {
        let units = [0x20FA, 0x0011, 0x0010, 0x0022];
        let (insn, width) = decode_instruction(&units, 0).unwrap();
        assert_eq!(width, 4);
        assert_eq!(insn.registers, vec![0, 1]);
        assert_eq!(
            insn.operand,
            Operand::DualReference(
                Reference::Index {
                    kind: ReferenceKind::Method,
                    index: 0x11
                },
                Reference::Index {
                    kind: ReferenceKind::Proto,
                    index: 0x22
                }
            )
        );
        assert_eq!(encode_instruction(&insn, &RawIndices).unwrap(), units);
    }

    #[test]
    fn decode_payloads() {
        let units = [
            0x0100, 2, 10, 0, 6, 0, 8, 0, // packed-switch
            0x0200, 1, 5, 0, 0xFFFC, 0xFFFF, // sparse-switch
            0x0300, 2, 3, 0, 0x0001, 0x0002, 0x0003, // fill-array-data
        ];
        let insns = decode_stream(&units).unwrap();
        assert_eq!(insns.len(), 3);
        assert_eq!(
            insns[0].operand,
            Operand::PackedSwitch {
                first_key: 10,
                targets: vec![6, 8]
            }
        );
        assert_eq!(
            insns[1].operand,
            Operand::SparseSwitch {
                keys: vec![5],
                targets: vec![-4]
            }
        );
        assert_eq!(
            insns[2].operand,
            Operand::ArrayData {
                element_width: 2,
                data: vec![1, 0, 2, 0, 3, 0]
            }
        );
    }

    #[test]
    fn units_from_odd_bytes() {
        assert!(units_from_bytes(&[0x0E]).is_err());
        assert_eq!(units_from_bytes(&[0x0E, 0x00]).unwrap(), vec![0x000E]);
    }
}
