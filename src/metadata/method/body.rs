//! Mutable instruction sequence of one method.
//!
//! [`MethodBody`] keeps its instructions in an arena of generation-tagged slots. Every
//! instruction is addressed through an [`InstructionId`] handle; the handle stays valid while the
//! instruction lives and becomes stale (and is detected as such) once it is removed. Labels and
//! try ranges hold handles, never offsets, so they follow their instruction through edits.
//!
//! Offsets are computed on demand by summing the widths of the preceding instructions. There is
//! no offset cache to invalidate.
//!
//! # Width Preservation
//!
//! Removing an instruction never changes the total code size: the instruction is replaced by
//! `nop` filler of exactly its width, and everything that pointed at it is moved onto the filler.
//! Branch deltas elsewhere in the method therefore remain correct.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::{
//!     assembly::{opcodes, Instruction, Operand},
//!     metadata::method::MethodBody,
//! };
//!
//! let mut body = MethodBody::new();
//! let konst = body.push(Instruction::new(opcodes::CONST_16, vec![0], Operand::Literal(300))?);
//! let ret = body.push(Instruction::new(opcodes::RETURN, vec![0], Operand::None)?);
//! body.add_label("exit", ret)?;
//!
//! body.remove(konst)?;
//! assert_eq!(body.code_units(), 3);
//! assert_eq!(body.label_offset("exit")?, 2);
//! # Ok::<(), dexscope::Error>(())
//! ```

use std::collections::HashMap;

use log::warn;

use crate::{
    assembly::{decode_stream, Instruction, InstructionEncoder, Operand},
    metadata::{
        key::StructuralKey,
        method::{CatchHandler, HandlerList, ResolvedTry, TryRange},
        reference::ReferenceIndexer,
    },
    utils::{to_u16, to_u32},
    Error, Result,
};

/// Handle to an instruction of a [`MethodBody`].
///
/// Handles are plain values; copying one does not copy the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl InstructionId {
    /// Arena slot of the instruction.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Generation of the slot when the handle was issued.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    instruction: Option<Instruction>,
}

/// The instructions, labels and try ranges of one method.
#[derive(Debug, Clone, Default)]
pub struct MethodBody {
    slots: Vec<Slot>,
    /// Slot indices in program order
    order: Vec<usize>,
    labels: HashMap<String, InstructionId>,
    tries: Vec<TryRange>,
}

impl MethodBody {
    /// Creates an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a body from instructions in program order.
    pub fn from_instructions(instructions: impl IntoIterator<Item = Instruction>) -> Self {
        let mut body = Self::new();
        for instruction in instructions {
            body.push(instruction);
        }
        body
    }

    /// Decodes a raw instruction stream into an editable body.
    ///
    /// # Errors
    /// Returns the decoder errors for unknown opcodes and truncated streams.
    pub fn from_code_units(units: &[u16]) -> Result<Self> {
        Ok(Self::from_instructions(decode_stream(units)?))
    }

    /// Appends an instruction and returns its handle.
    pub fn push(&mut self, instruction: Instruction) -> InstructionId {
        let id = self.allocate(instruction);
        self.order.push(id.index);
        id
    }

    /// Number of live instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the body has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total width of the body in code units.
    #[must_use]
    pub fn code_units(&self) -> usize {
        self.instructions().map(Instruction::width).sum()
    }

    /// Returns the instruction behind a handle.
    ///
    /// # Errors
    /// Returns [`crate::Error::InstructionNotFound`] for stale or foreign handles.
    pub fn get(&self, id: InstructionId) -> Result<&Instruction> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.instruction.as_ref())
            .ok_or(Error::InstructionNotFound)
    }

    /// Iterates over the live instructions in program order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.iter().map(|(_, instruction)| instruction)
    }

    /// Iterates over handles and instructions in program order.
    pub fn iter(&self) -> impl Iterator<Item = (InstructionId, &Instruction)> + '_ {
        self.order.iter().filter_map(|&index| {
            let slot = &self.slots[index];
            slot.instruction.as_ref().map(|instruction| {
                (
                    InstructionId {
                        index,
                        generation: slot.generation,
                    },
                    instruction,
                )
            })
        })
    }

    /// Code unit offset of an instruction.
    ///
    /// # Errors
    /// Returns [`crate::Error::InstructionNotFound`] for stale or foreign handles.
    pub fn offset_of(&self, id: InstructionId) -> Result<usize> {
        self.get(id)?;
        let mut offset = 0;
        for (current, instruction) in self.iter() {
            if current == id {
                return Ok(offset);
            }
            offset += instruction.width();
        }
        Err(Error::InstructionNotFound)
    }

    /// Handle of the instruction starting at a code unit offset.
    #[must_use]
    pub fn instruction_at(&self, offset: usize) -> Option<InstructionId> {
        let mut current = 0;
        for (id, instruction) in self.iter() {
            if current == offset {
                return Some(id);
            }
            if current > offset {
                break;
            }
            current += instruction.width();
        }
        None
    }

    /// Replaces the operand of an instruction in place.
    ///
    /// The format and width of the instruction never change.
    ///
    /// # Errors
    /// Returns [`crate::Error::InstructionNotFound`] for stale handles and
    /// [`crate::Error::InvalidOperand`] if the operand does not fit the format or would change
    /// the width of a payload.
    pub fn replace_operand(&mut self, id: InstructionId, operand: Operand) -> Result<()> {
        let current = self.get(id)?;
        current.check_operand(&operand)?;

        let mut replaced = current.clone();
        replaced.operand = operand;
        if replaced.width() != current.width() {
            return Err(Error::InvalidOperand(format!(
                "{} would change width from {} to {} code units",
                current.mnemonic(),
                current.width(),
                replaced.width()
            )));
        }

        self.slots[id.index].instruction = Some(replaced);
        Ok(())
    }

    /// Removes an instruction, leaving `nop` filler of the same width in its place.
    ///
    /// Labels, try range starts and handler targets that named the instruction move to the first
    /// filler; try range ends move to the last filler, so every bound keeps its code unit offset.
    /// Returns the filler handles.
    ///
    /// # Errors
    /// Returns [`crate::Error::InstructionNotFound`] for stale handles.
    pub fn remove(&mut self, id: InstructionId) -> Result<Vec<InstructionId>> {
        let width = self.get(id)?.width();
        let position = self
            .order
            .iter()
            .position(|&index| index == id.index)
            .ok_or(Error::InstructionNotFound)?;

        let slot = &mut self.slots[id.index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.instruction = Some(Instruction::nop());
        let mut fillers = vec![InstructionId {
            index: id.index,
            generation: slot.generation,
        }];

        for offset in 1..width {
            let filler = self.allocate(Instruction::nop());
            self.order.insert(position + offset, filler.index);
            fillers.push(filler);
        }

        let first = fillers[0];
        let last = fillers[fillers.len() - 1];
        for target in self.labels.values_mut() {
            if *target == id {
                *target = first;
            }
        }
        for range in &mut self.tries {
            if range.start == id {
                range.start = first;
            }
            if range.end == id {
                range.end = last;
            }
            for handler in &mut range.handlers {
                if handler.target == id {
                    handler.target = first;
                }
            }
        }

        Ok(fillers)
    }

    /// Registers a label on an instruction.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateLabel`] if the name is taken and
    /// [`crate::Error::InstructionNotFound`] for stale handles.
    pub fn add_label(&mut self, name: impl Into<String>, id: InstructionId) -> Result<()> {
        self.get(id)?;
        let name = name.into();
        if self.labels.contains_key(&name) {
            return Err(Error::DuplicateLabel(name));
        }
        self.labels.insert(name, id);
        Ok(())
    }

    /// Instruction a label points at.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<InstructionId> {
        self.labels.get(name).copied()
    }

    /// Current code unit offset of a label.
    ///
    /// # Errors
    /// Returns [`crate::Error::InstructionNotFound`] if no such label exists.
    pub fn label_offset(&self, name: &str) -> Result<usize> {
        let id = self.label(name).ok_or(Error::InstructionNotFound)?;
        self.offset_of(id)
    }

    /// Rewrites the branch delta of an instruction so that it targets a label.
    ///
    /// # Errors
    /// Returns [`crate::Error::InstructionNotFound`] for unknown labels or stale handles and
    /// [`crate::Error::InvalidOperand`] if the instruction is not a branch or the delta does not
    /// fit its format.
    pub fn retarget_branch(&mut self, id: InstructionId, label: &str) -> Result<()> {
        if !matches!(self.get(id)?.operand, Operand::Branch(_)) {
            return Err(Error::InvalidOperand(format!(
                "{} has no branch target",
                self.get(id)?.mnemonic()
            )));
        }

        let target = i64::try_from(self.label_offset(label)?)
            .map_err(|_| Error::InvalidOperand(format!("label {label} is out of range")))?;
        let source = i64::try_from(self.offset_of(id)?)
            .map_err(|_| Error::InvalidOperand("branch is out of range".to_string()))?;
        let delta = i32::try_from(target - source)
            .map_err(|_| Error::InvalidOperand(format!("branch to {label} is out of range")))?;

        self.replace_operand(id, Operand::Branch(delta))
    }

    /// Adds a try range.
    ///
    /// # Errors
    /// Returns [`crate::Error::InstructionNotFound`] if the range names a stale handle.
    pub fn add_try(&mut self, range: TryRange) -> Result<()> {
        for id in range.handles() {
            self.get(id)?;
        }

        let (start, end) = self.try_bounds(&range)?;
        for existing in &self.tries {
            let (other_start, other_end) = self.try_bounds(existing)?;
            if start <= other_end && other_start <= end {
                warn!(
                    "Try range {start:#x}..={end:#x} overlaps {other_start:#x}..={other_end:#x}"
                );
            }
        }

        self.tries.push(range);
        Ok(())
    }

    /// Try ranges in insertion order.
    #[must_use]
    pub fn tries(&self) -> &[TryRange] {
        &self.tries
    }

    /// Returns `true` if the instruction lies within any try range.
    ///
    /// # Errors
    /// Returns [`crate::Error::InstructionNotFound`] for stale handles.
    pub fn is_in_try(&self, id: InstructionId) -> Result<bool> {
        let offset = self.offset_of(id)?;
        for range in &self.tries {
            let (start, end) = self.try_bounds(range)?;
            if (start..=end).contains(&offset) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Start offset and inclusive end offset of a try range.
    ///
    /// The end offset is the last code unit of the `end` instruction.
    ///
    /// # Errors
    /// Returns [`crate::Error::InstructionNotFound`] for stale handles.
    pub fn try_bounds(&self, range: &TryRange) -> Result<(usize, usize)> {
        let start = self.offset_of(range.start)?;
        let end = self.offset_of(range.end)? + self.get(range.end)?.width() - 1;
        Ok((start, end))
    }

    /// Resolves every try range to offsets, sorted by start offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedTryRange`] for ranges without handlers, ranges that
    /// end before they start or start past the code, catch-all handlers that are not last, and
    /// ranges too long for a try item.
    pub fn resolve_tries(&self) -> Result<Vec<ResolvedTry>> {
        let code_units = self.code_units();
        let mut resolved = Vec::with_capacity(self.tries.len());

        for range in &self.tries {
            let (start, end) = self.try_bounds(range)?;
            if start >= code_units || end < start {
                return Err(Error::MalformedTryRange(format!(
                    "range {start:#x}..={end:#x} outside {code_units} code units"
                )));
            }
            if range.handlers.is_empty() {
                return Err(Error::MalformedTryRange(format!(
                    "range {start:#x}..={end:#x} has no handlers"
                )));
            }

            resolved.push(ResolvedTry {
                start: to_u32(start)?,
                insn_count: to_u16(end - start + 1).map_err(|_| {
                    Error::MalformedTryRange(format!("range {start:#x}..={end:#x} is too long"))
                })?,
                handlers: self.resolve_handlers(&range.handlers)?,
            });
        }

        resolved.sort_by_key(|range| range.start);
        Ok(resolved)
    }

    fn resolve_handlers(&self, handlers: &[CatchHandler]) -> Result<HandlerList> {
        let mut list = HandlerList {
            typed: Vec::new(),
            catch_all: None,
        };

        for (position, handler) in handlers.iter().enumerate() {
            let address = to_u32(self.offset_of(handler.target)?)?;
            match &handler.exception_type {
                Some(exception_type) => list.typed.push((exception_type.clone(), address)),
                None if position + 1 == handlers.len() => list.catch_all = Some(address),
                None => {
                    return Err(Error::MalformedTryRange(format!(
                        "catch-all handler at {address:#x} is not the last handler"
                    )))
                }
            }
        }

        Ok(list)
    }

    /// Encodes the body into code units.
    ///
    /// # Errors
    /// Returns the encoder errors, [`crate::Error::DanglingReference`] in particular.
    pub fn encode<I: ReferenceIndexer + ?Sized>(&self, indexer: &I) -> Result<Vec<u16>> {
        let mut encoder = InstructionEncoder::new(indexer);
        for instruction in self.instructions() {
            encoder.emit(instruction)?;
        }
        Ok(encoder.finalize())
    }

    /// Number of distinct handler lists across all try ranges.
    ///
    /// # Errors
    /// See [`MethodBody::resolve_tries`].
    pub fn handler_list_count(&self) -> Result<usize> {
        let mut keys: Vec<Vec<u8>> = self
            .resolve_tries()?
            .iter()
            .map(|range| range.handlers.structural_key())
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys.len())
    }

    fn allocate(&mut self, instruction: Instruction) -> InstructionId {
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            instruction: Some(instruction),
        });
        InstructionId {
            index,
            generation: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::opcodes,
        metadata::reference::{RawIndices, Reference, ReferenceKind},
    };

    fn insn(opcode: u8, registers: Vec<u16>, operand: Operand) -> Instruction {
        Instruction::new(opcode, registers, operand).unwrap()
    }

    fn sample() -> (MethodBody, Vec<InstructionId>) {
        let mut body = MethodBody::new();
        let ids = vec![
            body.push(insn(opcodes::CONST_4, vec![0], Operand::Literal(1))),
            body.push(insn(
                opcodes::CONST_STRING,
                vec![1],
                Operand::Reference(Reference::Index {
                    kind: ReferenceKind::String,
                    index: 4,
                }),
            )),
            body.push(insn(opcodes::CONST_WIDE, vec![2], Operand::Literal(7))),
            body.push(insn(opcodes::RETURN_VOID, vec![], Operand::None)),
        ];
        (body, ids)
    }

    #[test]
    fn offsets_sum_widths() {
        let (body, ids) = sample();
        let offsets: Vec<usize> = ids.iter().map(|id| body.offset_of(*id).unwrap()).collect();
        assert_eq!(offsets, [0, 1, 3, 8]);
        assert_eq!(body.code_units(), 9);
        assert_eq!(body.instruction_at(3), Some(ids[2]));
        assert_eq!(body.instruction_at(4), None);
    }

    #[test]
    fn remove_preserves_width_and_offsets() {
        let (mut body, ids) = sample();
        let fillers = body.remove(ids[2]).unwrap();

        assert_eq!(fillers.len(), 5);
        assert_eq!(body.code_units(), 9);
        assert_eq!(body.offset_of(ids[1]).unwrap(), 1);
        assert_eq!(body.offset_of(ids[3]).unwrap(), 8);
        assert_eq!(body.offset_of(fillers[0]).unwrap(), 3);
        assert!(matches!(body.get(ids[2]), Err(Error::InstructionNotFound)));
        assert!(matches!(body.remove(ids[2]), Err(Error::InstructionNotFound)));
    }

    #[test]
    fn fillers_take_fresh_slots() {
        let (mut body, ids) = sample();
        let mut fillers = body.remove(ids[2]).unwrap();
        fillers.extend(body.remove(ids[1]).unwrap());

        let mut slots: Vec<usize> = body.iter().map(|(id, _)| id.index()).collect();
        assert_eq!(slots.len(), 9);
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), 9);

        for filler in fillers {
            assert_eq!(body.get(filler).unwrap().mnemonic(), "nop");
        }
        assert_eq!(body.get(ids[0]).unwrap().mnemonic(), "const/4");
    }

    #[test]
    fn remove_moves_labels_and_try_bounds() {
        let (mut body, ids) = sample();
        body.add_label("wide", ids[2]).unwrap();
        body.add_try(
            TryRange::new(ids[1], ids[2]).with_handler(CatchHandler::catch_all(ids[2])),
        )
        .unwrap();

        let before = body.try_bounds(&body.tries()[0]).unwrap();
        let fillers = body.remove(ids[2]).unwrap();

        assert_eq!(body.label("wide"), Some(fillers[0]));
        assert_eq!(body.label_offset("wide").unwrap(), 3);
        assert_eq!(body.try_bounds(&body.tries()[0]).unwrap(), before);
        assert_eq!(body.tries()[0].handlers[0].target, fillers[0]);
    }

    #[test]
    fn duplicate_label_rejected() {
        let (mut body, ids) = sample();
        body.add_label("a", ids[0]).unwrap();
        assert!(matches!(
            body.add_label("a", ids[1]),
            Err(Error::DuplicateLabel(name)) if name == "a"
        ));
    }

    #[test]
    fn replace_operand_keeps_format() {
        let (mut body, ids) = sample();
        body.replace_operand(ids[0], Operand::Literal(-3)).unwrap();
        assert_eq!(body.get(ids[0]).unwrap().operand, Operand::Literal(-3));

        assert!(matches!(
            body.replace_operand(ids[0], Operand::Literal(100)),
            Err(Error::InvalidOperand(_))
        ));
        assert!(matches!(
            body.replace_operand(ids[3], Operand::Literal(0)),
            Err(Error::InvalidOperand(_))
        ));
    }

    #[test]
    fn payload_replacement_must_keep_width() {
        let mut body = MethodBody::new();
        let table = body.push(Instruction::packed_switch_payload(0, vec![4, 8]));
        body.replace_operand(
            table,
            Operand::PackedSwitch {
                first_key: 10,
                targets: vec![6, 9],
            },
        )
        .unwrap();
        assert!(matches!(
            body.replace_operand(
                table,
                Operand::PackedSwitch {
                    first_key: 0,
                    targets: vec![1],
                },
            ),
            Err(Error::InvalidOperand(_))
        ));
    }

    #[test]
    fn retarget_branch_uses_label_offset() {
        let mut body = MethodBody::new();
        let branch = body.push(insn(opcodes::GOTO, vec![], Operand::Branch(0)));
        body.push(insn(opcodes::CONST_16, vec![0], Operand::Literal(9)));
        let exit = body.push(insn(opcodes::RETURN_VOID, vec![], Operand::None));
        body.add_label("exit", exit).unwrap();

        body.retarget_branch(branch, "exit").unwrap();
        assert_eq!(body.get(branch).unwrap().operand, Operand::Branch(3));
        assert!(matches!(
            body.retarget_branch(exit, "exit"),
            Err(Error::InvalidOperand(_))
        ));
    }

    #[test]
    fn is_in_try_compares_offsets() {
        let (mut body, ids) = sample();
        body.add_try(TryRange::new(ids[0], ids[1]).with_handler(CatchHandler::catch_all(ids[3])))
            .unwrap();

        assert!(body.is_in_try(ids[1]).unwrap());
        assert!(!body.is_in_try(ids[2]).unwrap());

        let fillers = body.remove(ids[1]).unwrap();
        assert!(body.is_in_try(fillers[1]).unwrap());
    }

    #[test]
    fn resolve_tries_checks_handlers() {
        let (mut body, ids) = sample();
        body.add_try(TryRange::new(ids[0], ids[0])).unwrap();
        assert!(matches!(
            body.resolve_tries(),
            Err(Error::MalformedTryRange(_))
        ));

        let (mut body, ids) = sample();
        body.add_try(
            TryRange::new(ids[0], ids[2])
                .with_handler(CatchHandler::catch_all(ids[3]))
                .with_handler(CatchHandler::typed("LE;", ids[3])),
        )
        .unwrap();
        assert!(matches!(
            body.resolve_tries(),
            Err(Error::MalformedTryRange(_))
        ));
    }

    #[test]
    fn resolved_tries_sorted_by_start() {
        let (mut body, ids) = sample();
        body.add_try(TryRange::new(ids[2], ids[2]).with_handler(CatchHandler::catch_all(ids[3])))
            .unwrap();
        body.add_try(
            TryRange::new(ids[0], ids[1]).with_handler(CatchHandler::typed("LE;", ids[3])),
        )
        .unwrap();

        let resolved = body.resolve_tries().unwrap();
        assert_eq!(resolved[0].start, 0);
        assert_eq!(resolved[0].insn_count, 3);
        assert_eq!(resolved[1].start, 3);
        assert_eq!(resolved[1].insn_count, 5);
        assert_eq!(resolved[1].handlers.catch_all, Some(8));
        assert_eq!(body.handler_list_count().unwrap(), 2);
    }

    #[test]
    fn code_units_round_trip() {
        let (body, _) = sample();
        let units = body.encode(&RawIndices).unwrap();
        assert_eq!(units.len(), 9);

        let decoded = MethodBody::from_code_units(&units).unwrap();
        assert_eq!(decoded.encode(&RawIndices).unwrap(), units);
        assert_eq!(decoded.len(), 4);
    }
}
