//! Code items: register header, instructions and exception tables of one method.
//!
//! # Layout
//!
//! ```text
//! registers_size u16, ins_size u16, outs_size u16, tries_size u16,
//! debug_info_off u32, insns_size u32, insns [u16; insns_size],
//! [padding u16], tries [try_item; tries_size], handlers encoded_catch_handler_list
//! ```
//!
//! The padding, tries and handlers are only present when the method has try ranges.

use std::collections::HashMap;

use log::trace;

use crate::{
    assembly::{opcodes, Instruction, Operand},
    metadata::{
        key::StructuralKey,
        method::{HandlerList, Method, MethodBody},
        reference::{Reference, ReferenceIndexer},
    },
    utils::{to_u16, to_u32, write_sleb128, write_uleb128},
    writer::{config::WriterConfig, stream::ByteStream},
    Error, Result,
};

/// Register counts of a code item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterCounts {
    /// Registers used by the method
    pub registers: u16,
    /// Registers holding incoming arguments
    pub ins: u16,
    /// Registers needed for outgoing call arguments
    pub outs: u16,
}

/// Computes the register header of a method.
///
/// `registers` is the larger of the declared count and `ins`; when `outs` exceeds the configured
/// threshold it is also counted into `registers`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a prototype needs more than 65535 registers.
pub fn register_counts(
    method: &Method,
    body: &MethodBody,
    config: &WriterConfig,
) -> Result<RegisterCounts> {
    let ins = method.ins_count()?;
    let mut outs = 0;
    for instruction in body.instructions() {
        outs = outs.max(outgoing_registers(instruction)?);
    }

    let mut registers = method.registers.max(ins);
    if outs > config.max_outs_promotion {
        registers = registers.max(outs);
    }

    Ok(RegisterCounts {
        registers,
        ins,
        outs,
    })
}

/// Argument registers an instruction passes to a callee.
///
/// For method references this is the callee's parameter registers plus `this` unless the call
/// is static. Polymorphic and custom invokes, and raw method indices whose prototype is not
/// known, use the instruction's own register count.
fn outgoing_registers(instruction: &Instruction) -> Result<u16> {
    Ok(match (instruction.opcode, &instruction.operand) {
        (
            opcodes::INVOKE_STATIC | opcodes::INVOKE_STATIC_RANGE,
            Operand::Reference(Reference::Method(callee)),
        ) => callee.proto.parameter_registers()?,
        (
            opcodes::INVOKE_VIRTUAL..=opcodes::INVOKE_INTERFACE
            | opcodes::INVOKE_VIRTUAL_RANGE..=opcodes::INVOKE_INTERFACE_RANGE,
            Operand::Reference(Reference::Method(callee)),
        ) => callee
            .proto
            .parameter_registers()?
            .checked_add(1)
            .ok_or_else(|| malformed_error!("call to {} passes too many registers", callee))?,
        (opcodes::FILLED_NEW_ARRAY | opcodes::FILLED_NEW_ARRAY_RANGE, _) => 0,
        _ => instruction.argument_registers(),
    })
}

/// Writes the code item of one method and returns its offset.
///
/// # Errors
/// Returns [`crate::Error::DanglingReference`] for unpooled instruction references,
/// [`crate::Error::MalformedTryRange`] for invalid try ranges, and the encoder errors for
/// operands that do not fit their format.
pub fn write_code_item<I: ReferenceIndexer + ?Sized>(
    stream: &mut ByteStream,
    method: &Method,
    body: &MethodBody,
    indexer: &I,
    config: &WriterConfig,
) -> Result<u32> {
    let counts = register_counts(method, body, config)?;
    let insns = body.encode(indexer)?;
    let tries = body.resolve_tries()?;

    stream.align(4);
    let offset = stream.position()?;
    stream.write_u16(counts.registers);
    stream.write_u16(counts.ins);
    stream.write_u16(counts.outs);
    stream.write_u16(to_u16(tries.len())?);
    stream.write_u32(0);
    stream.write_u32(to_u32(insns.len())?);
    for unit in &insns {
        stream.write_u16(*unit);
    }

    if !tries.is_empty() {
        if insns.len() % 2 == 1 {
            stream.write_u16(0);
        }

        let (handlers, handler_offsets) =
            encode_handler_lists(tries.iter().map(|range| &range.handlers), indexer)?;
        for range in &tries {
            let handler_off = handler_offsets
                .get(&range.handlers.structural_key())
                .copied()
                .ok_or_else(|| {
                    malformed_error!("Handler list of try at {} was not encoded", range.start)
                })?;
            stream.write_u32(range.start);
            stream.write_u16(range.insn_count);
            stream.write_u16(handler_off);
        }
        stream.write_bytes(&handlers);
    }

    trace!(
        "Code item at {offset:#x}: {} registers, {} ins, {} outs, {} tries, {} code units",
        counts.registers,
        counts.ins,
        counts.outs,
        tries.len(),
        insns.len()
    );
    Ok(offset)
}

/// Encodes the distinct handler lists, in order of first use.
///
/// Returns the encoded catch handler list and, per list key, its byte offset from the start of
/// the encoded list.
fn encode_handler_lists<'a, I: ReferenceIndexer + ?Sized>(
    lists: impl Iterator<Item = &'a HandlerList>,
    indexer: &I,
) -> Result<(Vec<u8>, HashMap<Vec<u8>, u16>)> {
    let mut distinct: Vec<&HandlerList> = Vec::new();
    let mut offsets = HashMap::new();
    for list in lists {
        let key = list.structural_key();
        if !offsets.contains_key(&key) {
            offsets.insert(key, 0);
            distinct.push(list);
        }
    }

    let mut out = Vec::new();
    write_uleb128(to_u32(distinct.len())?, &mut out);
    for list in distinct {
        let offset = u16::try_from(out.len()).map_err(|_| {
            Error::MalformedTryRange("handler lists exceed 64 KiB".to_string())
        })?;
        offsets.insert(list.structural_key(), offset);

        let typed = i32::try_from(list.typed.len())
            .map_err(|_| Error::MalformedTryRange("too many handlers".to_string()))?;
        write_sleb128(if list.catch_all.is_some() { -typed } else { typed }, &mut out);
        for (exception_type, address) in &list.typed {
            write_uleb128(indexer.type_index(exception_type)?, &mut out);
            write_uleb128(*address, &mut out);
        }
        if let Some(address) = list.catch_all {
            write_uleb128(address, &mut out);
        }
    }

    Ok((out, offsets))
}
