//! Try ranges and catch handlers of a method body.
//!
//! A [`TryRange`] covers the instructions from `start` to `end` inclusive and lists the handlers
//! that are consulted, in order, when an exception escapes one of them. All positions are
//! instruction handles of the owning [`crate::metadata::method::MethodBody`]; their code unit
//! offsets are only computed when the range is resolved.
//!
//! # Layout in Bytecode
//!
//! ```text
//! try_item      { start_addr: u32, insn_count: u16, handler_off: u16 }
//! handler list  { size: sleb128, (type_idx: uleb128, addr: uleb128) * |size|, [catch_all_addr] }
//! ```
//!
//! A negative `size` means the list ends with a catch-all handler.

use crate::metadata::{key::StructuralKey, method::InstructionId};

/// One handler of a try range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatchHandler {
    /// Type descriptor of the caught exception, `None` for a catch-all handler
    pub exception_type: Option<String>,
    /// First instruction of the handler code
    pub target: InstructionId,
}

impl CatchHandler {
    /// A handler for one exception type.
    pub fn typed(exception_type: impl Into<String>, target: InstructionId) -> Self {
        CatchHandler {
            exception_type: Some(exception_type.into()),
            target,
        }
    }

    /// A handler for every exception.
    #[must_use]
    pub fn catch_all(target: InstructionId) -> Self {
        CatchHandler {
            exception_type: None,
            target,
        }
    }

    /// Returns `true` if this handler catches every exception.
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.exception_type.is_none()
    }
}

/// A protected instruction range with its handlers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TryRange {
    /// First protected instruction
    pub start: InstructionId,
    /// Last protected instruction, inclusive
    pub end: InstructionId,
    /// Handlers in the order they are consulted
    pub handlers: Vec<CatchHandler>,
}

impl TryRange {
    /// Creates a try range without handlers.
    #[must_use]
    pub fn new(start: InstructionId, end: InstructionId) -> Self {
        TryRange {
            start,
            end,
            handlers: Vec::new(),
        }
    }

    /// Adds a handler.
    #[must_use]
    pub fn with_handler(mut self, handler: CatchHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Returns every instruction handle this range refers to.
    pub fn handles(&self) -> impl Iterator<Item = InstructionId> + '_ {
        [self.start, self.end]
            .into_iter()
            .chain(self.handlers.iter().map(|handler| handler.target))
    }
}

/// A try range with every handle resolved to a code unit offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTry {
    /// Offset of the first protected code unit
    pub start: u32,
    /// Number of protected code units
    pub insn_count: u16,
    /// The handler list
    pub handlers: HandlerList,
}

/// A resolved handler list, interned by content within one code item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerList {
    /// Typed handlers: exception type descriptor and handler address
    pub typed: Vec<(String, u32)>,
    /// Address of the trailing catch-all handler
    pub catch_all: Option<u32>,
}

impl StructuralKey for HandlerList {
    fn write_key(&self, key: &mut Vec<u8>) {
        self.typed.len().write_key(key);
        for (exception_type, address) in &self.typed {
            exception_type.write_key(key);
            address.write_key(key);
        }
        self.catch_all.write_key(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: usize) -> InstructionId {
        InstructionId {
            index,
            generation: 0,
        }
    }

    #[test]
    fn handles_cover_bounds_and_targets() {
        let range = TryRange::new(id(0), id(2))
            .with_handler(CatchHandler::typed("Ljava/io/IOException;", id(5)))
            .with_handler(CatchHandler::catch_all(id(7)));

        assert_eq!(
            range.handles().collect::<Vec<_>>(),
            vec![id(0), id(2), id(5), id(7)]
        );
        assert!(range.handlers[1].is_catch_all());
    }

    #[test]
    fn handler_list_keys() {
        let a = HandlerList {
            typed: vec![("LA;".into(), 4)],
            catch_all: None,
        };
        let b = HandlerList {
            typed: vec![("LA;".into(), 4)],
            catch_all: Some(4),
        };
        assert_ne!(a.structural_key(), b.structural_key());
        assert_eq!(a.structural_key(), a.clone().structural_key());
    }
}
