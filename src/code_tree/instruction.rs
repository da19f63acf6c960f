use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kernel::flat_term::Functor;

/// Identity of a stored clause, as the caller of the index assigns it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ClauseId(pub usize);

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Index of a block in the store's block arena.
pub type BlockId = usize;

/// Index of a literal record in the store's literal arena.
pub type LiteralId = usize;

/// Index of a dispatch table in the store's table arena.
pub type TableId = usize;

/// Variable slots are numbered per literal, by first occurrence.
pub type Slot = u16;

/// The address of one instruction: a block and a position within it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CodeAddr {
    pub block: BlockId,
    pub offset: usize,
}

impl CodeAddr {
    pub fn start(block: BlockId) -> CodeAddr {
        CodeAddr { block, offset: 0 }
    }

    /// The next instruction in sequential order.
    /// Only valid when this instruction is not the last one of its block.
    pub fn next(&self) -> CodeAddr {
        CodeAddr {
            block: self.block,
            offset: self.offset + 1,
        }
    }
}

impl fmt::Display for CodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.offset)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Instruction {
    /// The current tape entry must be a functor with this code. Advances by one entry.
    CheckFunctor(Functor),

    /// Binds the slot to the subterm at the current position, and skips it.
    AssignVar(Slot),

    /// The subterm at the current position must equal the one bound to the slot.
    CheckVar(Slot),

    /// The end of one stored literal. The record holds its variable numbering and the
    /// matches cached during the current query.
    LitEnd(LiteralId),

    /// The end of a stored clause.
    Success(ClauseId),

    /// Jumps on the functor at the current position, through a sorted table.
    Dispatch(TableId),
}

impl Instruction {
    /// Whether execution can continue with the following instruction in the same block.
    /// Blocks always end with a terminal instruction.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Instruction::Success(_) | Instruction::Dispatch(_))
    }

    pub fn is_check_functor(&self) -> bool {
        matches!(self, Instruction::CheckFunctor(_))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instruction::CheckFunctor(functor) => write!(f, "check {}", functor),
            Instruction::AssignVar(slot) => write!(f, "assign v{}", slot),
            Instruction::CheckVar(slot) => write!(f, "compare v{}", slot),
            Instruction::LitEnd(id) => write!(f, "litend l{}", id),
            Instruction::Success(id) => write!(f, "success {}", id),
            Instruction::Dispatch(id) => write!(f, "dispatch t{}", id),
        }
    }
}

/// One cell of the automaton.
/// The alternative, if any, is the start of the block to try when this instruction fails.
/// Alternatives always point at offset 0 of a block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OpCode {
    pub instr: Instruction,
    pub alternative: Option<BlockId>,
}

impl OpCode {
    pub fn new(instr: Instruction) -> OpCode {
        OpCode {
            instr,
            alternative: None,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.alternative {
            Some(alt) => write!(f, "{} | else b{}", self.instr, alt),
            None => write!(f, "{}", self.instr),
        }
    }
}
