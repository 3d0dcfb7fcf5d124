//! Instruction record — the input side of the external interface.
//!
//! Decoding and trace ingestion are external collaborators;
//! this is just the shape the updater consumes. `srcs` is a `Vec<Op>`
//! rather than a fixed `[Op; MAX_SRCS]` — the core never needs a bound on
//! source count, only an order.

use crate::node::OpCode;
use crate::operand::Op;

/// One decoded three-address instruction, as fed to
/// [`crate::tree::Tree::update_backward`] / `update_forward` /
/// `update_forward_with_indirection`.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub operation: OpCode,
    pub dst: Op,
    pub srcs: Vec<Op>,
    pub pc: u32,
    pub line: u32,
    /// Diagnostic only — never consulted by the updater's control flow.
    pub disasm: String,
    pub is_floating: bool,
}

impl Instruction {
    pub fn new(operation: OpCode, dst: Op, srcs: Vec<Op>, pc: u32, line: u32) -> Self {
        Self {
            operation,
            dst,
            srcs,
            pc,
            line,
            disasm: String::new(),
            is_floating: false,
        }
    }

    pub fn with_disasm(mut self, disasm: impl Into<String>) -> Self {
        self.disasm = disasm.into();
        self
    }

    pub fn floating(mut self) -> Self {
        self.is_floating = true;
        self
    }
}

/// A conditional-branch record attached to a tree by the driving host
/// (see `Tree::append_conditional`). Resolved from the original's
/// `jump_info->cond_pc` / `line_cond` fields — the driver owns everything
/// else about control flow, the core just remembers where a slice crossed
/// a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalRecord {
    pub cond_pc: u32,
    pub line: u32,
}
