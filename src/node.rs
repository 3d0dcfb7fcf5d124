//! Expression node & graph, and the arena that owns them.
//!
//! Nodes form a cyclic structure (source children + reverse user edges).
//! Because the graph can contain cycles once commutative flattening runs,
//! we model this as an arena owning
//! every node, with source/user slots holding arena indices (`NodeId`)
//! rather than raw/shared pointers — `NodeId` is `Copy`, and a deleted
//! node (assign-collapse) just leaves a tombstone slot behind once
//! every referring index has been rewritten.

use crate::operand::Op;

/// An index into a [`Arena`]. Cheap to copy, valid only for the arena that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// The operation that produced a node's value from its `srcs`.
///
/// `FullOverlap` and `PartialOverlap` are the two synthetic markers the
/// updater uses internally to record *why* a node gained a dependency
/// edge during overlap resolution — they never originate
/// from the instruction stream itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// No operation has been recorded yet; only legal while `srcs` is empty.
    Unset,
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Not,
    Neg,
    Shl,
    Shr,
    Load,
    Store,
    Cmp,
    /// Synthetic: `d` fully subsumes a frontier entry `f`.
    FullOverlap,
    /// Synthetic: `d` straddles a frontier entry `f`, splitting it.
    PartialOverlap,
}

/// A back-edge: `(user, slot)` means `user.srcs[slot]` points back at the
/// node holding this entry.
pub type UserEdge = (NodeId, usize);

/// An operand-bearing node in the expression graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub op: Op,
    pub pc: u32,
    pub line: u32,
    pub operation: OpCode,
    pub srcs: Vec<NodeId>,
    pub users: Vec<UserEdge>,
    pub is_float_result: bool,
}

impl Node {
    pub fn new(op: Op, pc: u32, line: u32) -> Self {
        Self {
            op,
            pc,
            line,
            operation: OpCode::Unset,
            srcs: Vec::new(),
            users: Vec::new(),
            is_float_result: false,
        }
    }
}

/// Owning storage for every [`Node`] in a [`crate::tree::Tree`].
///
/// Deletion (assign-collapse only) leaves a `None`
/// tombstone at that slot rather than shifting indices, so every other
/// live `NodeId` remains valid.
#[derive(Debug, Default)]
pub struct Arena {
    slots: Vec<Option<Node>>,
}

impl Arena {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Some(node));
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        self.slots[id.0 as usize]
            .as_ref()
            .expect("NodeId referenced a deleted node")
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id.0 as usize]
            .as_mut()
            .expect("NodeId referenced a deleted node")
    }

    pub fn try_get(&self, id: NodeId) -> Option<&Node> {
        self.slots[id.0 as usize].as_ref()
    }

    /// Removes a node from the arena. Callers must have already rewritten
    /// every back-edge pointing at `id` (assign-collapse's contract).
    pub fn delete(&mut self, id: NodeId) -> Node {
        self.slots[id.0 as usize]
            .take()
            .expect("double delete of a NodeId")
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0 as usize), Some(Some(_)))
    }

    /// Registers `(user, slot)` as a back-edge on `src`, i.e. adds a new
    /// source child `src` to `user.srcs` at `slot` and records the
    /// reverse edge — the one place both halves of the link are
    /// established together.
    pub fn link(&mut self, user: NodeId, src: NodeId) -> usize {
        let slot = self.get(user).srcs.len();
        self.get_mut(user).srcs.push(src);
        self.get_mut(src).users.push((user, slot));
        slot
    }
}
