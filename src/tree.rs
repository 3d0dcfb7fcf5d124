//! Dependency updater & tree accessors.
//!
//! `Tree` owns the [`Arena`] and the [`Frontier`] together and exposes the
//! three state-machine entry points that apply one instruction at a time:
//! [`Tree::update_backward`], [`Tree::update_forward`], and
//! [`Tree::update_forward_with_indirection`].

use tracing::trace;

use crate::config::FrontierConfig;
use crate::diag::{Diagnostics, NoopDiagnostics};
use crate::error::{ExprDagError, Result};
use crate::frontier::Frontier;
use crate::instruction::{ConditionalRecord, Instruction};
use crate::node::{Arena, Node, NodeId, OpCode};
use crate::operand::Op;
use crate::overlap;

/// Owns every node and the live frontier for one slice reconstruction.
///
/// `D` is the [`Diagnostics`] sink; it defaults to the no-op
/// implementation so the core is usable — and testable — without any
/// print surface.
pub struct Tree<D: Diagnostics = NoopDiagnostics> {
    arena: Arena,
    frontier: Frontier,
    head: Option<NodeId>,
    conditionals: Vec<ConditionalRecord>,
    diag: D,
}

impl Tree<NoopDiagnostics> {
    pub fn new() -> Self {
        Self::with_config(FrontierConfig::default())
    }

    pub fn with_config(config: FrontierConfig) -> Self {
        Self::with_diagnostics(config, NoopDiagnostics)
    }
}

impl Default for Tree<NoopDiagnostics> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Diagnostics> Tree<D> {
    pub fn with_diagnostics(config: FrontierConfig, diag: D) -> Self {
        Self {
            arena: Arena::new(),
            frontier: Frontier::new(config),
            head: None,
            conditionals: Vec::new(),
            diag,
        }
    }

    // ---- accessors -------------------------------------------

    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    pub fn set_head(&mut self, id: NodeId) {
        debug_assert!(self.arena.is_live(id));
        self.head = Some(id);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn diagnostics(&self) -> &D {
        &self.diag
    }

    pub fn append_conditional(&mut self, record: ConditionalRecord) {
        self.conditionals.push(record);
    }

    pub fn conditionals(&self) -> &[ConditionalRecord] {
        &self.conditionals
    }

    /// Declared but deliberately unimplemented — the
    /// core stays pure with respect to I/O; a serialisation format belongs
    /// to an external collaborator.
    pub fn serialize_tree(&self) -> Result<String> {
        Err(ExprDagError::Unimplemented("serialize_tree"))
    }

    pub fn construct_tree(_serialized: &str) -> Result<Self>
    where
        D: Default,
    {
        Err(ExprDagError::Unimplemented("construct_tree"))
    }

    // ---- node creation with frontier reuse -----------------------

    fn create_or_get(&mut self, op: &Op, pc: u32, line: u32) -> NodeId {
        if !op.is_immediate() {
            if let Some(id) = self.frontier.search(op, &self.arena) {
                return id;
            }
        }
        self.arena.alloc(Node::new(op.clone(), pc, line))
    }

    fn frontier_insert(&mut self, op: &Op, id: NodeId) {
        if op.is_immediate() {
            return;
        }
        self.frontier
            .insert(op, id, &self.arena)
            .expect("frontier bucket capacity exceeded");
    }

    // ---- backward updater -------------------------------------------

    /// Applies one instruction, interpreted right-to-left. Returns `true`
    /// iff the instruction affects the slice rooted at `head`.
    pub fn update_backward(&mut self, instr: &Instruction) -> bool {
        let Instruction {
            operation,
            dst,
            srcs,
            pc,
            line,
            is_floating,
            ..
        } = instr;

        // Preamble: head initialisation — the first instruction seen
        // defines the slice target.
        if self.head.is_none() {
            let h = self.arena.alloc(Node::new(dst.clone(), *pc, *line));
            self.head = Some(h);
            self.frontier_insert(dst, h);
            trace!(?dst, "head initialised");
        }

        // Step 1: partial-overlap resolution against `dst`.
        let splits = overlap::partial_overlap_splits(dst, &self.frontier, &self.arena);
        let had_partial_overlap = !splits.is_empty();
        for (f_id, split) in splits {
            let f_op = self.arena.get(f_id).op.clone();
            self.frontier
                .remove(&f_op, &self.arena)
                .expect("partial-overlap candidate must be in its own bucket");
            for part in &split.parts {
                let part_id = self.create_or_get(part, *pc, *line);
                self.arena.link(f_id, part_id);
                if self.arena.get(f_id).operation == OpCode::Unset {
                    self.arena.get_mut(f_id).operation = OpCode::PartialOverlap;
                }
                self.frontier_insert(part, part_id);
            }
            self.diag.partial_overlap_split(dst, f_id, split.parts.len());
            trace!(?f_op, parts = split.parts.len(), "partial overlap split");
        }

        // Step 2: `dst` may now exist because step 1 produced a matching sub-operand.
        let mut dst_id = self.frontier.search(dst, &self.arena);

        // Step 3: full-overlap resolution against `dst`.
        let full = overlap::full_overlap_nodes(dst, &self.frontier, &self.arena);
        let had_full_overlap = !full.is_empty();
        if had_full_overlap {
            let d_id = *dst_id.get_or_insert_with(|| self.arena.alloc(Node::new(dst.clone(), *pc, *line)));
            for f_id in full {
                self.arena.link(f_id, d_id);
                if self.arena.get(f_id).operation == OpCode::Unset {
                    self.arena.get_mut(f_id).operation = OpCode::FullOverlap;
                }
                self.arena.get_mut(f_id).pc = *pc;
                self.arena.get_mut(f_id).line = *line;
                let f_op = self.arena.get(f_id).op.clone();
                self.frontier
                    .remove(&f_op, &self.arena)
                    .expect("full-overlap candidate must be in its own bucket");
                self.diag.full_overlap_found(dst, f_id);
                trace!(?f_op, "full overlap resolved");
            }
        }

        // Step 4: irrelevance check. A query with no destination node may
        // still have been relevant purely through its overlap side effects
        // (e.g. consuming a byte range of a wider live register) — the
        // consumed region is never itself materialised as a node (see
        // `overlap::PartialSplit`), so there is nothing further to attach.
        let d_id = match dst_id {
            Some(id) => id,
            None => {
                if had_partial_overlap || had_full_overlap {
                    trace!(?dst, "instruction relevant via overlap only, no destination node");
                    return true;
                }
                self.diag.instruction_out_of_slice(dst);
                trace!(?dst, "instruction not in slice");
                return false;
            }
        };

        // Step 5: record `dst` metadata and evict any stale frontier entry
        // for it — it is about to receive sources and become internal. It
        // stays evicted from here on; only a later full-overlap, exact
        // match, or split/assign-collapse ever brings an operand back.
        {
            let node = self.arena.get_mut(d_id);
            node.pc = *pc;
            node.line = *line;
            node.operation = *operation;
        }
        let _ = self.frontier.remove(dst, &self.arena);

        // Step 6: attach sources.
        let mut assign_collapsed = false;
        let mut collapsed_into = None;
        let is_assign = srcs.len() == 1 && *operation == OpCode::Assign;

        for src_op in srcs {
            let mut add_node = false;
            let src_id = if src_op.is_immediate() {
                self.arena.alloc(Node::new(src_op.clone(), *pc, *line))
            } else {
                match self.frontier.search(src_op, &self.arena) {
                    Some(existing) if existing != d_id => existing,
                    _ => {
                        add_node = true;
                        self.arena.alloc(Node::new(src_op.clone(), *pc, *line))
                    }
                }
            };

            if is_assign {
                let users = self.arena.get(d_id).users.clone();
                for (user, slot) in users {
                    self.arena.get_mut(user).srcs[slot] = src_id;
                    self.arena.get_mut(src_id).users.push((user, slot));
                }
                let node = self.arena.get_mut(src_id);
                node.pc = *pc;
                node.line = *line;
                if *is_floating {
                    node.is_float_result = true;
                }
                assign_collapsed = true;
                collapsed_into = Some(src_id);
                self.diag.assign_collapsed(d_id, src_id);
            } else {
                self.arena.link(d_id, src_id);
                if *is_floating {
                    self.arena.get_mut(src_id).is_float_result = true;
                }
            }

            // A source equal to `dst` itself (self-reference, e.g.
            // `R0 = ADD(R0, 1)`) got a fresh node above because `dst`'s own
            // entry was just evicted in step 5 — that fresh node is the
            // still-unresolved read of `dst`'s prior value, and the only
            // node that should ever occupy the operand's frontier slot now.
            if add_node {
                self.frontier_insert(src_op, src_id);
            }
        }

        if assign_collapsed {
            // `d_id`'s back-edges have all been rewritten onto the sole
            // source above; it is now safe to delete. If `d_id` was the
            // tree's head, the head must keep pointing at a live node — the
            // original never re-homes it, which would otherwise leave
            // `head()` dangling once `d_id` is gone (see DESIGN.md).
            let replacement = collapsed_into.expect("an ASSIGN with one source always attaches it");
            if self.head == Some(d_id) {
                self.head = Some(replacement);
            }
            self.arena.delete(d_id);
        } else {
            self.congregate(d_id);
        }

        true
    }

    // ---- forward updaters --------------------------------------------

    /// Forward dependency propagation: `dst` is in-slice iff any source
    /// has an exact frontier match, a full overlap, or a partial overlap.
    /// Partial overlaps are queried but never split in forward mode.
    pub fn update_forward(&mut self, instr: &Instruction) -> bool {
        let operands: Vec<Op> = instr
            .srcs
            .iter()
            .filter(|op| !op.is_immediate())
            .cloned()
            .collect();
        self.update_forward_kernel(instr, &operands)
    }

    /// Identical to [`Tree::update_forward`] except the candidate operand
    /// set also includes each source's four address components and the
    /// destination's, skipping immediates and the null register — used
    /// when taint through effective-address computation matters.
    pub fn update_forward_with_indirection(&mut self, instr: &Instruction) -> bool {
        let mut operands = Vec::new();
        for src in &instr.srcs {
            if !src.is_immediate() {
                operands.push(src.clone());
            }
            if let Some(components) = &src.addr_components {
                operands.extend(components.iter().filter(|c| !c.is_immediate()).cloned());
            }
        }
        if let Some(components) = &instr.dst.addr_components {
            operands.extend(components.iter().filter(|c| !c.is_immediate()).cloned());
        }
        operands.retain(|op| !(op.is_register() && op.is_null_register()));
        self.update_forward_kernel(instr, &operands)
    }

    fn update_forward_kernel(&mut self, instr: &Instruction, operands: &[Op]) -> bool {
        for op in operands {
            let exact = self.frontier.contains(op, &self.arena);
            let full = !overlap::full_overlap_nodes(op, &self.frontier, &self.arena).is_empty();
            let partial = !overlap::partial_overlap_splits(op, &self.frontier, &self.arena).is_empty();
            if exact || full || partial {
                if self.frontier.search(&instr.dst, &self.arena).is_none() {
                    let id = self.arena.alloc(Node::new(instr.dst.clone(), instr.pc, instr.line));
                    self.frontier_insert(&instr.dst, id);
                }
                trace!(?op, dst = ?instr.dst, "forward promotion");
                return true;
            }
        }

        if self.frontier.search(&instr.dst, &self.arena).is_some() {
            let _ = self.frontier.remove(&instr.dst, &self.arena);
        }
        trace!(dst = ?instr.dst, "forward eviction");
        false
    }

    // ---- canonicalisation --------------------------

    /// Rebalances/merges commutative sub-expressions along the path from
    /// `start` toward `head`: if a node and a same-commutative-operation
    /// child that has no other user form a chain, the child's sources are
    /// spliced directly into the parent and the child is deleted. Climbs
    /// to the parent's own sole user and repeats while the chain of
    /// matching commutative operations continues.
    ///
    /// `update_backward` invokes this on `d` itself once sources are
    /// attached, unless the instruction collapsed (matching the original's
    /// `dst->congregate_node(this->get_head())`). It is also exposed
    /// publicly so a caller can re-run it over an arbitrary node, e.g. after
    /// `update_forward` retargets sources elsewhere. `flatten_commutative_
    /// children` evicts a merged child's frontier entry before deleting it,
    /// so calling this mid-stream is safe.
    pub fn congregate(&mut self, start: NodeId) {
        let mut current = start;
        loop {
            self.flatten_commutative_children(current);

            let users = &self.arena.get(current).users;
            if users.len() != 1 {
                break;
            }
            let (parent, _slot) = users[0];
            let same_op = is_commutative(self.arena.get(current).operation)
                && self.arena.get(current).operation == self.arena.get(parent).operation;
            if !same_op || Some(current) == self.head {
                break;
            }
            current = parent;
        }
    }

    fn flatten_commutative_children(&mut self, node_id: NodeId) {
        loop {
            let op = self.arena.get(node_id).operation;
            if !is_commutative(op) {
                return;
            }
            let srcs = self.arena.get(node_id).srcs.clone();
            let mergeable = srcs.iter().enumerate().find_map(|(idx, &child_id)| {
                if child_id == node_id {
                    return None;
                }
                let child = self.arena.get(child_id);
                (child.operation == op && child.users.len() == 1).then_some((idx, child_id))
            });

            let Some((idx, child_id)) = mergeable else {
                return;
            };

            let child_srcs = self.arena.get(child_id).srcs.clone();
            let mut iter = child_srcs.into_iter();
            if let Some(first) = iter.next() {
                self.arena.get_mut(node_id).srcs[idx] = first;
                self.arena.get_mut(first).users.retain(|(u, _)| *u != child_id);
                self.arena.get_mut(first).users.push((node_id, idx));
                for rest in iter {
                    self.arena.get_mut(rest).users.retain(|(u, _)| *u != child_id);
                    let slot = self.arena.get(node_id).srcs.len();
                    self.arena.get_mut(node_id).srcs.push(rest);
                    self.arena.get_mut(rest).users.push((node_id, slot));
                }
            } else {
                // A commutative operation with zero recorded sources
                // shouldn't occur (it would have `operation == Unset`);
                // leave the slot untouched rather than corrupt back-edges.
                return;
            }
            let child_op = self.arena.get(child_id).op.clone();
            if self.frontier.search(&child_op, &self.arena) == Some(child_id) {
                let _ = self.frontier.remove(&child_op, &self.arena);
            }
            self.arena.delete(child_id);
        }
    }
}

fn is_commutative(op: OpCode) -> bool {
    matches!(op, OpCode::Add | OpCode::Mul | OpCode::And | OpCode::Or | OpCode::Xor)
}
