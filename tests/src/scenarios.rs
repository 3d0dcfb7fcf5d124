use exprdag::prelude::*;

fn instr(op: OpCode, dst: Op, srcs: Vec<Op>, pc: u32, line: u32) -> Instruction {
    Instruction::new(op, dst, srcs, pc, line)
}

/// R0 = ADD(R1, R2); R1 = MUL(R3, Imm(2)) — head gains a two-level
/// expression tree once both instructions are folded in backward.
#[test]
fn backward_reconstructs_a_two_level_expression_tree() {
    let mut tree = Tree::new();

    assert!(tree.update_backward(&instr(
        OpCode::Add,
        Op::reg(0, 4),
        vec![Op::reg(1, 4), Op::reg(2, 4)],
        2,
        2
    )));
    assert!(tree.update_backward(&instr(
        OpCode::Mul,
        Op::reg(1, 4),
        vec![Op::reg(3, 4), Op::imm_int(2, 4)],
        1,
        1
    )));

    let head = tree.head().expect("head initialised by the first instruction");
    assert_eq!(tree.node(head).operation, OpCode::Add);
    assert_eq!(tree.node(head).srcs.len(), 2);

    let r1_node = tree.node(head).srcs[0];
    assert_eq!(tree.node(r1_node).op, Op::reg(1, 4));
    assert_eq!(tree.node(r1_node).operation, OpCode::Mul);
    assert_eq!(tree.node(r1_node).srcs.len(), 2);

    // R2 was never redefined, so it stays live in the frontier as a leaf.
    assert!(tree.frontier().contains(&Op::reg(2, 4), tree.arena()));
    // R3 is a fresh leaf introduced by the second instruction's sources.
    assert!(tree.frontier().contains(&Op::reg(3, 4), tree.arena()));
}

/// An ASSIGN with a single source splices straight through: the node
/// representing the assigned-to operand disappears and its former users
/// point directly at the assignment's source.
#[test]
fn assign_with_a_single_source_collapses_the_intermediate_node() {
    let mut tree = Tree::new();

    assert!(tree.update_backward(&instr(OpCode::Add, Op::reg(2, 4), vec![Op::reg(1, 4), Op::imm_int(1, 4)], 2, 2)));
    let pre_collapse_head = tree.head().unwrap();

    assert!(tree.update_backward(&instr(OpCode::Assign, Op::reg(1, 4), vec![Op::reg(9, 4)], 1, 1)));

    // R2's node is untouched, but its first source now resolves straight
    // to R9 rather than to a now-deleted R1 node.
    let r2_node = tree.head().unwrap();
    assert_eq!(r2_node, pre_collapse_head);
    let spliced_src = tree.node(r2_node).srcs[0];
    assert_eq!(tree.node(spliced_src).op, Op::reg(9, 4));
    assert!(tree.frontier().contains(&Op::reg(9, 4), tree.arena()));
    assert!(!tree.frontier().contains(&Op::reg(1, 4), tree.arena()));
}

/// Writing the whole of a register retires every frontier entry for its
/// sub-registers — they become full-overlap sources of the new write.
/// AL and AH are themselves disjoint byte ranges, so they only become
/// live sub-register entries by both being pulled in as sources of a
/// single earlier-chronology instruction.
#[test]
fn full_width_write_subsumes_every_live_sub_register() {
    let mut tree = Tree::new();

    assert!(tree.update_backward(&instr(
        OpCode::Add,
        Op::reg(9, 4),
        vec![Op::reg_at(0, 0, 1), Op::reg_at(0, 1, 1)],
        2,
        2
    )));

    assert!(tree.update_backward(&instr(OpCode::Assign, Op::reg(0, 4), vec![Op::reg(8, 4)], 1, 1)));

    let head = tree.head().unwrap();
    let srcs = tree.node(head).srcs.clone();
    assert_eq!(srcs.len(), 2, "both sub-registers become full-overlap sources");
    for src in srcs {
        assert_eq!(tree.node(src).operation, OpCode::FullOverlap);
    }
    assert!(!tree.frontier().contains(&Op::reg_at(0, 0, 1), tree.arena()));
    assert!(!tree.frontier().contains(&Op::reg_at(0, 1, 1), tree.arena()));
    assert!(tree.frontier().contains(&Op::reg(8, 4), tree.arena()));
}

/// Writing a sub-range of a live register splits it: the part outside the
/// write stays behind in the frontier as its own node. The consumed
/// (overwritten) range is never materialised, so the write's own sources
/// never make it into the frontier either.
#[test]
fn sub_register_write_splits_the_wider_live_entry() {
    let mut tree = Tree::new();
    // EAX becomes a live source of an unrelated head — a resolved
    // destination is never itself reinstated into the frontier, so this is
    // the only way a whole register stays a split candidate for a later
    // (chronologically earlier) narrower write.
    assert!(tree.update_backward(&instr(
        OpCode::Add,
        Op::reg(9, 4),
        vec![Op::reg(0, 4), Op::imm_int(0xdead_beefu32 as i64, 4)],
        2,
        2
    )));
    assert!(tree.frontier().contains(&Op::reg(0, 4), tree.arena()));

    assert!(tree.update_backward(&instr(
        OpCode::Assign,
        Op::reg_at(0, 0, 2),
        vec![Op::reg(5, 2)],
        1,
        1
    )));

    assert!(!tree.frontier().contains(&Op::reg(0, 4), tree.arena()));
    assert!(tree.frontier().contains(&Op::reg_at(0, 2, 2), tree.arena()));
    assert!(!tree.frontier().contains(&Op::reg(5, 2), tree.arena()));
}

/// A self-referencing instruction (`R0 = ADD(R0, 1)`) leaves its fresh
/// copy of R0 — not `head` itself — as the frontier's live R0 entry: an
/// even-earlier write to R0 must resolve that still-open copy, not
/// retroactively rewrite the already-resolved ADD expression.
#[test]
fn self_reference_frontier_entry_resolves_to_an_even_earlier_write() {
    let mut tree = Tree::new();
    assert!(tree.update_backward(&instr(
        OpCode::Add,
        Op::reg(0, 4),
        vec![Op::reg(0, 4), Op::imm_int(1, 4)],
        2,
        2
    )));
    let head = tree.head().unwrap();
    let fresh = tree.node(head).srcs[0];
    assert_ne!(fresh, head);

    assert!(tree.update_backward(&instr(OpCode::Assign, Op::reg(0, 4), vec![Op::reg(9, 4)], 1, 1)));

    assert_eq!(tree.head(), Some(head), "the target ADD expression is untouched");
    assert!(!tree.arena().is_live(fresh), "the self-reference copy collapses into R9");
    let spliced = tree.node(head).srcs[0];
    assert_eq!(tree.node(spliced).op, Op::reg(9, 4));
    assert_eq!(tree.node(head).operation, OpCode::Add, "head's own operation must remain ADD");
}

/// Forward taint: a destination is promoted into the frontier as soon as
/// any of its sources is already live, and stays promoted across a chain.
#[test]
fn forward_taint_promotes_destinations_transitively() {
    let mut tree = Tree::new();
    let seed = Op::mem_heap(0x1000, 4);

    // Seed the frontier by making `seed` a live source of an unrelated
    // head — a resolved destination is never reinstated into the frontier,
    // so an operand only stays frontier-resident by being read, not written.
    tree.update_backward(&instr(OpCode::Load, Op::reg(9, 4), vec![seed.clone()], 1, 1));
    assert!(tree.frontier().contains(&seed, tree.arena()));

    let first_use = instr(OpCode::Add, Op::reg(2, 4), vec![seed.clone(), Op::imm_int(1, 4)], 2, 2);
    assert!(tree.update_forward(&first_use));
    assert!(tree.frontier().contains(&Op::reg(2, 4), tree.arena()));

    let second_use = instr(OpCode::Store, Op::mem_heap(0x2000, 4), vec![Op::reg(2, 4)], 3, 3);
    assert!(tree.update_forward(&second_use));
    assert!(tree.frontier().contains(&Op::mem_heap(0x2000, 4), tree.arena()));
}

/// Forward taint: a destination with no tainted source is evicted if it
/// was previously (spuriously) present in the frontier.
#[test]
fn forward_taint_evicts_untainted_destinations() {
    let mut tree = Tree::new();
    // R4 becomes a live source of an unrelated head — the only way a
    // resolved register stays frontier-resident is by being read, not by
    // being a destination that forward can then observe as "still live".
    tree.update_backward(&instr(OpCode::Add, Op::reg(9, 4), vec![Op::reg(4, 4), Op::imm_int(7, 4)], 1, 1));
    assert!(tree.frontier().contains(&Op::reg(4, 4), tree.arena()));

    let unrelated = instr(OpCode::Add, Op::reg(4, 4), vec![Op::reg(5, 4), Op::reg(6, 4)], 2, 2);
    assert!(!tree.update_forward(&unrelated));
    assert!(!tree.frontier().contains(&Op::reg(4, 4), tree.arena()));
}

/// Conditional records are opaque bookkeeping the core just stores and
/// returns back in order; nothing interprets them.
#[test]
fn conditionals_round_trip_in_append_order() {
    let mut tree = Tree::new();
    tree.append_conditional(ConditionalRecord { cond_pc: 10, line: 1 });
    tree.append_conditional(ConditionalRecord { cond_pc: 20, line: 2 });

    assert_eq!(
        tree.conditionals(),
        &[
            ConditionalRecord { cond_pc: 10, line: 1 },
            ConditionalRecord { cond_pc: 20, line: 2 },
        ]
    );
}

/// Serialisation is declared but intentionally left unimplemented in the
/// core — both sides of the round trip must say so rather than silently
/// no-op.
#[test]
fn tree_serialisation_is_explicitly_unimplemented() {
    let tree = Tree::new();
    assert!(matches!(tree.serialize_tree(), Err(ExprDagError::Unimplemented(_))));
    assert!(matches!(
        Tree::construct_tree("anything"),
        Err(ExprDagError::Unimplemented(_))
    ));
}

#[derive(Default)]
struct CountingDiagnostics {
    full_overlaps: u32,
    partial_overlaps: u32,
    collapses: u32,
    out_of_slice: u32,
}

impl Diagnostics for CountingDiagnostics {
    fn full_overlap_found(&mut self, _dst: &Op, _frontier_entry: NodeId) {
        self.full_overlaps += 1;
    }
    fn partial_overlap_split(&mut self, _dst: &Op, _frontier_entry: NodeId, _parts: usize) {
        self.partial_overlaps += 1;
    }
    fn assign_collapsed(&mut self, _removed: NodeId, _replacement: NodeId) {
        self.collapses += 1;
    }
    fn instruction_out_of_slice(&mut self, _dst: &Op) {
        self.out_of_slice += 1;
    }
}

/// A non-default `Diagnostics` implementation observes exactly the events
/// the updater's control flow actually takes, without changing behaviour.
#[test]
fn custom_diagnostics_observe_updater_decisions_without_altering_them() {
    let mut tree = Tree::with_diagnostics(FrontierConfig::default(), CountingDiagnostics::default());

    // head := ADD(R1, Imm(1,4)) -- R1 becomes a live source a later
    // (chronologically earlier) ASSIGN can collapse into.
    tree.update_backward(&instr(OpCode::Add, Op::reg(0, 4), vec![Op::reg(1, 4), Op::imm_int(1, 4)], 1, 1));
    tree.update_backward(&instr(OpCode::Assign, Op::reg(1, 4), vec![Op::reg(9, 4)], 2, 2));
    assert!(!tree.update_backward(&instr(OpCode::Add, Op::reg(50, 4), vec![Op::reg(51, 4), Op::reg(52, 4)], 3, 3)));

    assert_eq!(tree.diagnostics().collapses, 1);
    assert_eq!(tree.diagnostics().out_of_slice, 1);
}
