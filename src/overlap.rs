//! Overlap engine.
//!
//! Pure functions computing the full-overlap and partial-overlap sets for
//! a query operand against the frontier, and the sub-operand splits a
//! partial overlap produces. Nothing here mutates the frontier or the
//! arena — callers (the updater, `tree.rs`) own every side effect.

use crate::frontier::Frontier;
use crate::node::{Arena, NodeId};
use crate::operand::{Op, OpKind};

/// The outcome of splitting a frontier entry `f` against a query `q`.
///
/// `consumed` is the region's leftmost remainder: the part that is about
/// to be rewritten by the caller's destination and is never itself turned
/// into a node (it is about to be overwritten, not read). `parts`
/// holds the rest, in left-to-right order; for a left/right straddle
/// that's a single remainder, for a strictly-contains split it's the
/// query-sized middle part followed by the right remainder.
#[derive(Debug, Clone)]
pub struct PartialSplit {
    pub consumed: Op,
    pub parts: Vec<Op>,
}

fn exact_kind_match(a: &Op, b: &Op) -> bool {
    matches!(
        (&a.kind, &b.kind),
        (OpKind::Reg { .. }, OpKind::Reg { .. })
            | (OpKind::MemStack { .. }, OpKind::MemStack { .. })
            | (OpKind::MemHeap { .. }, OpKind::MemHeap { .. })
    )
}

fn candidates(q: &Op, frontier: &Frontier) -> Vec<NodeId> {
    if q.is_register() {
        let h = crate::frontier::hash(q, frontier.config()).expect("register is hashable");
        frontier.bucket(h).to_vec()
    } else {
        frontier.iter_mem().collect()
    }
}

/// Frontier entries strictly contained in `q`.
pub fn full_overlap_nodes(q: &Op, frontier: &Frontier, arena: &Arena) -> Vec<NodeId> {
    candidates(q, frontier)
        .into_iter()
        .filter(|&id| {
            let f = &arena.get(id).op;
            if q.is_register() && !exact_kind_match(q, f) {
                return false;
            }
            if q.is_memory() && !f.is_memory() {
                return false;
            }
            let (fv, fw, qv, qw) = (f.start(), f.end(), q.start(), q.end());
            fv >= qv && fw <= qw && !(fv == qv && fw == qw)
        })
        .collect()
}

/// Splits a single frontier entry `f` against `q`, if they partially
/// overlap under one of three geometric cases: left-straddle, right-straddle,
/// or strict containment.
fn split_one(f: &Op, q: &Op) -> Option<PartialSplit> {
    let (fv, fw_end) = (f.start(), f.end());
    let (qv, qw_end) = (q.start(), q.end());
    let width = f.width();

    // Left-straddle: f.v < q.v and f.v + f.w in (q.v, q.v + q.w].
    if fv < qv && fw_end > qv && fw_end <= qw_end {
        let consumed = f.sub_range(fv, (qv - fv) as u8);
        let kept = f.sub_range(qv, (fw_end - qv) as u8);
        return Some(PartialSplit {
            consumed,
            parts: vec![kept],
        });
    }

    // Right-straddle: f.v in [q.v, q.v + q.w) and f.v + f.w > q.v + q.w.
    if fv >= qv && fv < qw_end && fw_end > qw_end {
        let consumed = f.sub_range(fv, (qw_end - fv) as u8);
        let kept = f.sub_range(qw_end, (fw_end - qw_end) as u8);
        return Some(PartialSplit {
            consumed,
            parts: vec![kept],
        });
    }

    // Strictly-contains: f strictly contains q on both sides.
    if fv < qv && fw_end > qw_end {
        let consumed = f.sub_range(fv, (qv - fv) as u8);
        let middle = q.clone();
        let right = f.sub_range(qw_end, (fw_end - qw_end) as u8);
        let _ = width;
        return Some(PartialSplit {
            consumed,
            parts: vec![middle, right],
        });
    }

    None
}

/// Every frontier entry that partially overlaps `q`, paired with its split.
pub fn partial_overlap_splits(q: &Op, frontier: &Frontier, arena: &Arena) -> Vec<(NodeId, PartialSplit)> {
    candidates(q, frontier)
        .into_iter()
        .filter_map(|id| {
            let f = &arena.get(id).op;
            if !exact_kind_match(q, f) {
                return None;
            }
            split_one(f, q).map(|split| (id, split))
        })
        .collect()
}
