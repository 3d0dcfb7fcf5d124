//! Frontier index.
//!
//! A fixed-capacity table of buckets keyed by an operand-derived hash,
//! plus a secondary set of buckets currently holding at least one memory
//! operand so [`Frontier::iter_mem`] can walk live memory operands without
//! scanning the (much larger) register region.

use crate::config::FrontierConfig;
use crate::error::{ExprDagError, Result};
use crate::node::{Arena, NodeId};
use crate::operand::{Op, OpKind};

/// Maps an operand to its bucket index, or `None` if the operand is an
/// immediate and therefore not memoizable.
///
/// Registers and memory operands partition the hash range disjointly —
/// `index < mem_offset` for registers, `>= mem_offset` for memory — so a
/// bucket's occupants are always of a single kind and the kind need not be
/// rechecked on lookup.
pub fn hash(op: &Op, config: &FrontierConfig) -> Option<u32> {
    match op.kind {
        OpKind::Reg { index, .. } => {
            debug_assert!(
                (index as u32) < config.mem_offset,
                "register index {} must stay below mem_offset {}",
                index,
                config.mem_offset
            );
            Some(index as u32)
        }
        OpKind::MemStack { offset, .. } => Some(mem_hash(offset as i128, config)),
        OpKind::MemHeap { addr, .. } => Some(mem_hash(addr as i128, config)),
        OpKind::ImmInt { .. } | OpKind::ImmFloat { .. } => None,
    }
}

fn mem_hash(value: i128, config: &FrontierConfig) -> u32 {
    let region = config.mem_region() as i128;
    let offset = value.rem_euclid(region);
    config.mem_offset + offset as u32
}

/// The live frontier: operand nodes eligible to become sources of a future
/// definition (backward) or destinations of a future use (forward).
#[derive(Debug)]
pub struct Frontier {
    config: FrontierConfig,
    buckets: Vec<Vec<NodeId>>,
    /// Hashes whose bucket currently holds at least one memory-typed node,
    /// in the order they first became non-empty.
    mem_buckets: Vec<u32>,
}

impl Frontier {
    pub fn new(config: FrontierConfig) -> Self {
        let buckets = vec![Vec::new(); config.max_frontiers as usize];
        Self {
            config,
            buckets,
            mem_buckets: Vec::new(),
        }
    }

    pub fn config(&self) -> &FrontierConfig {
        &self.config
    }

    /// O(bucket size) linear scan for an exact `(value, width)` match in
    /// `op`'s bucket.
    pub fn search(&self, op: &Op, arena: &Arena) -> Option<NodeId> {
        let h = hash(op, &self.config)?;
        self.buckets[h as usize]
            .iter()
            .copied()
            .find(|&id| arena.get(id).op == *op)
    }

    /// Appends `node` to `op`'s bucket. Forbidden for immediates (programmer
    /// error).
    pub fn insert(&mut self, op: &Op, node: NodeId, arena: &Arena) -> Result<()> {
        debug_assert!(!op.is_immediate());
        let h = hash(op, &self.config).ok_or_else(|| ExprDagError::ImmediateInFrontier(op.clone()))?;
        let bucket = &mut self.buckets[h as usize];
        debug_assert!(bucket.len() < self.config.size_per_frontier);
        if bucket.len() >= self.config.size_per_frontier {
            return Err(ExprDagError::BucketOverflow {
                hash: h,
                capacity: self.config.size_per_frontier,
            });
        }
        let was_empty = bucket.is_empty();
        bucket.push(node);
        if was_empty && arena.get(node).op.is_memory() && !self.mem_buckets.contains(&h) {
            self.mem_buckets.push(h);
        }
        Ok(())
    }

    /// Locates and erases `op`'s entry, preserving bucket order.
    pub fn remove(&mut self, op: &Op, arena: &Arena) -> Result<()> {
        debug_assert!(!op.is_immediate());
        let h = hash(op, &self.config).ok_or_else(|| ExprDagError::ImmediateInFrontier(op.clone()))?;
        let bucket = &mut self.buckets[h as usize];
        let pos = bucket
            .iter()
            .position(|&id| arena.get(id).op == *op)
            .ok_or_else(|| ExprDagError::NotPresent(op.clone()))?;
        bucket.remove(pos);
        if bucket.is_empty() && op.is_memory() {
            self.mem_buckets.retain(|&mh| mh != h);
        }
        Ok(())
    }

    /// `true` if `op` currently has a matching entry in the frontier.
    pub fn contains(&self, op: &Op, arena: &Arena) -> bool {
        self.search(op, arena).is_some()
    }

    pub fn bucket(&self, h: u32) -> &[NodeId] {
        &self.buckets[h as usize]
    }

    /// Every node in a bucket currently flagged as containing at least one
    /// memory operand.
    pub fn iter_mem(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.mem_buckets
            .iter()
            .flat_map(move |&h| self.buckets[h as usize].iter().copied())
    }

    pub fn mem_bucket_hashes(&self) -> &[u32] {
        &self.mem_buckets
    }
}
