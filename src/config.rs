//! Frontier tunables.
//!
//! A plain, construction-time struct of knobs rather than a global
//! `static`. The ratios matter more than the absolute values —
//! `mem_offset` just needs to exceed the widest register index plus
//! sub-register granularity.

/// Tunables for a [`crate::frontier::Frontier`]/[`crate::tree::Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierConfig {
    /// Total number of hash buckets (`MAX_FRONTIERS`).
    pub max_frontiers: u32,
    /// Per-bucket capacity before a programmer-error overflow (`SIZE_PER_FRONTIER`).
    pub size_per_frontier: usize,
    /// First bucket index reserved for memory operands (`MEM_OFFSET`);
    /// register indices must stay below this.
    pub mem_offset: u32,
}

impl FrontierConfig {
    /// Number of buckets available to memory operands.
    pub fn mem_region(&self) -> u32 {
        self.max_frontiers - self.mem_offset
    }
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            max_frontiers: 1000,
            size_per_frontier: 100,
            mem_offset: 200,
        }
    }
}
