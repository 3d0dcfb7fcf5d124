//! Diagnostic emission hooks for observing updater decisions.
//!
//! The core must be testable without any print surface, so diagnostics are
//! a trait with a no-op default rather than a hardwired `println!`. The
//! updater also emits `tracing` spans/events at `trace` level alongside
//! calling this trait — both are inert unless something (a subscriber, or
//! a non-default `Diagnostics` impl) is listening.

use crate::node::NodeId;
use crate::operand::Op;

/// Observer hook for the updater's internal decisions. All methods default
/// to doing nothing, so `Tree<NoopDiagnostics>` (the default) costs
/// nothing beyond the `tracing` calls already gated at `trace` level.
pub trait Diagnostics {
    fn full_overlap_found(&mut self, _dst: &Op, _frontier_entry: NodeId) {}
    fn partial_overlap_split(&mut self, _dst: &Op, _frontier_entry: NodeId, _parts: usize) {}
    fn assign_collapsed(&mut self, _removed: NodeId, _replacement: NodeId) {}
    fn instruction_out_of_slice(&mut self, _dst: &Op) {}
}

/// The default, no-op [`Diagnostics`] implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {}
