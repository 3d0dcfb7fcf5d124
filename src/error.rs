//! Crate error type.
//!
//! A `thiserror` enum plus a crate-local `Result` alias. Only
//! programmer-error and unimplemented
//! conditions produce an `ExprDagError` — the dominant "not in slice"
//! path is a plain `bool` return with no error at all.

use thiserror::Error;

use crate::operand::Op;

/// Failure modes of the expression-DAG core.
#[derive(Error, Debug)]
pub enum ExprDagError {
    /// Attempted to insert or remove an immediate through the frontier's
    /// API. Immediates are never memoizable — this is a broken
    /// invariant in the caller, not a runtime condition.
    #[error("immediate operand {0:?} cannot be memoized in the frontier")]
    ImmediateInFrontier(Op),

    /// A bucket exceeded its configured capacity.
    #[error("frontier bucket {hash} exceeded capacity {capacity}")]
    BucketOverflow { hash: u32, capacity: usize },

    /// `remove` was asked to evict an operand that isn't present.
    #[error("operand {0:?} is not present in the frontier")]
    NotPresent(Op),

    /// `serialize_tree` / `construct_tree` — declared but
    /// deliberately unimplemented in the core.
    #[error("{0} is unimplemented in the core")]
    Unimplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, ExprDagError>;
