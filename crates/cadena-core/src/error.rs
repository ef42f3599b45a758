//! Error taxonomy for the pipeline engine.
//!
//! Construction and lifecycle errors are fatal to the operation that raised
//! them; the chain rolls back partially-applied work before returning.
//! Consistency findings that are tolerable come back separately as warnings
//! (see [`crate::consistency::ConsistencyReport`]), never as errors.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use thiserror::Error;

use crate::node::LifecycleState;
use crate::pool::PoolKind;

/// All failure modes surfaced by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A node was asked to run without the configuration it needs.
    #[error("required configuration is missing")]
    ConfigMissing,

    /// A memory pool could not satisfy an allocation request.
    #[error("allocation of {requested} bytes from pool {pool:?} failed")]
    AllocationFailed {
        /// Pool the request was made against.
        pool: PoolKind,
        /// Bytes requested.
        requested: usize,
    },

    /// Node initialization failed; the chain has rolled back.
    #[error("node init failed: {0}")]
    InitFailed(&'static str),

    /// A hard capability or consistency rule was violated at build time.
    #[error("consistency violation: {0}")]
    ConsistencyViolation(String),

    /// The format is rejected by the component it was handed to.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(&'static str),

    /// A tier overran its cycle budget.
    #[error("{tier} tier ran {cycles} cycles, budget is {budget}")]
    HardwareTimeout {
        /// Tier that overran.
        tier: &'static str,
        /// Cycles measured for the offending run.
        cycles: u32,
        /// Configured budget.
        budget: u32,
    },

    /// The operation is not legal in the node's current lifecycle state.
    #[error("operation invalid in state {0:?}")]
    InvalidState(LifecycleState),

    /// A parameter key was not recognized by the target node.
    #[error("unknown parameter {0:?}")]
    UnknownParam(String),

    /// A pool still had live blocks at teardown.
    #[error("pool {pool:?} leaked {bytes} bytes in {blocks} block(s)")]
    LeakDetected {
        /// Pool with outstanding blocks.
        pool: PoolKind,
        /// Bytes still checked out.
        bytes: usize,
        /// Number of outstanding blocks.
        blocks: usize,
    },

    /// The connection graph contains a cycle.
    #[error("connection graph contains a cycle")]
    CycleDetected,

    /// A chunk or node id does not refer to anything in this chain.
    #[error("unknown id {0}")]
    UnknownId(u32),
}
