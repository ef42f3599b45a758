//! The algorithm trait and per-node lifecycle bookkeeping.
//!
//! An [`Algorithm`] is anything that can sit in a chain: a capture driver
//! shim, a filter, a monitor. The chain owns one [`NodeSlot`] per algorithm
//! holding its lifecycle state and the readiness counters that connect the
//! bookkeeping tier to the processing and control tiers.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --init--> Initialized --configure--> Configured --build ok--> Running
//! ```
//!
//! `init` acquires resources (pool blocks, coefficient tables) and must
//! leave the node ready for `configure`. `configure` derives runtime state
//! from parameters and must be idempotent: the chain re-runs it after every
//! parameter change. `deinit` releases everything `init` acquired; a node
//! must detach internal references before the backing memory is dropped.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, string::String, vec::Vec};

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::capability::Capabilities;
use crate::chunk::Chunk;
use crate::consistency::ConsistencyReport;
use crate::error::EngineError;
use crate::format::AudioFormat;
use crate::platform::Platform;
use crate::pool::MemoryPools;

/// Opaque handle to a node within its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Opaque handle to a chunk within its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId(pub(crate) u32);

impl ChunkId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Where a node stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No resources held.
    Uninitialized,
    /// Resources acquired, parameters not yet applied.
    Initialized,
    /// Parameters applied, not yet scheduled.
    Configured,
    /// Scheduled by the chain tiers.
    Running,
}

/// Readiness increments an algorithm hands back to the scheduler.
///
/// The bookkeeping tier arms the processing tier and the processing tier
/// arms the control tier; these are the only places readiness is ever
/// incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// Units of processing work now ready.
    pub process: u32,
    /// Units of control work now ready.
    pub control: u32,
}

impl Readiness {
    /// Nothing became ready.
    pub const fn none() -> Self {
        Self { process: 0, control: 0 }
    }

    /// One unit of processing work became ready.
    pub const fn process() -> Self {
        Self { process: 1, control: 0 }
    }

    /// One unit of control work became ready.
    pub const fn control() -> Self {
        Self { process: 0, control: 1 }
    }
}

/// Everything a node sees at `init` time.
pub struct NodeContext<'a> {
    /// Pools to draw working memory from.
    pub pools: &'a MemoryPools,
    /// Formats of the chunks bound to this node's inputs, in port order.
    pub inputs: &'a [AudioFormat],
    /// Formats of the chunks bound to this node's outputs, in port order.
    pub outputs: &'a [AudioFormat],
    /// Host services.
    pub platform: &'a dyn Platform,
}

/// The chunks bound to a node, handed to the run-time hooks.
///
/// Inputs are shared, outputs exclusive; a chunk bound as both input and
/// output of the same node is rejected at build time.
pub struct NodeIo<'a, 'c> {
    /// Input chunks, in port order.
    pub inputs: &'a [&'c Chunk],
    /// Output chunks, in port order.
    pub outputs: &'a mut [&'c mut Chunk],
    /// Host services.
    pub platform: &'a dyn Platform,
}

/// Formats bound to a node, for pre-init consistency hooks.
pub struct IoFormats<'a> {
    /// Input formats, in port order.
    pub inputs: &'a [AudioFormat],
    /// Output formats, in port order.
    pub outputs: &'a [AudioFormat],
}

/// A processing element of a chain.
///
/// All hooks run on the thread driving the owning tier; implementations
/// never need interior locking beyond what the platform's control section
/// provides.
pub trait Algorithm: Send {
    /// The node's published contract. Checked before `init`.
    fn capabilities(&self) -> &'static Capabilities;

    /// Algorithm-specific checks beyond the declarative sets.
    ///
    /// Hard failures return an error and abort the build; tolerable
    /// findings go into the report.
    fn check_consistency(&self, io: &IoFormats<'_>) -> Result<ConsistencyReport, EngineError> {
        let _ = io;
        Ok(ConsistencyReport::new())
    }

    /// Acquires resources. Runs once per build, in schedule order.
    fn init(&mut self, cx: &mut NodeContext<'_>) -> Result<(), EngineError>;

    /// Applies parameters to runtime state. Must be idempotent.
    fn configure(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Updates a named parameter. The chain calls [`Algorithm::configure`]
    /// afterwards.
    fn set_param(&mut self, key: &str, value: f32) -> Result<(), EngineError> {
        let _ = value;
        Err(EngineError::UnknownParam(String::from(key)))
    }

    /// Bookkeeping tier: move cursors, decide whether a processing unit is
    /// ready. Must be cheap; runs at interrupt cadence.
    fn data_in_out(&mut self, io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError>;

    /// Processing tier: consume exactly one readiness unit of signal work.
    fn process(&mut self, io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
        let _ = io;
        Ok(Readiness::none())
    }

    /// Control tier: consume exactly one readiness unit of background work.
    fn control(&mut self, platform: &dyn Platform) -> Result<(), EngineError> {
        let _ = platform;
        Ok(())
    }

    /// Disabled nodes stay in the schedule but are skipped by every tier.
    fn is_disabled(&self) -> bool {
        false
    }

    /// Releases everything `init` acquired. Must be safe to call in any
    /// state and must detach internal references before dropping storage.
    fn deinit(&mut self);
}

/// Chain-side bookkeeping for one node.
pub(crate) struct NodeSlot {
    pub(crate) name: String,
    pub(crate) algo: Box<dyn Algorithm>,
    pub(crate) state: LifecycleState,
    pub(crate) inputs: Vec<ChunkId>,
    pub(crate) outputs: Vec<ChunkId>,
    pub(crate) process_ready: AtomicU32,
    pub(crate) control_ready: AtomicU32,
}

impl NodeSlot {
    pub(crate) fn new(
        name: String,
        algo: Box<dyn Algorithm>,
        inputs: Vec<ChunkId>,
        outputs: Vec<ChunkId>,
    ) -> Self {
        Self {
            name,
            algo,
            state: LifecycleState::Uninitialized,
            inputs,
            outputs,
            process_ready: AtomicU32::new(0),
            control_ready: AtomicU32::new(0),
        }
    }

    /// Applies readiness increments from a tier hook.
    pub(crate) fn arm(&self, readiness: Readiness) {
        if readiness.process > 0 {
            self.process_ready.fetch_add(readiness.process, Ordering::AcqRel);
        }
        if readiness.control > 0 {
            self.control_ready.fetch_add(readiness.control, Ordering::AcqRel);
        }
    }

    /// Consumes one unit from `counter` if any is pending. The counter can
    /// never go below zero: a zero counter stays zero.
    pub(crate) fn take_one(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    pub(crate) fn reset_readiness(&self) {
        self.process_ready.store(0, Ordering::Release);
        self.control_ready.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_counters_never_underflow() {
        let counter = AtomicU32::new(2);
        assert!(NodeSlot::take_one(&counter));
        assert!(NodeSlot::take_one(&counter));
        assert!(!NodeSlot::take_one(&counter));
        assert_eq!(counter.load(Ordering::Acquire), 0);
    }

    #[test]
    fn arm_accumulates_both_tiers() {
        let slot = NodeSlot::new(String::from("x"), Box::new(Nop), Vec::new(), Vec::new());
        slot.arm(Readiness::process());
        slot.arm(Readiness::process());
        slot.arm(Readiness { process: 0, control: 3 });
        assert_eq!(slot.process_ready.load(Ordering::Acquire), 2);
        assert_eq!(slot.control_ready.load(Ordering::Acquire), 3);
        slot.reset_readiness();
        assert_eq!(slot.process_ready.load(Ordering::Acquire), 0);
    }

    struct Nop;

    impl Algorithm for Nop {
        fn capabilities(&self) -> &'static Capabilities {
            static CAPS: Capabilities = Capabilities {
                name: "nop",
                inputs: crate::capability::PortRequirements::none(),
                outputs: crate::capability::PortRequirements::none(),
                consistency: crate::capability::ChunkConsistency::NONE,
            };
            &CAPS
        }

        fn init(&mut self, _cx: &mut NodeContext<'_>) -> Result<(), EngineError> {
            Ok(())
        }

        fn data_in_out(&mut self, _io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
            Ok(Readiness::none())
        }

        fn deinit(&mut self) {}
    }
}
