//! The chain: chunk/node registry, build-time validation, and the
//! two-phase scheduler.
//!
//! # Construction
//!
//! Chunks and nodes are registered while the chain is cold, then [`build`]
//! validates every binding against the published capabilities, orders the
//! nodes producer-before-consumer, and walks the lifecycle of each node.
//! `build` is transactional: if any node fails to initialize, every node
//! initialized so far is deinitialized in reverse order and the chain is
//! left cold with no memory held.
//!
//! # Scheduling
//!
//! Three tiers, called by the integrator from decreasing priority levels:
//!
//! - [`data_in_out`] at interrupt cadence: cursor bookkeeping only. Each
//!   node decides whether a unit of signal work became ready and the chain
//!   arms its processing counter.
//! - [`process`] from the processing context: drains every armed unit, one
//!   hook call per unit, in schedule order. If processing is starved for a
//!   few periods the counters accumulate and the next call catches up.
//! - [`control`] from the background context: drains control units armed by
//!   the processing tier.
//!
//! Readiness counters are the only cross-tier state; they are atomic and
//! never go below zero.
//!
//! [`build`]: AudioChain::build
//! [`data_in_out`]: AudioChain::data_in_out
//! [`process`]: AudioChain::process
//! [`control`]: AudioChain::control

#[cfg(not(feature = "std"))]
use alloc::{
    boxed::Box, collections::VecDeque, format, string::String, vec, vec::Vec,
};
#[cfg(feature = "std")]
use std::collections::VecDeque;

use crate::chunk::Chunk;
use crate::consistency::{self, ConsistencyReport, ConsistencyWarning};
use crate::cycles::CycleStats;
use crate::error::EngineError;
use crate::format::AudioFormat;
use crate::node::{
    Algorithm, ChunkId, IoFormats, LifecycleState, NodeContext, NodeId, NodeIo, NodeSlot,
};
use crate::platform::Platform;
use crate::pool::{MemoryPools, PoolKind};

/// A complete audio pipeline: chunks, nodes, schedule, and tier state.
pub struct AudioChain {
    pools: MemoryPools,
    platform: Box<dyn Platform>,
    chunks: Vec<Chunk>,
    nodes: Vec<NodeSlot>,
    order: Vec<usize>,
    chunk_consumers: Vec<u32>,
    consumers_left: Vec<u32>,
    built: bool,
    periods: u64,
    report: ConsistencyReport,
    data_stats: CycleStats,
    process_stats: CycleStats,
    control_stats: CycleStats,
}

/// Splits the chunk store into the shared inputs and exclusive outputs of
/// one node, in port order. Relies on build-time validation that a node
/// never binds the same chunk on both sides.
fn split_io<'c>(
    chunks: &'c mut [Chunk],
    inputs: &[ChunkId],
    outputs: &[ChunkId],
) -> (Vec<&'c Chunk>, Vec<&'c mut Chunk>) {
    let mut ins: Vec<(usize, &'c Chunk)> = Vec::with_capacity(inputs.len());
    let mut outs: Vec<(usize, &'c mut Chunk)> = Vec::with_capacity(outputs.len());
    for (i, chunk) in chunks.iter_mut().enumerate() {
        if let Some(port) = outputs.iter().position(|id| id.index() == i) {
            outs.push((port, chunk));
        } else if let Some(port) = inputs.iter().position(|id| id.index() == i) {
            ins.push((port, &*chunk));
        }
    }
    ins.sort_unstable_by_key(|&(port, _)| port);
    outs.sort_unstable_by_key(|&(port, _)| port);
    (ins.into_iter().map(|(_, c)| c).collect(), outs.into_iter().map(|(_, c)| c).collect())
}

impl AudioChain {
    /// A cold chain drawing from `pools` and running on `platform`.
    pub fn new(pools: MemoryPools, platform: Box<dyn Platform>) -> Self {
        Self {
            pools,
            platform,
            chunks: Vec::new(),
            nodes: Vec::new(),
            order: Vec::new(),
            chunk_consumers: Vec::new(),
            consumers_left: Vec::new(),
            built: false,
            periods: 0,
            report: ConsistencyReport::new(),
            data_stats: CycleStats::new("data_in_out"),
            process_stats: CycleStats::new("process"),
            control_stats: CycleStats::new("control"),
        }
    }

    /// Registers a chunk and allocates its storage from `pool`.
    ///
    /// # Errors
    ///
    /// Fails on an exhausted pool, or with [`EngineError::InvalidState`]
    /// once the chain is built.
    pub fn add_chunk(
        &mut self,
        name: &str,
        format: AudioFormat,
        nb_frames: u8,
        pool: PoolKind,
    ) -> Result<ChunkId, EngineError> {
        if self.built {
            return Err(EngineError::InvalidState(LifecycleState::Running));
        }
        let chunk = Chunk::new(name, format, nb_frames, &self.pools, pool)?;
        let id = ChunkId(self.chunks.len() as u32);
        self.chunks.push(chunk);
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_add_chunk: {id} {name:?}");
        Ok(id)
    }

    /// Registers a node with its chunk bindings, in port order.
    ///
    /// # Errors
    ///
    /// Rejects unknown chunk ids, a chunk bound on both sides of the same
    /// node, and registration after build.
    pub fn add_node(
        &mut self,
        name: &str,
        algo: Box<dyn Algorithm>,
        inputs: &[ChunkId],
        outputs: &[ChunkId],
    ) -> Result<NodeId, EngineError> {
        if self.built {
            return Err(EngineError::InvalidState(LifecycleState::Running));
        }
        for id in inputs.iter().chain(outputs) {
            if id.index() >= self.chunks.len() {
                return Err(EngineError::UnknownId(id.0));
            }
        }
        for id in inputs {
            if outputs.contains(id) {
                return Err(EngineError::ConsistencyViolation(format!(
                    "{name}: chunk {id} bound as both input and output",
                )));
            }
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeSlot::new(String::from(name), algo, inputs.to_vec(), outputs.to_vec()));
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_add_node: {id} {name:?}");
        Ok(id)
    }

    fn formats_of(&self, ids: &[ChunkId]) -> Vec<AudioFormat> {
        ids.iter().map(|id| *self.chunks[id.index()].format()).collect()
    }

    /// Single producer per chunk; returns `producer[chunk] = node index`.
    fn map_producers(&self) -> Result<Vec<Option<usize>>, EngineError> {
        let mut producer: Vec<Option<usize>> = vec![None; self.chunks.len()];
        for (n, slot) in self.nodes.iter().enumerate() {
            for id in &slot.outputs {
                if let Some(first) = producer[id.index()] {
                    return Err(EngineError::ConsistencyViolation(format!(
                        "chunk {} has two producers: {} and {}",
                        self.chunks[id.index()].name(),
                        self.nodes[first].name,
                        slot.name,
                    )));
                }
                producer[id.index()] = Some(n);
            }
        }
        Ok(producer)
    }

    /// Kahn's algorithm over producer-to-consumer edges.
    fn topo_order(&self, producer: &[Option<usize>]) -> Result<Vec<usize>, EngineError> {
        let n = self.nodes.len();
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut indegree = vec![0usize; n];
        for (consumer, slot) in self.nodes.iter().enumerate() {
            for id in &slot.inputs {
                if let Some(p) = producer[id.index()] {
                    successors[p].push(consumer);
                    indegree[consumer] += 1;
                }
            }
        }
        let mut queue: VecDeque<usize> =
            (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(next) = queue.pop_front() {
            order.push(next);
            for &s in &successors[next] {
                indegree[s] -= 1;
                if indegree[s] == 0 {
                    queue.push_back(s);
                }
            }
        }
        if order.len() != n {
            return Err(EngineError::CycleDetected);
        }
        Ok(order)
    }

    /// Validates every binding, orders the schedule, and brings every node
    /// to `Running`. Warnings collected from the node hooks are forwarded
    /// through [`Platform::warning`] and retained for later inspection.
    ///
    /// # Errors
    ///
    /// On any failure the chain rolls back to cold: nodes initialized so
    /// far are deinitialized in reverse order and no pool memory stays
    /// checked out by any node.
    pub fn build(&mut self) -> Result<&[ConsistencyWarning], EngineError> {
        if self.built {
            return Err(EngineError::InvalidState(LifecycleState::Running));
        }
        let mut report = ConsistencyReport::new();
        for slot in &self.nodes {
            let in_fmts = self.formats_of(&slot.inputs);
            let out_fmts = self.formats_of(&slot.outputs);
            let in_refs: Vec<&AudioFormat> = in_fmts.iter().collect();
            let out_refs: Vec<&AudioFormat> = out_fmts.iter().collect();
            consistency::check_node(&slot.name, slot.algo.capabilities(), &in_refs, &out_refs)?;
            report.merge(
                slot.algo
                    .check_consistency(&IoFormats { inputs: &in_fmts, outputs: &out_fmts })?,
            );
        }
        let producer = self.map_producers()?;
        let order = self.topo_order(&producer)?;
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_build: {} nodes in schedule order", order.len());

        for (done, &idx) in order.iter().enumerate() {
            let in_fmts = self.formats_of(&self.nodes[idx].inputs);
            let out_fmts = self.formats_of(&self.nodes[idx].outputs);
            let slot = &mut self.nodes[idx];
            let mut cx = NodeContext {
                pools: &self.pools,
                inputs: &in_fmts,
                outputs: &out_fmts,
                platform: &*self.platform,
            };
            let mut stepped = slot.algo.init(&mut cx);
            if stepped.is_ok() {
                slot.state = LifecycleState::Initialized;
                stepped = slot.algo.configure();
            }
            match stepped {
                Ok(()) => slot.state = LifecycleState::Configured,
                Err(e) => {
                    // roll back this node and everything before it
                    slot.algo.deinit();
                    slot.state = LifecycleState::Uninitialized;
                    for &prev in order[..done].iter().rev() {
                        let slot = &mut self.nodes[prev];
                        slot.algo.deinit();
                        slot.state = LifecycleState::Uninitialized;
                    }
                    return Err(e);
                }
            }
        }
        for slot in &mut self.nodes {
            slot.state = LifecycleState::Running;
            slot.reset_readiness();
        }
        let mut consumers = vec![0u32; self.chunks.len()];
        for slot in &self.nodes {
            for id in &slot.inputs {
                consumers[id.index()] += 1;
            }
        }
        self.consumers_left = vec![0; self.chunks.len()];
        self.chunk_consumers = consumers;
        for warning in report.warnings() {
            self.platform.warning(&format!("{warning}"));
        }
        self.order = order;
        self.report = report;
        self.built = true;
        self.periods = 0;
        Ok(self.report.warnings())
    }

    /// Bookkeeping tier. Call once per interrupt period.
    ///
    /// Advances the frame cursors of every chunk exchanged inside the
    /// graph: one frame marked written after its producer ran, one frame
    /// marked read once its last consumer ran. Chunks fed or drained by
    /// the integrator keep their cursors under the integrator's control.
    ///
    /// # Errors
    ///
    /// A node failure or a frame-cursor overrun is routed to
    /// [`Platform::on_fatal_error`] and then returned; the remaining nodes
    /// of this period are skipped.
    pub fn data_in_out(&mut self) -> Result<(), EngineError> {
        if !self.built {
            return Err(EngineError::InvalidState(LifecycleState::Uninitialized));
        }
        let platform = &*self.platform;
        self.data_stats.begin(platform);
        self.consumers_left.copy_from_slice(&self.chunk_consumers);
        for &idx in &self.order {
            let slot = &mut self.nodes[idx];
            let enabled = slot.state == LifecycleState::Running && !slot.algo.is_disabled();
            if enabled {
                let (ins, mut outs) = split_io(&mut self.chunks, &slot.inputs, &slot.outputs);
                let mut io = NodeIo { inputs: &ins, outputs: &mut outs, platform };
                match slot.algo.data_in_out(&mut io) {
                    Ok(readiness) => slot.arm(readiness),
                    Err(e) => {
                        platform.on_fatal_error(&format!("{}: {e}", slot.name));
                        return Err(e);
                    }
                }
            }
            let slot = &self.nodes[idx];
            if enabled {
                for id in &slot.outputs {
                    if self.chunk_consumers[id.index()] == 0 {
                        continue;
                    }
                    if let Err(e) = self.chunks[id.index()].advance_write() {
                        platform.on_fatal_error(&format!("{}: {e}", slot.name));
                        return Err(e);
                    }
                }
            }
            // a disabled consumer still counts down so the rotation keeps
            // moving past it
            for id in &slot.inputs {
                let left = &mut self.consumers_left[id.index()];
                *left -= 1;
                if *left > 0 || self.chunks[id.index()].frames_ready() == 0 {
                    continue;
                }
                if let Err(e) = self.chunks[id.index()].advance_read() {
                    platform.on_fatal_error(&format!("{}: {e}", slot.name));
                    return Err(e);
                }
            }
        }
        self.periods += 1;
        if let Err(e) = self.data_stats.end(platform) {
            platform.on_fatal_error(&format!("{e}"));
            return Err(e);
        }
        Ok(())
    }

    /// Processing tier: drains every armed unit in schedule order.
    ///
    /// Returns the number of units drained.
    ///
    /// # Errors
    ///
    /// As for [`AudioChain::data_in_out`]; the consumed readiness unit is
    /// not restored.
    pub fn process(&mut self) -> Result<u32, EngineError> {
        if !self.built {
            return Err(EngineError::InvalidState(LifecycleState::Uninitialized));
        }
        let platform = &*self.platform;
        self.process_stats.begin(platform);
        let mut drained = 0;
        for &idx in &self.order {
            loop {
                let slot = &self.nodes[idx];
                if slot.state != LifecycleState::Running || slot.algo.is_disabled() {
                    break;
                }
                if !NodeSlot::take_one(&slot.process_ready) {
                    break;
                }
                let slot = &mut self.nodes[idx];
                let (ins, mut outs) = split_io(&mut self.chunks, &slot.inputs, &slot.outputs);
                let mut io = NodeIo { inputs: &ins, outputs: &mut outs, platform };
                match slot.algo.process(&mut io) {
                    Ok(readiness) => slot.arm(readiness),
                    Err(e) => {
                        platform.on_fatal_error(&format!("{}: {e}", slot.name));
                        return Err(e);
                    }
                }
                drained += 1;
            }
        }
        if let Err(e) = self.process_stats.end(platform) {
            platform.on_fatal_error(&format!("{e}"));
            return Err(e);
        }
        Ok(drained)
    }

    /// Control tier: drains every armed control unit in schedule order.
    ///
    /// Returns the number of units drained.
    pub fn control(&mut self) -> Result<u32, EngineError> {
        if !self.built {
            return Err(EngineError::InvalidState(LifecycleState::Uninitialized));
        }
        let platform = &*self.platform;
        self.control_stats.begin(platform);
        let mut drained = 0;
        for &idx in &self.order {
            loop {
                let slot = &self.nodes[idx];
                if slot.state != LifecycleState::Running || slot.algo.is_disabled() {
                    break;
                }
                if !NodeSlot::take_one(&slot.control_ready) {
                    break;
                }
                let slot = &mut self.nodes[idx];
                if let Err(e) = slot.algo.control(platform) {
                    platform.on_fatal_error(&format!("{}: {e}", slot.name));
                    return Err(e);
                }
                drained += 1;
            }
        }
        if let Err(e) = self.control_stats.end(platform) {
            platform.on_fatal_error(&format!("{e}"));
            return Err(e);
        }
        Ok(drained)
    }

    /// Updates a node parameter and re-runs its `configure`.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownId`] for a bad node id, or whatever the node's
    /// own `set_param`/`configure` returns.
    pub fn set_param(&mut self, node: NodeId, key: &str, value: f32) -> Result<(), EngineError> {
        let slot =
            self.nodes.get_mut(node.index()).ok_or(EngineError::UnknownId(node.0))?;
        slot.algo.set_param(key, value)?;
        if slot.state != LifecycleState::Uninitialized {
            slot.algo.configure()?;
        }
        Ok(())
    }

    /// Deinitializes every node in reverse schedule order, frees all chunk
    /// storage, and verifies the pools balance to zero.
    ///
    /// # Errors
    ///
    /// [`EngineError::LeakDetected`] when a node failed to return a block.
    pub fn teardown(&mut self) -> Result<(), EngineError> {
        let order: Vec<usize> =
            if self.order.is_empty() { (0..self.nodes.len()).collect() } else { self.order.clone() };
        for &idx in order.iter().rev() {
            let slot = &mut self.nodes[idx];
            if slot.state != LifecycleState::Uninitialized {
                slot.algo.deinit();
                slot.state = LifecycleState::Uninitialized;
                slot.reset_readiness();
            }
        }
        self.nodes.clear();
        self.chunks.clear();
        self.order.clear();
        self.chunk_consumers.clear();
        self.consumers_left.clear();
        self.built = false;
        self.pools.verify_all_returned()
    }

    /// Periods counted since build.
    pub fn periods(&self) -> u64 {
        self.periods
    }

    /// Sum of pending processing units across all nodes.
    pub fn pending_process(&self) -> u32 {
        use core::sync::atomic::Ordering;
        self.nodes.iter().map(|s| s.process_ready.load(Ordering::Acquire)).sum()
    }

    /// Warnings retained from the last successful build.
    pub fn warnings(&self) -> &[ConsistencyWarning] {
        self.report.warnings()
    }

    /// Lifecycle state of `node`.
    pub fn node_state(&self, node: NodeId) -> Result<LifecycleState, EngineError> {
        self.nodes.get(node.index()).map(|s| s.state).ok_or(EngineError::UnknownId(node.0))
    }

    /// Shared access to a chunk, for feeding sources and draining sinks.
    pub fn chunk(&self, id: ChunkId) -> Result<&Chunk, EngineError> {
        self.chunks.get(id.index()).ok_or(EngineError::UnknownId(id.0))
    }

    /// Exclusive access to a chunk.
    pub fn chunk_mut(&mut self, id: ChunkId) -> Result<&mut Chunk, EngineError> {
        self.chunks.get_mut(id.index()).ok_or(EngineError::UnknownId(id.0))
    }

    /// The pools this chain draws from.
    pub fn pools(&self) -> &MemoryPools {
        &self.pools
    }

    /// Arms per-tier cycle watchdogs. `None` disarms.
    pub fn set_tier_budgets(
        &mut self,
        data_in_out: Option<u32>,
        process: Option<u32>,
        control: Option<u32>,
    ) {
        self.data_stats.set_budget(data_in_out);
        self.process_stats.set_budget(process);
        self.control_stats.set_budget(control);
    }

    /// Cycle statistics of the bookkeeping tier.
    pub fn data_in_out_stats(&self) -> &CycleStats {
        &self.data_stats
    }

    /// Cycle statistics of the processing tier.
    pub fn process_stats(&self) -> &CycleStats {
        &self.process_stats
    }

    /// Cycle statistics of the control tier.
    pub fn control_stats(&self) -> &CycleStats {
        &self.control_stats
    }
}

impl Drop for AudioChain {
    fn drop(&mut self) {
        // nodes may hold pool blocks; give them their detach pass
        for slot in self.nodes.iter_mut().rev() {
            if slot.state != LifecycleState::Uninitialized {
                slot.algo.deinit();
                slot.state = LifecycleState::Uninitialized;
            }
        }
    }
}
