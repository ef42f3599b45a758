//! Cadena Core - real-time audio pipeline engine for constrained targets
//!
//! This crate provides the buffer model, memory pools, capability checking,
//! and two-phase scheduler of a microcontroller-class audio pipeline. Nodes
//! exchange format-tagged chunks over a validated graph; all memory comes
//! from fixed-budget pools and is fully returned at teardown.
//!
//! # Core Abstractions
//!
//! ## Stream Model
//!
//! - [`AudioFormat`] - layout of one frame: type, rate, channels, domain
//! - [`Chunk`] - format-tagged exchange buffer with frame cursors
//! - [`MemoryPools`] / [`PoolBlock`] - fixed-budget RAII pool memory
//!
//! ## Pipeline
//!
//! - [`Algorithm`] - object-safe trait every node implements
//! - [`Capabilities`] - declarative per-port constraint sets
//! - [`AudioChain`] - registry, build-time validation, and scheduler
//!
//! The chain schedules three tiers: `data_in_out` at interrupt cadence for
//! cursor bookkeeping, `process` for signal work, `control` for background
//! work. Atomic readiness counters are the only cross-tier state, so a
//! starved tier catches up instead of corrupting audio.
//!
//! ## Building Blocks
//!
//! - [`FormatConverter`] - sample format and layout conversion
//! - [`DelayRing`] - circular delay over pool memory, PCM and PDM
//! - [`g711`] - A-law and mu-law companding
//! - [`CycleStats`] - per-tier cycle accounting and watchdog
//!
//! # no_std Support
//!
//! The crate is `no_std` compatible (with `alloc`). Disable the default
//! `std` feature:
//!
//! ```toml
//! [dependencies]
//! cadena-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cadena_core::{AudioChain, MemoryPools, NullPlatform, PoolKind};
//!
//! let mut chain = AudioChain::new(MemoryPools::default(), Box::new(NullPlatform::new()));
//! let mic = chain.add_chunk("mic", format, 1, PoolKind::IntRam)?;
//! let line = chain.add_chunk("line", format, 1, PoolKind::IntRam)?;
//! chain.add_node("delay", Box::new(delay), &[mic], &[line])?;
//! let warnings = chain.build()?;
//!
//! // from the audio interrupt:
//! chain.data_in_out()?;
//! // from the processing context:
//! chain.process()?;
//! // from the background loop:
//! chain.control()?;
//! ```
//!
//! # Design Principles
//!
//! - **Fail at build time**: formats are checked against capabilities
//!   before any node initializes
//! - **Fixed memory**: every byte is budgeted, counted, and leak-checked
//! - **Lock-free tiers**: readiness counters instead of queues or mutexes
//! - **Target-agnostic**: clocks and critical sections behind [`Platform`]

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod capability;
pub mod chain;
pub mod chunk;
pub mod consistency;
pub mod cycles;
pub mod delay_line;
pub mod error;
pub mod format;
pub mod g711;
pub mod node;
pub mod platform;
pub mod pool;
pub mod sfc;

// Re-export main types at crate root
pub use capability::{
    Capabilities, ChannelSet, ChunkConsistency, DomainSet, Field, FieldSet, InterleavingSet,
    PortCountSet, PortRequirements, RateSet, TypeSet,
};
pub use chain::AudioChain;
pub use chunk::Chunk;
pub use consistency::{ConsistencyReport, ConsistencyWarning};
pub use cycles::CycleStats;
pub use delay_line::DelayRing;
pub use error::EngineError;
pub use format::{AudioFormat, Domain, Interleaving, SampleType, MAX_CHANNELS, PCM_RATES, PDM_RATES};
pub use node::{
    Algorithm, ChunkId, IoFormats, LifecycleState, NodeContext, NodeId, NodeIo, Readiness,
};
pub use platform::{ControlSection, NullPlatform, Platform};
pub use pool::{MemoryPools, PoolBlock, PoolBudgets, PoolKind};
pub use sfc::FormatConverter;
