//! Cadena Algos - pipeline algorithm nodes
//!
//! Ready-made [`Algorithm`](cadena_core::Algorithm) implementations for
//! cadena chains:
//!
//! - [`Gain`] - format adaptation with dB gain, converter-backed
//! - [`Delay`] - fixed delay over a pool-backed ring, PCM and PDM
//! - [`Passthrough`] - straight frame copy
//! - [`Deinterleave`] - one interleaved input fanned out to channel groups
//! - [`FrequencyJoin`] - band-wise merge of spectral inputs
//! - [`RmsMonitor`] - per-channel level metering with control-tier snapshots
//!
//! ## Example
//!
//! ```rust,ignore
//! use cadena_algos::{Delay, DelaySpec, Gain};
//! use cadena_core::PoolKind;
//!
//! let delay = Delay::new(DelaySpec::Seconds(0.010), PoolKind::ExtRam);
//! let mut gain = Gain::new();
//! gain.set_gain_db(-6.0);
//!
//! chain.add_node("delay", Box::new(delay), &[mic], &[wet])?;
//! chain.add_node("gain", Box::new(gain), &[wet], &[line])?;
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod deinterleave;
pub mod delay;
pub mod fjoin;
pub mod gain;
pub mod passthrough;
pub mod rms;

pub use deinterleave::Deinterleave;
pub use delay::{Delay, DelaySpec};
pub use fjoin::FrequencyJoin;
pub use gain::Gain;
pub use passthrough::Passthrough;
pub use rms::{RmsHandle, RmsMonitor};
