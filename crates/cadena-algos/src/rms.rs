//! Per-channel RMS level metering.
//!
//! A sink node: one float input, no outputs. The bookkeeping tier only
//! arms a processing unit per frame; the mean-square smoothing runs in the
//! processing tier, and once per window the smoothed levels are published
//! from the control tier through a shared [`RmsHandle`]. Readers on any
//! thread poll the handle without touching the chain.

#[cfg(not(feature = "std"))]
use alloc::{string::String, sync::Arc};
#[cfg(feature = "std")]
use std::sync::Arc;

use core::sync::atomic::{AtomicU32, Ordering};

use cadena_core::capability::{
    Capabilities, ChannelSet, ChunkConsistency, DomainSet, InterleavingSet, PortCountSet,
    PortRequirements, RateSet, TypeSet,
};
use cadena_core::node::{Algorithm, NodeContext, NodeIo, Readiness};
use cadena_core::platform::{ControlSection, Platform};
use cadena_core::{EngineError, MAX_CHANNELS};

const MAX: usize = MAX_CHANNELS as usize;

static CAPS: Capabilities = Capabilities {
    name: "rms",
    inputs: PortRequirements {
        count: PortCountSet::ONE,
        channels: ChannelSet::ALL,
        rates: RateSet::ALL,
        types: TypeSet::FLOAT32,
        interleaving: InterleavingSet::BOTH,
        domains: DomainSet::TIME,
    },
    outputs: PortRequirements::none(),
    consistency: ChunkConsistency::NONE,
};

struct Levels {
    bits: [AtomicU32; MAX],
    channels: AtomicU32,
}

/// Reader side of an [`RmsMonitor`]: cheap, clonable, thread-safe.
#[derive(Clone)]
pub struct RmsHandle {
    shared: Arc<Levels>,
}

impl RmsHandle {
    /// Last published RMS level of `channel`, linear scale. Zero for
    /// channels the monitored stream does not carry.
    pub fn level(&self, channel: usize) -> f32 {
        if channel >= MAX {
            return 0.0;
        }
        f32::from_bits(self.shared.bits[channel].load(Ordering::Acquire))
    }

    /// Last published level in dBFS. Silence floors at -120 dB.
    pub fn level_db(&self, channel: usize) -> f32 {
        let lin = self.level(channel);
        if lin <= 1.0e-6 { -120.0 } else { 20.0 * libm::log10f(lin) }
    }

    /// Channel count of the monitored stream, zero before init.
    pub fn channels(&self) -> usize {
        self.shared.channels.load(Ordering::Acquire) as usize
    }
}

/// Exponentially smoothed per-channel RMS meter.
///
/// Smoothing follows a first-order time constant: each frame folds its
/// mean square into the accumulator with weight `1 - lambda`, where
/// `lambda = exp(-frame_duration / time_constant)`. Every `window_frames`
/// frames the square roots of the accumulators are snapshotted and handed
/// to the control tier for publication.
pub struct RmsMonitor {
    time_constant_ms: f32,
    window_frames: u32,
    lambda: f32,
    accum: [f32; MAX],
    pending: [f32; MAX],
    frames_in_window: u32,
    channels: usize,
    elements: u32,
    rate_hz: u32,
    shared: Arc<Levels>,
}

impl RmsMonitor {
    /// A meter with a 100 ms time constant publishing every 8 frames.
    /// Returns the node and its reader handle.
    pub fn new() -> (Self, RmsHandle) {
        let shared = Arc::new(Levels {
            bits: [const { AtomicU32::new(0) }; MAX],
            channels: AtomicU32::new(0),
        });
        let monitor = Self {
            time_constant_ms: 100.0,
            window_frames: 8,
            lambda: 0.0,
            accum: [0.0; MAX],
            pending: [0.0; MAX],
            frames_in_window: 0,
            channels: 0,
            elements: 0,
            rate_hz: 0,
            shared: Arc::clone(&shared),
        };
        (monitor, RmsHandle { shared })
    }
}

impl Algorithm for RmsMonitor {
    fn capabilities(&self) -> &'static Capabilities {
        &CAPS
    }

    fn init(&mut self, cx: &mut NodeContext<'_>) -> Result<(), EngineError> {
        let format = &cx.inputs[0];
        self.channels = format.channels() as usize;
        self.elements = format.elements();
        self.rate_hz = format.rate_hz();
        self.accum = [0.0; MAX];
        self.pending = [0.0; MAX];
        self.frames_in_window = 0;
        self.shared.channels.store(self.channels as u32, Ordering::Release);
        Ok(())
    }

    fn configure(&mut self) -> Result<(), EngineError> {
        if self.time_constant_ms < 0.0 {
            return Err(EngineError::InitFailed("rms time constant must not be negative"));
        }
        if self.rate_hz == 0 {
            return Ok(());
        }
        self.lambda = if self.time_constant_ms == 0.0 {
            0.0
        } else {
            let frame_s = self.elements as f32 / self.rate_hz as f32;
            libm::expf(-frame_s / (self.time_constant_ms / 1000.0))
        };
        Ok(())
    }

    fn set_param(&mut self, key: &str, value: f32) -> Result<(), EngineError> {
        match key {
            "time_constant_ms" => {
                self.time_constant_ms = value;
                Ok(())
            }
            "window_frames" => {
                if value < 1.0 {
                    return Err(EngineError::InitFailed("rms window needs at least one frame"));
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    self.window_frames = value as u32;
                }
                Ok(())
            }
            _ => Err(EngineError::UnknownParam(String::from(key))),
        }
    }

    fn data_in_out(&mut self, _io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
        Ok(Readiness::process())
    }

    fn process(&mut self, io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
        let input = io.inputs[0];
        for ch in 0..self.channels {
            let mut sum = 0.0f32;
            for el in 0..self.elements as usize {
                let s = input.sample_f32(ch, el);
                sum += s * s;
            }
            let mean = sum / self.elements as f32;
            self.accum[ch] = self.lambda * self.accum[ch] + (1.0 - self.lambda) * mean;
        }
        self.frames_in_window += 1;
        if self.frames_in_window < self.window_frames {
            return Ok(Readiness::none());
        }
        self.frames_in_window = 0;
        for ch in 0..self.channels {
            self.pending[ch] = libm::sqrtf(self.accum[ch]);
        }
        Ok(Readiness::control())
    }

    fn control(&mut self, platform: &dyn Platform) -> Result<(), EngineError> {
        // publish all channels as one consistent set
        let _guard = ControlSection::enter(platform);
        for ch in 0..self.channels {
            self.shared.bits[ch].store(self.pending[ch].to_bits(), Ordering::Release);
        }
        Ok(())
    }

    fn deinit(&mut self) {
        self.accum = [0.0; MAX];
        self.frames_in_window = 0;
    }
}
