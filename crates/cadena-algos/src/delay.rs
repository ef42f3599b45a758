//! Delay node: a fixed lag between input and output chunks.
//!
//! Wraps a [`DelayRing`] allocated from a caller-chosen pool; the delay can
//! be given in seconds (converted against the stream rate at init) or in
//! raw samples, which for PDM streams means bits. The exchange is pure
//! data movement and runs in the bookkeeping tier.

use cadena_core::capability::{
    Capabilities, ChunkConsistency, PortCountSet, PortRequirements,
};
use cadena_core::node::{Algorithm, NodeContext, NodeIo, Readiness};
use cadena_core::{DelayRing, EngineError, PoolKind};

static CAPS: Capabilities = Capabilities {
    name: "delay",
    inputs: PortRequirements::any(PortCountSet::ONE),
    outputs: PortRequirements::any(PortCountSet::ONE),
    consistency: ChunkConsistency::STRICT,
};

/// How the lag is specified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DelaySpec {
    /// Wall-clock lag, converted against the stream rate at init.
    Seconds(f32),
    /// Lag in samples (bits for PDM).
    Samples(u32),
}

/// Fixed delay over a pool-backed circular ring.
pub struct Delay {
    spec: DelaySpec,
    pool: PoolKind,
    ring: Option<DelayRing>,
}

impl Delay {
    /// A delay node drawing its ring from `pool`.
    pub fn new(spec: DelaySpec, pool: PoolKind) -> Self {
        Self { spec, pool, ring: None }
    }

    /// Effective delay in samples once initialized.
    pub fn delay_samples(&self) -> Option<usize> {
        self.ring.as_ref().map(DelayRing::delay_samples)
    }
}

impl Algorithm for Delay {
    fn capabilities(&self) -> &'static Capabilities {
        &CAPS
    }

    fn init(&mut self, cx: &mut NodeContext<'_>) -> Result<(), EngineError> {
        let format = &cx.inputs[0];
        let samples = match self.spec {
            DelaySpec::Seconds(s) => {
                if s < 0.0 {
                    return Err(EngineError::InitFailed("negative delay"));
                }
                (s * format.rate_hz() as f32) as usize
            }
            DelaySpec::Samples(n) => n as usize,
        };
        self.ring = Some(DelayRing::new(format, samples, cx.pools, self.pool)?);
        Ok(())
    }

    fn data_in_out(&mut self, io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
        let ring = self.ring.as_mut().ok_or(EngineError::ConfigMissing)?;
        ring.exchange(io.inputs[0], io.outputs[0]);
        Ok(Readiness::none())
    }

    fn deinit(&mut self) {
        // drop the ring before anything else can schedule this node
        self.ring = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadena_core::{AudioFormat, Domain, Interleaving, MemoryPools, NullPlatform, SampleType};

    #[test]
    fn seconds_convert_against_the_stream_rate() {
        let pools = MemoryPools::default();
        let platform = NullPlatform::new();
        let format = AudioFormat::new(
            1,
            16000,
            SampleType::Fixed16,
            Interleaving::Interleaved,
            Domain::Time,
            160,
        )
        .unwrap();
        let mut delay = Delay::new(DelaySpec::Seconds(0.010), PoolKind::IntRam);
        let inputs = [format];
        let outputs = [format];
        let mut cx = cadena_core::NodeContext {
            pools: &pools,
            inputs: &inputs,
            outputs: &outputs,
            platform: &platform,
        };
        delay.init(&mut cx).unwrap();
        assert_eq!(delay.delay_samples(), Some(160));
        delay.deinit();
        assert!(pools.verify_all_returned().is_ok());
    }
}
