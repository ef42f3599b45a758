//! Deinterleave node: one interleaved input fanned out to channel groups.
//!
//! Consecutive input channels are assigned to the outputs in port order:
//! with a 4-channel input and outputs of 1 and 3 channels, output 0 gets
//! channel 0 and output 1 gets channels 1 to 3. The channel budget must
//! balance exactly; that check is algorithm-specific and runs in
//! `check_consistency` before any node initializes.

#[cfg(not(feature = "std"))]
use alloc::format;

use cadena_core::capability::{
    Capabilities, ChannelSet, ChunkConsistency, DomainSet, FieldSet, InterleavingSet, PortCountSet,
    PortRequirements, RateSet, TypeSet,
};
use cadena_core::consistency::ConsistencyReport;
use cadena_core::node::{Algorithm, IoFormats, NodeContext, NodeIo, Readiness};
use cadena_core::EngineError;

static CAPS: Capabilities = Capabilities {
    name: "deinterleave",
    inputs: PortRequirements {
        count: PortCountSet::ONE,
        channels: ChannelSet::ALL,
        rates: RateSet::ALL,
        types: TypeSet::LINEAR.or(TypeSet::G711),
        interleaving: InterleavingSet::INTERLEAVED,
        domains: DomainSet::TIME,
    },
    outputs: PortRequirements {
        count: PortCountSet::MANY,
        channels: ChannelSet::ALL,
        rates: RateSet::ALL,
        types: TypeSet::LINEAR.or(TypeSet::G711),
        interleaving: InterleavingSet::BOTH,
        domains: DomainSet::TIME,
    },
    consistency: ChunkConsistency {
        among_inputs: FieldSet::NONE,
        among_outputs: FieldSet::RATE.or(FieldSet::TYPE).or(FieldSet::ELEMENTS),
        between: FieldSet::RATE.or(FieldSet::TYPE).or(FieldSet::DOMAIN).or(FieldSet::ELEMENTS),
    },
};

/// Splits an interleaved stream into consecutive channel groups.
#[derive(Debug, Default)]
pub struct Deinterleave;

impl Deinterleave {
    /// A deinterleave node.
    pub fn new() -> Self {
        Self
    }
}

impl Algorithm for Deinterleave {
    fn capabilities(&self) -> &'static Capabilities {
        &CAPS
    }

    fn check_consistency(&self, io: &IoFormats<'_>) -> Result<ConsistencyReport, EngineError> {
        let supplied = u32::from(io.inputs[0].channels());
        let consumed: u32 = io.outputs.iter().map(|f| u32::from(f.channels())).sum();
        if supplied != consumed {
            return Err(EngineError::ConsistencyViolation(format!(
                "deinterleave: input supplies {supplied} channel(s), outputs consume {consumed}",
            )));
        }
        Ok(ConsistencyReport::new())
    }

    fn init(&mut self, _cx: &mut NodeContext<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    fn data_in_out(&mut self, io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
        let input = io.inputs[0];
        let in_fmt = *input.format();
        let in_frame = input.read_frame();
        let size = in_fmt.sample_size();
        let elements = in_fmt.elements() as usize;
        let mut next_channel = 0usize;
        for output in io.outputs.iter_mut() {
            let out_fmt = *output.format();
            let out_frame = output.write_frame();
            for ch in 0..out_fmt.channels() as usize {
                let src_ch = next_channel + ch;
                for el in 0..elements {
                    let src = in_fmt.byte_offset(src_ch, el);
                    let dst = out_fmt.byte_offset(ch, el);
                    out_frame[dst..dst + size].copy_from_slice(&in_frame[src..src + size]);
                }
            }
            next_channel += out_fmt.channels() as usize;
        }
        Ok(Readiness::none())
    }

    fn deinit(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadena_core::{AudioFormat, Domain, Interleaving, SampleType};

    fn fmt(channels: u8, il: Interleaving) -> AudioFormat {
        AudioFormat::new(channels, 16000, SampleType::Fixed16, il, Domain::Time, 8).unwrap()
    }

    #[test]
    fn channel_budget_must_balance() {
        let d = Deinterleave::new();
        let input = [fmt(4, Interleaving::Interleaved)];
        let good = [fmt(1, Interleaving::Interleaved), fmt(3, Interleaving::NonInterleaved)];
        assert!(
            d.check_consistency(&IoFormats { inputs: &input, outputs: &good }).is_ok()
        );
        let short = [fmt(1, Interleaving::Interleaved), fmt(2, Interleaving::NonInterleaved)];
        assert!(matches!(
            d.check_consistency(&IoFormats { inputs: &input, outputs: &short }),
            Err(EngineError::ConsistencyViolation(_))
        ));
    }
}
