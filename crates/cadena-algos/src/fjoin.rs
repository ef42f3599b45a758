//! Frequency join node: concatenates the bands of N spectral inputs.
//!
//! Input bins land in the output in port order: input 0's bins first, then
//! input 1's, and so on. The band budget is checked before init with an
//! asymmetric policy: an output wider than the combined inputs is
//! tolerable (the surplus bins stay silent) and only draws a warning, but
//! an output too narrow to hold every input bin is a hard error — bins
//! would be lost.

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
    name: "fjoin",
    inputs: PortRequirements {
        count: PortCountSet::MANY,
        channels: ChannelSet::ALL,
        rates: RateSet::ALL,
        types: TypeSet::FLOAT32,
        interleaving: InterleavingSet::NON_INTERLEAVED,
        domains: DomainSet::FREQUENCY,
    },
    outputs: PortRequirements {
        count: PortCountSet::ONE,
        channels: ChannelSet::ALL,
        rates: RateSet::ALL,
        types: TypeSet::FLOAT32,
        interleaving: InterleavingSet::NON_INTERLEAVED,
        domains: DomainSet::FREQUENCY,
    },
    consistency: ChunkConsistency {
        among_inputs: FieldSet::RATE.or(FieldSet::CHANNELS),
        among_outputs: FieldSet::NONE,
        between: FieldSet::RATE.or(FieldSet::CHANNELS),
    },
};

/// Concatenates spectral band ranges from several inputs into one output.
#[derive(Debug, Default)]
pub struct FrequencyJoin;

impl FrequencyJoin {
    /// A frequency join node.
    pub fn new() -> Self {
        Self
    }
}

impl Algorithm for FrequencyJoin {
    fn capabilities(&self) -> &'static Capabilities {
        &CAPS
    }

    fn check_consistency(&self, io: &IoFormats<'_>) -> Result<ConsistencyReport, EngineError> {
        let supplied: u32 = io.inputs.iter().map(cadena_core::AudioFormat::elements).sum();
        let width = io.outputs[0].elements();
        if width < supplied {
            return Err(EngineError::ConsistencyViolation(format!(
                "fjoin: output holds {width} band(s), inputs supply {supplied}",
            )));
        }
        let mut report = ConsistencyReport::new();
        if width > supplied {
            report.warn(
                "fjoin",
                format!("output holds {width} band(s), inputs supply only {supplied}"),
            );
        }
        Ok(report)
    }

    fn init(&mut self, _cx: &mut NodeContext<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    fn data_in_out(&mut self, io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
        let out_fmt = *io.outputs[0].format();
        let channels = out_fmt.channels() as usize;
        let out_frame = io.outputs[0].write_frame();
        // surplus bins stay silent
        out_frame.fill(0);
        for ch in 0..channels {
            let mut band = 0usize;
            for input in io.inputs {
                let in_fmt = input.format();
                let bytes = in_fmt.channel_bytes();
                let src = in_fmt.byte_offset(ch, 0);
                let dst = out_fmt.byte_offset(ch, band);
                out_frame[dst..dst + bytes]
                    .copy_from_slice(&input.read_frame()[src..src + bytes]);
                band += in_fmt.elements() as usize;
            }
        }
        Ok(Readiness::none())
    }

    fn deinit(&mut self) {}
}
