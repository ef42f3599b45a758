//! Gain node: format adaptation plus level trim.
//!
//! Backed by a [`FormatConverter`], so the input and output chunks may
//! differ in sample type and interleaving; the node converts while it
//! scales. The decibel parameter is turned into a linear factor in
//! `configure`, which re-runs after every parameter change. The work is a
//! single converted copy and happens in the bookkeeping tier.

use cadena_core::capability::{
    Capabilities, ChannelSet, ChunkConsistency, DomainSet, FieldSet, InterleavingSet, PortCountSet,
    PortRequirements, RateSet, TypeSet,
};
use cadena_core::node::{Algorithm, NodeContext, NodeIo, Readiness};
use cadena_core::{EngineError, FormatConverter};

static CAPS: Capabilities = Capabilities {
    name: "gain",
    inputs: PortRequirements {
        count: PortCountSet::ONE,
        channels: ChannelSet::ALL,
        rates: RateSet::ALL,
        types: TypeSet::LINEAR.or(TypeSet::G711),
        interleaving: InterleavingSet::BOTH,
        domains: DomainSet::TIME,
    },
    outputs: PortRequirements {
        count: PortCountSet::ONE,
        channels: ChannelSet::ALL,
        rates: RateSet::ALL,
        types: TypeSet::LINEAR.or(TypeSet::G711),
        interleaving: InterleavingSet::BOTH,
        domains: DomainSet::TIME,
    },
    consistency: ChunkConsistency {
        among_inputs: FieldSet::NONE,
        among_outputs: FieldSet::NONE,
        // type and interleaving are free: the converter bridges them
        between: FieldSet::RATE.or(FieldSet::CHANNELS).or(FieldSet::DOMAIN).or(FieldSet::ELEMENTS),
    },
};

/// Level trim with optional mix-into-destination, converter-backed.
pub struct Gain {
    gain_db: f32,
    mix: bool,
    converter: Option<FormatConverter>,
}

impl Gain {
    /// Unity gain, overwrite mode.
    pub fn new() -> Self {
        Self { gain_db: 0.0, mix: false, converter: None }
    }

    /// Sets the trim in decibels.
    pub fn set_gain_db(&mut self, db: f32) {
        self.gain_db = db;
    }

    /// Mix into the destination instead of overwriting it.
    pub fn set_mix(&mut self, mix: bool) {
        self.mix = mix;
    }

    fn linear(&self) -> f32 {
        libm::powf(10.0, self.gain_db / 20.0)
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for Gain {
    fn capabilities(&self) -> &'static Capabilities {
        &CAPS
    }

    fn init(&mut self, cx: &mut NodeContext<'_>) -> Result<(), EngineError> {
        self.converter = Some(FormatConverter::new(&cx.inputs[0], &cx.outputs[0])?);
        Ok(())
    }

    fn configure(&mut self) -> Result<(), EngineError> {
        let gain = self.linear();
        let mix = self.mix;
        let converter = self.converter.as_mut().ok_or(EngineError::ConfigMissing)?;
        converter.set_gain(mix, gain);
        Ok(())
    }

    fn set_param(&mut self, key: &str, value: f32) -> Result<(), EngineError> {
        match key {
            "gain_db" => self.gain_db = value,
            "mix" => self.mix = value != 0.0,
            _ => return Err(EngineError::UnknownParam(key.into())),
        }
        Ok(())
    }

    fn data_in_out(&mut self, io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
        let converter = self.converter.as_ref().ok_or(EngineError::ConfigMissing)?;
        converter.convert(io.inputs[0].read_frame(), io.outputs[0].write_frame());
        Ok(Readiness::none())
    }

    fn deinit(&mut self) {
        self.converter = None;
    }
}
