//! Passthrough node: a straight frame copy.
//!
//! Useful as a probe point or a placeholder while a chain is being brought
//! up. Input and output must match on every field; the copy is one
//! `copy_from_slice` in the bookkeeping tier.

use cadena_core::capability::{
    Capabilities, ChunkConsistency, PortCountSet, PortRequirements,
};
use cadena_core::node::{Algorithm, NodeContext, NodeIo, Readiness};
use cadena_core::EngineError;

static CAPS: Capabilities = Capabilities {
    name: "passthrough",
    inputs: PortRequirements::any(PortCountSet::ONE),
    outputs: PortRequirements::any(PortCountSet::ONE),
    consistency: ChunkConsistency::STRICT,
};

/// Copies its input frame to its output frame, unchanged.
#[derive(Debug, Default)]
pub struct Passthrough;

impl Passthrough {
    /// A passthrough node.
    pub fn new() -> Self {
        Self
    }
}

impl Algorithm for Passthrough {
    fn capabilities(&self) -> &'static Capabilities {
        &CAPS
    }

    fn init(&mut self, _cx: &mut NodeContext<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    fn data_in_out(&mut self, io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
        let input = io.inputs[0].read_frame();
        io.outputs[0].write_frame().copy_from_slice(input);
        Ok(Readiness::none())
    }

    fn deinit(&mut self) {}
}
