//! Build-time consistency checking of bound chunks against capabilities.
//!
//! Run once per node while the chain is being built, before any node is
//! initialized. Hard failures (a format a port does not admit, an equality
//! constraint violated) abort the build with
//! [`EngineError::ConsistencyViolation`]. Findings a node declares tolerable
//! through its own [`check`](crate::node::Algorithm::check_consistency) hook
//! are collected as warnings and reported to the caller without stopping
//! the build.

#[cfg(not(feature = "std"))]
use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};

use core::fmt;

use crate::capability::{Capabilities, Field, FieldSet};
use crate::error::EngineError;
use crate::format::AudioFormat;

/// A tolerable finding: the build proceeds, the integrator should look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyWarning {
    /// Node the finding concerns.
    pub node: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.node, self.message)
    }
}

/// Warnings accumulated across a build.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyReport {
    warnings: Vec<ConsistencyWarning>,
}

impl ConsistencyReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning against `node`.
    pub fn warn(&mut self, node: &str, message: impl fmt::Display) {
        self.warnings
            .push(ConsistencyWarning { node: node.to_string(), message: message.to_string() });
    }

    /// Moves all warnings from `other` into this report.
    pub fn merge(&mut self, other: ConsistencyReport) {
        self.warnings.extend(other.warnings);
    }

    /// True when nothing was flagged.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// The collected warnings.
    pub fn warnings(&self) -> &[ConsistencyWarning] {
        &self.warnings
    }
}

pub(crate) fn overrun_message(chunk: &str, op: &str) -> String {
    format!("chunk {chunk:?}: frame {op} overrun")
}

fn fields_equal(a: &AudioFormat, b: &AudioFormat, field: Field) -> bool {
    match field {
        Field::Rate => a.rate_hz() == b.rate_hz(),
        Field::Channels => a.channels() == b.channels(),
        Field::Type => a.sample_type() == b.sample_type(),
        Field::Interleaving => a.interleaving() == b.interleaving(),
        Field::Domain => a.domain() == b.domain(),
        Field::Elements => a.elements() == b.elements(),
        Field::Duration => a.same_duration(b),
    }
}

fn check_group_equality(
    node: &str,
    group: &str,
    formats: &[&AudioFormat],
    fields: FieldSet,
) -> Result<(), EngineError> {
    let Some((first, rest)) = formats.split_first() else {
        return Ok(());
    };
    for (i, other) in rest.iter().enumerate() {
        for field in fields.iter() {
            if !fields_equal(first, other, field) {
                return Err(EngineError::ConsistencyViolation(format!(
                    "{node}: {} differs between {group} 0 and {group} {}",
                    field.name(),
                    i + 1,
                )));
            }
        }
    }
    Ok(())
}

fn check_cross_equality(
    node: &str,
    inputs: &[&AudioFormat],
    outputs: &[&AudioFormat],
    fields: FieldSet,
) -> Result<(), EngineError> {
    for (i, input) in inputs.iter().enumerate() {
        for (o, output) in outputs.iter().enumerate() {
            for field in fields.iter() {
                if !fields_equal(input, output, field) {
                    return Err(EngineError::ConsistencyViolation(format!(
                        "{node}: {} differs between input {i} and output {o}",
                        field.name(),
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Checks one node's bound formats against its published capabilities.
///
/// # Errors
///
/// Returns [`EngineError::ConsistencyViolation`] naming the node, the port
/// and the first field that fails.
pub fn check_node(
    node: &str,
    caps: &Capabilities,
    inputs: &[&AudioFormat],
    outputs: &[&AudioFormat],
) -> Result<(), EngineError> {
    if !caps.inputs.count.contains(inputs.len()) {
        return Err(EngineError::ConsistencyViolation(format!(
            "{node}: {} input port(s) not admitted by {}",
            inputs.len(),
            caps.name,
        )));
    }
    if !caps.outputs.count.contains(outputs.len()) {
        return Err(EngineError::ConsistencyViolation(format!(
            "{node}: {} output port(s) not admitted by {}",
            outputs.len(),
            caps.name,
        )));
    }
    for (i, format) in inputs.iter().enumerate() {
        if let Err(field) = caps.inputs.admits(format) {
            return Err(EngineError::ConsistencyViolation(format!(
                "{node}: input {i} {} not admitted by {}",
                field.name(),
                caps.name,
            )));
        }
    }
    for (o, format) in outputs.iter().enumerate() {
        if let Err(field) = caps.outputs.admits(format) {
            return Err(EngineError::ConsistencyViolation(format!(
                "{node}: output {o} {} not admitted by {}",
                field.name(),
                caps.name,
            )));
        }
    }
    check_group_equality(node, "input", inputs, caps.consistency.among_inputs)?;
    check_group_equality(node, "output", outputs, caps.consistency.among_outputs)?;
    check_cross_equality(node, inputs, outputs, caps.consistency.between)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        ChannelSet, ChunkConsistency, DomainSet, InterleavingSet, PortCountSet, PortRequirements,
        RateSet, TypeSet,
    };
    use crate::format::{Domain, Interleaving, SampleType};

    const CAPS: Capabilities = Capabilities {
        name: "unit",
        inputs: PortRequirements {
            count: PortCountSet::ONE,
            channels: ChannelSet::ALL,
            rates: RateSet::PCM,
            types: TypeSet::LINEAR,
            interleaving: InterleavingSet::BOTH,
            domains: DomainSet::TIME,
        },
        outputs: PortRequirements {
            count: PortCountSet::ONE,
            channels: ChannelSet::ALL,
            rates: RateSet::PCM,
            types: TypeSet::LINEAR,
            interleaving: InterleavingSet::BOTH,
            domains: DomainSet::TIME,
        },
        consistency: ChunkConsistency {
            among_inputs: FieldSet::NONE,
            among_outputs: FieldSet::NONE,
            between: FieldSet::ALL_BUT_TYPE,
        },
    };

    fn fmt(rate: u32, ty: SampleType, elements: u32) -> AudioFormat {
        AudioFormat::new(1, rate, ty, Interleaving::Interleaved, Domain::Time, elements).unwrap()
    }

    #[test]
    fn accepts_a_matching_binding() {
        let a = fmt(16000, SampleType::Fixed16, 160);
        let b = fmt(16000, SampleType::Float32, 160);
        check_node("n", &CAPS, &[&a], &[&b]).unwrap();
    }

    #[test]
    fn rejects_wrong_port_count() {
        let a = fmt(16000, SampleType::Fixed16, 160);
        let err = check_node("n", &CAPS, &[&a, &a], &[&a]).unwrap_err();
        let EngineError::ConsistencyViolation(msg) = err else { panic!() };
        assert!(msg.contains("2 input port(s)"));
    }

    #[test]
    fn rejects_inadmissible_field_by_name() {
        let pdm = AudioFormat::new(
            1,
            1_024_000,
            SampleType::PdmMsbFirst,
            Interleaving::NonInterleaved,
            Domain::Time,
            1024,
        )
        .unwrap();
        let out = fmt(16000, SampleType::Fixed16, 160);
        let EngineError::ConsistencyViolation(msg) =
            check_node("mic", &CAPS, &[&pdm], &[&out]).unwrap_err()
        else {
            panic!()
        };
        assert!(msg.contains("input 0 rate"));
    }

    #[test]
    fn rejects_cross_equality_violation() {
        let a = fmt(16000, SampleType::Fixed16, 160);
        let b = fmt(16000, SampleType::Fixed16, 128);
        let EngineError::ConsistencyViolation(msg) =
            check_node("n", &CAPS, &[&a], &[&b]).unwrap_err()
        else {
            panic!()
        };
        assert!(msg.contains("elements differs between input 0 and output 0"));
    }

    #[test]
    fn duration_constraint_admits_resampled_pairs() {
        let caps = Capabilities {
            consistency: ChunkConsistency {
                among_inputs: FieldSet::NONE,
                among_outputs: FieldSet::NONE,
                between: FieldSet::DURATION,
            },
            ..CAPS
        };
        let a = fmt(16000, SampleType::Fixed16, 160);
        let b = fmt(48000, SampleType::Fixed16, 480);
        check_node("n", &caps, &[&a], &[&b]).unwrap();
    }

    #[test]
    fn report_collects_and_merges() {
        let mut report = ConsistencyReport::new();
        assert!(report.is_clean());
        report.warn("fjoin", "band total 5 under output width 6");
        let mut other = ConsistencyReport::new();
        other.warn("rms", "window longer than a frame");
        report.merge(other);
        assert_eq!(report.warnings().len(), 2);
        assert!(!report.is_clean());
    }
}
