//! Declarative capability sets: what formats a node admits on its ports.
//!
//! Every algorithm publishes a `'static` [`Capabilities`] record built from
//! small const bit-set newtypes. The chain checks each bound chunk against
//! them at build time, before any node is initialized, so format mismatches
//! are rejected with a precise field name instead of corrupting audio at
//! run time.

use crate::format::{AudioFormat, Domain, Interleaving, SampleType, PCM_RATES, PDM_RATES};

/// Set of admissible [`SampleType`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSet(u8);

impl TypeSet {
    /// Admits nothing.
    pub const EMPTY: Self = Self(0);
    /// 16-bit fixed point.
    pub const FIXED16: Self = Self(1 << 0);
    /// 32-bit fixed point.
    pub const FIXED32: Self = Self(1 << 1);
    /// 32-bit float.
    pub const FLOAT32: Self = Self(1 << 2);
    /// G.711 A-law.
    pub const G711_ALAW: Self = Self(1 << 3);
    /// G.711 mu-law.
    pub const G711_MULAW: Self = Self(1 << 4);
    /// PDM, MSB first.
    pub const PDM_MSB: Self = Self(1 << 5);
    /// PDM, LSB first.
    pub const PDM_LSB: Self = Self(1 << 6);

    /// Both G.711 companding laws.
    pub const G711: Self = Self::G711_ALAW.or(Self::G711_MULAW);
    /// Both PDM bit orders.
    pub const PDM: Self = Self::PDM_MSB.or(Self::PDM_LSB);
    /// All linear PCM types.
    pub const LINEAR: Self = Self::FIXED16.or(Self::FIXED32).or(Self::FLOAT32);
    /// Every sample type.
    pub const ALL: Self = Self::LINEAR.or(Self::G711).or(Self::PDM);

    /// Union of two sets.
    pub const fn or(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Membership test.
    pub const fn contains(self, ty: SampleType) -> bool {
        self.0 & (1 << ty.bit()) != 0
    }
}

/// Set of admissible sample rates.
///
/// Bits cover the standard PCM and PDM rate tables; the `CUSTOM` bit admits
/// any rate outside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSet(u16);

impl RateSet {
    /// Admits nothing.
    pub const EMPTY: Self = Self(0);
    /// All standard PCM rates.
    pub const PCM: Self = Self((1 << PCM_RATES.len()) - 1);
    /// All standard PDM bit clock rates.
    pub const PDM: Self = Self(((1 << PDM_RATES.len()) - 1) << PCM_RATES.len());
    /// Any rate outside the standard tables.
    pub const CUSTOM: Self = Self(1 << 15);
    /// Every rate.
    pub const ALL: Self = Self::PCM.or(Self::PDM).or(Self::CUSTOM);

    /// Union of two sets.
    pub const fn or(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Membership test. Rates in the standard tables test their own bit;
    /// anything else tests `CUSTOM`.
    pub fn contains(self, rate_hz: u32) -> bool {
        if let Some(i) = PCM_RATES.iter().position(|&r| r == rate_hz) {
            return self.0 & (1 << i) != 0;
        }
        if let Some(i) = PDM_RATES.iter().position(|&r| r == rate_hz) {
            return self.0 & (1 << (PCM_RATES.len() + i)) != 0;
        }
        self.0 & Self::CUSTOM.0 != 0
    }
}

/// Set of admissible channel counts (bit `n` admits `n` channels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSet(u16);

impl ChannelSet {
    /// Admits nothing.
    pub const EMPTY: Self = Self(0);
    /// Exactly one channel.
    pub const MONO: Self = Self::exactly(1);
    /// Exactly two channels.
    pub const STEREO: Self = Self::exactly(2);
    /// Any count from 1 to [`crate::format::MAX_CHANNELS`].
    pub const ALL: Self = Self(0b1_1111_1110);

    /// Admits exactly `n` channels.
    pub const fn exactly(n: u8) -> Self {
        Self(1 << n)
    }

    /// Union of two sets.
    pub const fn or(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Membership test.
    pub const fn contains(self, channels: u8) -> bool {
        channels < 16 && self.0 & (1 << channels) != 0
    }
}

/// Set of admissible channel orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleavingSet(u8);

impl InterleavingSet {
    /// Interleaved only.
    pub const INTERLEAVED: Self = Self(1);
    /// Non-interleaved only.
    pub const NON_INTERLEAVED: Self = Self(2);
    /// Either ordering.
    pub const BOTH: Self = Self(3);

    /// Membership test.
    pub const fn contains(self, il: Interleaving) -> bool {
        match il {
            Interleaving::Interleaved => self.0 & 1 != 0,
            Interleaving::NonInterleaved => self.0 & 2 != 0,
        }
    }
}

/// Set of admissible domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainSet(u8);

impl DomainSet {
    /// Time domain only.
    pub const TIME: Self = Self(1);
    /// Frequency domain only.
    pub const FREQUENCY: Self = Self(2);
    /// Either domain.
    pub const BOTH: Self = Self(3);

    /// Membership test.
    pub const fn contains(self, domain: Domain) -> bool {
        match domain {
            Domain::Time => self.0 & 1 != 0,
            Domain::Frequency => self.0 & 2 != 0,
        }
    }
}

/// Set of admissible port counts (bit `n` admits `n` ports, bit 15 admits
/// any larger count).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortCountSet(u16);

impl PortCountSet {
    /// No ports on this side (sources have no inputs, sinks no outputs).
    pub const NONE: Self = Self(1 << 0);
    /// Exactly one port.
    pub const ONE: Self = Self(1 << 1);
    /// Exactly two ports.
    pub const TWO: Self = Self(1 << 2);
    /// Any count of one or more.
    pub const MANY: Self = Self(!1);

    /// Admits exactly `n` ports.
    pub const fn exactly(n: u8) -> Self {
        Self(1 << n)
    }

    /// Union of two sets.
    pub const fn or(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Membership test.
    pub const fn contains(self, count: usize) -> bool {
        if count < 15 { self.0 & (1 << count) != 0 } else { self.0 & (1 << 15) != 0 }
    }
}

/// Format fields, as named by equality constraints and admission failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Sample rate.
    Rate,
    /// Channel count.
    Channels,
    /// Sample type.
    Type,
    /// Channel ordering.
    Interleaving,
    /// Time or frequency domain.
    Domain,
    /// Elements per frame.
    Elements,
    /// Frame wall-clock duration.
    Duration,
}

impl Field {
    /// Field name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rate => "rate",
            Self::Channels => "channels",
            Self::Type => "type",
            Self::Interleaving => "interleaving",
            Self::Domain => "domain",
            Self::Elements => "elements",
            Self::Duration => "duration",
        }
    }
}

/// Set of format fields that must agree across a group of chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSet(u8);

impl FieldSet {
    /// No constraint.
    pub const NONE: Self = Self(0);
    /// Rate must agree.
    pub const RATE: Self = Self(1 << 0);
    /// Channel count must agree.
    pub const CHANNELS: Self = Self(1 << 1);
    /// Sample type must agree.
    pub const TYPE: Self = Self(1 << 2);
    /// Interleaving must agree.
    pub const INTERLEAVING: Self = Self(1 << 3);
    /// Domain must agree.
    pub const DOMAIN: Self = Self(1 << 4);
    /// Element count must agree.
    pub const ELEMENTS: Self = Self(1 << 5);
    /// Frame duration must agree (weaker than `ELEMENTS`: rate and element
    /// count may both differ as long as the wall-clock span matches).
    pub const DURATION: Self = Self(1 << 6);

    /// Every field including element count.
    pub const ALL: Self = Self::RATE
        .or(Self::CHANNELS)
        .or(Self::TYPE)
        .or(Self::INTERLEAVING)
        .or(Self::DOMAIN)
        .or(Self::ELEMENTS);
    /// Everything except sample type: the usual contract of a converter.
    pub const ALL_BUT_TYPE: Self =
        Self::RATE.or(Self::CHANNELS).or(Self::INTERLEAVING).or(Self::DOMAIN).or(Self::ELEMENTS);
    /// Same clock and span without pinning the layout.
    pub const SAME_CLOCK: Self = Self::RATE.or(Self::DURATION);

    /// Union of two sets.
    pub const fn or(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Membership test.
    pub const fn contains(self, field: Field) -> bool {
        let bit = match field {
            Field::Rate => Self::RATE.0,
            Field::Channels => Self::CHANNELS.0,
            Field::Type => Self::TYPE.0,
            Field::Interleaving => Self::INTERLEAVING.0,
            Field::Domain => Self::DOMAIN.0,
            Field::Elements => Self::ELEMENTS.0,
            Field::Duration => Self::DURATION.0,
        };
        self.0 & bit != 0
    }

    /// Fields in this set, in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Field> {
        [
            Field::Rate,
            Field::Channels,
            Field::Type,
            Field::Interleaving,
            Field::Domain,
            Field::Elements,
            Field::Duration,
        ]
        .into_iter()
        .filter(move |&f| self.contains(f))
    }
}

/// Constraints one side (input or output) of a node places on its ports.
#[derive(Debug, Clone, Copy)]
pub struct PortRequirements {
    /// Admissible number of ports on this side.
    pub count: PortCountSet,
    /// Admissible channel counts.
    pub channels: ChannelSet,
    /// Admissible sample rates.
    pub rates: RateSet,
    /// Admissible sample types.
    pub types: TypeSet,
    /// Admissible channel orderings.
    pub interleaving: InterleavingSet,
    /// Admissible domains.
    pub domains: DomainSet,
}

impl PortRequirements {
    /// A side with no ports at all.
    pub const fn none() -> Self {
        Self {
            count: PortCountSet::NONE,
            channels: ChannelSet::EMPTY,
            rates: RateSet::EMPTY,
            types: TypeSet::EMPTY,
            interleaving: InterleavingSet::BOTH,
            domains: DomainSet::BOTH,
        }
    }

    /// A maximally permissive side with `count` ports.
    pub const fn any(count: PortCountSet) -> Self {
        Self {
            count,
            channels: ChannelSet::ALL,
            rates: RateSet::ALL,
            types: TypeSet::ALL,
            interleaving: InterleavingSet::BOTH,
            domains: DomainSet::BOTH,
        }
    }

    /// Checks one bound format against this side's sets.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`Field`].
    pub fn admits(&self, format: &AudioFormat) -> Result<(), Field> {
        if !self.rates.contains(format.rate_hz()) {
            return Err(Field::Rate);
        }
        if !self.channels.contains(format.channels()) {
            return Err(Field::Channels);
        }
        if !self.types.contains(format.sample_type()) {
            return Err(Field::Type);
        }
        if !self.interleaving.contains(format.interleaving()) {
            return Err(Field::Interleaving);
        }
        if !self.domains.contains(format.domain()) {
            return Err(Field::Domain);
        }
        Ok(())
    }
}

/// Equality constraints among a node's bound chunks.
#[derive(Debug, Clone, Copy)]
pub struct ChunkConsistency {
    /// Fields that must agree across all input chunks.
    pub among_inputs: FieldSet,
    /// Fields that must agree across all output chunks.
    pub among_outputs: FieldSet,
    /// Fields that must agree between every input and every output.
    pub between: FieldSet,
}

impl ChunkConsistency {
    /// No equality constraints.
    pub const NONE: Self =
        Self { among_inputs: FieldSet::NONE, among_outputs: FieldSet::NONE, between: FieldSet::NONE };

    /// Everything must match everywhere: the contract of an in-place style
    /// transform.
    pub const STRICT: Self =
        Self { among_inputs: FieldSet::ALL, among_outputs: FieldSet::ALL, between: FieldSet::ALL };
}

/// A node's complete published contract.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// Stable algorithm name for diagnostics.
    pub name: &'static str,
    /// Input-side constraints.
    pub inputs: PortRequirements,
    /// Output-side constraints.
    pub outputs: PortRequirements,
    /// Cross-chunk equality constraints.
    pub consistency: ChunkConsistency,
}
