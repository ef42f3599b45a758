//! Audio stream description: sample type, rate, channel layout, domain.
//!
//! An [`AudioFormat`] fully describes the memory layout of one frame of
//! audio, including the strided addressing used for interleaved and
//! non-interleaved storage. PDM streams are addressed in bits (one sample
//! per bit, packed eight to a byte); all other types are addressed in whole
//! samples.
//!
//! The addressing law for a sample `(channel, element)` is
//!
//! ```text
//! byte = (channel * channels_offset + pos * samples_offset) * sample_size
//! ```
//!
//! where `pos = element` for PCM and `pos = element / 8` for PDM. Frequency
//! domain formats store complex bins (real, imaginary) and double both
//! strides accordingly; [`AudioFormat::byte_offset`] then addresses the real
//! part, with the imaginary part one sample behind it.

use crate::error::EngineError;

/// On-the-wire encoding of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// Signed 16-bit linear PCM (Q15).
    Fixed16,
    /// Signed 32-bit linear PCM (Q31).
    Fixed32,
    /// IEEE 754 single precision, nominal range [-1.0, 1.0).
    Float32,
    /// ITU-T G.711 A-law companded, one byte per sample.
    G711Alaw,
    /// ITU-T G.711 mu-law companded, one byte per sample.
    G711Mulaw,
    /// 1-bit pulse-density modulation, most significant bit first.
    PdmMsbFirst,
    /// 1-bit pulse-density modulation, least significant bit first.
    PdmLsbFirst,
}

impl SampleType {
    /// Size of the smallest addressable unit in bytes.
    ///
    /// PDM packs eight samples per byte, so the unit is the byte, not the
    /// sample.
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::Fixed16 => 2,
            Self::Fixed32 | Self::Float32 => 4,
            Self::G711Alaw | Self::G711Mulaw | Self::PdmMsbFirst | Self::PdmLsbFirst => 1,
        }
    }

    /// True for the 1-bit pulse-density types.
    pub const fn is_pdm(self) -> bool {
        matches!(self, Self::PdmMsbFirst | Self::PdmLsbFirst)
    }

    /// True for the G.711 companded types.
    pub const fn is_g711(self) -> bool {
        matches!(self, Self::G711Alaw | Self::G711Mulaw)
    }

    /// True for linear PCM types (fixed point or float).
    pub const fn is_linear(self) -> bool {
        matches!(self, Self::Fixed16 | Self::Fixed32 | Self::Float32)
    }

    /// Byte pattern representing silence for this encoding.
    ///
    /// Linear PCM is silent at numeric zero. A-law encodes zero as 0x55,
    /// mu-law as 0x7F. An idle PDM stream toggles every bit (0x55 = 50%
    /// density, the analog midpoint). Filling a whole buffer with this byte
    /// yields valid silence for every type.
    pub const fn silence_byte(self) -> u8 {
        match self {
            Self::Fixed16 | Self::Fixed32 | Self::Float32 => 0x00,
            Self::G711Alaw | Self::PdmMsbFirst | Self::PdmLsbFirst => 0x55,
            Self::G711Mulaw => 0x7F,
        }
    }

    /// Stable bit position for capability masks.
    pub(crate) const fn bit(self) -> u8 {
        match self {
            Self::Fixed16 => 0,
            Self::Fixed32 => 1,
            Self::Float32 => 2,
            Self::G711Alaw => 3,
            Self::G711Mulaw => 4,
            Self::PdmMsbFirst => 5,
            Self::PdmLsbFirst => 6,
        }
    }
}

/// Channel ordering within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interleaving {
    /// Samples of all channels alternate: `L0 R0 L1 R1 ...`
    Interleaved,
    /// Each channel occupies a contiguous block: `L0 L1 ... R0 R1 ...`
    NonInterleaved,
}

/// Time-domain samples or frequency-domain complex bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Elements are samples.
    Time,
    /// Elements are complex spectral bins (real, imaginary pairs).
    Frequency,
}

impl Domain {
    /// Stride multiplier: frequency-domain bins occupy two cells each.
    pub const fn complex_factor(self) -> usize {
        match self {
            Self::Time => 1,
            Self::Frequency => 2,
        }
    }
}

/// Standard PCM sample rates, in ascending order.
pub const PCM_RATES: [u32; 6] = [8000, 16000, 24000, 32000, 48000, 96000];

/// Standard PDM bit clock rates, in ascending order.
pub const PDM_RATES: [u32; 9] = [
    256_000, 384_000, 512_000, 768_000, 1_024_000, 1_536_000, 2_048_000, 3_072_000, 4_096_000,
];

/// Maximum channel count supported by the addressing model.
pub const MAX_CHANNELS: u8 = 8;

/// Complete description of one audio stream.
///
/// Immutable once constructed; [`AudioFormat::new`] rejects layouts the
/// addressing model cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    channels: u8,
    rate_hz: u32,
    sample_type: SampleType,
    interleaving: Interleaving,
    domain: Domain,
    elements: u32,
}

impl AudioFormat {
    /// Builds a validated format.
    ///
    /// `elements` counts samples per channel per frame in the time domain
    /// (bits for PDM) and complex bins in the frequency domain.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedFormat`] when the layout is not
    /// expressible: zero elements or rate, more than [`MAX_CHANNELS`]
    /// channels, PDM element counts that are not byte-aligned, or
    /// frequency-domain companded/PDM streams.
    pub fn new(
        channels: u8,
        rate_hz: u32,
        sample_type: SampleType,
        interleaving: Interleaving,
        domain: Domain,
        elements: u32,
    ) -> Result<Self, EngineError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(EngineError::UnsupportedFormat("channel count out of range"));
        }
        if rate_hz == 0 {
            return Err(EngineError::UnsupportedFormat("sample rate must be non-zero"));
        }
        if elements == 0 {
            return Err(EngineError::UnsupportedFormat("element count must be non-zero"));
        }
        if sample_type.is_pdm() {
            if domain == Domain::Frequency {
                return Err(EngineError::UnsupportedFormat("PDM streams are time-domain only"));
            }
            if elements % 8 != 0 {
                return Err(EngineError::UnsupportedFormat(
                    "PDM element count must be a multiple of 8",
                ));
            }
        }
        if domain == Domain::Frequency && !sample_type.is_linear() {
            return Err(EngineError::UnsupportedFormat(
                "frequency domain requires a linear sample type",
            ));
        }
        Ok(Self { channels, rate_hz, sample_type, interleaving, domain, elements })
    }

    /// Number of channels.
    pub const fn channels(&self) -> u8 {
        self.channels
    }

    /// Sample rate in Hz (bit clock rate for PDM).
    pub const fn rate_hz(&self) -> u32 {
        self.rate_hz
    }

    /// Per-sample encoding.
    pub const fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    /// Channel ordering.
    pub const fn interleaving(&self) -> Interleaving {
        self.interleaving
    }

    /// Time or frequency domain.
    pub const fn domain(&self) -> Domain {
        self.domain
    }

    /// Elements per channel per frame: samples (bits for PDM) or complex
    /// bins.
    pub const fn elements(&self) -> u32 {
        self.elements
    }

    /// Size of the addressable unit in bytes. See [`SampleType::size_bytes`].
    pub const fn sample_size(&self) -> usize {
        self.sample_type.size_bytes()
    }

    /// Stride, in addressable units, between successive samples of one
    /// channel. Includes the complex factor for frequency-domain formats.
    pub const fn samples_offset(&self) -> usize {
        let base = match self.interleaving {
            Interleaving::Interleaved => self.channels as usize,
            Interleaving::NonInterleaved => 1,
        };
        base * self.domain.complex_factor()
    }

    /// Stride, in addressable units, between the bases of successive
    /// channels. Includes the complex factor for frequency-domain formats.
    pub const fn channels_offset(&self) -> usize {
        let base = match self.interleaving {
            Interleaving::Interleaved => 1,
            Interleaving::NonInterleaved => {
                if self.sample_type.is_pdm() {
                    (self.elements as usize) / 8
                } else {
                    self.elements as usize
                }
            }
        };
        base * self.domain.complex_factor()
    }

    /// Byte offset of sample `(channel, element)` within one frame.
    ///
    /// For PDM the returned offset addresses the byte holding the bit;
    /// `element % 8` selects the bit within it. For frequency-domain formats
    /// it addresses the real part of bin `element`.
    pub const fn byte_offset(&self, channel: usize, element: usize) -> usize {
        let pos = if self.sample_type.is_pdm() { element >> 3 } else { element };
        (channel * self.channels_offset() + pos * self.samples_offset()) * self.sample_size()
    }

    /// Bytes occupied by one channel of one frame.
    pub const fn channel_bytes(&self) -> usize {
        if self.sample_type.is_pdm() {
            (self.elements as usize) / 8
        } else {
            self.elements as usize * self.sample_size() * self.domain.complex_factor()
        }
    }

    /// Total bytes occupied by one frame, all channels.
    pub const fn frame_bytes(&self) -> usize {
        self.channels as usize * self.channel_bytes()
    }

    /// True when two formats describe frames of identical wall-clock
    /// duration. Exact integer cross-multiplication, no float rounding.
    pub const fn same_duration(&self, other: &Self) -> bool {
        self.elements as u64 * other.rate_hz as u64 == other.elements as u64 * self.rate_hz as u64
    }

    /// Silence byte pattern for this format. See [`SampleType::silence_byte`].
    pub const fn silence_byte(&self) -> u8 {
        self.sample_type.silence_byte()
    }
}
