//! Sample format conversion between two frame layouts.
//!
//! A [`FormatConverter`] is built once for a fixed input/output format pair
//! and then applied frame by frame. It converts sample type, interleaving,
//! or both, walking each side with its own addressing law so any layout
//! pair the formats can express is supported. Channel count, element count
//! and rate must match; PDM and frequency-domain formats are rejected
//! (1-bit streams have no per-sample value to convert).
//!
//! Pure integer conversions route through a Q31 intermediate and are exact
//! both ways where the destination can represent the source. As soon as a
//! float is involved, or the converter is given a gain or asked to mix into
//! the destination, the samples route through `f32` with saturating
//! store.

use crate::error::EngineError;
use crate::format::{AudioFormat, Domain, SampleType};
use crate::g711;

/// One sample's worth of load/store and rescaling.
trait Sample: Copy {
    const BYTES: usize;
    fn load(bytes: &[u8]) -> Self;
    fn store(self, bytes: &mut [u8]);
    fn to_q31(self) -> i32;
    fn from_q31(v: i32) -> Self;
    fn to_f32(self) -> f32;
    fn from_f32(v: f32) -> Self;
}

impl Sample for i16 {
    const BYTES: usize = 2;
    fn load(bytes: &[u8]) -> Self {
        Self::from_le_bytes([bytes[0], bytes[1]])
    }
    fn store(self, bytes: &mut [u8]) {
        bytes[..2].copy_from_slice(&self.to_le_bytes());
    }
    fn to_q31(self) -> i32 {
        i32::from(self) << 16
    }
    fn from_q31(v: i32) -> Self {
        (v >> 16) as i16
    }
    fn to_f32(self) -> f32 {
        f32::from(self) / 32768.0
    }
    fn from_f32(v: f32) -> Self {
        // float-to-int casts saturate
        (v * 32768.0) as i16
    }
}

impl Sample for i32 {
    const BYTES: usize = 4;
    fn load(bytes: &[u8]) -> Self {
        Self::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
    fn store(self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_le_bytes());
    }
    fn to_q31(self) -> i32 {
        self
    }
    fn from_q31(v: i32) -> Self {
        v
    }
    fn to_f32(self) -> f32 {
        self as f32 / 2_147_483_648.0
    }
    fn from_f32(v: f32) -> Self {
        (v * 2_147_483_648.0) as i32
    }
}

impl Sample for f32 {
    const BYTES: usize = 4;
    fn load(bytes: &[u8]) -> Self {
        Self::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
    fn store(self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_le_bytes());
    }
    fn to_q31(self) -> i32 {
        (self * 2_147_483_648.0) as i32
    }
    fn from_q31(v: i32) -> Self {
        v as f32 / 2_147_483_648.0
    }
    fn to_f32(self) -> f32 {
        self
    }
    fn from_f32(v: f32) -> Self {
        v
    }
}

#[derive(Clone, Copy)]
struct ALaw(u8);

impl Sample for ALaw {
    const BYTES: usize = 1;
    fn load(bytes: &[u8]) -> Self {
        Self(bytes[0])
    }
    fn store(self, bytes: &mut [u8]) {
        bytes[0] = self.0;
    }
    fn to_q31(self) -> i32 {
        g711::alaw_to_linear(self.0).to_q31()
    }
    fn from_q31(v: i32) -> Self {
        Self(g711::linear_to_alaw(i16::from_q31(v)))
    }
    fn to_f32(self) -> f32 {
        g711::alaw_to_linear(self.0).to_f32()
    }
    fn from_f32(v: f32) -> Self {
        Self(g711::linear_to_alaw(i16::from_f32(v)))
    }
}

#[derive(Clone, Copy)]
struct MuLaw(u8);

impl Sample for MuLaw {
    const BYTES: usize = 1;
    fn load(bytes: &[u8]) -> Self {
        Self(bytes[0])
    }
    fn store(self, bytes: &mut [u8]) {
        bytes[0] = self.0;
    }
    fn to_q31(self) -> i32 {
        g711::mulaw_to_linear(self.0).to_q31()
    }
    fn from_q31(v: i32) -> Self {
        Self(g711::linear_to_mulaw(i16::from_q31(v)))
    }
    fn to_f32(self) -> f32 {
        g711::mulaw_to_linear(self.0).to_f32()
    }
    fn from_f32(v: f32) -> Self {
        Self(g711::linear_to_mulaw(i16::from_f32(v)))
    }
}

type KernelFn = fn(&FormatConverter, &[u8], &mut [u8]);

fn convert_loop<I: Sample, O: Sample>(ctx: &FormatConverter, input: &[u8], output: &mut [u8]) {
    let channels = ctx.input.channels() as usize;
    let elements = ctx.input.elements() as usize;
    let float_path = ctx.mix || ctx.gain != 1.0;
    for ch in 0..channels {
        for el in 0..elements {
            let i_off = ctx.input.byte_offset(ch, el);
            let o_off = ctx.output.byte_offset(ch, el);
            let src = I::load(&input[i_off..i_off + I::BYTES]);
            let dst = &mut output[o_off..o_off + O::BYTES];
            if float_path {
                let mut v = src.to_f32() * ctx.gain;
                if ctx.mix {
                    v += O::load(dst).to_f32();
                }
                O::from_f32(v).store(dst);
            } else {
                O::from_q31(src.to_q31()).store(dst);
            }
        }
    }
}

fn kernel_for(input: SampleType, output: SampleType) -> Result<KernelFn, EngineError> {
    use SampleType::{Fixed16, Fixed32, Float32, G711Alaw, G711Mulaw};
    if input.is_pdm() || output.is_pdm() {
        return Err(EngineError::UnsupportedFormat("PDM streams cannot be value-converted"));
    }
    Ok(match (input, output) {
        (Fixed16, Fixed16) => convert_loop::<i16, i16>,
        (Fixed16, Fixed32) => convert_loop::<i16, i32>,
        (Fixed16, Float32) => convert_loop::<i16, f32>,
        (Fixed16, G711Alaw) => convert_loop::<i16, ALaw>,
        (Fixed16, G711Mulaw) => convert_loop::<i16, MuLaw>,
        (Fixed32, Fixed16) => convert_loop::<i32, i16>,
        (Fixed32, Fixed32) => convert_loop::<i32, i32>,
        (Fixed32, Float32) => convert_loop::<i32, f32>,
        (Fixed32, G711Alaw) => convert_loop::<i32, ALaw>,
        (Fixed32, G711Mulaw) => convert_loop::<i32, MuLaw>,
        (Float32, Fixed16) => convert_loop::<f32, i16>,
        (Float32, Fixed32) => convert_loop::<f32, i32>,
        (Float32, Float32) => convert_loop::<f32, f32>,
        (Float32, G711Alaw) => convert_loop::<f32, ALaw>,
        (Float32, G711Mulaw) => convert_loop::<f32, MuLaw>,
        (G711Alaw, Fixed16) => convert_loop::<ALaw, i16>,
        (G711Alaw, Fixed32) => convert_loop::<ALaw, i32>,
        (G711Alaw, Float32) => convert_loop::<ALaw, f32>,
        (G711Alaw, G711Alaw) => convert_loop::<ALaw, ALaw>,
        (G711Alaw, G711Mulaw) => convert_loop::<ALaw, MuLaw>,
        (G711Mulaw, Fixed16) => convert_loop::<MuLaw, i16>,
        (G711Mulaw, Fixed32) => convert_loop::<MuLaw, i32>,
        (G711Mulaw, Float32) => convert_loop::<MuLaw, f32>,
        (G711Mulaw, G711Alaw) => convert_loop::<MuLaw, ALaw>,
        (G711Mulaw, G711Mulaw) => convert_loop::<MuLaw, MuLaw>,
        _ => return Err(EngineError::UnsupportedFormat("no conversion kernel for this pair")),
    })
}

/// Frame-by-frame converter between two fixed formats.
pub struct FormatConverter {
    input: AudioFormat,
    output: AudioFormat,
    mix: bool,
    gain: f32,
    kernel: KernelFn,
}

impl FormatConverter {
    /// Builds a converter for a fixed format pair.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnsupportedFormat`] for PDM or frequency-domain
    /// formats, or when channel count, element count, or rate differ.
    pub fn new(input: &AudioFormat, output: &AudioFormat) -> Result<Self, EngineError> {
        if input.domain() != Domain::Time || output.domain() != Domain::Time {
            return Err(EngineError::UnsupportedFormat("conversion is time-domain only"));
        }
        if input.channels() != output.channels() {
            return Err(EngineError::UnsupportedFormat("channel counts differ"));
        }
        if input.elements() != output.elements() {
            return Err(EngineError::UnsupportedFormat("element counts differ"));
        }
        if input.rate_hz() != output.rate_hz() {
            return Err(EngineError::UnsupportedFormat("rates differ"));
        }
        let kernel = kernel_for(input.sample_type(), output.sample_type())?;
        Ok(Self { input: *input, output: *output, mix: false, gain: 1.0, kernel })
    }

    /// Sets a linear gain and whether output samples are mixed into the
    /// destination instead of overwriting it. Gain 1.0 without mixing
    /// restores the exact integer path.
    pub fn set_gain(&mut self, mix: bool, gain: f32) {
        self.mix = mix;
        self.gain = gain;
    }

    /// Input format.
    pub fn input(&self) -> &AudioFormat {
        &self.input
    }

    /// Output format.
    pub fn output(&self) -> &AudioFormat {
        &self.output
    }

    /// Converts one input frame into one output frame.
    ///
    /// `input` and `output` must each hold exactly one frame of their
    /// format.
    pub fn convert(&self, input: &[u8], output: &mut [u8]) {
        debug_assert_eq!(input.len(), self.input.frame_bytes());
        debug_assert_eq!(output.len(), self.output.frame_bytes());
        (self.kernel)(self, input, output);
    }

    /// Fills one output frame with silence in the output encoding.
    pub fn clear(&self, output: &mut [u8]) {
        output.fill(self.output.silence_byte());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Interleaving, SampleType};

    fn fmt(ty: SampleType, il: Interleaving) -> AudioFormat {
        AudioFormat::new(2, 16000, ty, il, Domain::Time, 4).unwrap()
    }

    fn frame_i16(f: &AudioFormat, fill: impl Fn(usize, usize) -> i16) -> Vec<u8> {
        let mut bytes = vec![0u8; f.frame_bytes()];
        for ch in 0..f.channels() as usize {
            for el in 0..f.elements() as usize {
                let off = f.byte_offset(ch, el);
                bytes[off..off + 2].copy_from_slice(&fill(ch, el).to_le_bytes());
            }
        }
        bytes
    }

    #[test]
    fn i16_to_i32_and_back_is_bit_exact() {
        let a = fmt(SampleType::Fixed16, Interleaving::Interleaved);
        let b = fmt(SampleType::Fixed32, Interleaving::Interleaved);
        let up = FormatConverter::new(&a, &b).unwrap();
        let down = FormatConverter::new(&b, &a).unwrap();
        let src = frame_i16(&a, |ch, el| (ch as i16 * 1000) + el as i16 * 7 - 3);
        let mut wide = vec![0u8; b.frame_bytes()];
        let mut back = vec![0u8; a.frame_bytes()];
        up.convert(&src, &mut wide);
        down.convert(&wide, &mut back);
        assert_eq!(src, back);
    }

    #[test]
    fn i16_through_f32_is_bit_exact() {
        let a = fmt(SampleType::Fixed16, Interleaving::Interleaved);
        let b = fmt(SampleType::Float32, Interleaving::Interleaved);
        let up = FormatConverter::new(&a, &b).unwrap();
        let down = FormatConverter::new(&b, &a).unwrap();
        let src = frame_i16(&a, |_, el| [i16::MIN, -1, 0, 12345][el]);
        let mut floats = vec![0u8; b.frame_bytes()];
        let mut back = vec![0u8; a.frame_bytes()];
        up.convert(&src, &mut floats);
        down.convert(&floats, &mut back);
        assert_eq!(src, back);
    }

    #[test]
    fn reinterleaving_moves_samples_not_values() {
        let a = fmt(SampleType::Fixed16, Interleaving::Interleaved);
        let b = fmt(SampleType::Fixed16, Interleaving::NonInterleaved);
        let conv = FormatConverter::new(&a, &b).unwrap();
        let src = frame_i16(&a, |ch, el| (ch * 100 + el) as i16);
        let mut dst = vec![0u8; b.frame_bytes()];
        conv.convert(&src, &mut dst);
        for ch in 0..2 {
            for el in 0..4 {
                let off = b.byte_offset(ch, el);
                let v = i16::from_le_bytes([dst[off], dst[off + 1]]);
                assert_eq!(v, (ch * 100 + el) as i16);
            }
        }
    }

    #[test]
    fn gain_scales_through_the_float_path() {
        let a = fmt(SampleType::Fixed16, Interleaving::Interleaved);
        let mut conv = FormatConverter::new(&a, &a).unwrap();
        conv.set_gain(false, 0.5);
        let src = frame_i16(&a, |_, _| 10000);
        let mut dst = vec![0u8; a.frame_bytes()];
        conv.convert(&src, &mut dst);
        let v = i16::from_le_bytes([dst[0], dst[1]]);
        assert_eq!(v, 5000);
    }

    #[test]
    fn mix_accumulates_and_saturates() {
        let a = fmt(SampleType::Fixed16, Interleaving::Interleaved);
        let mut conv = FormatConverter::new(&a, &a).unwrap();
        conv.set_gain(true, 1.0);
        let src = frame_i16(&a, |_, _| 30000);
        let mut dst = frame_i16(&a, |_, _| 10000);
        conv.convert(&src, &mut dst);
        let v = i16::from_le_bytes([dst[0], dst[1]]);
        // 30000 + 10000 clips at full scale
        assert_eq!(v, i16::MAX);
    }

    #[test]
    fn alaw_decodes_encode_as_identity_through_i16() {
        let alaw = AudioFormat::new(
            1,
            8000,
            SampleType::G711Alaw,
            Interleaving::Interleaved,
            Domain::Time,
            256,
        )
        .unwrap();
        let lin = AudioFormat::new(
            1,
            8000,
            SampleType::Fixed16,
            Interleaving::Interleaved,
            Domain::Time,
            256,
        )
        .unwrap();
        let dec = FormatConverter::new(&alaw, &lin).unwrap();
        let enc = FormatConverter::new(&lin, &alaw).unwrap();
        let src: Vec<u8> = (0..=255).collect();
        let mut linear = vec![0u8; lin.frame_bytes()];
        let mut back = vec![0u8; alaw.frame_bytes()];
        dec.convert(&src, &mut linear);
        enc.convert(&linear, &mut back);
        assert_eq!(src, back);
    }

    #[test]
    fn rejects_pdm_and_mismatched_layouts() {
        let pdm = AudioFormat::new(
            1,
            1_024_000,
            SampleType::PdmMsbFirst,
            Interleaving::NonInterleaved,
            Domain::Time,
            64,
        )
        .unwrap();
        let lin = fmt(SampleType::Fixed16, Interleaving::Interleaved);
        assert!(FormatConverter::new(&pdm, &lin).is_err());
        let wrong_elements =
            AudioFormat::new(2, 16000, SampleType::Fixed16, Interleaving::Interleaved, Domain::Time, 8)
                .unwrap();
        assert!(FormatConverter::new(&lin, &wrong_elements).is_err());
    }

    #[test]
    fn clear_writes_encoding_silence() {
        let mulaw = AudioFormat::new(
            1,
            8000,
            SampleType::G711Mulaw,
            Interleaving::Interleaved,
            Domain::Time,
            8,
        )
        .unwrap();
        let lin = AudioFormat::new(
            1,
            8000,
            SampleType::Fixed16,
            Interleaving::Interleaved,
            Domain::Time,
            8,
        )
        .unwrap();
        let conv = FormatConverter::new(&lin, &mulaw).unwrap();
        let mut out = vec![0u8; mulaw.frame_bytes()];
        conv.clear(&mut out);
        assert!(out.iter().all(|&b| b == 0x7F));
    }
}
