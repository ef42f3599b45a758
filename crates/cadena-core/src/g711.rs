//! ITU-T G.711 companding: A-law and mu-law to and from 16-bit linear.
//!
//! Algorithmic segment encoding, no lookup tables. Both laws are exact
//! inverses over their own codeword space: `encode(decode(c)) == c` for
//! every A-law codeword and every mu-law codeword except 0x7F, the
//! negative-zero code, which decodes to the same value as 0xFF.

const SIGN_BIT: u8 = 0x80;
const QUANT_MASK: u8 = 0x0F;
const SEG_SHIFT: u8 = 4;
const SEG_MASK: u8 = 0x70;
const BIAS: i32 = 0x84;
const CLIP: i32 = 8159;

const SEG_AEND: [i32; 8] = [0x1F, 0x3F, 0x7F, 0xFF, 0x1FF, 0x3FF, 0x7FF, 0xFFF];
const SEG_UEND: [i32; 8] = [0x3F, 0x7F, 0xFF, 0x1FF, 0x3FF, 0x7FF, 0xFFF, 0x1FFF];

fn segment(value: i32, table: &[i32; 8]) -> usize {
    table.iter().position(|&end| value <= end).unwrap_or(8)
}

/// Decodes one A-law codeword to 16-bit linear.
pub fn alaw_to_linear(code: u8) -> i16 {
    let code = code ^ 0x55;
    let mut t = i32::from(code & QUANT_MASK) << 4;
    let seg = (code & SEG_MASK) >> SEG_SHIFT;
    match seg {
        0 => t += 8,
        1 => t += 0x108,
        _ => {
            t += 0x108;
            t <<= seg - 1;
        }
    }
    let t = t as i16;
    if code & SIGN_BIT != 0 { t } else { -t }
}

/// Encodes 16-bit linear to one A-law codeword.
pub fn linear_to_alaw(pcm: i16) -> u8 {
    let mut value = i32::from(pcm) >> 3;
    let mask = if value >= 0 {
        0xD5
    } else {
        value = -value - 1;
        0x55
    };
    let seg = segment(value, &SEG_AEND);
    if seg >= 8 {
        return 0x7F ^ mask;
    }
    let mut code = (seg as u8) << SEG_SHIFT;
    let shift = if seg < 2 { 1 } else { seg };
    code |= ((value >> shift) as u8) & QUANT_MASK;
    code ^ mask
}

/// Decodes one mu-law codeword to 16-bit linear.
pub fn mulaw_to_linear(code: u8) -> i16 {
    let code = !code;
    let mut t = (i32::from(code & QUANT_MASK) << 3) + BIAS;
    t <<= (code & SEG_MASK) >> SEG_SHIFT;
    let t = if code & SIGN_BIT != 0 { BIAS - t } else { t - BIAS };
    t as i16
}

/// Encodes 16-bit linear to one mu-law codeword.
pub fn linear_to_mulaw(pcm: i16) -> u8 {
    let mut value = i32::from(pcm) >> 2;
    let mask = if value < 0 {
        value = -value;
        0x7F
    } else {
        0xFF
    };
    if value > CLIP {
        value = CLIP;
    }
    value += BIAS >> 2;
    let seg = segment(value, &SEG_UEND);
    if seg >= 8 {
        return 0x7F ^ mask;
    }
    let code = ((seg as u8) << SEG_SHIFT) | (((value >> (seg + 1)) as u8) & QUANT_MASK);
    code ^ mask
}
