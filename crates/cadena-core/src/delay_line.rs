//! Circular delay ring over pool memory, PCM and PDM.
//!
//! One ring serves a whole node: per channel it holds `elements + delay`
//! samples and exchanges exactly one frame per call, writing the newest
//! frame in and reading the frame `delay` samples behind it out. The ring
//! starts silence-filled, so the first `delay` samples a consumer sees are
//! valid silence.
//!
//! PCM frames whose channel data is contiguous (interleaved, or mono) are
//! collapsed to a single channel of wider samples and move as two block
//! copies per side at most (the wrap split). PDM rings are kept
//! non-interleaved regardless of the stream layout and are addressed in
//! bits; the requested delay is rounded up to a multiple of 8 for the
//! allocation so the write side stays byte-aligned, while reads at a
//! non-aligned bit position run a 16-bit shift register honoring the
//! stream's bit order.

use crate::chunk::Chunk;
use crate::error::EngineError;
use crate::format::{AudioFormat, Interleaving};
use crate::pool::{MemoryPools, PoolBlock, PoolKind};

/// A fixed-delay circular buffer exchanging one frame per call.
pub struct DelayRing {
    block: PoolBlock,
    is_pdm: bool,
    pdm_msb_first: bool,
    pdm_interleaved: bool,
    /// Bytes per effective sample; multiplied by the channel count when the
    /// channels collapse to one block.
    sample_size: usize,
    /// Effective channel count (1 when collapsed).
    channels: usize,
    /// Samples (bits for PDM) per frame per effective channel.
    nb_samples: usize,
    /// Byte stride between successive samples of one channel in the chunk.
    samples_offset: usize,
    delay_samples: usize,
    /// Ring length in samples per effective channel.
    alloc_samples: usize,
    /// Ring bytes per effective channel.
    ch_bytes: usize,
    write_pos: usize,
}

impl DelayRing {
    /// Allocates a silence-filled ring for `format` with the given delay.
    ///
    /// # Errors
    ///
    /// Propagates pool exhaustion.
    pub fn new(
        format: &AudioFormat,
        delay_samples: usize,
        pools: &MemoryPools,
        pool: PoolKind,
    ) -> Result<Self, EngineError> {
        let is_pdm = format.sample_type().is_pdm();
        let interleaved = format.interleaving() == Interleaving::Interleaved;
        let channels = format.channels() as usize;
        let sample_size = format.sample_size();
        let nb_samples = format.elements() as usize;
        // contiguous channel data moves as one block
        let block_copy = !is_pdm && (interleaved || channels == 1);

        // keep the write position byte-aligned for PDM
        let alloc_delay =
            if is_pdm { (delay_samples + 7) & !7 } else { delay_samples };
        let alloc_samples = nb_samples + alloc_delay;
        let per_channel =
            if is_pdm { alloc_samples / 8 } else { alloc_samples * sample_size };
        let total = channels * per_channel;
        let mut block = pools.allocate(pool, total)?;
        block.fill(format.silence_byte());

        let eff_channels = if block_copy { 1 } else { channels };
        Ok(Self {
            block,
            is_pdm,
            pdm_msb_first: format.sample_type() == crate::format::SampleType::PdmMsbFirst,
            pdm_interleaved: is_pdm && interleaved && channels > 1,
            sample_size: if block_copy { sample_size * channels } else { sample_size },
            channels: eff_channels,
            nb_samples,
            samples_offset: format.samples_offset() * sample_size,
            delay_samples,
            alloc_samples,
            ch_bytes: total / eff_channels,
            write_pos: 0,
        })
    }

    /// Configured delay in samples (bits for PDM).
    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    /// Ring bytes held in the pool.
    pub fn ring_bytes(&self) -> usize {
        self.block.len()
    }

    /// Writes the input chunk's read frame into the ring and fills the
    /// output chunk's write frame with the view `delay` samples behind it.
    pub fn exchange(&mut self, input: &Chunk, output: &mut Chunk) {
        let write_pos = self.write_pos;
        let read_pos = if write_pos < self.delay_samples {
            write_pos + self.alloc_samples - self.delay_samples
        } else {
            write_pos - self.delay_samples
        };
        let (read_size1, read_size2) = if read_pos + self.nb_samples < self.alloc_samples {
            (self.nb_samples, 0)
        } else {
            let first = self.alloc_samples - read_pos;
            (first, self.nb_samples - first)
        };
        let (write_size1, write_size2) = if write_pos + self.nb_samples < self.alloc_samples {
            self.write_pos = write_pos + self.nb_samples;
            (self.nb_samples, 0)
        } else {
            let first = self.alloc_samples - write_pos;
            self.write_pos = self.nb_samples - first;
            (first, self.nb_samples - first)
        };

        if self.is_pdm {
            self.exchange_pdm(
                input, output, write_pos, read_pos, write_size1, write_size2, read_size1,
                read_size2,
            );
        } else {
            self.exchange_pcm(
                input, output, write_pos, read_pos, write_size1, write_size2, read_size1,
                read_size2,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn exchange_pcm(
        &mut self,
        input: &Chunk,
        output: &mut Chunk,
        write_pos: usize,
        read_pos: usize,
        write_size1: usize,
        write_size2: usize,
        read_size1: usize,
        read_size2: usize,
    ) {
        // samples to bytes
        let size = self.sample_size;
        let write_pos = write_pos * size;
        let read_pos = read_pos * size;
        let write_size1 = write_size1 * size;
        let write_size2 = write_size2 * size;
        let read_size1 = read_size1 * size;
        let read_size2 = read_size2 * size;
        let ch_bytes = self.ch_bytes;

        let in_frame = input.read_frame();
        let in_fmt = *input.format();
        let out_fmt = *output.format();
        let out_frame = output.write_frame();
        for ch in 0..self.channels {
            let in_base = in_fmt.byte_offset(ch, 0);
            let out_base = out_fmt.byte_offset(ch, 0);
            let ring = &mut self.block.bytes_mut()[ch * ch_bytes..(ch + 1) * ch_bytes];
            ring[write_pos..write_pos + write_size1]
                .copy_from_slice(&in_frame[in_base..in_base + write_size1]);
            ring[..write_size2].copy_from_slice(
                &in_frame[in_base + write_size1..in_base + write_size1 + write_size2],
            );
            out_frame[out_base..out_base + read_size1]
                .copy_from_slice(&ring[read_pos..read_pos + read_size1]);
            out_frame[out_base + read_size1..out_base + read_size1 + read_size2]
                .copy_from_slice(&ring[..read_size2]);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn exchange_pdm(
        &mut self,
        input: &Chunk,
        output: &mut Chunk,
        write_pos: usize,
        read_pos: usize,
        write_size1: usize,
        write_size2: usize,
        read_size1: usize,
        read_size2: usize,
    ) {
        // the ring is non-interleaved whatever the stream layout
        let stride = self.samples_offset;
        let write_div8 = write_pos >> 3; // write side is byte-aligned by construction
        let read_div8 = read_pos >> 3;
        let read_mod8 = read_pos & 7;
        let wsize1 = write_size1 >> 3;
        let wsize2 = write_size2 >> 3;
        let rsize1 = (read_size1 + read_mod8 + 7) >> 3;
        let rsize2 = (read_size2 + 7) >> 3;
        let ch_bytes = self.ch_bytes;

        let in_frame = input.read_frame();
        let in_fmt = *input.format();

        // input into ring
        for ch in 0..self.channels {
            let ring = &mut self.block.bytes_mut()[ch * ch_bytes..(ch + 1) * ch_bytes];
            let in_base = in_fmt.byte_offset(ch, 0);
            if self.pdm_interleaved {
                let mut src = in_base;
                for i in 0..wsize1 {
                    ring[write_div8 + i] = in_frame[src];
                    src += stride;
                }
                for i in 0..wsize2 {
                    ring[i] = in_frame[src];
                    src += stride;
                }
            } else {
                ring[write_div8..write_div8 + wsize1]
                    .copy_from_slice(&in_frame[in_base..in_base + wsize1]);
                ring[..wsize2]
                    .copy_from_slice(&in_frame[in_base + wsize1..in_base + wsize1 + wsize2]);
            }
        }

        // ring into output
        let out_fmt = *output.format();
        let out_frame = output.write_frame();
        for ch in 0..self.channels {
            let ring = &self.block.bytes()[ch * ch_bytes..(ch + 1) * ch_bytes];
            let out_base = out_fmt.byte_offset(ch, 0);
            if read_mod8 == 0 {
                if self.pdm_interleaved {
                    let mut dst = out_base;
                    for i in 0..rsize1 {
                        out_frame[dst] = ring[read_div8 + i];
                        dst += stride;
                    }
                    for i in 0..rsize2 {
                        out_frame[dst] = ring[i];
                        dst += stride;
                    }
                } else {
                    out_frame[out_base..out_base + rsize1]
                        .copy_from_slice(&ring[read_div8..read_div8 + rsize1]);
                    out_frame[out_base + rsize1..out_base + rsize1 + rsize2]
                        .copy_from_slice(&ring[..rsize2]);
                }
            } else if self.pdm_msb_first {
                // 16-bit shift register: older byte high, newer byte low
                let mut tmp = u16::from(ring[read_div8]);
                let mut dst = out_base;
                for i in 1..rsize1 {
                    tmp = (tmp << 8) | u16::from(ring[read_div8 + i]);
                    out_frame[dst] = ((tmp << read_mod8) >> 8) as u8;
                    dst += stride;
                }
                for i in 0..rsize2 {
                    tmp = (tmp << 8) | u16::from(ring[i]);
                    out_frame[dst] = ((tmp << read_mod8) >> 8) as u8;
                    dst += stride;
                }
            } else {
                // LSB first: older byte low, newer byte high
                let mut tmp = u16::from(ring[read_div8]) << 8;
                let mut dst = out_base;
                for i in 1..rsize1 {
                    tmp = (tmp >> 8) | (u16::from(ring[read_div8 + i]) << 8);
                    out_frame[dst] = (tmp >> read_mod8) as u8;
                    dst += stride;
                }
                for i in 0..rsize2 {
                    tmp = (tmp >> 8) | (u16::from(ring[i]) << 8);
                    out_frame[dst] = (tmp >> read_mod8) as u8;
                    dst += stride;
                }
            }
        }
    }
}
