//! Chunks: format-tagged exchange buffers between nodes.
//!
//! A chunk owns a pool block sized for `nb_frames` frames of its format and
//! carries monotonically increasing read/write frame counters. The counters
//! never wrap back: frame slots are addressed modulo `nb_frames`, and the
//! difference `written - read` is the number of frames ready for a
//! consumer. Storage is silence-filled at creation so a consumer scheduled
//! ahead of its producer reads valid silence, never garbage.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use crate::error::EngineError;
use crate::format::AudioFormat;
use crate::pool::{MemoryPools, PoolBlock, PoolKind};

/// A named exchange buffer with format-directed addressing.
#[derive(Debug)]
pub struct Chunk {
    name: String,
    format: AudioFormat,
    nb_frames: u8,
    storage: PoolBlock,
    read_frames: u64,
    written_frames: u64,
}

impl Chunk {
    /// Allocates a chunk from `pool` and fills it with silence.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AllocationFailed`] when the pool cannot hold
    /// `nb_frames` frames of `format`, and [`EngineError::UnsupportedFormat`]
    /// for a zero frame count.
    pub(crate) fn new(
        name: &str,
        format: AudioFormat,
        nb_frames: u8,
        pools: &MemoryPools,
        pool: PoolKind,
    ) -> Result<Self, EngineError> {
        if nb_frames == 0 {
            return Err(EngineError::UnsupportedFormat("chunk needs at least one frame"));
        }
        let bytes = format.frame_bytes() * nb_frames as usize;
        let mut storage = pools.allocate(pool, bytes)?;
        storage.fill(format.silence_byte());
        Ok(Self {
            name: String::from(name),
            format,
            nb_frames,
            storage,
            read_frames: 0,
            written_frames: 0,
        })
    }

    /// Chunk name, as given at creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stream format of every frame in this chunk.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Capacity in frames.
    pub fn nb_frames(&self) -> u8 {
        self.nb_frames
    }

    /// Pool this chunk's storage lives in.
    pub fn pool(&self) -> PoolKind {
        self.storage.kind()
    }

    /// Frames written but not yet consumed.
    pub fn frames_ready(&self) -> u64 {
        self.written_frames - self.read_frames
    }

    /// Frame slots currently free for a producer.
    pub fn frames_free(&self) -> u64 {
        u64::from(self.nb_frames) - self.frames_ready()
    }

    /// Total frames marked written since creation.
    pub fn frames_written(&self) -> u64 {
        self.written_frames
    }

    /// Marks one frame as produced.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConsistencyViolation`] when no slot is free:
    /// the producer has lapped its consumer.
    pub fn advance_write(&mut self) -> Result<(), EngineError> {
        if self.frames_free() == 0 {
            return Err(EngineError::ConsistencyViolation(crate::consistency::overrun_message(
                &self.name, "write",
            )));
        }
        self.written_frames += 1;
        Ok(())
    }

    /// Marks one frame as consumed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConsistencyViolation`] when nothing is ready.
    pub fn advance_read(&mut self) -> Result<(), EngineError> {
        if self.frames_ready() == 0 {
            return Err(EngineError::ConsistencyViolation(crate::consistency::overrun_message(
                &self.name, "read",
            )));
        }
        self.read_frames += 1;
        Ok(())
    }

    fn frame_slice(&self, frame: u64) -> &[u8] {
        let size = self.format.frame_bytes();
        let start = (frame % u64::from(self.nb_frames)) as usize * size;
        &self.storage.bytes()[start..start + size]
    }

    fn frame_slice_mut(&mut self, frame: u64) -> &mut [u8] {
        let size = self.format.frame_bytes();
        let start = (frame % u64::from(self.nb_frames)) as usize * size;
        &mut self.storage.bytes_mut()[start..start + size]
    }

    /// Bytes of the frame a consumer should read next.
    pub fn read_frame(&self) -> &[u8] {
        self.frame_slice(self.read_frames)
    }

    /// Bytes of the frame slot a producer should fill next.
    pub fn write_frame(&mut self) -> &mut [u8] {
        self.frame_slice_mut(self.written_frames)
    }

    /// Reads the sample at `(channel, element)` of the current read frame as
    /// `i16`. Meaningful for `Fixed16` formats.
    pub fn sample_i16(&self, channel: usize, element: usize) -> i16 {
        let off = self.format.byte_offset(channel, element);
        let frame = self.read_frame();
        i16::from_le_bytes([frame[off], frame[off + 1]])
    }

    /// Writes the sample at `(channel, element)` of the current write frame
    /// as `i16`.
    pub fn set_sample_i16(&mut self, channel: usize, element: usize, value: i16) {
        let off = self.format.byte_offset(channel, element);
        let frame = self.write_frame();
        frame[off..off + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Reads the sample at `(channel, element)` of the current read frame as
    /// `f32`. Meaningful for `Float32` formats.
    pub fn sample_f32(&self, channel: usize, element: usize) -> f32 {
        let off = self.format.byte_offset(channel, element);
        let frame = self.read_frame();
        f32::from_le_bytes([frame[off], frame[off + 1], frame[off + 2], frame[off + 3]])
    }

    /// Writes the sample at `(channel, element)` of the current write frame
    /// as `f32`.
    pub fn set_sample_f32(&mut self, channel: usize, element: usize, value: f32) {
        let off = self.format.byte_offset(channel, element);
        let frame = self.write_frame();
        frame[off..off + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Resets the current write frame to silence.
    pub fn fill_silence(&mut self) {
        let byte = self.format.silence_byte();
        self.write_frame().fill(byte);
    }
}
