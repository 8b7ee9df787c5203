//! Audio destinations
//!
//! A sink is the terminal destination of an effect chain, and every effect
//! hands its output to the next destination through this trait.

use crate::pcm;

/// Destination that accepts channel-major audio blocks
///
/// `buf` holds one sequence per channel, all of equal length. Implementations
/// may read, copy or mutate the samples in place, but must not resize the
/// sequences or assume the buffer stays valid after returning.
///
/// # Real-Time Constraints
/// Implementations on the audio path should not allocate or block.
pub trait AudioSink {
    /// Accept one block of audio
    fn write_audio(&mut self, buf: &mut [Vec<f32>]);
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn write_audio(&mut self, buf: &mut [Vec<f32>]) {
        (**self).write_audio(buf);
    }
}

impl<S: AudioSink + ?Sized> AudioSink for &mut S {
    fn write_audio(&mut self, buf: &mut [Vec<f32>]) {
        (**self).write_audio(buf);
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn write_audio(&mut self, _buf: &mut [Vec<f32>]) {}
}

/// Sink that re-interleaves float output into a growing buffer
///
/// Useful for offline processing and tests. Allocates as it grows.
#[derive(Debug, Clone)]
pub struct CollectingF32Sink {
    out_buf: Vec<f32>,
    /// Remaining frames to accept
    limit: usize,
}

impl CollectingF32Sink {
    /// Create a sink with capacity for `samples_per_channel` frames
    pub fn new(channels: usize, samples_per_channel: usize) -> Self {
        Self {
            out_buf: Vec::with_capacity(channels * samples_per_channel),
            limit: usize::MAX,
        }
    }

    /// Stop collecting after `limit` more frames
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// Collected interleaved samples
    pub fn buffer(&self) -> &[f32] {
        &self.out_buf
    }

    /// Take the collected samples, leaving the sink empty
    pub fn take_buffer(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.out_buf)
    }
}

impl AudioSink for CollectingF32Sink {
    fn write_audio(&mut self, buf: &mut [Vec<f32>]) {
        let frames = pcm::interleave_f32_into(buf, &mut self.out_buf, self.limit);
        self.limit -= frames;
    }
}

/// Sink that converts output back to interleaved S16 PCM
#[derive(Debug, Clone)]
pub struct CollectingS16Sink {
    out_buf: Vec<i16>,
}

impl CollectingS16Sink {
    /// Create a sink with capacity for `samples_per_channel` frames
    pub fn new(channels: usize, samples_per_channel: usize) -> Self {
        Self {
            out_buf: Vec::with_capacity(channels * samples_per_channel),
        }
    }

    /// Collected interleaved samples
    pub fn buffer(&self) -> &[i16] {
        &self.out_buf
    }
}

impl AudioSink for CollectingS16Sink {
    fn write_audio(&mut self, buf: &mut [Vec<f32>]) {
        pcm::interleave_s16_into(buf, &mut self.out_buf, usize::MAX);
    }
}
