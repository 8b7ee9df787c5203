//! Linear PCM helpers for the host bridge
//!
//! The core works on channel-major `f32` blocks. Hosts deliver interleaved
//! PCM, so these helpers convert and (de-)interleave at the boundary.

use crate::error::{DspError, Result};
use serde::{Deserialize, Serialize};

/// PCM sample format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PcmFormat {
    Unknown,
    U8,
    S16,
    S24,
    #[default]
    F32,
}

impl PcmFormat {
    /// Fail unless the bridge helpers handle this format
    pub fn ensure_supported(self) -> Result<()> {
        match self {
            Self::S16 | Self::F32 => Ok(()),
            other => Err(DspError::UnsupportedFormat(format!("{other:?}"))),
        }
    }
}

/// Convert a signed 16-bit sample to a normalized float
#[inline]
pub fn s16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Convert a normalized float to a signed 16-bit sample
///
/// Scales by 32768 (matching [`s16_to_f32`]) and clamps, so +1.0 saturates to 32767.
#[inline]
pub fn f32_to_s16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

/// De-interleave float PCM into per-channel buffers
///
/// Buffers are resized to `raw.len() / channels` samples each. Trailing
/// samples that do not form a full frame are dropped.
pub fn deinterleave_f32(raw: &[f32], channel_bufs: &mut [Vec<f32>]) {
    deinterleave_with(raw, channel_bufs, |s| s);
}

/// De-interleave S16 PCM into per-channel float buffers
pub fn deinterleave_s16(raw: &[i16], channel_bufs: &mut [Vec<f32>]) {
    deinterleave_with(raw, channel_bufs, s16_to_f32);
}

fn deinterleave_with<T: Copy>(raw: &[T], channel_bufs: &mut [Vec<f32>], convert: impl Fn(T) -> f32) {
    let channels = channel_bufs.len();
    if channels == 0 {
        return;
    }

    let samples_per_channel = raw.len() / channels;
    for (ch, buf) in channel_bufs.iter_mut().enumerate() {
        buf.clear();
        buf.extend(
            raw.iter()
                .skip(ch)
                .step_by(channels)
                .take(samples_per_channel)
                .map(|&s| convert(s)),
        );
    }
}

/// Append channel-major samples to an interleaved float buffer
///
/// At most `limit` frames are appended; returns the number of frames written.
pub fn interleave_f32_into(buf: &[Vec<f32>], out: &mut Vec<f32>, limit: usize) -> usize {
    interleave_with(buf, out, limit, |s| s)
}

/// Append channel-major samples to an interleaved S16 buffer
pub fn interleave_s16_into(buf: &[Vec<f32>], out: &mut Vec<i16>, limit: usize) -> usize {
    interleave_with(buf, out, limit, f32_to_s16)
}

fn interleave_with<T: Copy + Default>(
    buf: &[Vec<f32>],
    out: &mut Vec<T>,
    limit: usize,
    convert: impl Fn(f32) -> T,
) -> usize {
    let channels = buf.len();
    let Some(first) = buf.first() else {
        return 0;
    };

    let frames = first.len().min(limit);
    let start = out.len();
    out.resize(start + frames * channels, T::default());

    for (ch, channel) in buf.iter().enumerate() {
        for (i, &sample) in channel.iter().take(frames).enumerate() {
            out[start + i * channels + ch] = convert(sample);
        }
    }

    frames
}
