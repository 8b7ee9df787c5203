//! Shared helpers for integration tests
#![allow(dead_code)]

use audiofx_dsp::sink::AudioSink;
use std::f32::consts::PI;

/// Install a tracing subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Generate a mono sine wave
pub fn generate_sine(frequency: f32, sample_rate: f32, num_samples: usize, amplitude: f32) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate).sin() * amplitude)
        .collect()
}

pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

pub fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}

/// Reference time-domain linear convolution
pub fn direct_convolution(x: &[f32], h: &[f32]) -> Vec<f32> {
    if x.is_empty() || h.is_empty() {
        return Vec::new();
    }
    let mut y = vec![0.0; x.len() + h.len() - 1];
    for (i, &xi) in x.iter().enumerate() {
        for (j, &hj) in h.iter().enumerate() {
            y[i + j] += xi * hj;
        }
    }
    y
}

/// Sink that keeps every channel separately
#[derive(Debug, Default)]
pub struct ChannelCapture {
    pub channels: Vec<Vec<f32>>,
    /// Number of blocks received
    pub writes: usize,
}

impl ChannelCapture {
    pub fn channel(&self, ch: usize) -> &[f32] {
        self.channels.get(ch).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

impl AudioSink for ChannelCapture {
    fn write_audio(&mut self, buf: &mut [Vec<f32>]) {
        if self.channels.len() < buf.len() {
            self.channels.resize(buf.len(), Vec::new());
        }
        for (out, ch) in self.channels.iter_mut().zip(buf.iter()) {
            out.extend_from_slice(ch);
        }
        self.writes += 1;
    }
}

/// Split channel-major audio into blocks of at most `chunk` frames
pub fn chunks(input: &[Vec<f32>], chunk: usize) -> Vec<Vec<Vec<f32>>> {
    let frames = input.first().map_or(0, Vec::len);
    (0..frames)
        .step_by(chunk.max(1))
        .map(|start| {
            let end = (start + chunk).min(frames);
            input.iter().map(|c| c[start..end].to_vec()).collect()
        })
        .collect()
}
