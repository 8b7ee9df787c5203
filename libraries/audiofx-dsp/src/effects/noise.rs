//! White noise generator
//!
//! Replaces the input with uniform noise in [-1, 1]. Mostly useful as a
//! test source for the rest of the chain.

use super::AudioEffect;
use crate::sink::AudioSink;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Uniform white noise source
#[derive(Debug, Clone)]
pub struct Noise {
    rng: StdRng,
    dist: Uniform<f32>,
}

impl Noise {
    /// Noise seeded from system entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible noise
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            dist: Uniform::new_inclusive(-1.0, 1.0),
        }
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEffect for Noise {
    fn write_audio(&mut self, buf: &mut [Vec<f32>], next: &mut dyn AudioSink) {
        for channel in buf.iter_mut() {
            for sample in channel.iter_mut() {
                *sample = self.dist.sample(&mut self.rng);
            }
        }

        next.write_audio(buf);
    }

    fn reset(&mut self) {
        // The generator keeps running; nothing is buffered
    }

    fn name(&self) -> &'static str {
        "Noise"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingF32Sink;

    #[test]
    fn output_in_range_and_not_silent() {
        let mut noise = Noise::with_seed(7);
        let mut sink = CollectingF32Sink::new(2, 1024);

        noise.write_audio(&mut [vec![0.0; 1024], vec![0.0; 1024]], &mut sink);

        let out = sink.buffer();
        assert_eq!(out.len(), 2048);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));

        let rms = (out.iter().map(|s| s * s).sum::<f32>() / out.len() as f32).sqrt();
        // Uniform [-1, 1] has RMS 1/sqrt(3)
        assert!((rms - 0.577).abs() < 0.05, "rms {rms}");
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let mut a = Noise::with_seed(42);
        let mut b = Noise::with_seed(42);
        let mut sink_a = CollectingF32Sink::new(1, 64);
        let mut sink_b = CollectingF32Sink::new(1, 64);

        a.write_audio(&mut [vec![0.0; 64]], &mut sink_a);
        b.write_audio(&mut [vec![0.0; 64]], &mut sink_b);

        assert_eq!(sink_a.buffer(), sink_b.buffer());
    }
}
