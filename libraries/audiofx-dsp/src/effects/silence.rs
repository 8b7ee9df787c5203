//! Silence

use super::AudioEffect;
use crate::sink::AudioSink;

/// Replaces every sample with zero
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl AudioEffect for Silence {
    fn write_audio(&mut self, buf: &mut [Vec<f32>], next: &mut dyn AudioSink) {
        for channel in buf.iter_mut() {
            channel.fill(0.0);
        }

        next.write_audio(buf);
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "Silence"
    }
}
