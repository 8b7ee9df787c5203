//! Static gain

use super::AudioEffect;
use crate::sink::AudioSink;
use crate::util::amplitude;

/// Multiplies every sample by a fixed factor
#[derive(Debug, Clone)]
pub struct Gain {
    gain_db: f32,
    /// Linear factor derived from `gain_db`
    factor: f32,
}

impl Gain {
    /// Create a gain stage of `gain_db` decibels
    pub fn new(gain_db: f32) -> Self {
        Self {
            gain_db,
            factor: amplitude::db_to_linear(gain_db),
        }
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    pub fn set_gain_db(&mut self, gain_db: f32) {
        self.gain_db = gain_db;
        self.factor = amplitude::db_to_linear(gain_db);
    }

    /// Linear factor applied to samples
    pub fn factor(&self) -> f32 {
        self.factor
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl AudioEffect for Gain {
    fn write_audio(&mut self, buf: &mut [Vec<f32>], next: &mut dyn AudioSink) {
        for channel in buf.iter_mut() {
            for sample in channel.iter_mut() {
                *sample *= self.factor;
            }
        }

        next.write_audio(buf);
    }

    fn reset(&mut self) {
        // Stateless
    }

    fn name(&self) -> &'static str {
        "Gain"
    }
}
