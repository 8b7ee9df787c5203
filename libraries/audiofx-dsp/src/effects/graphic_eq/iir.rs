//! Graphic EQ as a cascade of peaking biquads

use super::{GraphicEqBand, GraphicEqBands};
use crate::effects::parametric_eq::ParametricEq;
use crate::effects::AudioEffect;
use crate::error::Result;
use crate::filters::BiquadFilterType;
use crate::sink::AudioSink;
use tracing::debug;

/// Graphic EQ with one peaking biquad per band and channel
pub struct IirGraphicEq {
    bands: GraphicEqBands,
    peq: ParametricEq,
}

impl IirGraphicEq {
    /// Create a flat EQ over `bands`
    pub fn new(sample_rate: f32, channels: usize, bands: GraphicEqBands) -> Self {
        let mut eq = Self {
            bands,
            peq: ParametricEq::new(sample_rate, channels),
        };
        eq.build_filters();
        eq
    }

    /// Replace the band layout with `num_bands` flat bands and rebuild
    ///
    /// # Errors
    /// See [`GraphicEqBands::new`]. The current layout is kept on failure.
    pub fn init_bands(&mut self, num_bands: usize, start_freq: f32, end_freq: f32) -> Result<()> {
        self.bands = GraphicEqBands::new(num_bands, start_freq, end_freq)?;
        self.build_filters();
        Ok(())
    }

    /// Set every band's gain and rebuild
    ///
    /// # Errors
    /// Fails if `gains` does not have one entry per band.
    pub fn set_all_bands(&mut self, gains: &[f32]) -> Result<()> {
        self.bands.set_all(gains)?;
        self.build_filters();
        Ok(())
    }

    /// Set one band's gain and rebuild
    ///
    /// # Errors
    /// Fails for an unknown band index.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Result<()> {
        self.bands.set_gain(index, gain_db)?;
        self.build_filters();
        Ok(())
    }

    pub fn band(&self, index: usize) -> Option<&GraphicEqBand> {
        self.bands.band(index)
    }

    pub fn bands(&self) -> &GraphicEqBands {
        &self.bands
    }

    /// Underlying biquad cascade
    pub fn parametric_eq(&self) -> &ParametricEq {
        &self.peq
    }

    fn build_filters(&mut self) {
        self.peq.remove_all_filters();
        self.peq.reserve_filters(self.bands.len());

        for band in self.bands.as_slice() {
            self.peq.add_filter(
                BiquadFilterType::PeakingEq,
                band.center_freq,
                band.q,
                band.gain_db,
            );
        }
        debug!(bands = self.bands.len(), "IIR graphic EQ rebuilt");
    }
}

impl AudioEffect for IirGraphicEq {
    fn write_audio(&mut self, buf: &mut [Vec<f32>], next: &mut dyn AudioSink) {
        self.peq.write_audio(buf, next);
    }

    fn reset(&mut self) {
        self.peq.reset();
    }

    fn name(&self) -> &'static str {
        "Graphic EQ (IIR)"
    }
}
