//! Graphic EQ as a single designed FIR filter

use super::{GraphicEqBand, GraphicEqBands};
use crate::effects::convolver::Convolver;
use crate::effects::AudioEffect;
use crate::error::Result;
use crate::filters::{FilterPhase, FirDesign};
use crate::sink::AudioSink;
use tracing::{debug, warn};

/// Graphic EQ applied through block convolution
///
/// The band gains are turned into a `block_size`-tap FIR filter on every
/// change. Latency equals one block.
pub struct FirGraphicEq {
    bands: GraphicEqBands,
    design: FirDesign,
    convolver: Convolver,
}

impl FirGraphicEq {
    /// Default block size and filter length
    pub const DEFAULT_BLOCK_SIZE: usize = 4999;

    /// Create a flat EQ over `bands` with a minimum-phase filter
    ///
    /// # Errors
    /// Fails if the block size is invalid or the initial filter cannot be
    /// designed (bands reaching Nyquist, for example).
    pub fn new(
        sample_rate: f32,
        channels: usize,
        bands: GraphicEqBands,
        block_size: usize,
    ) -> Result<Self> {
        Self::with_phase(sample_rate, channels, bands, block_size, FilterPhase::Minimum)
    }

    /// Create a flat EQ with an explicit filter phase
    ///
    /// # Errors
    /// See [`FirGraphicEq::new`].
    pub fn with_phase(
        sample_rate: f32,
        channels: usize,
        bands: GraphicEqBands,
        block_size: usize,
        phase: FilterPhase,
    ) -> Result<Self> {
        let mut eq = Self {
            bands,
            design: FirDesign::new(sample_rate).with_phase(phase),
            convolver: Convolver::new(channels, block_size)?,
        };
        eq.build_filter()?;
        Ok(eq)
    }

    /// Replace the band layout with `num_bands` flat bands and rebuild
    ///
    /// # Errors
    /// Invalid layout or filter design failure; the previous layout and
    /// filter stay active.
    pub fn init_bands(&mut self, num_bands: usize, start_freq: f32, end_freq: f32) -> Result<()> {
        let bands = GraphicEqBands::new(num_bands, start_freq, end_freq)?;
        self.apply(bands)
    }

    /// Set every band's gain and rebuild
    ///
    /// # Errors
    /// Wrong gain count or filter design failure; the previous gains and
    /// filter stay active.
    pub fn set_all_bands(&mut self, gains: &[f32]) -> Result<()> {
        let mut bands = self.bands.clone();
        bands.set_all(gains)?;
        self.apply(bands)
    }

    /// Set one band's gain and rebuild
    ///
    /// # Errors
    /// Unknown band or filter design failure; the previous gains and filter
    /// stay active.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Result<()> {
        let mut bands = self.bands.clone();
        bands.set_gain(index, gain_db)?;
        self.apply(bands)
    }

    pub fn band(&self, index: usize) -> Option<&GraphicEqBand> {
        self.bands.band(index)
    }

    pub fn bands(&self) -> &GraphicEqBands {
        &self.bands
    }

    /// Current filter taps
    pub fn filter(&self) -> &[f32] {
        self.convolver.filter()
    }

    pub fn phase(&self) -> FilterPhase {
        self.design.phase
    }

    pub fn block_size(&self) -> usize {
        self.convolver.block_size()
    }

    /// Install `bands` if a filter can be designed for them
    fn apply(&mut self, bands: GraphicEqBands) -> Result<()> {
        let previous = std::mem::replace(&mut self.bands, bands);
        if let Err(e) = self.build_filter() {
            warn!(error = %e, "FIR graphic EQ design failed, keeping previous filter");
            self.bands = previous;
            return Err(e);
        }
        Ok(())
    }

    fn build_filter(&mut self) -> Result<()> {
        let (freqs, gains): (Vec<f32>, Vec<f32>) = self
            .bands
            .as_slice()
            .iter()
            .map(|b| (b.center_freq, b.gain_db))
            .unzip();

        let mut taps = vec![0.0; self.convolver.block_size()];
        self.design.design(&freqs, &gains, &mut taps)?;
        self.convolver.set_filter(&taps)?;

        debug!(
            bands = self.bands.len(),
            taps = taps.len(),
            phase = ?self.design.phase,
            "FIR graphic EQ rebuilt"
        );
        Ok(())
    }
}

impl AudioEffect for FirGraphicEq {
    fn write_audio(&mut self, buf: &mut [Vec<f32>], next: &mut dyn AudioSink) {
        self.convolver.write_audio(buf, next);
    }

    fn reset(&mut self) {
        self.convolver.reset();
    }

    fn finalize(&mut self, next: &mut dyn AudioSink) {
        self.convolver.finalize(next);
    }

    fn name(&self) -> &'static str {
        "Graphic EQ (FIR)"
    }
}
