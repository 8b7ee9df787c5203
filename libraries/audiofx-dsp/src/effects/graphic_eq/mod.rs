//! Graphic Equalizer
//!
//! A fixed bank of log-spaced bands with adjustable gain. The band range is
//! split into `num_bands` sub-bands of equal width in octaves; each band sits
//! at the geometric center of its sub-band and shares the Q for that width.
//!
//! Two realizations keep an underlying filter in sync with the bands:
//! - [`IirGraphicEq`]: one peaking biquad per band, in cascade
//! - [`FirGraphicEq`]: a single designed FIR filter applied by block convolution
//!
//! Every gain change rebuilds the filter from the full band state.

mod fir;
mod iir;

pub use fir::FirGraphicEq;
pub use iir::IirGraphicEq;

use crate::error::{DspError, Result};
use crate::filters::biquad::octave_bw_to_q;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default lower edge of the band range (Hz)
pub const DEFAULT_START_FREQ: f32 = 20.0;

/// Default upper edge of the band range (Hz)
pub const DEFAULT_END_FREQ: f32 = 20_000.0;

/// One graphic EQ band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphicEqBand {
    /// Center frequency in Hz
    pub center_freq: f32,
    pub q: f32,
    pub gain_db: f32,
}

/// Band layout and gains
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicEqBands {
    bands: Vec<GraphicEqBand>,
    start_freq: f32,
    end_freq: f32,
}

impl GraphicEqBands {
    /// Split `[start_freq, end_freq]` into `num_bands` log-spaced bands at 0 dB
    ///
    /// # Errors
    /// Fails with [`DspError::InvalidBands`] for zero bands or a range that is
    /// not `0 < start_freq < end_freq`.
    pub fn new(num_bands: usize, start_freq: f32, end_freq: f32) -> Result<Self> {
        if num_bands == 0 {
            return Err(DspError::InvalidBands("band count must be positive".into()));
        }
        if !(start_freq > 0.0 && end_freq > start_freq && end_freq.is_finite()) {
            return Err(DspError::InvalidBands(format!(
                "invalid band range {start_freq}..{end_freq} Hz"
            )));
        }

        // Sub-band width in octaves
        let log_bw = (end_freq / start_freq).log2() / num_bands as f32;
        let q = octave_bw_to_q(log_bw);

        let bands: Vec<_> = (0..num_bands)
            .map(|i| GraphicEqBand {
                center_freq: start_freq * 2.0_f32.powf((i as f32 + 0.5) * log_bw),
                q,
                gain_db: 0.0,
            })
            .collect();

        debug!(num_bands, start_freq, end_freq, q, "graphic EQ bands laid out");

        Ok(Self {
            bands,
            start_freq,
            end_freq,
        })
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn band(&self, index: usize) -> Option<&GraphicEqBand> {
        self.bands.get(index)
    }

    pub fn as_slice(&self) -> &[GraphicEqBand] {
        &self.bands
    }

    pub fn start_freq(&self) -> f32 {
        self.start_freq
    }

    pub fn end_freq(&self) -> f32 {
        self.end_freq
    }

    /// Lower and upper edge of band `index` in Hz
    pub fn band_edges(&self, index: usize) -> Option<(f32, f32)> {
        if index >= self.bands.len() {
            return None;
        }
        let log_bw = (self.end_freq / self.start_freq).log2() / self.bands.len() as f32;
        Some((
            self.start_freq * 2.0_f32.powf(index as f32 * log_bw),
            self.start_freq * 2.0_f32.powf((index + 1) as f32 * log_bw),
        ))
    }

    /// Band gains in band order
    pub fn gains(&self) -> Vec<f32> {
        self.bands.iter().map(|b| b.gain_db).collect()
    }

    /// Set every band's gain
    ///
    /// # Errors
    /// Fails with [`DspError::BandCountMismatch`] unless exactly one gain per
    /// band is given.
    pub fn set_all(&mut self, gains: &[f32]) -> Result<()> {
        if gains.len() != self.bands.len() {
            return Err(DspError::BandCountMismatch {
                expected: self.bands.len(),
                actual: gains.len(),
            });
        }
        for (band, &gain) in self.bands.iter_mut().zip(gains) {
            band.gain_db = gain;
        }
        Ok(())
    }

    /// Set one band's gain
    ///
    /// # Errors
    /// Fails with [`DspError::BandIndexOutOfRange`] for an unknown band.
    pub fn set_gain(&mut self, index: usize, gain_db: f32) -> Result<()> {
        let count = self.bands.len();
        let band = self
            .bands
            .get_mut(index)
            .ok_or(DspError::BandIndexOutOfRange { index, count })?;
        band.gain_db = gain_db;
        Ok(())
    }
}
