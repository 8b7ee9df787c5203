//! Frequency response of FIR taps
//!
//! Raw data only; plotting is left to the caller.

use crate::error::{DspError, Result};
use crate::util::{amplitude, next_fft_size};
use realfft::RealFftPlanner;
use std::f64::consts::PI;

/// Magnitude and phase of an impulse response per FFT bin
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirResponse {
    /// Bin center frequencies in Hz, from 0 to Nyquist
    pub frequencies: Vec<f32>,
    pub magnitude_db: Vec<f32>,
    /// Phase in radians, wrapped to (-pi, pi]
    pub phase: Vec<f32>,
}

impl FirResponse {
    /// Analyze `taps` at `sample_rate`, zero-padded to an FFT-friendly size
    ///
    /// # Errors
    /// Fails with [`DspError::EmptyFilter`] if `taps` is empty.
    pub fn analyze(taps: &[f32], sample_rate: f32) -> Result<Self> {
        if taps.is_empty() {
            return Err(DspError::EmptyFilter);
        }

        let fft_size = next_fft_size(taps.len());
        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(fft_size);

        let mut input = r2c.make_input_vec();
        input[..taps.len()].copy_from_slice(taps);
        let mut spectrum = r2c.make_output_vec();
        r2c.process(&mut input, &mut spectrum)?;

        let bin_width = sample_rate / fft_size as f32;
        Ok(Self {
            frequencies: (0..spectrum.len()).map(|k| k as f32 * bin_width).collect(),
            magnitude_db: spectrum
                .iter()
                .map(|c| amplitude::linear_to_db(c.norm()))
                .collect(),
            phase: spectrum.iter().map(|c| c.arg()).collect(),
        })
    }
}

/// Linear magnitude of `taps` at `freq` Hz by direct DTFT evaluation
pub fn dtft_magnitude(taps: &[f32], freq: f32, sample_rate: f32) -> f32 {
    let w = 2.0 * PI * f64::from(freq) / f64::from(sample_rate);
    let (re, im) = taps
        .iter()
        .enumerate()
        .fold((0.0_f64, 0.0_f64), |(re, im), (n, &t)| {
            let phase = w * n as f64;
            let t = f64::from(t);
            (re + t * phase.cos(), im - t * phase.sin())
        });
    re.hypot(im) as f32
}
