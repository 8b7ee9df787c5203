//! FIR filter design from sparse frequency response control points
//!
//! Gains given at a handful of frequencies are interpolated with a makima
//! spline over log frequency, sampled onto a dense linear grid, and turned
//! into taps by frequency sampling with a linear phase term (the same
//! approach as `scipy.signal.firwin2`). Minimum-phase output goes through a
//! homomorphic (cepstral) transform afterwards.
//!
//! All intermediate work is done in `f64`; only the final taps are `f32`.

use crate::error::{DspError, Result};
use crate::filters::spline::Makima;
use crate::util::window;
use realfft::num_complex::Complex;
use realfft::RealFftPlanner;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Stand-in for 0 Hz on the log-frequency axis
const FREQ_EPSILON: f64 = 1e-7;

/// Cepstral aliasing tolerance of the minimum-phase transform
const MIN_PHASE_ALIASING: f64 = 0.01;

/// Phase response of a designed filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPhase {
    /// Symmetric taps, constant group delay of `(len - 1) / 2`
    Linear,
    /// Energy concentrated at the start, lowest latency
    #[default]
    Minimum,
}

/// FIR design parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirDesign {
    /// Sample rate the control point frequencies refer to
    pub sample_rate: f32,
    pub phase: FilterPhase,
}

impl FirDesign {
    /// Minimum-phase design at `sample_rate`
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            phase: FilterPhase::default(),
        }
    }

    /// Set the phase response
    #[must_use]
    pub fn with_phase(mut self, phase: FilterPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Length of the linear-phase prototype for `out_len` output taps
    ///
    /// The homomorphic transform returns `ceil(n / 2)` taps, so minimum-phase
    /// designs start from `2 * out_len - 1`.
    pub fn prototype_len(&self, out_len: usize) -> usize {
        match self.phase {
            FilterPhase::Linear => out_len,
            FilterPhase::Minimum => (out_len * 2).saturating_sub(1),
        }
    }

    /// Design `out.len()` taps matching `gains_db` at `freqs` (Hz)
    ///
    /// `freqs` must be strictly increasing and lie strictly between 0 Hz and
    /// Nyquist. The response is anchored at 0 dB at both ends.
    ///
    /// # Errors
    /// Malformed control points or fewer than 2 output taps. `out` is left
    /// unmodified on failure.
    pub fn design(&self, freqs: &[f32], gains_db: &[f32], out: &mut [f32]) -> Result<()> {
        if out.len() < 2 {
            return Err(DspError::InvalidTapCount(out.len()));
        }
        let (log_freqs, gains) = self.control_points(freqs, gains_db)?;
        let n_taps = self.prototype_len(out.len());

        let response = sample_response(&log_freqs, &gains, n_taps, self.phase)?;
        let mut taps = frequency_sample(&response, n_taps)?;

        if self.phase == FilterPhase::Minimum {
            taps = minimum_phase(&taps)?;
        }

        debug_assert_eq!(taps.len(), out.len());
        for (o, t) in out.iter_mut().zip(&taps) {
            *o = *t as f32;
        }
        Ok(())
    }

    /// Validate, normalize and anchor the control points
    ///
    /// Returns `log2` of the normalized frequencies and the dB gains.
    fn control_points(&self, freqs: &[f32], gains_db: &[f32]) -> Result<(Vec<f64>, Vec<f64>)> {
        if freqs.is_empty() {
            return Err(DspError::InvalidBands("no control points".into()));
        }
        if freqs.len() != gains_db.len() {
            return Err(DspError::InvalidBands(format!(
                "{} frequencies but {} gains",
                freqs.len(),
                gains_db.len()
            )));
        }

        let nyquist = f64::from(self.sample_rate) / 2.0;
        let mut log_freqs = Vec::with_capacity(freqs.len() + 2);
        let mut gains = Vec::with_capacity(freqs.len() + 2);
        log_freqs.push(FREQ_EPSILON.log2());
        gains.push(0.0);

        for (&freq, &gain) in freqs.iter().zip(gains_db) {
            let norm = f64::from(freq) / nyquist;
            if !(norm > FREQ_EPSILON && norm < 1.0 && gain.is_finite()) {
                return Err(DspError::InvalidBands(format!(
                    "control point ({freq} Hz, {gain} dB) outside (0, {nyquist}) Hz or not finite"
                )));
            }
            log_freqs.push(norm.log2());
            gains.push(f64::from(gain));
        }

        log_freqs.push(0.0);
        gains.push(0.0);

        // Monotonicity is checked by the spline
        Ok((log_freqs, gains))
    }
}

/// Design `out.len()` taps for `(freqs, gains_db)` control points
///
/// Shorthand for [`FirDesign::design`].
pub fn make_filter(
    freqs: &[f32],
    gains_db: &[f32],
    out: &mut [f32],
    sample_rate: f32,
    phase: FilterPhase,
) -> Result<()> {
    FirDesign::new(sample_rate)
        .with_phase(phase)
        .design(freqs, gains_db, out)
}

/// Convert linear-phase taps to minimum phase
///
/// Returns `ceil(taps.len() / 2)` taps whose magnitude response approximates
/// the square root of the input's.
///
/// # Errors
/// Empty input or an all-zero spectrum.
pub fn to_minimum_phase(taps: &[f32]) -> Result<Vec<f32>> {
    let linear: Vec<f64> = taps.iter().map(|&t| f64::from(t)).collect();
    Ok(minimum_phase(&linear)?
        .into_iter()
        .map(|t| t as f32)
        .collect())
}

/// Linear gain at `n_taps` evenly spaced points from 0 to Nyquist
fn sample_response(
    log_freqs: &[f64],
    gains_db: &[f64],
    n_taps: usize,
    phase: FilterPhase,
) -> Result<Makima> {
    let log_spline = Makima::new(log_freqs, gains_db)?;
    let step = 1.0 / (n_taps - 1) as f64;

    let mut grid = Vec::with_capacity(n_taps);
    let mut linear_gains = Vec::with_capacity(n_taps);
    for i in 0..n_taps {
        let freq = i as f64 * step;
        let mut gain_db = log_spline.eval(freq.max(FREQ_EPSILON).log2());
        if phase == FilterPhase::Minimum {
            // Squared magnitude, halved again by the homomorphic step
            gain_db *= 2.0;
        }
        grid.push(freq);
        linear_gains.push(10.0_f64.powf(gain_db / 20.0));
    }

    Makima::new(&grid, &linear_gains)
}

/// Frequency-sampling design of `n_taps` windowed linear-phase taps
fn frequency_sample(response: &Makima, n_taps: usize) -> Result<Vec<f64>> {
    let ifft_len = n_taps * 2;
    let mut planner = RealFftPlanner::<f64>::new();
    let c2r = planner.plan_fft_inverse(ifft_len);

    let mut spectrum = c2r.make_input_vec();
    let delay = (n_taps - 1) as f64 / 2.0;
    let scale = 1.0 / ifft_len as f64;
    for (k, bin) in spectrum.iter_mut().enumerate() {
        let freq = k as f64 / n_taps as f64;
        let gain = response.eval(freq);
        *bin = Complex::from_polar(gain * scale, -PI * delay * freq);
    }
    // DC and Nyquist must be real for a real inverse transform
    spectrum[0].im = 0.0;
    spectrum[n_taps].im = 0.0;

    let mut time = c2r.make_output_vec();
    let mut scratch = c2r.make_scratch_vec();
    c2r.process_with_scratch(&mut spectrum, &mut time, &mut scratch)?;

    time.truncate(n_taps);
    for (i, tap) in time.iter_mut().enumerate() {
        *tap *= window::hann(n_taps, i);
    }
    Ok(time)
}

/// Homomorphic minimum-phase transform
fn minimum_phase(linear: &[f64]) -> Result<Vec<f64>> {
    let len = linear.len();
    if len == 0 {
        return Err(DspError::EmptyFilter);
    }

    let min_fft = (2.0 * (len.saturating_sub(1)) as f64 / MIN_PHASE_ALIASING).ceil() as usize;
    let n_fft = min_fft.max(2).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n_fft);
    let inverse = planner.plan_fft_inverse(n_fft);
    let inv_n = 1.0 / n_fft as f64;

    let mut buf = vec![Complex::new(0.0, 0.0); n_fft];
    for (b, &t) in buf.iter_mut().zip(linear) {
        b.re = t;
    }
    forward.process(&mut buf);

    // Log magnitude, offset by a fraction of the smallest positive bin
    let min_positive = buf
        .iter()
        .map(|c| c.norm())
        .filter(|&m| m > 0.0)
        .fold(f64::INFINITY, f64::min);
    if !min_positive.is_finite() {
        return Err(DspError::Fft("filter has an all-zero spectrum".into()));
    }
    let offset = FREQ_EPSILON * min_positive;
    for b in &mut buf {
        *b = Complex::new(0.5 * (b.norm() + offset).ln(), 0.0);
    }

    // Real cepstrum
    inverse.process(&mut buf);

    // Fold negative quefrencies onto positive ones
    let stop = len.div_ceil(2);
    for (i, b) in buf.iter_mut().enumerate() {
        let w = if i == 0 || (i == stop && len % 2 == 1) {
            1.0
        } else if i < stop {
            2.0
        } else {
            0.0
        };
        *b = Complex::new(b.re * inv_n * w, 0.0);
    }

    forward.process(&mut buf);
    for b in &mut buf {
        *b = b.exp();
    }
    inverse.process(&mut buf);

    let out_len = len / 2 + len % 2;
    Ok(buf[..out_len].iter().map(|c| c.re * inv_n).collect())
}
