//! Biquad filter section
//!
//! Second-order IIR section designed with the Audio EQ Cookbook
//! (<https://www.w3.org/TR/audio-eq-cookbook/>) and evaluated in Direct Form I.

use crate::util::amplitude;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::{LN_2, PI};
use tracing::trace;

/// Lowest frequency plotted by [`BiquadFilter::response_curve`]
const GRAPH_MIN_FREQ: f32 = 20.0;

/// Filter shape of a biquad section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiquadFilterType {
    LowPass,
    HighPass,
    /// Band-pass with constant skirt gain (peak gain = Q)
    BandPassPeakQ,
    /// Band-pass with constant 0 dB peak gain
    BandPassPeak0,
    Notch,
    AllPass,
    PeakingEq,
    LowShelf,
    HighShelf,
}

impl BiquadFilterType {
    /// Whether the gain parameter affects this shape
    pub fn uses_gain(self) -> bool {
        matches!(self, Self::PeakingEq | Self::LowShelf | Self::HighShelf)
    }
}

/// Coefficients normalized by `a0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoefficients {
    /// Identity (pass-through) section
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Compute cookbook coefficients
    ///
    /// `gain_db` is ignored unless `filter_type.uses_gain()`.
    pub fn design(
        filter_type: BiquadFilterType,
        sample_rate: f32,
        center_freq: f32,
        q: f32,
        gain_db: f32,
    ) -> Self {
        let q = f64::from(q);
        let a = if filter_type.uses_gain() {
            10.0_f64.powf(f64::from(gain_db) / 40.0)
        } else {
            1.0
        };
        let w0 = 2.0 * PI * f64::from(center_freq) / f64::from(sample_rate);
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            BiquadFilterType::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            BiquadFilterType::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            BiquadFilterType::BandPassPeakQ => (
                q * alpha,
                0.0,
                -q * alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            BiquadFilterType::BandPassPeak0 => {
                (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            BiquadFilterType::Notch => (
                1.0,
                -2.0 * cos_w0,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            BiquadFilterType::AllPass => (
                1.0 - alpha,
                -2.0 * cos_w0,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            BiquadFilterType::PeakingEq => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            BiquadFilterType::LowShelf => {
                let beta = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + beta),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - beta),
                    (a + 1.0) + (a - 1.0) * cos_w0 + beta,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - beta,
                )
            }
            BiquadFilterType::HighShelf => {
                let beta = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + beta),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - beta),
                    (a + 1.0) - (a - 1.0) * cos_w0 + beta,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - beta,
                )
            }
        };

        let coeffs = Self {
            b0: (b0 / a0) as f32,
            b1: (b1 / a0) as f32,
            b2: (b2 / a0) as f32,
            a1: (a1 / a0) as f32,
            a2: (a2 / a0) as f32,
        };
        trace!(?filter_type, ?coeffs, "biquad designed");
        coeffs
    }

    /// Complex transfer function at normalized angular frequency `w` (rad/sample)
    pub fn transfer(&self, w: f64) -> Complex<f64> {
        // z^-1 = e^{-jw}
        let z1 = Complex::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let num = f64::from(self.b0) + z1 * f64::from(self.b1) + z2 * f64::from(self.b2);
        let den = 1.0 + z1 * f64::from(self.a1) + z2 * f64::from(self.a2);
        num / den
    }

    /// Linear magnitude response at `freq` Hz
    pub fn magnitude(&self, freq: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * PI * f64::from(freq) / f64::from(sample_rate);
        self.transfer(w).norm() as f32
    }
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Biquad filter with its own delay line
///
/// Coefficients are fixed at construction; changing parameters means
/// creating a new filter. State is sequential, so one instance serves
/// exactly one channel.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoefficients,

    // Direct Form I state
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadFilter {
    /// Design a new filter
    pub fn new(
        filter_type: BiquadFilterType,
        sample_rate: f32,
        center_freq: f32,
        q: f32,
        gain_db: f32,
    ) -> Self {
        Self::from_coefficients(BiquadCoefficients::design(
            filter_type,
            sample_rate,
            center_freq,
            q,
            gain_db,
        ))
    }

    /// Wrap precomputed coefficients with zeroed state
    pub fn from_coefficients(coeffs: BiquadCoefficients) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Normalized coefficients
    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coeffs
    }

    /// Process one sample
    #[inline]
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        let c = &self.coeffs;
        let mut result =
            c.b0 * sample + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        // Flush denormals
        if result.abs() < 1e-15 {
            result = 0.0;
        }

        self.x2 = self.x1;
        self.x1 = sample;
        self.y2 = self.y1;
        self.y1 = result;

        result
    }

    /// Process a slice of samples in place
    pub fn process_block(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Zero the delay line, keeping coefficients
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// Delay line state as `(x1, x2, y1, y2)`
    pub fn state(&self) -> (f32, f32, f32, f32) {
        (self.x1, self.x2, self.y1, self.y2)
    }

    /// Linear magnitude response at `freq` Hz
    pub fn magnitude_response(&self, freq: f32, sample_rate: f32) -> f32 {
        self.coeffs.magnitude(freq, sample_rate)
    }

    /// Log-spaced magnitude response from 20 Hz to Nyquist
    ///
    /// Returns `(frequency_hz, gain_db)` pairs for graphing.
    pub fn response_curve(&self, count: usize, sample_rate: f32) -> Vec<(f32, f32)> {
        let nyquist = sample_rate / 2.0;
        let log_min = GRAPH_MIN_FREQ.log2();
        let log_max = nyquist.log2();
        let log_step = if count > 1 {
            (log_max - log_min) / (count - 1) as f32
        } else {
            0.0
        };

        (0..count)
            .map(|i| {
                let freq = 2.0_f32.powf(log_min + log_step * i as f32);
                let gain_db = amplitude::linear_to_db(self.magnitude_response(freq, sample_rate));
                (freq, gain_db)
            })
            .collect()
    }
}

/// Q for a bandwidth of `n` octaves
///
/// http://www.sengpielaudio.com/calculator-bandwidth.htm
pub fn octave_bw_to_q(n: f32) -> f32 {
    let pow_n = 2.0_f32.powf(n);
    pow_n.sqrt() / (pow_n - 1.0)
}

/// Q for a digital bandwidth of `bw` octaves between -3 dB points at `center_freq`
pub fn bw_to_q(sample_rate: f32, center_freq: f32, bw: f32) -> f32 {
    let w0 = 2.0 * PI * f64::from(center_freq) / f64::from(sample_rate);
    (1.0 / (2.0 * ((LN_2 / 2.0) * f64::from(bw) * (w0 / w0.sin())).sinh())) as f32
}

/// Q for a shelf of gain `gain_db` and slope `s` (1.0 = steepest monotonic)
pub fn s_to_q(gain_db: f32, s: f32) -> f32 {
    let a = 10.0_f32.powf(gain_db / 40.0);
    1.0 / ((a + 1.0 / a) * (1.0 / s - 1.0) + 2.0).sqrt()
}
