//! Window functions
//!
//! Uses the squared-sine form of the Hann window rather than the canonical
//! `0.5 - 0.5 cos(..)`.

use std::f64::consts::PI;

/// Symmetric Hann window for filter design
///
/// `num_samples` must be at least 2. Both endpoints are zero.
#[inline]
pub fn hann(num_samples: usize, n: usize) -> f64 {
    let x = (PI * n as f64 / (num_samples - 1) as f64).sin();
    x * x
}

/// Periodic Hann window for spectral analysis
///
/// One period of an `num_samples + 1` symmetric window with the last point
/// dropped, so consecutive frames overlap-add to a constant.
#[inline]
pub fn hann_periodic(num_samples: usize, n: usize) -> f64 {
    let x = (PI * n as f64 / num_samples as f64).sin();
    x * x
}
