//! Modified Akima ("makima") interpolation
//!
//! Piecewise cubic Hermite interpolation whose knot derivatives are weighted
//! averages of neighbouring secant slopes. Flat runs stay flat and sharp
//! steps do not ring, which keeps designed EQ curves from overshooting.

use crate::error::{DspError, Result};

/// Makima interpolator over strictly increasing knots
#[derive(Debug, Clone)]
pub struct Makima {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Derivative at each knot
    slopes: Vec<f64>,
}

impl Makima {
    /// Build an interpolator through `(x[i], y[i])`
    ///
    /// # Errors
    /// Fails with [`DspError::InvalidBands`] if fewer than two points are given,
    /// the lengths differ, any value is non-finite or `x` is not strictly increasing.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(DspError::InvalidBands(format!(
                "{} frequencies but {} gains",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(DspError::InvalidBands(
                "at least two points are required".into(),
            ));
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(DspError::InvalidBands("non-finite value".into()));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DspError::InvalidBands(
                "frequencies must be strictly increasing".into(),
            ));
        }

        let slopes = knot_slopes(x, y);
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            slopes,
        })
    }

    /// Evaluate at `x`, clamped to the knot range
    pub fn eval(&self, x: f64) -> f64 {
        let last = self.x.len() - 1;
        let x = x.clamp(self.x[0], self.x[last]);

        // Segment k spans x[k]..=x[k + 1]
        let k = self.x.partition_point(|&xi| xi <= x).saturating_sub(1).min(last - 1);

        let h = self.x[k + 1] - self.x[k];
        let secant = (self.y[k + 1] - self.y[k]) / h;
        let t0 = self.slopes[k];
        let t1 = self.slopes[k + 1];

        let c2 = (3.0 * secant - 2.0 * t0 - t1) / h;
        let c3 = (t0 + t1 - 2.0 * secant) / (h * h);
        let dx = x - self.x[k];

        self.y[k] + dx * (t0 + dx * (c2 + dx * c3))
    }
}

fn knot_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let secants: Vec<f64> = x
        .windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| (yw[1] - yw[0]) / (xw[1] - xw[0]))
        .collect();

    if n == 2 {
        return vec![secants[0]; 2];
    }

    // Two extrapolated secants on each side: m[k + 2] = secants[k]
    let mut m = vec![0.0; n + 3];
    m[2..n + 1].copy_from_slice(&secants);
    m[1] = 2.0 * m[2] - m[3];
    m[0] = 2.0 * m[1] - m[2];
    m[n + 1] = 2.0 * m[n] - m[n - 1];
    m[n + 2] = 2.0 * m[n + 1] - m[n];

    (0..n)
        .map(|i| {
            let w1 = (m[i + 3] - m[i + 2]).abs() + (m[i + 3] + m[i + 2]).abs() / 2.0;
            let w2 = (m[i + 1] - m[i]).abs() + (m[i + 1] + m[i]).abs() / 2.0;
            let sum = w1 + w2;
            if sum > 0.0 {
                (w1 * m[i + 1] + w2 * m[i + 2]) / sum
            } else {
                (m[i + 1] + m[i + 2]) / 2.0
            }
        })
        .collect()
}
