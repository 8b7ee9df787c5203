//! Amplitude conversions
//!
//! The pipeline uses [-1, 1] normalized floats, so the reference level is
//! always 1.0 and PCM is treated as amplitude (k = 20).

/// Convert dB to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to dB
///
/// Zero maps to negative infinity.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * linear.log10()
}
