//! Filter sections and filter design

pub mod biquad;
pub mod fir_design;
pub mod response;
pub mod spline;

pub use biquad::{BiquadCoefficients, BiquadFilter, BiquadFilterType};
pub use fir_design::{make_filter, to_minimum_phase, FilterPhase, FirDesign};
pub use response::FirResponse;
