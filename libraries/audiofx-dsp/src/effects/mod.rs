//! Audio effects processing
//!
//! Effects operate on channel-major `f32` blocks and hand their output to the
//! next destination in an [`EffectChain`].
//!
//! Available effects:
//! - **Gain**: static gain in dB
//! - **Noise**: uniform white noise source
//! - **Silence**: zeroes the signal
//! - **ParametricEq**: cascade of biquad sections
//! - **IirGraphicEq**: graphic equalizer built from peaking biquads
//! - **FirGraphicEq**: graphic equalizer built from a designed FIR filter
//! - **Convolver**: overlap-add FFT convolution with arbitrary taps

mod chain;
pub mod convolver;
mod gain;
pub mod graphic_eq;
mod noise;
pub mod parametric_eq;
mod silence;

pub use chain::{AudioEffect, Effect, EffectChain, EffectId};
pub use convolver::Convolver;
pub use gain::Gain;
pub use graphic_eq::{FirGraphicEq, GraphicEqBand, GraphicEqBands, IirGraphicEq};
pub use noise::Noise;
pub use parametric_eq::{EqFilter, ParametricEq};
pub use silence::Silence;
