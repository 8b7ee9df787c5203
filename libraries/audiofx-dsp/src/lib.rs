//! Audio FX DSP
//!
//! Real-time multi-channel effect chain with FIR/IIR equalizer design.
//!
//! This crate provides:
//! - An effect chain that routes channel-major `f32` blocks through enabled
//!   effects into a sink
//! - Overlap-add FFT convolution for arbitrarily long FIR filters
//! - Biquad sections (Audio EQ Cookbook) and parametric/graphic equalizers
//! - FIR design from sparse (frequency, gain) control points, with an
//!   optional homomorphic minimum-phase transform
//! - Interleaved S16/F32 PCM bridging for hosts
//!
//! Processing is single-threaded and synchronous. Steady-state block
//! processing does not allocate; configuration calls (filter design, chain
//! restructuring) do and belong off the audio thread.
//!
//! # Example: Graphic EQ
//!
//! ```rust
//! use audiofx_dsp::effects::{Effect, EffectChain, GraphicEqBands, IirGraphicEq};
//! use audiofx_dsp::sink::CollectingF32Sink;
//!
//! let mut chain = EffectChain::new(48_000.0, 2, CollectingF32Sink::new(2, 1024));
//!
//! let bands = GraphicEqBands::new(10, 20.0, 20_000.0).unwrap();
//! let geq = chain.create_effect(IirGraphicEq::new(48_000.0, 2, bands));
//! chain.add_effect(geq).unwrap();
//!
//! if let Some(Effect::GraphicEqIir(eq)) = chain.effect_mut(geq) {
//!     eq.set_band_gain(0, 4.0).unwrap(); // Bass boost
//! }
//!
//! let mut block = vec![vec![0.0; 1024]; 2];
//! chain.write_audio(&mut block).unwrap();
//! chain.finalize();
//!
//! assert_eq!(chain.sink().buffer().len(), 2048);
//! ```

pub mod config;
pub mod effects;
mod error;
pub mod filters;
pub mod pcm;
pub mod sink;
pub mod util;

pub use config::{EffectConfig, EffectKind, PipelineConfig};
pub use effects::{AudioEffect, Effect, EffectChain, EffectId};
pub use error::{DspError, Result};
pub use sink::AudioSink;
