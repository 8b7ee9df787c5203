//! Pipeline configuration
//!
//! Describes which effects to install, in order, with their parameters.
//! A configuration can be loaded from JSON and turned into a ready chain:
//!
//! ```rust
//! use audiofx_dsp::config::PipelineConfig;
//! use audiofx_dsp::effects::EffectChain;
//! use audiofx_dsp::sink::NullSink;
//!
//! let config = PipelineConfig::from_json(
//!     r#"{
//!         "sample_rate": 48000,
//!         "channels": 2,
//!         "effects": [
//!             { "kind": "gain", "gain_db": -3.0 },
//!             { "kind": "graphic_eq_iir", "num_bands": 10, "gains": [0, 0, 2, 0, 0, 0, 0, 0, -2, 0] }
//!         ]
//!     }"#,
//! )
//! .unwrap();
//!
//! let (chain, ids) = EffectChain::from_config(&config, NullSink).unwrap();
//! assert_eq!(chain.effects(), ids.as_slice());
//! ```

use crate::effects::graphic_eq::{DEFAULT_END_FREQ, DEFAULT_START_FREQ};
use crate::effects::{
    Convolver, Effect, EffectChain, EffectId, EqFilter, FirGraphicEq, Gain, GraphicEqBands,
    IirGraphicEq, Noise, ParametricEq, Silence,
};
use crate::error::{DspError, Result};
use crate::filters::FilterPhase;
use crate::pcm::PcmFormat;
use crate::sink::AudioSink;
use serde::{Deserialize, Serialize};

/// Whole-pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub sample_rate: f32,
    pub channels: usize,
    /// Host PCM format; only S16 and F32 are bridged
    #[serde(default)]
    pub format: PcmFormat,
    /// Effects in processing order
    #[serde(default)]
    pub effects: Vec<EffectConfig>,
}

impl PipelineConfig {
    /// Parse a JSON configuration
    ///
    /// # Errors
    /// Fails with [`DspError::Config`] on malformed JSON or unknown effect kinds.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty-printed JSON
    ///
    /// # Errors
    /// Fails with [`DspError::Config`] if a value cannot be represented (NaN gains, for example).
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One effect in the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: EffectKind,
}

fn default_enabled() -> bool {
    true
}

impl From<EffectKind> for EffectConfig {
    fn from(kind: EffectKind) -> Self {
        Self {
            enabled: true,
            kind,
        }
    }
}

/// Effect type and parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectKind {
    Gain {
        gain_db: f32,
    },
    Noise {
        /// Fixed seed for reproducible output
        #[serde(default)]
        seed: Option<u64>,
    },
    Silence,
    ParametricEq {
        #[serde(default)]
        filters: Vec<EqFilter>,
    },
    GraphicEqIir {
        num_bands: usize,
        #[serde(default = "default_start_freq")]
        start_freq: f32,
        #[serde(default = "default_end_freq")]
        end_freq: f32,
        /// One gain per band; empty means flat
        #[serde(default)]
        gains: Vec<f32>,
    },
    GraphicEqFir {
        num_bands: usize,
        #[serde(default = "default_start_freq")]
        start_freq: f32,
        #[serde(default = "default_end_freq")]
        end_freq: f32,
        #[serde(default)]
        gains: Vec<f32>,
        #[serde(default = "default_fir_block_size")]
        block_size: usize,
        #[serde(default)]
        phase: FilterPhase,
    },
    Convolver {
        block_size: usize,
        /// Time-domain filter; empty means pass-through
        #[serde(default)]
        taps: Vec<f32>,
    },
}

fn default_start_freq() -> f32 {
    DEFAULT_START_FREQ
}

fn default_end_freq() -> f32 {
    DEFAULT_END_FREQ
}

fn default_fir_block_size() -> usize {
    FirGraphicEq::DEFAULT_BLOCK_SIZE
}

impl EffectKind {
    /// Construct the configured effect
    ///
    /// # Errors
    /// Any error from the effect's constructor or setters.
    pub fn build(&self, sample_rate: f32, channels: usize) -> Result<Effect> {
        let effect = match self {
            Self::Gain { gain_db } => Gain::new(*gain_db).into(),
            Self::Noise { seed } => seed.map_or_else(Noise::new, Noise::with_seed).into(),
            Self::Silence => Silence.into(),
            Self::ParametricEq { filters } => {
                let mut eq = ParametricEq::new(sample_rate, channels);
                for filter in filters {
                    eq.push(*filter);
                }
                eq.into()
            }
            Self::GraphicEqIir {
                num_bands,
                start_freq,
                end_freq,
                gains,
            } => {
                let bands = configured_bands(*num_bands, *start_freq, *end_freq, gains)?;
                IirGraphicEq::new(sample_rate, channels, bands).into()
            }
            Self::GraphicEqFir {
                num_bands,
                start_freq,
                end_freq,
                gains,
                block_size,
                phase,
            } => {
                let bands = configured_bands(*num_bands, *start_freq, *end_freq, gains)?;
                FirGraphicEq::with_phase(sample_rate, channels, bands, *block_size, *phase)?.into()
            }
            Self::Convolver { block_size, taps } => {
                let mut convolver = Convolver::new(channels, *block_size)?;
                if !taps.is_empty() {
                    convolver.set_filter(taps)?;
                }
                convolver.into()
            }
        };
        Ok(effect)
    }
}

fn configured_bands(
    num_bands: usize,
    start_freq: f32,
    end_freq: f32,
    gains: &[f32],
) -> Result<GraphicEqBands> {
    let mut bands = GraphicEqBands::new(num_bands, start_freq, end_freq)?;
    if !gains.is_empty() {
        bands.set_all(gains)?;
    }
    Ok(bands)
}

impl<S: AudioSink> EffectChain<S> {
    /// Build a chain from a configuration
    ///
    /// Returns the chain and the handles of the created effects in
    /// configuration order. Disabled effects are created and added but bypassed.
    ///
    /// # Errors
    /// Unsupported PCM format, zero channels, or any effect that fails to build.
    pub fn from_config(config: &PipelineConfig, sink: S) -> Result<(Self, Vec<EffectId>)> {
        config.format.ensure_supported()?;
        if config.channels == 0 {
            return Err(DspError::Config("channel count must be positive".into()));
        }
        if !(config.sample_rate > 0.0 && config.sample_rate.is_finite()) {
            return Err(DspError::Config(format!(
                "invalid sample rate {}",
                config.sample_rate
            )));
        }

        let mut chain = Self::new(config.sample_rate, config.channels, sink);
        let mut ids = Vec::with_capacity(config.effects.len());
        for effect in &config.effects {
            let built = effect.kind.build(config.sample_rate, config.channels)?;
            let id = chain.create_effect(built);
            chain.add_effect(id)?;
            if !effect.enabled {
                chain.set_enabled(id, false)?;
            }
            ids.push(id);
        }

        Ok((chain, ids))
    }
}
