//! Parametric equalizer
//!
//! An ordered cascade of biquad sections. Every channel owns its own copy of
//! the cascade so filter state never leaks between channels.

use super::AudioEffect;
use crate::error::{DspError, Result};
use crate::filters::{BiquadCoefficients, BiquadFilter, BiquadFilterType};
use crate::sink::AudioSink;
use serde::{Deserialize, Serialize};

/// Parameters of one cascade section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqFilter {
    pub filter_type: BiquadFilterType,
    /// Center or corner frequency in Hz
    pub center_freq: f32,
    pub q: f32,
    /// Ignored unless the type is peaking or shelving
    #[serde(default)]
    pub gain_db: f32,
}

impl EqFilter {
    /// Peaking section
    pub fn peaking(center_freq: f32, q: f32, gain_db: f32) -> Self {
        Self {
            filter_type: BiquadFilterType::PeakingEq,
            center_freq,
            q,
            gain_db,
        }
    }
}

/// Cascade of biquad filters applied to every channel
pub struct ParametricEq {
    sample_rate: f32,
    /// Section parameters in cascade order
    params: Vec<EqFilter>,
    /// `[channel][section]`
    channel_filters: Vec<Vec<BiquadFilter>>,
}

impl ParametricEq {
    /// Create an empty (pass-through) equalizer
    pub fn new(sample_rate: f32, channels: usize) -> Self {
        Self {
            sample_rate,
            params: Vec::new(),
            channel_filters: vec![Vec::new(); channels],
        }
    }

    /// Append a section; returns its index
    pub fn add_filter(
        &mut self,
        filter_type: BiquadFilterType,
        center_freq: f32,
        q: f32,
        gain_db: f32,
    ) -> usize {
        self.push(EqFilter {
            filter_type,
            center_freq,
            q,
            gain_db,
        })
    }

    /// Append a section from its parameters; returns its index
    pub fn push(&mut self, params: EqFilter) -> usize {
        let coeffs = self.design(&params);
        for filters in &mut self.channel_filters {
            filters.push(BiquadFilter::from_coefficients(coeffs));
        }
        self.params.push(params);
        self.params.len() - 1
    }

    /// Replace section `index` with a freshly designed one
    ///
    /// The section's state starts from zero.
    ///
    /// # Errors
    /// Fails with [`DspError::FilterIndexOutOfRange`] for an unknown index.
    pub fn update_filter(
        &mut self,
        index: usize,
        filter_type: BiquadFilterType,
        center_freq: f32,
        q: f32,
        gain_db: f32,
    ) -> Result<()> {
        self.check_index(index)?;

        let params = EqFilter {
            filter_type,
            center_freq,
            q,
            gain_db,
        };
        let coeffs = self.design(&params);
        for filters in &mut self.channel_filters {
            filters[index] = BiquadFilter::from_coefficients(coeffs);
        }
        self.params[index] = params;
        Ok(())
    }

    /// Remove section `index`, shifting later sections down
    ///
    /// # Errors
    /// Fails with [`DspError::FilterIndexOutOfRange`] for an unknown index.
    pub fn remove_filter(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;

        for filters in &mut self.channel_filters {
            filters.remove(index);
        }
        self.params.remove(index);
        Ok(())
    }

    pub fn remove_all_filters(&mut self) {
        for filters in &mut self.channel_filters {
            filters.clear();
        }
        self.params.clear();
    }

    /// Preallocate room for `count` sections
    pub(crate) fn reserve_filters(&mut self, count: usize) {
        self.params.reserve(count);
        for filters in &mut self.channel_filters {
            filters.reserve(count);
        }
    }

    pub fn filter_count(&self) -> usize {
        self.params.len()
    }

    /// Parameters of section `index`
    pub fn filter(&self, index: usize) -> Option<&EqFilter> {
        self.params.get(index)
    }

    /// All section parameters in cascade order
    pub fn filters(&self) -> &[EqFilter] {
        &self.params
    }

    /// Coefficients of section `index`
    pub fn coefficients(&self, index: usize) -> Option<&BiquadCoefficients> {
        self.channel_filters
            .first()
            .and_then(|filters| filters.get(index))
            .map(BiquadFilter::coefficients)
    }

    /// Combined linear magnitude of the cascade at `freq` Hz
    pub fn magnitude_response(&self, freq: f32) -> f32 {
        self.channel_filters.first().map_or(1.0, |filters| {
            filters
                .iter()
                .map(|f| f.magnitude_response(freq, self.sample_rate))
                .product()
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn design(&self, params: &EqFilter) -> BiquadCoefficients {
        BiquadCoefficients::design(
            params.filter_type,
            self.sample_rate,
            params.center_freq,
            params.q,
            params.gain_db,
        )
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.params.len() {
            Ok(())
        } else {
            Err(DspError::FilterIndexOutOfRange {
                index,
                count: self.params.len(),
            })
        }
    }
}

impl AudioEffect for ParametricEq {
    fn write_audio(&mut self, buf: &mut [Vec<f32>], next: &mut dyn AudioSink) {
        for (channel, filters) in buf.iter_mut().zip(self.channel_filters.iter_mut()) {
            for filter in filters.iter_mut() {
                filter.process_block(channel);
            }
        }

        next.write_audio(buf);
    }

    fn reset(&mut self) {
        for filters in &mut self.channel_filters {
            for filter in filters.iter_mut() {
                filter.reset();
            }
        }
    }

    fn name(&self) -> &'static str {
        "Parametric EQ"
    }
}
