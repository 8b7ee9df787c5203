//! DSP-specific errors

use thiserror::Error;

/// Result type alias using `DspError`
pub type Result<T> = std::result::Result<T, DspError>;

/// DSP error types
///
/// Only configuration operations fail. Steady-state processing never returns
/// an error from inside an effect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    /// Filter design control points are malformed
    #[error("Invalid band control points: {0}")]
    InvalidBands(String),

    /// Requested tap count cannot produce a filter
    #[error("Invalid tap count: {0}")]
    InvalidTapCount(usize),

    /// Convolution filter has no taps
    #[error("Filter is empty")]
    EmptyFilter,

    /// Convolution block size cannot be zero
    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    /// Transform failed (degenerate size or invalid spectrum)
    #[error("FFT error: {0}")]
    Fft(String),

    /// Band index is outside the configured layout
    #[error("Band index {index} out of range ({count} bands)")]
    BandIndexOutOfRange { index: usize, count: usize },

    /// Number of gains does not match the number of bands
    #[error("Expected {expected} band gains, got {actual}")]
    BandCountMismatch { expected: usize, actual: usize },

    /// Filter index is outside the parametric EQ's cascade
    #[error("Filter index {index} out of range ({count} filters)")]
    FilterIndexOutOfRange { index: usize, count: usize },

    /// Audio block channel count differs from the pipeline's
    #[error("Expected {expected} channels, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    /// Per-channel sequences of one block differ in length
    #[error("Channels have uneven lengths")]
    UnevenChannels,

    /// PCM format is not handled by the bridge helpers
    #[error("Unsupported PCM format: {0}")]
    UnsupportedFormat(String),

    /// Handle does not refer to a live effect
    #[error("Unknown effect handle")]
    UnknownEffect,

    /// Effect is already part of the chain
    #[error("Effect is already in the chain")]
    DuplicateEffect,

    /// Pipeline configuration could not be parsed or applied
    #[error("Config error: {0}")]
    Config(String),
}

impl From<realfft::FftError> for DspError {
    fn from(err: realfft::FftError) -> Self {
        Self::Fft(err.to_string())
    }
}

impl From<serde_json::Error> for DspError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
