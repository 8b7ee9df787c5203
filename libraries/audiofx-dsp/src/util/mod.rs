//! Numeric helpers shared by the filters and effects

pub mod amplitude;
mod fft_size;
pub mod window;

pub use fft_size::next_fft_size;
