//! Block FFT convolution engine
//!
//! Applies an FIR filter of any length to a continuous stream with
//! overlap-add. Input is accumulated per channel until a full block is
//! available, then filtered in the frequency domain. The linear convolution
//! of a block spills `taps - 1` samples past the block end; that tail is kept
//! per channel and added to the start of the next block.
//!
//! Latency is one block. The transform is zero-padded to at least
//! `block_size + taps`, so the circular convolution never wraps around.
//!
//! # Example
//!
//! ```rust
//! use audiofx_dsp::effects::{AudioEffect, Convolver};
//! use audiofx_dsp::sink::NullSink;
//!
//! let mut convolver = Convolver::new(2, 256).unwrap();
//! convolver.set_filter(&[0.5, 0.25, 0.125]).unwrap();
//!
//! let mut block = vec![vec![0.0; 512]; 2];
//! convolver.write_audio(&mut block, &mut NullSink);
//! convolver.finalize(&mut NullSink);
//! ```

use super::AudioEffect;
use crate::error::{DspError, Result};
use crate::sink::AudioSink;
use crate::util::next_fft_size;
use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;
use tracing::debug;

/// Overlap-add FFT convolver
///
/// Without a filter the convolver passes audio through unchanged.
pub struct Convolver {
    /// Number of channels
    channels: usize,
    /// Samples per processed block
    block_size: usize,
    /// Fill level of the accumulation buffers
    block_pos: usize,
    /// Per-channel input accumulation, reused as the output block
    blocks: Vec<Vec<f32>>,
    /// Filter state (None until a filter is set)
    kernel: Option<Kernel>,
}

/// Filter-dependent state, sized once per filter
struct Kernel {
    /// Time-domain taps, unpadded
    taps: Vec<f32>,
    /// Filter spectrum, pre-scaled by `1 / fft_size`
    spectrum: Vec<Complex<f32>>,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    /// Per-channel ringing tail carried into the next block
    overlaps: Vec<Vec<f32>>,
    /// Shared transform buffers (channels are processed sequentially)
    time_buf: Vec<f32>,
    freq_buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Kernel {
    fn new(taps: &[f32], block_size: usize, channels: usize) -> Result<Self> {
        let conv_size = block_size + taps.len();
        let fft_size = next_fft_size(conv_size);

        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let mut scratch = vec![
            Complex::new(0.0, 0.0);
            forward.get_scratch_len().max(inverse.get_scratch_len())
        ];

        let mut time_buf = forward.make_input_vec();
        time_buf[..taps.len()].copy_from_slice(taps);
        let mut spectrum = forward.make_output_vec();
        forward.process_with_scratch(&mut time_buf, &mut spectrum, &mut scratch)?;

        // Absorb the inverse transform's normalization
        let scale = 1.0 / fft_size as f32;
        for bin in &mut spectrum {
            *bin *= scale;
        }

        debug!(
            taps = taps.len(),
            block_size, fft_size, "convolution kernel prepared"
        );

        Ok(Self {
            taps: taps.to_vec(),
            freq_buf: forward.make_output_vec(),
            spectrum,
            forward,
            inverse,
            overlaps: vec![vec![0.0; taps.len()]; channels],
            time_buf,
            scratch,
        })
    }

    /// Linear convolution of `input` with the taps into `time_buf`
    ///
    /// The first `input.len() + taps - 1` samples of `time_buf` are valid.
    fn convolve(&mut self, input: &[f32]) {
        self.time_buf[..input.len()].copy_from_slice(input);
        self.time_buf[input.len()..].fill(0.0);

        if self
            .forward
            .process_with_scratch(&mut self.time_buf, &mut self.freq_buf, &mut self.scratch)
            .is_err()
        {
            self.time_buf.fill(0.0);
            return;
        }

        for (bin, h) in self.freq_buf.iter_mut().zip(&self.spectrum) {
            *bin *= h;
        }
        // DC and Nyquist of a real signal's spectrum are real
        let last = self.freq_buf.len() - 1;
        self.freq_buf[0].im = 0.0;
        self.freq_buf[last].im = 0.0;

        if self
            .inverse
            .process_with_scratch(&mut self.freq_buf, &mut self.time_buf, &mut self.scratch)
            .is_err()
        {
            self.time_buf.fill(0.0);
        }
    }

    /// Write `time_buf` plus the channel's carried tail into `out`
    fn add_overlap(&self, channel: usize, out: &mut [f32]) {
        let overlap = &self.overlaps[channel];
        for (i, (o, &y)) in out.iter_mut().zip(&self.time_buf).enumerate() {
            *o = y + overlap.get(i).copied().unwrap_or(0.0);
        }
    }

    /// Carry everything past `split` into the channel's tail
    fn save_tail(&mut self, channel: usize, split: usize) {
        let overlap = &mut self.overlaps[channel];
        let len = overlap.len();
        // Reads at split + j always run ahead of the write at j
        for j in 0..len {
            let carried = if split + j < len { overlap[split + j] } else { 0.0 };
            overlap[j] = self.time_buf[split + j] + carried;
        }
    }

    fn reset(&mut self) {
        for overlap in &mut self.overlaps {
            overlap.fill(0.0);
        }
    }
}

impl Convolver {
    /// Create a pass-through convolver for `channels` channels
    ///
    /// # Errors
    /// Fails with [`DspError::InvalidBlockSize`] if `block_size` is zero.
    pub fn new(channels: usize, block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(DspError::InvalidBlockSize(block_size));
        }

        Ok(Self {
            channels,
            block_size,
            block_pos: 0,
            blocks: vec![vec![0.0; block_size]; channels],
            kernel: None,
        })
    }

    /// Install a new filter
    ///
    /// Plans the transforms and precomputes the filter spectrum. Accumulated
    /// input is kept; the ringing tail of the previous filter is dropped.
    ///
    /// # Real-Time Constraints
    /// Allocates. Do not call from the audio thread.
    ///
    /// # Errors
    /// Fails with [`DspError::EmptyFilter`] for an empty slice. The previous
    /// filter stays active on failure.
    pub fn set_filter(&mut self, taps: &[f32]) -> Result<()> {
        if taps.is_empty() {
            return Err(DspError::EmptyFilter);
        }
        self.kernel = Some(Kernel::new(taps, self.block_size, self.channels)?);
        Ok(())
    }

    /// Remove the filter and pass audio through
    ///
    /// Pending input and the ringing tail are discarded.
    pub fn clear_filter(&mut self) {
        self.kernel = None;
        self.block_pos = 0;
    }

    /// Current taps (empty when no filter is set)
    pub fn filter(&self) -> &[f32] {
        self.kernel.as_ref().map(|k| k.taps.as_slice()).unwrap_or(&[])
    }

    /// Samples per processed block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Transform size for the current filter
    pub fn fft_size(&self) -> Option<usize> {
        self.kernel.as_ref().map(|k| k.time_buf.len())
    }

    /// Samples waiting for the next full block
    pub fn pending(&self) -> usize {
        self.block_pos
    }

    /// Filter every channel's full block and emit it
    fn process_block(&mut self, next: &mut dyn AudioSink) {
        let Some(kernel) = self.kernel.as_mut() else {
            return;
        };

        for (ch, block) in self.blocks.iter_mut().enumerate() {
            kernel.convolve(block);
            kernel.add_overlap(ch, block);
            kernel.save_tail(ch, self.block_size);
        }

        next.write_audio(&mut self.blocks);
        self.block_pos = 0;
    }
}

impl AudioEffect for Convolver {
    fn write_audio(&mut self, buf: &mut [Vec<f32>], next: &mut dyn AudioSink) {
        if self.kernel.is_none() {
            next.write_audio(buf);
            return;
        }

        let frames = buf.first().map_or(0, Vec::len);
        let mut offset = 0;
        while offset < frames {
            let n = (self.block_size - self.block_pos).min(frames - offset);
            for (block, input) in self.blocks.iter_mut().zip(buf.iter()) {
                block[self.block_pos..self.block_pos + n]
                    .copy_from_slice(&input[offset..offset + n]);
            }
            self.block_pos += n;
            offset += n;

            if self.block_pos == self.block_size {
                self.process_block(next);
            }
        }
    }

    fn reset(&mut self) {
        self.block_pos = 0;
        for block in &mut self.blocks {
            block.fill(0.0);
        }
        if let Some(kernel) = self.kernel.as_mut() {
            kernel.reset();
        }
    }

    /// Flush the partial block and the remaining tail
    ///
    /// Emits `pending + taps - 1` samples per channel (nothing if that is
    /// zero), then clears the streaming state.
    ///
    /// # Real-Time Constraints
    /// Allocates the final output block.
    fn finalize(&mut self, next: &mut dyn AudioSink) {
        let Some(kernel) = self.kernel.as_mut() else {
            return;
        };

        let emit_len = self.block_pos + kernel.taps.len() - 1;
        if emit_len > 0 {
            let mut tails = Vec::with_capacity(self.channels);
            for (ch, block) in self.blocks.iter().enumerate() {
                kernel.convolve(&block[..self.block_pos]);
                let mut out = vec![0.0; emit_len];
                kernel.add_overlap(ch, &mut out);
                tails.push(out);
            }
            next.write_audio(&mut tails);
        }

        self.reset();
    }

    fn name(&self) -> &'static str {
        "Convolver"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;

    /// Per-channel capture
    #[derive(Default)]
    struct Capture {
        channels: Vec<Vec<f32>>,
        writes: usize,
    }

    impl AudioSink for Capture {
        fn write_audio(&mut self, buf: &mut [Vec<f32>]) {
            self.channels.resize(buf.len(), Vec::new());
            for (out, ch) in self.channels.iter_mut().zip(buf.iter()) {
                out.extend_from_slice(ch);
            }
            self.writes += 1;
        }
    }

    fn direct_convolution(x: &[f32], h: &[f32]) -> Vec<f32> {
        let mut y = vec![0.0; x.len() + h.len() - 1];
        for (i, &xi) in x.iter().enumerate() {
            for (j, &hj) in h.iter().enumerate() {
                y[i + j] += xi * hj;
            }
        }
        y
    }

    fn signal(len: usize, seed: f32) -> Vec<f32> {
        (0..len).map(|i| ((i as f32 + seed) * 0.37).sin()).collect()
    }

    fn run(
        convolver: &mut Convolver,
        input: &[Vec<f32>],
        chunk: usize,
    ) -> Capture {
        let mut capture = Capture::default();
        let frames = input[0].len();
        let mut start = 0;
        while start < frames {
            let end = (start + chunk).min(frames);
            let mut block: Vec<Vec<f32>> = input.iter().map(|c| c[start..end].to_vec()).collect();
            convolver.write_audio(&mut block, &mut capture);
            start = end;
        }
        convolver.finalize(&mut capture);
        capture
    }

    #[test]
    fn unit_impulse_is_identity() {
        let mut convolver = Convolver::new(1, 64).unwrap();
        convolver.set_filter(&[1.0]).unwrap();

        let input = vec![signal(300, 0.0)];
        let capture = run(&mut convolver, &input, 50);

        assert_eq!(capture.channels[0].len(), 300);
        for (a, b) in capture.channels[0].iter().zip(&input[0]) {
            assert!((a - b).abs() < 1e-5, "{a} != {b}");
        }
    }

    #[test]
    fn matches_direct_convolution() {
        let taps = [0.5, -0.25, 0.125, 0.75, 0.1];
        let mut convolver = Convolver::new(1, 16).unwrap();
        convolver.set_filter(&taps).unwrap();

        let input = vec![signal(100, 1.0)];
        let capture = run(&mut convolver, &input, 7);
        let expected = direct_convolution(&input[0], &taps);

        assert_eq!(capture.channels[0].len(), expected.len());
        for (i, (a, b)) in capture.channels[0].iter().zip(&expected).enumerate() {
            assert!((a - b).abs() < 1e-4, "sample {i}: {a} != {b}");
        }
    }

    #[test]
    fn filter_longer_than_block() {
        let taps: Vec<f32> = (0..50).map(|i| 1.0 / (i as f32 + 1.0)).collect();
        let mut convolver = Convolver::new(1, 8).unwrap();
        convolver.set_filter(&taps).unwrap();

        let input = vec![signal(61, 2.0)];
        let capture = run(&mut convolver, &input, 13);
        let expected = direct_convolution(&input[0], &taps);

        assert_eq!(capture.channels[0].len(), expected.len());
        for (a, b) in capture.channels[0].iter().zip(&expected) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn channels_keep_independent_tails() {
        let taps = [1.0, 0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3];
        let left = signal(40, 0.0);
        let right: Vec<f32> = signal(40, 5.0).iter().map(|s| -2.0 * s).collect();

        let mut stereo = Convolver::new(2, 8).unwrap();
        stereo.set_filter(&taps).unwrap();
        let capture = run(&mut stereo, &[left.clone(), right.clone()], 8);

        for (ch, input) in [left, right].iter().enumerate() {
            let expected = direct_convolution(input, &taps);
            for (a, b) in capture.channels[ch].iter().zip(&expected) {
                assert!((a - b).abs() < 1e-4, "channel {ch}: {a} != {b}");
            }
        }
    }

    #[test]
    fn silence_after_an_impulse_leaves_only_the_tail() {
        let taps = [1.0, -0.5, 0.25];
        let mut convolver = Convolver::new(1, 8).unwrap();
        convolver.set_filter(&taps).unwrap();
        let mut capture = Capture::default();

        let mut impulse = vec![0.0; 8];
        impulse[7] = 1.0;
        convolver.write_audio(&mut [impulse], &mut capture);
        for _ in 0..4 {
            convolver.write_audio(&mut [vec![0.0; 8]], &mut capture);
        }

        let out = &capture.channels[0];
        assert_eq!(out.len(), 40);
        for (i, &s) in out.iter().enumerate() {
            let expected = match i {
                7..=9 => taps[i - 7],
                _ => 0.0,
            };
            assert!((s - expected).abs() < 1e-5, "sample {i}: {s}");
        }
    }

    #[test]
    fn emits_only_full_blocks_until_finalize() {
        let mut convolver = Convolver::new(2, 32).unwrap();
        convolver.set_filter(&[1.0, 0.5]).unwrap();
        let mut capture = Capture::default();

        convolver.write_audio(&mut [vec![0.1; 20], vec![0.1; 20]], &mut capture);
        assert_eq!(capture.writes, 0);
        assert_eq!(convolver.pending(), 20);

        convolver.write_audio(&mut [vec![0.1; 20], vec![0.1; 20]], &mut capture);
        assert_eq!(capture.writes, 1);
        assert_eq!(capture.channels[0].len(), 32);
        assert_eq!(convolver.pending(), 8);

        convolver.finalize(&mut capture);
        assert_eq!(capture.channels[0].len(), 41);
        assert_eq!(convolver.pending(), 0);
    }

    #[test]
    fn finalize_with_nothing_pending_and_single_tap_emits_nothing() {
        let mut convolver = Convolver::new(1, 4).unwrap();
        convolver.set_filter(&[2.0]).unwrap();
        let mut capture = Capture::default();

        convolver.write_audio(&mut [vec![1.0; 8]], &mut capture);
        convolver.finalize(&mut capture);

        assert_eq!(capture.writes, 2);
        assert_eq!(capture.channels[0].len(), 8);
        assert!(capture.channels[0].iter().all(|s| (s - 2.0).abs() < 1e-5));
    }

    #[test]
    fn passes_through_without_filter() {
        let mut convolver = Convolver::new(1, 16).unwrap();
        let mut capture = Capture::default();

        convolver.write_audio(&mut [vec![0.3, -0.3]], &mut capture);
        convolver.finalize(&mut capture);

        assert_eq!(capture.channels[0], vec![0.3, -0.3]);
        assert!(convolver.filter().is_empty());
    }

    #[test]
    fn fft_size_is_even_and_covers_block_plus_taps() {
        let mut convolver = Convolver::new(1, 100).unwrap();
        convolver.set_filter(&[0.0; 33]).unwrap();

        let size = convolver.fft_size().unwrap();
        assert!(size >= 133);
        assert_eq!(size % 2, 0);
    }

    #[test]
    fn invalid_configuration_rejected() {
        assert!(matches!(Convolver::new(2, 0), Err(DspError::InvalidBlockSize(0))));

        let mut convolver = Convolver::new(1, 8).unwrap();
        convolver.set_filter(&[0.5, 0.5]).unwrap();
        assert_eq!(convolver.set_filter(&[]), Err(DspError::EmptyFilter));
        assert_eq!(convolver.filter(), &[0.5, 0.5]);
    }

    #[test]
    fn reset_is_idempotent_and_keeps_filter() {
        let mut convolver = Convolver::new(1, 8).unwrap();
        convolver.set_filter(&[0.5, 0.5, 0.5]).unwrap();
        convolver.write_audio(&mut [vec![1.0; 12]], &mut NullSink);

        convolver.reset();
        convolver.reset();
        assert_eq!(convolver.pending(), 0);
        assert_eq!(convolver.filter(), &[0.5, 0.5, 0.5]);

        // A fresh stream after reset carries no tail from before
        let capture = run(&mut convolver, &[vec![0.0; 8]], 8);
        assert!(capture.channels[0].iter().all(|&s| s.abs() < 1e-6));
    }
}
