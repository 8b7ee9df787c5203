//! Graphic EQ band layout and response tests

mod common;

use audiofx_dsp::effects::{AudioEffect, GraphicEqBands, IirGraphicEq};
use audiofx_dsp::util::amplitude::linear_to_db;
use audiofx_dsp::DspError;
use common::{calculate_rms, generate_sine, ChannelCapture};
use proptest::prelude::*;

const SR: f32 = 44_100.0;

#[test]
fn ten_band_layout_is_octave_spaced() {
    let bands = GraphicEqBands::new(10, 20.0, 20_000.0).unwrap();
    let slice = bands.as_slice();

    let ratio = slice[1].center_freq / slice[0].center_freq;
    assert!((ratio.log2() - 0.9966).abs() < 1e-3);

    // Geometric center of the first sub-band
    let expected = 20.0 * 2.0_f32.powf(0.5 * ratio.log2());
    assert!((slice[0].center_freq - expected).abs() < 1e-2);

    // Roughly one octave per band gives Q near sqrt(2)
    assert!((slice[0].q - 1.41).abs() < 0.02);
}

#[test]
fn edges_tile_the_range() {
    let bands = GraphicEqBands::new(7, 50.0, 16_000.0).unwrap();

    assert_eq!(bands.band_edges(7), None);
    let (first_low, _) = bands.band_edges(0).unwrap();
    let (_, last_high) = bands.band_edges(6).unwrap();
    assert!((first_low - 50.0).abs() < 1e-3);
    assert!((last_high - 16_000.0).abs() < 1.0);

    for i in 0..6 {
        let (_, high) = bands.band_edges(i).unwrap();
        let (low, _) = bands.band_edges(i + 1).unwrap();
        assert!((high - low).abs() < 1e-2);
    }
}

#[test]
fn invalid_layouts_rejected() {
    assert!(matches!(GraphicEqBands::new(0, 20.0, 20_000.0), Err(DspError::InvalidBands(_))));
    assert!(matches!(GraphicEqBands::new(10, 0.0, 20_000.0), Err(DspError::InvalidBands(_))));
    assert!(matches!(GraphicEqBands::new(10, 1000.0, 1000.0), Err(DspError::InvalidBands(_))));
    assert!(matches!(GraphicEqBands::new(10, 1000.0, 100.0), Err(DspError::InvalidBands(_))));
}

#[test]
fn gain_errors_report_counts() {
    let mut bands = GraphicEqBands::new(5, 20.0, 20_000.0).unwrap();
    assert_eq!(
        bands.set_gain(5, 1.0),
        Err(DspError::BandIndexOutOfRange { index: 5, count: 5 })
    );
    assert_eq!(
        bands.set_all(&[0.0; 6]),
        Err(DspError::BandCountMismatch {
            expected: 5,
            actual: 6
        })
    );
    assert_eq!(bands.gains(), vec![0.0; 5]);
}

#[test]
fn iir_band_boost_reaches_gain() {
    let bands = GraphicEqBands::new(10, 20.0, 20_000.0).unwrap();
    let mut eq = IirGraphicEq::new(SR, 2, bands);

    for (i, gain) in [(2, 6.0), (7, -9.0)] {
        eq.set_all_bands(&[0.0; 10]).unwrap();
        eq.set_band_gain(i, gain).unwrap();

        let center = eq.band(i).unwrap().center_freq;
        let db = linear_to_db(eq.parametric_eq().magnitude_response(center));
        assert!((db - gain).abs() < 1e-3, "band {i}: {db} dB");
    }
}

#[test]
fn iir_eq_shapes_stereo_stream() {
    let bands = GraphicEqBands::new(10, 20.0, 20_000.0).unwrap();
    let mut eq = IirGraphicEq::new(SR, 2, bands);
    eq.set_band_gain(5, -12.0).unwrap();

    let center = eq.band(5).unwrap().center_freq;
    let tone = generate_sine(center, SR, 44_100, 0.5);
    let mut block = vec![tone.clone(), tone.clone()];
    let mut capture = ChannelCapture::default();
    eq.write_audio(&mut block, &mut capture);

    let expected = eq.parametric_eq().magnitude_response(center);
    for ch in 0..2 {
        let settled = &capture.channel(ch)[22_050..];
        let ratio = calculate_rms(settled) / calculate_rms(&tone[22_050..]);
        assert!((ratio - expected).abs() < 0.01, "channel {ch}: {ratio}");
    }
}

proptest! {
    #[test]
    fn layout_invariants_hold(
        num_bands in 1usize..64,
        start_freq in 10.0f32..1000.0,
        span in 1.5f32..2000.0,
    ) {
        let end_freq = start_freq * span;
        let bands = GraphicEqBands::new(num_bands, start_freq, end_freq).unwrap();
        prop_assert_eq!(bands.len(), num_bands);

        let slice = bands.as_slice();
        let q = slice[0].q;
        for (i, band) in slice.iter().enumerate() {
            let (low, high) = bands.band_edges(i).unwrap();
            prop_assert!(low < band.center_freq && band.center_freq < high);
            prop_assert!((band.center_freq - (low * high).sqrt()).abs() <= 1e-3 * band.center_freq);
            prop_assert_eq!(band.q, q);
            prop_assert_eq!(band.gain_db, 0.0);
        }
        for pair in slice.windows(2) {
            prop_assert!(pair[0].center_freq < pair[1].center_freq);
        }
    }
}
