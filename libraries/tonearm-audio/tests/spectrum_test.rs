//! Spectrum analyzer behavior tests
//!
//! Silence convergence, single-tone band dominance and output bounds.

use proptest::prelude::*;
use std::f32::consts::PI;
use tonearm_audio::{SpectrumAnalyzer, SpectrumConfig};

const SAMPLE_RATE: u32 = 44_100;
const WINDOW: usize = 2048;

fn analyzer() -> SpectrumAnalyzer {
    SpectrumAnalyzer::new(SpectrumConfig::default(), SAMPLE_RATE).unwrap()
}

fn tone(frequency: f32, amplitude: f32) -> Vec<f32> {
    (0..WINDOW)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

#[test]
fn silence_fades_through_analysis_then_settles_through_decay() {
    let mut analyzer = analyzer();
    let loud = tone(1000.0, 1.0);
    for _ in 0..10 {
        analyzer.analyze(&loud);
    }
    assert!(!analyzer.is_silent());

    let silence = vec![0.0; WINDOW];
    for _ in 0..25 {
        analyzer.analyze(&silence);
    }
    // 0.7^25 of a full-scale band
    assert!(analyzer.spectrum().iter().all(|&v| v < 1e-3));

    let mut ticks = 0;
    while !analyzer.is_silent() {
        analyzer.decay();
        ticks += 1;
        assert!(ticks <= 5, "spectrum did not settle after {ticks} decay ticks");
    }
}

#[test]
fn silence_converges_to_zero_through_decay() {
    let mut analyzer = analyzer();
    let loud = tone(440.0, 1.0);
    for _ in 0..10 {
        analyzer.analyze(&loud);
    }

    let mut ticks = 0;
    while !analyzer.is_silent() {
        analyzer.decay();
        ticks += 1;
        assert!(ticks <= 50, "spectrum did not decay after {ticks} ticks");
    }
    assert!(analyzer.spectrum().iter().all(|&v| v == 0.0));
}

/// Bins that fall inside exactly one band's range
fn exclusive_bin(bins: &[(usize, usize)], band: usize) -> Option<usize> {
    let (low, high) = bins[band];
    (low..=high).find(|&bin| {
        bins.iter()
            .enumerate()
            .all(|(other, &(lo, hi))| other == band || !(lo..=hi).contains(&bin))
    })
}

#[test]
fn full_scale_tone_dominates_its_band() {
    let bins = analyzer().band_bins().to_vec();
    let mut checked = 0;

    for band in 0..bins.len() {
        let Some(bin) = exclusive_bin(&bins, band) else {
            continue;
        };
        let mut analyzer = analyzer();
        let frame = tone(analyzer.bin_frequency(bin), 1.0);
        for _ in 0..30 {
            analyzer.analyze(&frame);
        }

        let spectrum = analyzer.spectrum();
        assert!(spectrum[band] > 0.5, "band {band} only reached {}", spectrum[band]);
        for (other, &value) in spectrum.iter().enumerate() {
            if other != band {
                assert!(
                    spectrum[band] > value,
                    "band {band} ({}) not above band {other} ({value})",
                    spectrum[band]
                );
            }
        }
        checked += 1;
    }

    // Every band from ~110 Hz up owns at least one bin at 44.1 kHz / 2048
    assert!(checked >= 15, "only {checked} bands checked");
}

#[test]
fn treble_tone_registers_in_wide_bands() {
    let mut analyzer = analyzer();
    let frame = tone(12_000.0, 1.0);
    for _ in 0..10 {
        analyzer.analyze(&frame);
    }
    let (loudest, &level) = analyzer
        .spectrum()
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .unwrap();
    assert_eq!(loudest, 18);
    assert!(level > 0.5);
}

#[test]
fn rising_is_faster_than_falling() {
    let mut analyzer = analyzer();
    let loud = tone(1000.0, 1.0);

    analyzer.analyze(&loud);
    let peak_band = analyzer
        .spectrum()
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    let after_one_rise = analyzer.spectrum()[peak_band];

    for _ in 0..30 {
        analyzer.analyze(&loud);
    }
    let settled = analyzer.spectrum()[peak_band];

    analyzer.analyze(&vec![0.0; WINDOW]);
    let after_one_fall = analyzer.spectrum()[peak_band];

    // One attack step covers 70% of the way up, one decay step 30% of the way down
    assert!((after_one_rise / settled - 0.7).abs() < 0.05);
    assert!((after_one_fall / settled - 0.7).abs() < 0.05);
}

#[test]
fn short_frames_are_zero_padded() {
    let mut analyzer = analyzer();
    let short = &tone(1000.0, 1.0)[..256];
    let spectrum = analyzer.analyze(short);
    assert_eq!(spectrum.len(), 20);
    assert!(spectrum.iter().any(|&v| v > 0.0));
}

proptest! {
    /// Property: every band stays within [0, 1] for arbitrary input
    #[test]
    fn bands_stay_normalized(
        frames in prop::collection::vec(prop::collection::vec(-4.0f32..4.0, 0..3000), 1..8)
    ) {
        let mut analyzer = analyzer();
        for frame in frames {
            let spectrum = analyzer.analyze(&frame);
            prop_assert_eq!(spectrum.len(), 20);
            prop_assert!(spectrum.iter().all(|v| (0.0..=1.0).contains(v)));
        }
        analyzer.decay();
        prop_assert!(analyzer.spectrum().iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
