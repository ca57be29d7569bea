//! Spectrum analyzer
//!
//! Windowed FFT of the first channel, reduced to log-spaced bands in
//! decibels, normalized to `[0, 1]` and smoothed with asymmetric attack and
//! decay. A band takes the level of its loudest bin, so a tone reads the same
//! in a two-bin bass band as in a three-hundred-bin treble band. All buffers
//! are allocated in [`SpectrumAnalyzer::new`].

use crate::error::{DspError, Result};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Floor applied to bin magnitudes before the decibel conversion
const MIN_MAGNITUDE: f32 = 1e-10;

/// Spectrum analyzer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// FFT window length in samples
    pub window_size: usize,

    /// Number of output bands
    pub band_count: usize,

    /// Lower edge of the first band (Hz)
    pub min_frequency: f32,

    /// Upper edge of the last band, capped at Nyquist (Hz)
    pub max_frequency: f32,

    /// Decibel value mapped to 0.0
    pub min_db: f32,

    /// Decibel value mapped to 1.0
    pub max_db: f32,

    /// Blend weight when a band rises
    pub attack: f32,

    /// Blend weight when a band falls
    pub decay: f32,

    /// Per-tick fall-off while playback is stopped or paused
    pub stop_decay: f32,

    /// Bands below this snap to zero during the stop-decay pass
    pub zero_floor: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            window_size: 2048,
            band_count: 20,
            min_frequency: 20.0,
            max_frequency: 20_000.0,
            min_db: -50.0,
            max_db: 0.0,
            attack: 0.7,
            decay: 0.3,
            stop_decay: 0.15,
            zero_floor: 1e-3,
        }
    }
}

impl SpectrumConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 4 {
            return Err(DspError::InvalidConfig(format!(
                "window_size must be at least 4, got {}",
                self.window_size
            )));
        }
        if self.band_count == 0 {
            return Err(DspError::InvalidConfig("band_count must be positive".into()));
        }
        if !(self.min_frequency > 0.0 && self.max_frequency > self.min_frequency) {
            return Err(DspError::InvalidConfig(format!(
                "frequency range {}..{} Hz is empty",
                self.min_frequency, self.max_frequency
            )));
        }
        if self.max_db <= self.min_db {
            return Err(DspError::InvalidConfig(format!(
                "decibel range {}..{} is empty",
                self.min_db, self.max_db
            )));
        }
        for (name, weight) in [
            ("attack", self.attack),
            ("decay", self.decay),
            ("stop_decay", self.stop_decay),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(DspError::InvalidConfig(format!(
                    "{name} must be within 0..=1, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

/// Real-time spectrum analyzer
pub struct SpectrumAnalyzer {
    config: SpectrumConfig,
    sample_rate: u32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    /// Inclusive bin range per band
    band_bins: Vec<(usize, usize)>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(config: SpectrumConfig, sample_rate: u32) -> Result<Self> {
        config.validate()?;
        if sample_rate == 0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }

        let size = config.window_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        let band_bins = Self::band_bins_for(&config, sample_rate);
        tracing::debug!(sample_rate, window_size = size, bands = ?band_bins, "Spectrum bands");

        Ok(Self {
            window: Self::hann_window(size),
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
            magnitudes: vec![0.0; size / 2],
            smoothed: vec![0.0; config.band_count],
            band_bins,
            fft,
            sample_rate,
            config,
        })
    }

    fn hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect()
    }

    /// Map log-spaced band edges onto inclusive FFT bin ranges
    fn band_bins_for(config: &SpectrumConfig, sample_rate: u32) -> Vec<(usize, usize)> {
        let bin_count = config.window_size / 2;
        let last_bin = bin_count - 1;
        let nyquist = sample_rate as f32 / 2.0;
        let max_frequency = config.max_frequency.min(nyquist);

        let log_min = config.min_frequency.log10();
        let log_max = max_frequency.max(config.min_frequency).log10();
        let step = (log_max - log_min) / config.band_count as f32;

        let to_bin = |frequency: f32| -> usize {
            let bin = (frequency / nyquist * bin_count as f32).round();
            (bin.max(0.0) as usize).min(last_bin)
        };

        (0..config.band_count)
            .map(|band| {
                let low = 10f32.powf(log_min + step * band as f32);
                let high = 10f32.powf(log_min + step * (band + 1) as f32);
                let low_bin = to_bin(low);
                let high_bin = to_bin(high).max(low_bin);
                (low_bin, high_bin)
            })
            .collect()
    }

    /// Analyze one mono frame and update the smoothed spectrum
    ///
    /// Frames longer than the window are truncated, shorter ones zero-padded.
    /// An empty frame is skipped and the previous spectrum carried forward.
    pub fn analyze(&mut self, samples: &[f32]) -> &[f32] {
        self.analyze_strided(samples, 1)
    }

    /// Analyze the first channel of an interleaved frame
    pub fn analyze_interleaved(&mut self, samples: &[f32], channels: usize) -> &[f32] {
        self.analyze_strided(samples, channels.max(1))
    }

    fn analyze_strided(&mut self, samples: &[f32], stride: usize) -> &[f32] {
        if samples.is_empty() {
            return &self.smoothed;
        }

        let first_channel = samples.iter().step_by(stride);
        self.buffer.fill(Complex::new(0.0, 0.0));
        for ((slot, &sample), &weight) in self
            .buffer
            .iter_mut()
            .zip(first_channel)
            .zip(self.window.iter())
        {
            *slot = Complex::new(sample * weight, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 2.0 / self.config.window_size as f32;
        for (magnitude, bin) in self.magnitudes.iter_mut().zip(self.buffer.iter()) {
            *magnitude = bin.norm() * scale;
        }

        let range = self.config.max_db - self.config.min_db;
        for (smoothed, &(low, high)) in self.smoothed.iter_mut().zip(self.band_bins.iter()) {
            let peak = self.magnitudes[low..=high]
                .iter()
                .copied()
                .fold(0.0_f32, f32::max);
            let db = 20.0 * peak.max(MIN_MAGNITUDE).log10();
            let target = ((db - self.config.min_db) / range).clamp(0.0, 1.0);

            let weight = if target > *smoothed {
                self.config.attack
            } else {
                self.config.decay
            };
            *smoothed = (*smoothed + (target - *smoothed) * weight).clamp(0.0, 1.0);
        }

        &self.smoothed
    }

    /// One decay-only step, used while nothing is rendering
    pub fn decay(&mut self) -> &[f32] {
        let factor = 1.0 - self.config.stop_decay;
        for value in &mut self.smoothed {
            *value *= factor;
            if *value < self.config.zero_floor {
                *value = 0.0;
            }
        }
        &self.smoothed
    }

    /// Whether every band has reached zero
    pub fn is_silent(&self) -> bool {
        self.smoothed.iter().all(|&v| v == 0.0)
    }

    /// Drop all smoothing state
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }

    /// Current smoothed spectrum
    pub fn spectrum(&self) -> &[f32] {
        &self.smoothed
    }

    /// Inclusive FFT bin range of each band
    pub fn band_bins(&self) -> &[(usize, usize)] {
        &self.band_bins
    }

    /// Center frequency of an FFT bin (Hz)
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.config.window_size as f32
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// Rebuild for a new sample rate, keeping the smoothed spectrum
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.band_bins = Self::band_bins_for(&self.config, sample_rate);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> SpectrumAnalyzer {
        SpectrumAnalyzer::new(SpectrumConfig::default(), 44_100).unwrap()
    }

    #[test]
    fn bands_are_ordered_and_in_range() {
        let analyzer = analyzer();
        let bins = analyzer.band_bins();
        assert_eq!(bins.len(), 20);
        for &(low, high) in bins {
            assert!(low <= high);
            assert!(high < 1024);
        }
        for pair in bins.windows(2) {
            assert!(pair[0].0 <= pair[1].0);
        }
    }

    #[test]
    fn low_sample_rate_caps_bands_at_nyquist() {
        let analyzer = SpectrumAnalyzer::new(SpectrumConfig::default(), 8_000).unwrap();
        let (_, last_high) = *analyzer.band_bins().last().unwrap();
        assert!(last_high <= 1023);
        // Last band should end at 4 kHz, which is the top bin
        assert_eq!(last_high, 1023);
    }

    #[test]
    fn empty_frame_carries_spectrum_forward() {
        let mut analyzer = analyzer();
        let tone: Vec<f32> = (0..2048)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 44_100.0).sin())
            .collect();
        let before = analyzer.analyze(&tone).to_vec();
        let after = analyzer.analyze(&[]).to_vec();
        assert_eq!(before, after);
    }

    #[test]
    fn interleaved_uses_first_channel_only() {
        let mut mono = analyzer();
        let mut stereo = analyzer();

        let left: Vec<f32> = (0..2048)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin())
            .collect();
        let interleaved: Vec<f32> = left.iter().flat_map(|&l| [l, 0.0]).collect();

        let expected = mono.analyze(&left).to_vec();
        let actual = stereo.analyze_interleaved(&interleaved, 2).to_vec();
        for (a, b) in expected.iter().zip(actual.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn decay_reaches_zero() {
        let mut analyzer = analyzer();
        analyzer.smoothed.fill(1.0);

        let mut ticks = 0;
        while !analyzer.is_silent() {
            analyzer.decay();
            ticks += 1;
            assert!(ticks < 100);
        }
        // 0.85^n < 1e-3 first holds at n = 43
        assert_eq!(ticks, 43);
    }

    #[test]
    fn only_the_decay_pass_snaps_to_zero() {
        let mut analyzer = analyzer();
        analyzer.smoothed.fill(0.001);

        // Silence pulls every band down by the decay weight, floor or not
        analyzer.analyze(&[0.0; 2048]);
        assert!(analyzer.spectrum().iter().all(|&v| (v - 0.0007).abs() < 1e-7));
        assert!(!analyzer.is_silent());

        analyzer.decay();
        assert!(analyzer.is_silent());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SpectrumConfig {
            attack: 1.5,
            ..SpectrumConfig::default()
        };
        assert!(SpectrumAnalyzer::new(config, 44_100).is_err());
        assert!(SpectrumAnalyzer::new(SpectrumConfig::default(), 0).is_err());
    }

    #[test]
    fn config_fills_missing_fields_from_defaults() {
        let config: SpectrumConfig = serde_json::from_str(r#"{"decay": 0.5}"#).unwrap();
        assert_eq!(config.decay, 0.5);
        assert_eq!(config.band_count, 20);
        assert_eq!(config.window_size, SpectrumConfig::default().window_size);
    }
}
