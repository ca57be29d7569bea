//! Graphic Equalizer
//!
//! Ten peaking biquads at fixed center frequencies, ±12 dB per band.
//! Gain changes recompute coefficients immediately; there is no parameter
//! smoothing.

use std::f32::consts::PI;

/// Band center frequencies (Hz)
pub const EQ_CENTER_FREQUENCIES: [f32; 10] = [
    60.0, 170.0, 310.0, 600.0, 1000.0, 3000.0, 6000.0, 12000.0, 14000.0, 16000.0,
];

/// Octave-ish bandwidth shared by every band
pub const EQ_Q: f32 = 1.41;

const GAIN_LIMIT_DB: f32 = 12.0;

/// One peaking band with stereo state
#[derive(Debug, Clone, Copy)]
struct PeakingBand {
    frequency: f32,
    gain_db: f32,

    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // Per channel: [x1, x2, y1, y2]
    state: [[f32; 4]; 2],
}

impl PeakingBand {
    fn new(frequency: f32) -> Self {
        Self {
            frequency,
            gain_db: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            state: [[0.0; 4]; 2],
        }
    }

    fn is_bypassed(&self) -> bool {
        self.gain_db.abs() < 0.01
    }

    fn update_coefficients(&mut self, sample_rate: f32) {
        if sample_rate < 1.0 || self.is_bypassed() {
            self.b0 = 1.0;
            self.b1 = 0.0;
            self.b2 = 0.0;
            self.a1 = 0.0;
            self.a2 = 0.0;
            return;
        }

        let a = 10.0_f32.powf(self.gain_db / 40.0);
        // Bands above 45% of the sample rate are pulled down to stay stable
        let frequency = self.frequency.min(sample_rate * 0.45);
        let omega = 2.0 * PI * frequency / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * EQ_Q);

        let a0 = 1.0 + alpha / a;
        self.b0 = (1.0 + alpha * a) / a0;
        self.b1 = (-2.0 * cos_omega) / a0;
        self.b2 = (1.0 - alpha * a) / a0;
        self.a1 = (-2.0 * cos_omega) / a0;
        self.a2 = (1.0 - alpha / a) / a0;
    }

    #[inline]
    fn process(&mut self, channel: usize, input: f32) -> f32 {
        let [x1, x2, y1, y2] = self.state[channel];
        let mut output = self.b0 * input + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;

        // Flush denormals
        if output.abs() < 1e-15 {
            output = 0.0;
        }

        self.state[channel] = [input, x1, output, y1];
        output
    }

    fn reset(&mut self) {
        self.state = [[0.0; 4]; 2];
    }
}

/// 10-band graphic equalizer for interleaved stereo
#[derive(Debug, Clone)]
pub struct GraphicEqualizer {
    bands: [PeakingBand; 10],
    sample_rate: u32,
}

impl GraphicEqualizer {
    pub fn new(sample_rate: u32) -> Self {
        let mut eq = Self {
            bands: EQ_CENTER_FREQUENCIES.map(PeakingBand::new),
            sample_rate,
        };
        eq.update_all();
        eq
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.bands.get(index).map(|band| band.gain_db)
    }

    pub fn gains(&self) -> [f32; 10] {
        self.bands.map(|band| band.gain_db)
    }

    /// Set one band's gain in dB, clamped to ±12
    ///
    /// Out-of-range indices are ignored.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) {
        let sample_rate = self.sample_rate as f32;
        if let Some(band) = self.bands.get_mut(index) {
            band.gain_db = if gain_db.is_nan() {
                0.0
            } else {
                gain_db.clamp(-GAIN_LIMIT_DB, GAIN_LIMIT_DB)
            };
            band.update_coefficients(sample_rate);
        }
    }

    pub fn set_gains(&mut self, gains: [f32; 10]) {
        for (index, gain) in gains.into_iter().enumerate() {
            self.set_band_gain(index, gain);
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.update_all();
            self.reset();
        }
    }

    /// Whether every band is flat
    pub fn is_flat(&self) -> bool {
        self.bands.iter().all(PeakingBand::is_bypassed)
    }

    /// Process interleaved stereo samples in place
    pub fn process_stereo(&mut self, buffer: &mut [f32]) {
        if self.is_flat() {
            return;
        }

        for frame in buffer.chunks_exact_mut(2) {
            let (mut left, mut right) = (frame[0], frame[1]);
            for band in self.bands.iter_mut().filter(|band| !band.is_bypassed()) {
                left = band.process(0, left);
                right = band.process(1, right);
            }
            frame[0] = left;
            frame[1] = right;
        }
    }

    /// Clear filter history
    pub fn reset(&mut self) {
        for band in &mut self.bands {
            band.reset();
        }
    }

    fn update_all(&mut self) {
        let sample_rate = self.sample_rate as f32;
        for band in &mut self.bands {
            band.update_coefficients(sample_rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s = (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin() * 0.25;
                [s, s]
            })
            .collect()
    }

    fn rms_tail(buffer: &[f32]) -> f32 {
        let tail = &buffer[buffer.len() / 2..];
        (tail.iter().map(|s| s * s).sum::<f32>() / tail.len() as f32).sqrt()
    }

    #[test]
    fn flat_eq_is_transparent() {
        let mut eq = GraphicEqualizer::new(44_100);
        let input = sine(1000.0, 44_100, 1024);
        let mut output = input.clone();
        eq.process_stereo(&mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn boost_raises_level_at_center() {
        let mut eq = GraphicEqualizer::new(44_100);
        eq.set_band_gain(4, 12.0);

        let input = sine(1000.0, 44_100, 8192);
        let mut output = input.clone();
        eq.process_stereo(&mut output);

        let gain_db = 20.0 * (rms_tail(&output) / rms_tail(&input)).log10();
        assert!((gain_db - 12.0).abs() < 1.0, "gain was {gain_db} dB");
    }

    #[test]
    fn cut_lowers_level_at_center() {
        let mut eq = GraphicEqualizer::new(48_000);
        eq.set_band_gain(0, -12.0);

        let input = sine(60.0, 48_000, 48_000);
        let mut output = input.clone();
        eq.process_stereo(&mut output);

        let gain_db = 20.0 * (rms_tail(&output) / rms_tail(&input)).log10();
        assert!((gain_db + 12.0).abs() < 1.0, "gain was {gain_db} dB");
    }

    #[test]
    fn gains_are_clamped() {
        let mut eq = GraphicEqualizer::new(44_100);
        eq.set_band_gain(2, 30.0);
        eq.set_band_gain(3, -30.0);
        eq.set_band_gain(42, 5.0);
        assert_eq!(eq.band_gain(2), Some(12.0));
        assert_eq!(eq.band_gain(3), Some(-12.0));
        assert_eq!(eq.band_gain(42), None);
    }

    #[test]
    fn high_bands_stay_stable_at_low_sample_rates() {
        let mut eq = GraphicEqualizer::new(22_050);
        eq.set_gains([12.0; 10]);

        let mut buffer = sine(5000.0, 22_050, 4096);
        eq.process_stereo(&mut buffer);
        assert!(buffer.iter().all(|s| s.is_finite()));
    }
}
