//! Desktop playback configuration

use crate::error::{AudioError, Result};
use serde::{Deserialize, Serialize};
use tonearm_audio::SpectrumConfig;
use tonearm_playback::PlaybackConfig;

/// Engine and analyzer settings for a desktop player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopConfig {
    pub playback: PlaybackConfig,
    pub spectrum: SpectrumConfig,
}

impl DesktopConfig {
    pub fn validate(&self) -> Result<()> {
        let playback = &self.playback;
        if playback.poll_interval_ms == 0 {
            return Err(invalid("playback.poll_interval_ms must be positive"));
        }
        if !playback.volume.is_finite() || !(0.0..=1.0).contains(&playback.volume) {
            return Err(invalid("playback.volume must be within [0, 1]"));
        }
        if !playback.lossless_threshold_kbps.is_finite() || playback.lossless_threshold_kbps <= 0.0
        {
            return Err(invalid("playback.lossless_threshold_kbps must be positive"));
        }

        self.spectrum.validate()?;
        Ok(())
    }
}

fn invalid(message: &str) -> AudioError {
    AudioError::Config(message.to_string())
}
