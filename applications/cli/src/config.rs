/// Player configuration
///
/// Layered as: built-in defaults, then a TOML file, then `TONEARM_*`
/// environment variables (nested keys joined with `__`, e.g.
/// `TONEARM_PLAYBACK__VOLUME=0.5`).
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tonearm_audio::SpectrumConfig;
use tonearm_audio_desktop::DesktopConfig;
use tonearm_playback::PlaybackConfig;

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "tonearm.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub playback: PlaybackConfig,
    pub spectrum: SpectrumConfig,
    pub ui: UiSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Redraw the status line and spectrum meter
    pub show_meter: bool,

    /// Status line refresh interval
    pub meter_interval_ms: u64,

    /// Exit once the playlist runs out
    pub exit_at_end: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            show_meter: true,
            meter_interval_ms: 250,
            exit_at_end: true,
        }
    }
}

impl CliConfig {
    /// Load from defaults, an optional file and the process environment
    ///
    /// An explicit `path` must exist; the default `tonearm.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, config::Environment::with_prefix("TONEARM"))
    }

    fn load_with(path: Option<&Path>, environment: config::Environment) -> Result<Self> {
        let defaults = config::Config::try_from(&CliConfig::default())?;

        let file = match path {
            Some(path) => config::File::from(path.to_path_buf()).required(true),
            None => config::File::from(PathBuf::from(DEFAULT_CONFIG_FILE)).required(false),
        };

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                environment
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("playback.bitrate_ladder"),
            )
            .build()?;

        let config: CliConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.desktop()
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        if self.ui.meter_interval_ms == 0 {
            return Err(CliError::Config(
                "ui.meter_interval_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Engine and analyzer settings handed to the playback thread
    pub fn desktop(&self) -> DesktopConfig {
        DesktopConfig {
            playback: self.playback.clone(),
            spectrum: self.spectrum.clone(),
        }
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))
    }
}
