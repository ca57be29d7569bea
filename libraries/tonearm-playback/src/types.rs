//! Core types for playback management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::bitrate::{LOSSLESS_THRESHOLD_KBPS, LOSSY_BITRATE_LADDER};

/// Number of equalizer bands exposed on the control surface
pub const EQ_BAND_COUNT: usize = 10;

/// Maximum boost/cut of a single equalizer band (dB)
pub const EQ_GAIN_LIMIT_DB: f32 = 12.0;

/// Openable track reference supplied by the track provider
///
/// Title and artist are display hints only. Duration, sample rate, channel
/// count and bitrate are always re-derived from the opened source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackHandle {
    /// Unique track identifier
    pub id: String,

    /// File path for audio decoding
    pub path: PathBuf,

    /// Title hint from the provider (optional)
    pub title_hint: Option<String>,

    /// Artist hint from the provider (optional)
    pub artist_hint: Option<String>,

    /// File size in bytes, used for bitrate estimation (0 = unknown)
    pub file_size_bytes: u64,
}

impl TrackHandle {
    /// Create a handle for a file path with no hints
    ///
    /// The path doubles as the identifier.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            id: path.to_string_lossy().into_owned(),
            path,
            title_hint: None,
            artist_hint: None,
            file_size_bytes: 0,
        }
    }

    /// Name to show when no title hint is available
    pub fn display_name(&self) -> String {
        if let Some(title) = &self.title_hint {
            return title.clone();
        }

        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Engine state
///
/// `Stopped` and `Paused` both hold a loaded source; they differ only in
/// whether the position was reset to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// No source loaded
    Idle,

    /// Source loaded, not rendering
    Stopped,

    /// Currently rendering
    Playing,

    /// Rendering frozen mid-track
    Paused,
}

/// Header information read from an opened source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Total frames in the source
    pub frame_count: u64,

    /// Native sample rate in Hz
    pub sample_rate: u32,

    /// Native channel count
    pub channel_count: u16,

    /// Size of the underlying file in bytes (0 = unknown)
    pub file_size_bytes: u64,
}

impl SourceInfo {
    /// Duration derived from frame count and sample rate
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / f64::from(self.sample_rate)
    }
}

/// State of the current playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    /// Loaded (or loading) track
    pub track: Option<TrackHandle>,

    /// Total duration of the loaded source
    pub duration_seconds: f64,

    /// Current position, always within `[0, duration_seconds]`
    pub position_seconds: f64,

    /// Offset the current segment was scheduled from
    pub seek_offset_seconds: f64,

    /// Whether audio is being rendered
    pub is_playing: bool,

    /// Output volume in `[0, 1]`
    pub volume: f32,

    /// Equalizer gains in dB, one per band
    pub eq_gains: [f32; EQ_BAND_COUNT],

    /// Native sample rate of the source
    pub sample_rate: u32,

    /// Native channel count of the source
    pub channel_count: u16,

    /// Estimated bitrate for display
    pub bitrate_kbps: u32,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            track: None,
            duration_seconds: 0.0,
            position_seconds: 0.0,
            seek_offset_seconds: 0.0,
            is_playing: false,
            volume: 1.0,
            eq_gains: [0.0; EQ_BAND_COUNT],
            sample_rate: 0,
            channel_count: 0,
            bitrate_kbps: 0,
        }
    }
}

impl PlaybackSession {
    /// Fresh session for a new track, keeping the user's volume and EQ
    pub(crate) fn for_track(track: TrackHandle, previous: &PlaybackSession) -> Self {
        Self {
            track: Some(track),
            volume: previous.volume,
            eq_gains: previous.eq_gains,
            ..Self::default()
        }
    }

    /// Zero all source-derived metrics
    pub(crate) fn clear_metrics(&mut self) {
        self.duration_seconds = 0.0;
        self.position_seconds = 0.0;
        self.seek_offset_seconds = 0.0;
        self.is_playing = false;
        self.sample_rate = 0;
        self.channel_count = 0;
        self.bitrate_kbps = 0;
    }
}

/// Published values observed by UI and visualization collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub state: EngineState,
    pub track_id: Option<String>,
    pub is_playing: bool,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    pub spectrum: Vec<f32>,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub volume: f32,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            state: EngineState::Idle,
            track_id: None,
            is_playing: false,
            position_seconds: 0.0,
            duration_seconds: 0.0,
            spectrum: Vec::new(),
            bitrate_kbps: 0,
            sample_rate: 0,
            channel_count: 0,
            volume: 1.0,
        }
    }
}

/// Configuration for the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Initial volume (0.0-1.0, default: 1.0)
    pub volume: f32,

    /// Initial shuffle state (default: off)
    pub shuffle: bool,

    /// Initial repeat state (default: off)
    pub repeat: bool,

    /// Position/spectrum poll cadence while playing (default: 100 ms)
    pub poll_interval_ms: u64,

    /// Pause between tearing down a render path and opening the next source (default: 50 ms)
    pub load_settle_ms: u64,

    /// Raw bitrates at or above this are reported unsnapped (default: 500 kbps)
    pub lossless_threshold_kbps: f64,

    /// Standard encoder bitrates used to snap lossy estimates
    pub bitrate_ladder: Vec<u32>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            shuffle: false,
            repeat: false,
            poll_interval_ms: 100,
            load_settle_ms: 50,
            lossless_threshold_kbps: LOSSLESS_THRESHOLD_KBPS,
            bitrate_ladder: LOSSY_BITRATE_LADDER.to_vec(),
        }
    }
}
