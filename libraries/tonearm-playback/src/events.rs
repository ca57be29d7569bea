//! Playback Events
//!
//! Emitted by the engine for UI synchronization. Events are queued inside the
//! engine and drained by whoever drives it.

use crate::types::EngineState;
use serde::{Deserialize, Serialize};

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Engine state changed
    StateChanged {
        /// The new state
        state: EngineState,
    },

    /// Source opened and attached
    TrackLoaded {
        track_id: String,
        duration_seconds: f64,
        sample_rate: u32,
        channel_count: u16,
        bitrate_kbps: u32,
    },

    /// Source could not be opened; the session was reset
    LoadFailed { track_id: String, message: String },

    /// Output device could not be started
    EngineStartFailed { message: String },

    /// Periodic position update while playing
    PositionUpdate {
        position_seconds: f64,
        duration_seconds: f64,
    },

    /// Track played through to the end
    TrackFinished {
        /// ID of the finished track
        track_id: String,
    },

    /// Track finished and no next track was available
    EndOfPlaylist,

    /// Volume changed (0.0-1.0)
    VolumeChanged { volume: f32 },

    /// Equalizer band changed
    EqChanged { band: usize, gain_db: f32 },

    /// Playlist contents or ordering changed
    PlaylistChanged {
        /// New playlist length
        length: usize,
    },
}
