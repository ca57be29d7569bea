//! Error types for playback management

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Source could not be opened or decoded; session metrics are zeroed
    #[error("Failed to load track {track_id}: {reason}")]
    LoadFailed { track_id: String, reason: String },

    /// Output device could not be started
    #[error("Audio output could not start: {0}")]
    EngineStartFailed(String),

    /// No track is currently loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Audio source error
    #[error("Audio source error: {0}")]
    AudioSource(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
