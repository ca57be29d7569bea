//! Platform-agnostic audio source traits
//!
//! The engine never decodes anything itself. A [`SourceOpener`] turns a
//! [`TrackHandle`] into a decoder plus the header information the engine needs
//! for its session metrics.

use crate::error::Result;
use crate::types::{SourceInfo, TrackHandle};
use std::time::Duration;

/// Decoded audio stream
///
/// Samples are interleaved stereo f32 in [-1.0, 1.0] at the output rate the
/// source was opened for.
pub trait AudioSource: Send {
    /// Read next chunk of audio samples
    ///
    /// Returns the number of samples written (0 = end of track).
    fn read_samples(&mut self, buffer: &mut [f32]) -> Result<usize>;

    /// Seek to position in track
    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Get total track duration
    fn duration(&self) -> Duration;

    /// Get current read position
    fn position(&self) -> Duration;

    /// Check if track has ended
    fn is_finished(&self) -> bool;

    /// Reset to beginning of track
    fn reset(&mut self) -> Result<()> {
        self.seek(Duration::ZERO)
    }
}

/// An opened source together with its header information
pub struct OpenedSource<S> {
    pub info: SourceInfo,
    pub source: S,
}

impl<S> std::fmt::Debug for OpenedSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedSource")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Opens track handles into decodable sources
///
/// Runs off the control path (on the loader worker), so implementations may
/// block on I/O.
pub trait SourceOpener: Send {
    type Source: Send + 'static;

    fn open(&self, track: &TrackHandle) -> Result<OpenedSource<Self::Source>>;
}
