//! Tonearm - Playback Core
//!
//! Platform-agnostic playback scheduling for Tonearm.
//!
//! This crate provides:
//! - The single-stream playback state machine ([`PlaybackEngine`])
//! - Generation-based cancellation of stale segment completions
//! - Playlist sequencing with shuffle and repeat ([`PlaylistSequencer`])
//! - Bitrate estimation snapped to the standard lossy ladder
//! - Session, telemetry and event types for UI collaborators
//!
//! # Architecture
//!
//! `tonearm-playback` has no audio-device dependency. The platform supplies a
//! [`RenderPath`] (output device plus one schedulable source) and a
//! [`SourceOpener`]; the engine drives them from the control path.
//!
//! # Example
//!
//! ```rust
//! use tonearm_playback::{
//!     Completion, CompletionKind, CompletionOutcome, Generation, OpenedSource,
//!     PlaybackConfig, PlaybackEngine, PlaylistSequencer, RenderPath, Result, SourceInfo,
//!     TrackHandle,
//! };
//!
//! #[derive(Default)]
//! struct SilentOutput {
//!     running: bool,
//!     last: Option<Generation>,
//! }
//!
//! impl RenderPath for SilentOutput {
//!     type Source = ();
//!     fn start(&mut self) -> Result<()> { self.running = true; Ok(()) }
//!     fn is_running(&self) -> bool { self.running }
//!     fn attach(&mut self, _source: ()) -> Result<()> { Ok(()) }
//!     fn detach(&mut self) {}
//!     fn schedule(&mut self, _from: f64, generation: Generation) -> Result<()> {
//!         self.last = Some(generation);
//!         Ok(())
//!     }
//!     fn pause(&mut self) {}
//!     fn resume(&mut self) {}
//!     fn cancel(&mut self) {}
//!     fn set_volume(&mut self, _volume: f32) {}
//!     fn set_eq_band(&mut self, _band: usize, _gain_db: f32) {}
//!     fn rendered_seconds(&self) -> f64 { 0.0 }
//! }
//!
//! let mut playlist = PlaylistSequencer::new();
//! playlist.add(TrackHandle::from_path("/music/a.flac"));
//! playlist.add(TrackHandle::from_path("/music/b.flac"));
//!
//! let mut engine = PlaybackEngine::new(SilentOutput::default(), PlaybackConfig::default());
//! let request = engine.play_index(&mut playlist, 0)?;
//!
//! // The platform opens `request.track` off the control path...
//! let info = SourceInfo { frame_count: 441_000, sample_rate: 44_100, channel_count: 2, file_size_bytes: 0 };
//! engine.complete_load(request.ticket, Ok(OpenedSource { info, source: () }))?;
//!
//! // ...and later reports the end of the segment
//! let generation = engine.render().last.unwrap();
//! let outcome = engine.handle_completion(
//!     Completion { generation, kind: CompletionKind::EndOfMedia },
//!     &mut playlist,
//! );
//! assert!(matches!(outcome, CompletionOutcome::Advance(_)));
//! # Ok::<(), tonearm_playback::PlaybackError>(())
//! ```

pub mod bitrate;
mod engine;
mod error;
mod events;
mod generation;
mod render;
mod sequencer;
mod source;
pub mod types;

// Public exports
pub use engine::{CompletionOutcome, LoadRequest, LoadTicket, PlaybackEngine};
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use generation::{Generation, ScheduleGeneration};
pub use render::{Completion, CompletionKind, RenderPath};
pub use sequencer::{PlaylistSequencer, TrackSequence};
pub use source::{AudioSource, OpenedSource, SourceOpener};
pub use types::{
    EngineState, PlaybackConfig, PlaybackSession, SourceInfo, Telemetry, TrackHandle,
    EQ_BAND_COUNT, EQ_GAIN_LIMIT_DB,
};
