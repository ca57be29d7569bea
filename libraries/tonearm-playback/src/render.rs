//! Render path abstraction
//!
//! A render path owns the output device and plays at most one scheduled
//! segment at a time. Segments are stamped with the [`Generation`] current
//! when they were scheduled; the path reports a [`Completion`] carrying that
//! stamp whenever a segment ends, for any reason.

use crate::error::Result;
use crate::generation::Generation;
use serde::{Deserialize, Serialize};

/// Why a scheduled segment ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionKind {
    /// The source ran out of frames
    EndOfMedia,

    /// The segment was cancelled (stop, seek, track switch)
    TrackSwitch,
}

/// End-of-segment notification from the render path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub generation: Generation,
    pub kind: CompletionKind,
}

/// Output device plus one schedulable source
///
/// Completions are delivered out of band (the desktop implementation posts
/// them to a channel drained by the control loop), possibly after the engine
/// has already moved on. The engine filters them by generation.
pub trait RenderPath {
    /// Source type accepted by [`RenderPath::attach`]
    type Source: Send;

    /// Start the output device
    fn start(&mut self) -> Result<()>;

    /// Whether the output device is running
    fn is_running(&self) -> bool;

    /// Make a source available for scheduling, replacing any previous one
    fn attach(&mut self, source: Self::Source) -> Result<()>;

    /// Drop the attached source
    fn detach(&mut self);

    /// Schedule the attached source from an offset, stamped with a generation
    ///
    /// Any segment already scheduled is cancelled first.
    fn schedule(&mut self, from_seconds: f64, generation: Generation) -> Result<()>;

    /// Freeze rendering in place
    fn pause(&mut self);

    /// Continue a frozen segment
    fn resume(&mut self);

    /// Cancel the scheduled segment, if any
    fn cancel(&mut self);

    fn set_volume(&mut self, volume: f32);

    fn set_eq_band(&mut self, band: usize, gain_db: f32);

    /// Seconds rendered by the current segment since it was scheduled
    fn rendered_seconds(&self) -> f64;
}
