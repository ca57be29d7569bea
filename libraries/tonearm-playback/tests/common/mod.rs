//! Shared helpers for engine integration tests

#![allow(dead_code)]

use tonearm_playback::{
    Completion, CompletionKind, Generation, OpenedSource, PlaybackConfig, PlaybackEngine,
    PlaybackError, RenderPath, Result, SourceInfo, TrackHandle,
};

/// Render path that simulates a clock and records every call
#[derive(Debug, Default)]
pub struct ScriptedRender {
    pub running: bool,
    pub attached: bool,
    pub paused: bool,
    pub active: Option<Generation>,
    pub schedules: Vec<(f64, Generation)>,
    pub cancelled: Vec<Generation>,
    pub rendered: f64,
    pub volume: f32,
    pub eq: [f32; 10],
}

impl ScriptedRender {
    /// Advance the simulated clock while a segment is playing
    pub fn advance(&mut self, seconds: f64) {
        if self.active.is_some() && !self.paused {
            self.rendered += seconds;
        }
    }

    /// Completion the device would post when the active segment runs out
    pub fn end_of_media(&self) -> Option<Completion> {
        self.active.map(|generation| Completion {
            generation,
            kind: CompletionKind::EndOfMedia,
        })
    }
}

impl RenderPath for ScriptedRender {
    type Source = f64;

    fn start(&mut self) -> Result<()> {
        self.running = true;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn attach(&mut self, _duration: f64) -> Result<()> {
        self.attached = true;
        Ok(())
    }

    fn detach(&mut self) {
        self.attached = false;
        self.active = None;
    }

    fn schedule(&mut self, from_seconds: f64, generation: Generation) -> Result<()> {
        if !self.attached {
            return Err(PlaybackError::NoTrackLoaded);
        }
        self.cancel();
        self.schedules.push((from_seconds, generation));
        self.active = Some(generation);
        self.rendered = 0.0;
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn cancel(&mut self) {
        if let Some(generation) = self.active.take() {
            self.cancelled.push(generation);
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn set_eq_band(&mut self, band: usize, gain_db: f32) {
        self.eq[band] = gain_db;
    }

    fn rendered_seconds(&self) -> f64 {
        self.rendered
    }
}

pub fn track(name: &str) -> TrackHandle {
    TrackHandle::from_path(format!("/music/{name}.flac"))
}

pub fn opened(duration_seconds: f64) -> Result<OpenedSource<f64>> {
    Ok(OpenedSource {
        info: SourceInfo {
            frame_count: (duration_seconds * 48_000.0) as u64,
            sample_rate: 48_000,
            channel_count: 2,
            file_size_bytes: 0,
        },
        source: duration_seconds,
    })
}

/// Engine with a track of the given length loaded and stopped
pub fn engine_with_track(duration_seconds: f64) -> PlaybackEngine<ScriptedRender> {
    let mut engine = PlaybackEngine::new(ScriptedRender::default(), PlaybackConfig::default());
    let request = engine.load(track("loaded"));
    engine
        .complete_load(request.ticket, opened(duration_seconds))
        .unwrap();
    engine
}
