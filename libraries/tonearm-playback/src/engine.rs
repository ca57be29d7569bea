//! Playback engine
//!
//! Single-stream scheduling state machine. The engine owns the render path
//! and the schedule generation; all session mutation happens here, on the
//! control path. Source opening is asynchronous: `load` hands back a
//! [`LoadRequest`] for the caller to run, and the result comes back through
//! [`PlaybackEngine::complete_load`].

use crate::bitrate::estimate_bitrate_kbps;
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::generation::{Generation, ScheduleGeneration};
use crate::render::{Completion, CompletionKind, RenderPath};
use crate::sequencer::{PlaylistSequencer, TrackSequence};
use crate::source::OpenedSource;
use crate::types::{
    EngineState, PlaybackConfig, PlaybackSession, Telemetry, TrackHandle, EQ_BAND_COUNT,
    EQ_GAIN_LIMIT_DB,
};
use std::fmt;

/// Identifies one `load` call; results for older tickets are discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(u64);

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load#{}", self.0)
    }
}

/// A source-open request to run off the control path
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub track: TrackHandle,
}

/// What a completion notification turned into
#[derive(Debug, PartialEq)]
pub enum CompletionOutcome {
    /// Generation mismatch; nothing changed
    Stale,

    /// Current segment finalized, nothing further to do
    Finished,

    /// Current segment finalized and the next track is loading
    Advance(LoadRequest),

    /// Current segment finalized and the sequencer had nothing next
    EndOfPlaylist,
}

#[derive(Debug)]
struct PendingLoad {
    ticket: LoadTicket,
    autoplay: bool,
}

/// Playback engine
pub struct PlaybackEngine<R: RenderPath> {
    render: R,
    config: PlaybackConfig,
    state: EngineState,
    session: PlaybackSession,
    generation: ScheduleGeneration,

    // Generation of the segment the engine expects a completion from
    schedule_intent: Option<Generation>,

    polling: bool,
    spectrum_decay_requested: bool,

    next_ticket: u64,
    pending_load: Option<PendingLoad>,

    // Event queue for UI synchronization
    pending_events: Vec<PlaybackEvent>,
}

impl<R: RenderPath> PlaybackEngine<R> {
    /// Create a new engine around a render path
    pub fn new(mut render: R, config: PlaybackConfig) -> Self {
        let volume = if config.volume.is_nan() {
            1.0
        } else {
            config.volume.clamp(0.0, 1.0)
        };
        render.set_volume(volume);

        Self {
            render,
            config,
            state: EngineState::Idle,
            session: PlaybackSession {
                volume,
                ..PlaybackSession::default()
            },
            generation: ScheduleGeneration::new(),
            schedule_intent: None,
            polling: false,
            spectrum_decay_requested: false,
            next_ticket: 0,
            pending_load: None,
            pending_events: Vec::new(),
        }
    }

    // ===== Loading =====

    /// Tear down the current segment and start loading a track
    pub fn load(&mut self, track: TrackHandle) -> LoadRequest {
        self.begin_load(track, false)
    }

    /// Load a track and start playing once it is open
    pub fn load_and_play(&mut self, track: TrackHandle) -> LoadRequest {
        self.begin_load(track, true)
    }

    /// Explicit track switch: load, keeping the current play intent
    pub fn switch_track(&mut self, track: TrackHandle) -> LoadRequest {
        let autoplay = self.state == EngineState::Playing
            || self.pending_load.as_ref().is_some_and(|p| p.autoplay);
        self.begin_load(track, autoplay)
    }

    fn begin_load(&mut self, track: TrackHandle, autoplay: bool) -> LoadRequest {
        self.render.cancel();
        self.render.detach();
        self.schedule_intent = None;
        self.polling = false;

        self.session = PlaybackSession::for_track(track.clone(), &self.session);
        self.set_state(EngineState::Idle);

        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);
        self.pending_load = Some(PendingLoad { ticket, autoplay });

        tracing::info!(%ticket, track_id = %track.id, autoplay, "Loading track");

        LoadRequest { ticket, track }
    }

    /// Apply the result of a source-open request
    ///
    /// Results for superseded tickets are dropped without touching the
    /// session. A failed open zeroes the session metrics and leaves the
    /// engine `Idle`, ready for another `load`.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<OpenedSource<R::Source>>,
    ) -> Result<()> {
        let pending = match self.pending_load.take() {
            Some(pending) if pending.ticket == ticket => pending,
            other => {
                self.pending_load = other;
                tracing::debug!(%ticket, "Discarding superseded load result");
                return Ok(());
            }
        };

        let opened = match result {
            Ok(opened) if opened.info.sample_rate == 0 => {
                return Err(self.fail_load("source reports a zero sample rate".to_string()));
            }
            Ok(opened) => opened,
            Err(err) => return Err(self.fail_load(err.to_string())),
        };

        let info = opened.info;
        if let Err(err) = self.render.attach(opened.source) {
            return Err(self.fail_load(err.to_string()));
        }

        let duration = info.duration_seconds();
        let hinted_size = self.session.track.as_ref().map_or(0, |t| t.file_size_bytes);
        let file_size = if hinted_size > 0 {
            hinted_size
        } else {
            info.file_size_bytes
        };

        self.session.duration_seconds = duration;
        self.session.position_seconds = 0.0;
        self.session.seek_offset_seconds = 0.0;
        self.session.sample_rate = info.sample_rate;
        self.session.channel_count = info.channel_count;
        self.session.bitrate_kbps = estimate_bitrate_kbps(
            file_size,
            duration,
            &self.config.bitrate_ladder,
            self.config.lossless_threshold_kbps,
        );

        let track_id = self.current_track_id().unwrap_or_default();
        tracing::info!(
            track_id = %track_id,
            duration_seconds = duration,
            sample_rate = info.sample_rate,
            channels = info.channel_count,
            bitrate_kbps = self.session.bitrate_kbps,
            "Track loaded"
        );

        self.set_state(EngineState::Stopped);
        self.emit(PlaybackEvent::TrackLoaded {
            track_id,
            duration_seconds: duration,
            sample_rate: info.sample_rate,
            channel_count: info.channel_count,
            bitrate_kbps: self.session.bitrate_kbps,
        });

        if pending.autoplay {
            self.start_segment()?;
        }
        Ok(())
    }

    fn fail_load(&mut self, reason: String) -> PlaybackError {
        let track_id = self.current_track_id().unwrap_or_default();
        tracing::warn!(track_id = %track_id, %reason, "Failed to load track");

        self.render.detach();
        self.session.clear_metrics();
        self.set_state(EngineState::Idle);
        self.emit(PlaybackEvent::LoadFailed {
            track_id: track_id.clone(),
            message: reason.clone(),
        });

        PlaybackError::LoadFailed { track_id, reason }
    }

    // ===== Transport =====

    /// Start playback from the seek offset
    ///
    /// While a load is in flight this only marks it to start when ready.
    pub fn play(&mut self) -> Result<()> {
        match self.state {
            EngineState::Playing => Ok(()),
            EngineState::Idle => match self.pending_load.as_mut() {
                Some(pending) => {
                    pending.autoplay = true;
                    Ok(())
                }
                None => Err(PlaybackError::NoTrackLoaded),
            },
            EngineState::Paused => self.resume(),
            EngineState::Stopped => self.start_segment(),
        }
    }

    /// Freeze rendering in place
    pub fn pause(&mut self) {
        if self.state != EngineState::Playing {
            return;
        }

        self.sample_position();
        self.render.pause();
        self.session.is_playing = false;
        self.polling = false;
        self.spectrum_decay_requested = true;
        self.set_state(EngineState::Paused);
    }

    /// Continue after a pause
    ///
    /// A segment that was seeked (or cancelled) while paused is rescheduled
    /// from the paused position; otherwise rendering continues in place.
    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            EngineState::Playing => Ok(()),
            EngineState::Idle => self.play(),
            EngineState::Stopped => self.start_segment(),
            EngineState::Paused => {
                if self.session.seek_offset_seconds > 0.0 || self.schedule_intent.is_none() {
                    self.session.seek_offset_seconds = self.session.position_seconds;
                    return self.start_segment();
                }

                if !self.render.is_running() {
                    self.start_output()?;
                }
                self.render.resume();
                self.session.is_playing = true;
                self.polling = true;
                self.spectrum_decay_requested = false;
                self.set_state(EngineState::Playing);
                Ok(())
            }
        }
    }

    /// Stop and rewind to the start of the track
    ///
    /// An in-flight load is abandoned.
    pub fn stop(&mut self) {
        if self.pending_load.take().is_some() {
            tracing::debug!("Abandoning in-flight load");
            self.session.track = None;
        }

        self.render.cancel();
        self.schedule_intent = None;
        self.session.position_seconds = 0.0;
        self.session.seek_offset_seconds = 0.0;
        self.session.is_playing = false;
        self.polling = false;
        self.spectrum_decay_requested = true;

        if self.state != EngineState::Idle {
            self.set_state(EngineState::Stopped);
        }
    }

    /// Jump to a position in the current track
    ///
    /// Targets outside `[0, duration)` are ignored.
    pub fn seek(&mut self, target_seconds: f64) -> Result<()> {
        if self.state == EngineState::Idle {
            return Ok(());
        }
        if !target_seconds.is_finite()
            || target_seconds < 0.0
            || target_seconds >= self.session.duration_seconds
        {
            tracing::debug!(
                target_seconds,
                duration_seconds = self.session.duration_seconds,
                "Ignoring seek outside track"
            );
            return Ok(());
        }

        let generation = self.generation.advance();
        self.session.seek_offset_seconds = target_seconds;
        self.session.position_seconds = target_seconds;

        tracing::debug!(target_seconds, %generation, "Seek");

        if self.state == EngineState::Playing {
            self.render.schedule(target_seconds, generation)?;
            self.schedule_intent = Some(generation);
        } else {
            self.render.cancel();
            self.schedule_intent = None;
        }
        Ok(())
    }

    fn start_output(&mut self) -> Result<()> {
        if let Err(err) = self.render.start() {
            let message = err.to_string();
            tracing::error!(error = %message, "Audio output failed to start");
            self.emit(PlaybackEvent::EngineStartFailed {
                message: message.clone(),
            });
            return Err(PlaybackError::EngineStartFailed(message));
        }
        Ok(())
    }

    fn start_segment(&mut self) -> Result<()> {
        if !self.render.is_running() {
            self.start_output()?;
        }

        let generation = self.generation.advance();
        let from = self.session.seek_offset_seconds;
        self.render.schedule(from, generation)?;
        self.schedule_intent = Some(generation);
        self.render.set_volume(self.session.volume);

        tracing::debug!(from_seconds = from, %generation, "Scheduled segment");

        self.session.position_seconds = from;
        self.session.is_playing = true;
        self.polling = true;
        self.spectrum_decay_requested = false;
        self.set_state(EngineState::Playing);
        Ok(())
    }

    // ===== Navigation =====

    /// Switch to the sequencer's next track
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self, sequence: &mut impl TrackSequence) -> Option<LoadRequest> {
        let track = sequence.next_track()?;
        Some(self.switch_track(track))
    }

    /// Switch to the sequencer's previous track
    pub fn previous(&mut self, sequence: &mut impl TrackSequence) -> Option<LoadRequest> {
        let track = sequence.previous_track()?;
        Some(self.switch_track(track))
    }

    /// Select a playlist entry and start playing it
    pub fn play_index(
        &mut self,
        sequencer: &mut PlaylistSequencer,
        index: usize,
    ) -> Result<LoadRequest> {
        let track = sequencer
            .select(index)
            .cloned()
            .ok_or(PlaybackError::IndexOutOfBounds(index))?;
        Ok(self.load_and_play(track))
    }

    // ===== Completions =====

    /// Handle an end-of-segment notification from the render path
    ///
    /// Only a completion stamped with the current generation, for the
    /// segment the engine is waiting on, has any effect.
    pub fn handle_completion(
        &mut self,
        completion: Completion,
        sequence: &mut impl TrackSequence,
    ) -> CompletionOutcome {
        if !self.generation.is_current(completion.generation)
            || self.schedule_intent != Some(completion.generation)
        {
            tracing::trace!(
                completion_generation = %completion.generation,
                current_generation = %self.generation.current(),
                "Dropping stale completion"
            );
            return CompletionOutcome::Stale;
        }

        self.schedule_intent = None;
        self.session.position_seconds = self.session.duration_seconds;
        self.session.seek_offset_seconds = 0.0;
        self.session.is_playing = false;
        self.polling = false;
        self.spectrum_decay_requested = true;
        self.set_state(EngineState::Stopped);

        match completion.kind {
            CompletionKind::TrackSwitch => CompletionOutcome::Finished,
            CompletionKind::EndOfMedia => {
                let track_id = self.current_track_id().unwrap_or_default();
                tracing::info!(track_id = %track_id, "Track finished");
                self.emit(PlaybackEvent::TrackFinished { track_id });

                match sequence.next_track() {
                    Some(track) => CompletionOutcome::Advance(self.load_and_play(track)),
                    None => {
                        tracing::info!("End of playlist");
                        self.emit(PlaybackEvent::EndOfPlaylist);
                        CompletionOutcome::EndOfPlaylist
                    }
                }
            }
        }
    }

    // ===== Polling =====

    /// One poll step: sample the position and publish it
    pub fn tick(&mut self) {
        if !self.polling {
            return;
        }
        self.sample_position();
        self.emit(PlaybackEvent::PositionUpdate {
            position_seconds: self.session.position_seconds,
            duration_seconds: self.session.duration_seconds,
        });
    }

    fn sample_position(&mut self) {
        let rendered = self.render.rendered_seconds();
        let position = self.session.seek_offset_seconds + rendered;
        self.session.position_seconds = if position.is_finite() {
            position.max(0.0).min(self.session.duration_seconds)
        } else {
            self.session.seek_offset_seconds
        };
    }

    // ===== Output controls =====

    /// Set output volume, clamped to `[0, 1]`
    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.session.volume = volume;
        self.render.set_volume(volume);
        self.emit(PlaybackEvent::VolumeChanged { volume });
    }

    /// Set one equalizer band, clamped to the gain limit
    pub fn set_eq_band(&mut self, band: usize, gain_db: f32) -> Result<()> {
        if band >= EQ_BAND_COUNT {
            return Err(PlaybackError::IndexOutOfBounds(band));
        }
        let gain_db = if gain_db.is_nan() {
            0.0
        } else {
            gain_db.clamp(-EQ_GAIN_LIMIT_DB, EQ_GAIN_LIMIT_DB)
        };

        self.session.eq_gains[band] = gain_db;
        self.render.set_eq_band(band, gain_db);
        self.emit(PlaybackEvent::EqChanged { band, gain_db });
        Ok(())
    }

    // ===== State =====

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Current schedule generation
    pub fn generation(&self) -> Generation {
        self.generation.current()
    }

    /// Whether the position/spectrum poll cadence should be running
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Whether a load is in flight
    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Whether the spectrum should decay toward zero
    pub fn spectrum_decay_requested(&self) -> bool {
        self.spectrum_decay_requested
    }

    /// Acknowledge that the spectrum has fully decayed
    pub fn clear_spectrum_decay(&mut self) {
        self.spectrum_decay_requested = false;
    }

    pub fn render(&self) -> &R {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut R {
        &mut self.render
    }

    /// Snapshot of the published values
    pub fn telemetry(&self, spectrum: &[f32]) -> Telemetry {
        Telemetry {
            state: self.state,
            track_id: self.current_track_id(),
            is_playing: self.session.is_playing,
            position_seconds: self.session.position_seconds,
            duration_seconds: self.session.duration_seconds,
            spectrum: spectrum.to_vec(),
            bitrate_kbps: self.session.bitrate_kbps,
            sample_rate: self.session.sample_rate,
            channel_count: self.session.channel_count,
            volume: self.session.volume,
        }
    }

    /// Take all queued events
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn current_track_id(&self) -> Option<String> {
        self.session.track.as_ref().map(|t| t.id.clone())
    }

    fn set_state(&mut self, state: EngineState) {
        if self.state != state {
            self.state = state;
            self.emit(PlaybackEvent::StateChanged { state });
        }
    }

    fn emit(&mut self, event: PlaybackEvent) {
        self.pending_events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceInfo;

    /// Render path that records calls and never produces audio
    #[derive(Default)]
    struct NullRender {
        running: bool,
        attached: bool,
        scheduled: Vec<(f64, Generation)>,
        cancels: usize,
        rendered: f64,
        fail_start: bool,
    }

    impl RenderPath for NullRender {
        type Source = ();

        fn start(&mut self) -> Result<()> {
            if self.fail_start {
                return Err(PlaybackError::EngineStartFailed("no device".to_string()));
            }
            self.running = true;
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running
        }

        fn attach(&mut self, _source: ()) -> Result<()> {
            self.attached = true;
            Ok(())
        }

        fn detach(&mut self) {
            self.attached = false;
        }

        fn schedule(&mut self, from_seconds: f64, generation: Generation) -> Result<()> {
            if !self.attached {
                return Err(PlaybackError::NoTrackLoaded);
            }
            self.scheduled.push((from_seconds, generation));
            self.rendered = 0.0;
            Ok(())
        }

        fn pause(&mut self) {}

        fn resume(&mut self) {}

        fn cancel(&mut self) {
            self.cancels += 1;
        }

        fn set_volume(&mut self, _volume: f32) {}

        fn set_eq_band(&mut self, _band: usize, _gain_db: f32) {}

        fn rendered_seconds(&self) -> f64 {
            self.rendered
        }
    }

    fn opened(seconds: u64) -> Result<OpenedSource<()>> {
        Ok(OpenedSource {
            info: SourceInfo {
                frame_count: seconds * 44_100,
                sample_rate: 44_100,
                channel_count: 2,
                file_size_bytes: seconds * 20_000,
            },
            source: (),
        })
    }

    fn loaded_engine() -> PlaybackEngine<NullRender> {
        let mut engine = PlaybackEngine::new(NullRender::default(), PlaybackConfig::default());
        let request = engine.load(TrackHandle::from_path("/music/a.mp3"));
        engine.complete_load(request.ticket, opened(100)).unwrap();
        engine
    }

    #[test]
    fn load_derives_metrics_from_source() {
        let engine = loaded_engine();
        let session = engine.session();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!((session.duration_seconds - 100.0).abs() < 1e-9);
        assert_eq!(session.sample_rate, 44_100);
        assert_eq!(session.channel_count, 2);
        // 20 kB/s = 160 kbps
        assert_eq!(session.bitrate_kbps, 160);
    }

    #[test]
    fn superseded_load_results_are_discarded() {
        let mut engine = PlaybackEngine::new(NullRender::default(), PlaybackConfig::default());
        let first = engine.load(TrackHandle::from_path("/music/a.mp3"));
        let second = engine.load(TrackHandle::from_path("/music/b.mp3"));

        engine.complete_load(first.ticket, opened(10)).unwrap();
        assert_eq!(engine.state(), EngineState::Idle);

        engine.complete_load(second.ticket, opened(20)).unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!((engine.session().duration_seconds - 20.0).abs() < 1e-9);
    }

    #[test]
    fn play_advances_generation_once() {
        let mut engine = loaded_engine();
        let before = engine.generation();
        engine.play().unwrap();
        assert_eq!(engine.generation().value(), before.value() + 1);

        engine.play().unwrap();
        assert_eq!(engine.generation().value(), before.value() + 1);
        assert_eq!(engine.render().scheduled.len(), 1);
    }

    #[test]
    fn play_before_load_completes_autoplays() {
        let mut engine = PlaybackEngine::new(NullRender::default(), PlaybackConfig::default());
        let request = engine.load(TrackHandle::from_path("/music/a.mp3"));
        engine.play().unwrap();
        assert_eq!(engine.state(), EngineState::Idle);

        engine.complete_load(request.ticket, opened(5)).unwrap();
        assert_eq!(engine.state(), EngineState::Playing);
    }

    #[test]
    fn play_without_track_is_an_error() {
        let mut engine = PlaybackEngine::new(NullRender::default(), PlaybackConfig::default());
        assert!(matches!(engine.play(), Err(PlaybackError::NoTrackLoaded)));
    }

    #[test]
    fn engine_start_failure_is_reported() {
        let mut engine = loaded_engine();
        engine.render_mut().fail_start = true;

        let err = engine.play().unwrap_err();
        assert!(matches!(err, PlaybackError::EngineStartFailed(_)));
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, PlaybackEvent::EngineStartFailed { .. })));

        engine.render_mut().fail_start = false;
        engine.play().unwrap();
        assert_eq!(engine.state(), EngineState::Playing);
    }

    #[test]
    fn failed_load_zeroes_metrics() {
        let mut engine = loaded_engine();
        let request = engine.load(TrackHandle::from_path("/music/broken.mp3"));
        let err = engine
            .complete_load(
                request.ticket,
                Err(PlaybackError::AudioSource("unsupported".to_string())),
            )
            .unwrap_err();

        assert!(matches!(err, PlaybackError::LoadFailed { .. }));
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.session().duration_seconds, 0.0);
        assert_eq!(engine.session().bitrate_kbps, 0);
    }

    #[test]
    fn seek_past_end_is_ignored() {
        let mut engine = loaded_engine();
        let before = engine.generation();
        engine.seek(100.0).unwrap();
        engine.seek(-1.0).unwrap();
        engine.seek(f64::NAN).unwrap();
        assert_eq!(engine.generation(), before);
        assert_eq!(engine.session().position_seconds, 0.0);
    }

    #[test]
    fn seek_while_playing_reschedules() {
        let mut engine = loaded_engine();
        engine.play().unwrap();
        engine.seek(42.0).unwrap();

        let (from, generation) = *engine.render().scheduled.last().unwrap();
        assert_eq!(from, 42.0);
        assert_eq!(generation, engine.generation());
        assert_eq!(engine.session().position_seconds, 42.0);
    }

    #[test]
    fn tick_tracks_rendered_time() {
        let mut engine = loaded_engine();
        engine.seek(10.0).unwrap();
        engine.play().unwrap();
        engine.render_mut().rendered = 2.5;
        engine.tick();
        assert!((engine.session().position_seconds - 12.5).abs() < 1e-9);

        engine.render_mut().rendered = 500.0;
        engine.tick();
        assert_eq!(engine.session().position_seconds, 100.0);
    }

    #[test]
    fn volume_and_eq_are_clamped() {
        let mut engine = loaded_engine();
        engine.set_volume(1.7);
        assert_eq!(engine.session().volume, 1.0);
        engine.set_volume(-0.2);
        assert_eq!(engine.session().volume, 0.0);

        engine.set_eq_band(3, 40.0).unwrap();
        assert_eq!(engine.session().eq_gains[3], EQ_GAIN_LIMIT_DB);
        assert!(matches!(
            engine.set_eq_band(EQ_BAND_COUNT, 1.0),
            Err(PlaybackError::IndexOutOfBounds(10))
        ));
    }

    #[test]
    fn stop_does_not_advance_generation() {
        let mut engine = loaded_engine();
        engine.play().unwrap();
        let generation = engine.generation();
        engine.stop();
        assert_eq!(engine.generation(), generation);
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(!engine.is_polling());
        assert!(engine.spectrum_decay_requested());
    }
}
