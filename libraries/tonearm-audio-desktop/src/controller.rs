//! Control loop
//!
//! One thread owns the engine, the playlist, the spectrum analyzer and the
//! loader handle, so every session mutation is totally ordered. The loop
//! selects over four inputs:
//!
//! - commands from the facade
//! - completions posted by the render callback
//! - results from the track loader
//! - a poll ticker that exists only while the engine is polling or the
//!   spectrum is still decaying (`never()` otherwise)

use crate::config::DesktopConfig;
use crate::error::Result;
use crate::loader::{LoadResult, TrackLoader};
use crate::render::OutputTap;
use crossbeam_channel::{never, select, tick, Receiver, Sender, TrySendError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tonearm_audio::SpectrumAnalyzer;
use tonearm_playback::{
    Completion, CompletionOutcome, EngineState, LoadRequest, PlaybackEngine, PlaybackEvent,
    PlaylistSequencer, RenderPath, SourceOpener, Telemetry, TrackHandle,
};

/// Commands accepted by the control loop
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    /// Load a track without starting it
    Load(TrackHandle),

    /// Start playback (the playlist's current entry if nothing is loaded)
    Play,

    /// Pause playback
    Pause,

    /// Resume after a pause
    Resume,

    /// Stop and rewind
    Stop,

    /// Seek to position (in seconds)
    Seek(f64),

    /// Set volume (0.0-1.0)
    SetVolume(f32),

    /// Set one equalizer band (dB)
    SetEqBand { band: usize, gain_db: f32 },

    /// Skip to next track
    Next,

    /// Go to previous track
    Previous,

    /// Enable or disable shuffle
    SetShuffle(bool),

    /// Enable or disable repeat
    SetRepeat(bool),

    /// Append tracks to the playlist
    AddTracks(Vec<TrackHandle>),

    /// Remove a playlist entry
    RemoveTrack(usize),

    /// Clear the playlist
    ClearPlaylist,

    /// Play a playlist entry
    PlayIndex(usize),

    /// Exit the control loop
    Shutdown,
}

/// Engine, playlist and analyzer driven from one thread
pub struct ControlLoop<R: RenderPath> {
    engine: PlaybackEngine<R>,
    playlist: PlaylistSequencer,
    analyzer: SpectrumAnalyzer,
    loader: TrackLoader<R::Source>,

    completions: Receiver<Completion>,
    dropped_completions: u64,
    ticker: Receiver<Instant>,
    ticking: bool,
    poll_interval: Duration,

    captured: Vec<f32>,
    window: VecDeque<f32>,

    events: Sender<PlaybackEvent>,
    telemetry: Arc<Mutex<Telemetry>>,
}

impl<R> ControlLoop<R>
where
    R: RenderPath + OutputTap,
    R::Source: 'static,
{
    pub fn new<O>(
        render: R,
        opener: O,
        config: &DesktopConfig,
        events: Sender<PlaybackEvent>,
        telemetry: Arc<Mutex<Telemetry>>,
    ) -> Result<Self>
    where
        O: SourceOpener<Source = R::Source> + 'static,
    {
        config.validate()?;

        let analyzer = SpectrumAnalyzer::new(config.spectrum.clone(), render.output_sample_rate())?;
        let completions = render.completions();
        let loader = TrackLoader::spawn(
            opener,
            Duration::from_millis(config.playback.load_settle_ms),
        )?;

        let mut playlist = PlaylistSequencer::new();
        playlist.set_shuffle(config.playback.shuffle);
        playlist.set_repeat(config.playback.repeat);

        let window_size = config.spectrum.window_size;
        let mut control = Self {
            engine: PlaybackEngine::new(render, config.playback.clone()),
            playlist,
            analyzer,
            loader,
            completions,
            dropped_completions: 0,
            ticker: never(),
            ticking: false,
            poll_interval: Duration::from_millis(config.playback.poll_interval_ms),
            captured: Vec::new(),
            window: VecDeque::with_capacity(window_size),
            events,
            telemetry,
        };
        control.publish();
        Ok(control)
    }

    /// Run until `Shutdown` or until every command sender is gone
    pub fn run(mut self, commands: &Receiver<PlaybackCommand>) {
        tracing::debug!("Control loop started");
        while self.step(commands) {}
        self.engine.stop();
        tracing::debug!("Control loop stopped");
    }

    /// Wait for one input and handle it
    ///
    /// Returns `false` once the loop should exit.
    pub fn step(&mut self, commands: &Receiver<PlaybackCommand>) -> bool {
        let completions = self.completions.clone();
        let results = self.loader.results().clone();
        let ticker = self.ticker.clone();

        let keep_running = select! {
            recv(commands) -> command => match command {
                Ok(PlaybackCommand::Shutdown) | Err(_) => false,
                Ok(command) => {
                    self.handle_command(command);
                    true
                }
            },
            recv(completions) -> completion => {
                if let Ok(completion) = completion {
                    self.handle_completion(completion);
                }
                true
            },
            recv(results) -> result => {
                if let Ok(result) = result {
                    self.handle_load_result(result);
                }
                true
            },
            recv(ticker) -> _ => {
                self.handle_tick();
                true
            },
        };

        self.check_dropped_completions();
        self.flush_events();
        self.sync_ticker();
        self.publish();
        keep_running
    }

    /// Log completions the callback could not deliver since the last check
    fn check_dropped_completions(&mut self) {
        let dropped = self.engine.render().dropped_completions();
        if dropped > self.dropped_completions {
            tracing::warn!(
                lost = dropped - self.dropped_completions,
                total = dropped,
                "Render completions dropped; completion channel was full"
            );
            self.dropped_completions = dropped;
        }
    }

    pub fn handle_command(&mut self, command: PlaybackCommand) {
        tracing::trace!(?command, "Control command");

        let outcome = match command {
            PlaybackCommand::Load(track) => {
                let request = self.engine.load(track);
                self.request_load(request);
                Ok(())
            }
            PlaybackCommand::Play => self.play(),
            PlaybackCommand::Pause => {
                self.engine.pause();
                Ok(())
            }
            PlaybackCommand::Resume => self.engine.resume(),
            PlaybackCommand::Stop => {
                self.engine.stop();
                Ok(())
            }
            PlaybackCommand::Seek(seconds) => self.engine.seek(seconds),
            PlaybackCommand::SetVolume(volume) => {
                self.engine.set_volume(volume);
                Ok(())
            }
            PlaybackCommand::SetEqBand { band, gain_db } => self.engine.set_eq_band(band, gain_db),
            PlaybackCommand::Next => {
                match self.engine.next(&mut self.playlist) {
                    Some(request) => self.request_load(request),
                    None => tracing::debug!("No next track"),
                }
                Ok(())
            }
            PlaybackCommand::Previous => {
                match self.engine.previous(&mut self.playlist) {
                    Some(request) => self.request_load(request),
                    None => tracing::debug!("No previous track"),
                }
                Ok(())
            }
            PlaybackCommand::SetShuffle(enabled) => {
                if self.playlist.is_shuffle_enabled() != enabled {
                    self.playlist.set_shuffle(enabled);
                    self.playlist_changed();
                }
                Ok(())
            }
            PlaybackCommand::SetRepeat(enabled) => {
                self.playlist.set_repeat(enabled);
                Ok(())
            }
            PlaybackCommand::AddTracks(tracks) => {
                self.playlist.add_many(tracks);
                self.playlist_changed();
                Ok(())
            }
            PlaybackCommand::RemoveTrack(index) => {
                if self.playlist.remove(index).is_some() {
                    self.playlist_changed();
                }
                Ok(())
            }
            PlaybackCommand::ClearPlaylist => {
                self.playlist.clear();
                self.playlist_changed();
                Ok(())
            }
            PlaybackCommand::PlayIndex(index) => {
                match self.engine.play_index(&mut self.playlist, index) {
                    Ok(request) => {
                        self.request_load(request);
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
            PlaybackCommand::Shutdown => Ok(()),
        };

        if let Err(err) = outcome {
            tracing::warn!(error = %err, "Command failed");
        }
    }

    fn play(&mut self) -> tonearm_playback::Result<()> {
        let idle = self.engine.state() == EngineState::Idle && !self.engine.is_loading();
        if idle && !self.playlist.is_empty() {
            let index = self.playlist.current_index().unwrap_or(0);
            let request = self.engine.play_index(&mut self.playlist, index)?;
            self.request_load(request);
            return Ok(());
        }
        self.engine.play()
    }

    fn handle_completion(&mut self, completion: Completion) {
        match self.engine.handle_completion(completion, &mut self.playlist) {
            CompletionOutcome::Advance(request) => self.request_load(request),
            CompletionOutcome::Stale
            | CompletionOutcome::Finished
            | CompletionOutcome::EndOfPlaylist => {}
        }
    }

    fn handle_load_result(&mut self, loaded: LoadResult<R::Source>) {
        if let Err(err) = self.engine.complete_load(loaded.ticket, loaded.result) {
            tracing::warn!(ticket = %loaded.ticket, error = %err, "Load did not complete");
        }
    }

    /// One poll step: position, spectrum, decay
    fn handle_tick(&mut self) {
        self.engine.tick();

        self.captured.clear();
        self.engine.render_mut().drain_captured(&mut self.captured);
        let window_size = self.analyzer.config().window_size;
        for &sample in &self.captured {
            if self.window.len() == window_size {
                self.window.pop_front();
            }
            self.window.push_back(sample);
        }

        if self.engine.is_polling() {
            if !self.window.is_empty() {
                self.analyzer.analyze(self.window.make_contiguous());
            }
        } else if self.engine.spectrum_decay_requested() {
            self.window.clear();
            if self.analyzer.is_silent() {
                self.engine.clear_spectrum_decay();
            } else {
                self.analyzer.decay();
            }
        }
    }

    fn request_load(&mut self, request: LoadRequest) {
        let ticket = request.ticket;
        if let Err(err) = self.loader.request(request) {
            tracing::error!(%ticket, error = %err, "Could not queue load");
            // The load will never complete; fail it so the engine leaves loading
            let _ = self.engine.complete_load(ticket, Err(err.into()));
        }
    }

    fn playlist_changed(&mut self) {
        self.emit(PlaybackEvent::PlaylistChanged {
            length: self.playlist.len(),
        });
    }

    fn flush_events(&mut self) {
        for event in self.engine.drain_events() {
            self.emit(event);
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::trace!(?event, "Event queue full, dropping event");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn wants_ticks(&self) -> bool {
        self.engine.is_polling() || self.engine.spectrum_decay_requested()
    }

    fn sync_ticker(&mut self) {
        let wanted = self.wants_ticks();
        if wanted != self.ticking {
            self.ticking = wanted;
            self.ticker = if wanted {
                tick(self.poll_interval)
            } else {
                never()
            };
        }
    }

    fn publish(&self) {
        let snapshot = self.engine.telemetry(self.analyzer.spectrum());
        *self.telemetry.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    pub fn engine(&self) -> &PlaybackEngine<R> {
        &self.engine
    }

    pub fn playlist(&self) -> &PlaylistSequencer {
        &self.playlist
    }

    pub fn analyzer(&self) -> &SpectrumAnalyzer {
        &self.analyzer
    }
}
