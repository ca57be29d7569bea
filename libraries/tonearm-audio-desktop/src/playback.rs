//! Desktop playback integration
//!
//! Spawns the control loop on its own thread and talks to it over channels.
//! The render path is created on that thread, so the CPAL stream never
//! crosses threads.

use crate::config::DesktopConfig;
use crate::controller::{ControlLoop, PlaybackCommand};
use crate::error::{AudioError, Result};
use crate::render::{CpalRenderPath, OutputTap};
use crate::sources::LocalSourceOpener;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tonearm_playback::{PlaybackEvent, RenderPath, SourceOpener, Telemetry, TrackHandle};

const COMMAND_QUEUE_DEPTH: usize = 64;
const EVENT_QUEUE_DEPTH: usize = 256;

/// Desktop playback
///
/// Owns the control thread. Commands are queued; outcomes arrive as
/// [`PlaybackEvent`]s and in the [`Telemetry`] snapshot.
pub struct DesktopPlayback {
    /// Command sender
    command_tx: Sender<PlaybackCommand>,

    /// Event receiver
    event_rx: Receiver<PlaybackEvent>,

    /// Latest published values
    telemetry: Arc<Mutex<Telemetry>>,

    handle: Option<JoinHandle<()>>,
}

impl DesktopPlayback {
    /// Play through the default output device
    ///
    /// Fails if no output device is available.
    pub fn new(config: DesktopConfig) -> Result<Self> {
        Self::spawn_with(config, || {
            let render = CpalRenderPath::new()?;
            let opener = LocalSourceOpener::new(render.sample_rate());
            Ok((render, opener))
        })
    }

    /// Spawn the control loop around a render path and opener built by
    /// `factory` on the control thread
    pub fn spawn_with<R, O, F>(config: DesktopConfig, factory: F) -> Result<Self>
    where
        R: RenderPath + OutputTap + 'static,
        R::Source: 'static,
        O: SourceOpener<Source = R::Source> + 'static,
        F: FnOnce() -> Result<(R, O)> + Send + 'static,
    {
        config.validate()?;

        let (command_tx, command_rx) = bounded::<PlaybackCommand>(COMMAND_QUEUE_DEPTH);
        let (event_tx, event_rx) = bounded::<PlaybackEvent>(EVENT_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let telemetry = Arc::new(Mutex::new(Telemetry::default()));

        let shared = Arc::clone(&telemetry);
        let handle = thread::Builder::new()
            .name("playback-control".to_string())
            .spawn(move || {
                let control = factory().and_then(|(render, opener)| {
                    ControlLoop::new(render, opener, &config, event_tx, shared)
                });
                match control {
                    Ok(control) => {
                        let _ = ready_tx.send(Ok(()));
                        control.run(&command_rx);
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                    }
                }
            })
            .map_err(|e| AudioError::Worker(format!("Failed to spawn control loop: {e}")))?;

        let ready = ready_rx
            .recv()
            .map_err(|_| AudioError::Worker("Control loop exited during startup".into()))?;
        if let Err(err) = ready {
            let _ = handle.join();
            return Err(err);
        }

        tracing::info!("Desktop playback ready");
        Ok(Self {
            command_tx,
            event_rx,
            telemetry,
            handle: Some(handle),
        })
    }

    /// Send command to the control loop
    pub fn send_command(&self, command: PlaybackCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| AudioError::Worker("Control loop has exited".into()))
    }

    pub fn load(&self, track: TrackHandle) -> Result<()> {
        self.send_command(PlaybackCommand::Load(track))
    }

    pub fn play(&self) -> Result<()> {
        self.send_command(PlaybackCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send_command(PlaybackCommand::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send_command(PlaybackCommand::Resume)
    }

    pub fn stop(&self) -> Result<()> {
        self.send_command(PlaybackCommand::Stop)
    }

    pub fn seek(&self, seconds: f64) -> Result<()> {
        self.send_command(PlaybackCommand::Seek(seconds))
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send_command(PlaybackCommand::SetVolume(volume))
    }

    pub fn set_eq_band(&self, band: usize, gain_db: f32) -> Result<()> {
        self.send_command(PlaybackCommand::SetEqBand { band, gain_db })
    }

    pub fn next(&self) -> Result<()> {
        self.send_command(PlaybackCommand::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.send_command(PlaybackCommand::Previous)
    }

    pub fn set_shuffle(&self, enabled: bool) -> Result<()> {
        self.send_command(PlaybackCommand::SetShuffle(enabled))
    }

    pub fn set_repeat(&self, enabled: bool) -> Result<()> {
        self.send_command(PlaybackCommand::SetRepeat(enabled))
    }

    pub fn add_tracks(&self, tracks: Vec<TrackHandle>) -> Result<()> {
        self.send_command(PlaybackCommand::AddTracks(tracks))
    }

    pub fn remove_track(&self, index: usize) -> Result<()> {
        self.send_command(PlaybackCommand::RemoveTrack(index))
    }

    pub fn play_index(&self, index: usize) -> Result<()> {
        self.send_command(PlaybackCommand::PlayIndex(index))
    }

    /// Try to receive next event (non-blocking)
    pub fn try_recv_event(&self) -> Option<PlaybackEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Event receiver, for blocking or `select!`-based consumers
    pub fn events(&self) -> &Receiver<PlaybackEvent> {
        &self.event_rx
    }

    /// Snapshot of the published values
    pub fn telemetry(&self) -> Telemetry {
        self.telemetry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop the control loop and wait for it to exit
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.command_tx.send(PlaybackCommand::Shutdown);
            if handle.join().is_err() {
                tracing::error!("Control loop panicked");
            }
        }
    }
}

impl Drop for DesktopPlayback {
    fn drop(&mut self) {
        self.join();
    }
}
