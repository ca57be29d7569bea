//! Interactive session: stdin commands in, events and the meter out

use crate::commands::{self, Input, HELP};
use crate::config::UiSettings;
use crate::error::Result;
use crate::meter;
use crossbeam_channel::{bounded, never, select, tick, Receiver};
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;
use tonearm_audio_desktop::{DesktopPlayback, PlaybackCommand};
use tonearm_playback::{PlaybackEvent, TrackHandle};

/// Forward stdin lines on a channel until EOF
pub fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = bounded(16);
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

pub struct Session {
    playback: DesktopPlayback,
    ui: UiSettings,

    /// Playlist in insertion order, mirrored from the commands sent
    tracks: Vec<TrackHandle>,

    /// A status line is on screen and must be cleared before printing
    status_drawn: bool,
}

impl Session {
    pub fn new(playback: DesktopPlayback, ui: UiSettings) -> Self {
        Self {
            playback,
            ui,
            tracks: Vec::new(),
            status_drawn: false,
        }
    }

    /// Queue tracks and start the first one
    pub fn start(&mut self, tracks: Vec<TrackHandle>) -> Result<()> {
        if tracks.is_empty() {
            return Ok(());
        }
        self.send(PlaybackCommand::AddTracks(tracks))?;
        self.send(PlaybackCommand::PlayIndex(0))
    }

    /// Run until `quit`, or until the playlist ends when configured to
    pub fn run(mut self, lines: Receiver<String>) -> Result<()> {
        let mut lines = lines;
        let events = self.playback.events().clone();
        let meter = if self.ui.show_meter {
            tick(Duration::from_millis(self.ui.meter_interval_ms))
        } else {
            never()
        };

        loop {
            select! {
                recv(lines) -> line => match line {
                    Ok(line) => match commands::parse(&line) {
                        Ok(Input::Quit) => break,
                        Ok(input) => {
                            if let Err(err) = self.handle(input) {
                                self.say(&err.to_string());
                            }
                        }
                        Err(err) => self.say(&err.to_string()),
                    },
                    Err(_) => {
                        // Stdin closed; keep playing
                        tracing::debug!("Input closed");
                        lines = never();
                    }
                },
                recv(events) -> event => {
                    let Ok(event) = event else {
                        tracing::warn!("Playback thread exited");
                        break;
                    };
                    if let Some(text) = meter::describe_event(&event) {
                        self.say(&text);
                    }
                    if event == PlaybackEvent::EndOfPlaylist && self.ui.exit_at_end {
                        break;
                    }
                },
                recv(meter) -> _ => self.draw_status(),
            }
        }

        self.clear_status();
        self.playback.shutdown();
        Ok(())
    }

    fn handle(&mut self, input: Input) -> Result<()> {
        match input {
            Input::Playback(command) => self.send(command)?,
            Input::Status => {
                let line = meter::status_line(&self.playback.telemetry());
                self.say(&line);
            }
            Input::List => self.say(&self.playlist_text()),
            Input::Help => self.say(HELP),
            Input::Quit | Input::Empty => {}
        }
        Ok(())
    }

    fn send(&mut self, command: PlaybackCommand) -> Result<()> {
        match &command {
            PlaybackCommand::AddTracks(tracks) => self.tracks.extend(tracks.iter().cloned()),
            PlaybackCommand::RemoveTrack(index) if *index < self.tracks.len() => {
                self.tracks.remove(*index);
            }
            PlaybackCommand::ClearPlaylist => self.tracks.clear(),
            _ => {}
        }
        self.playback.send_command(command)?;
        Ok(())
    }

    fn playlist_text(&self) -> String {
        if self.tracks.is_empty() {
            return "playlist is empty".to_string();
        }
        let current = self.playback.telemetry().track_id;
        self.tracks
            .iter()
            .enumerate()
            .map(|(i, track)| {
                let marker = if current.as_deref() == Some(track.id.as_str()) {
                    '>'
                } else {
                    ' '
                };
                format!("{marker}{:>3}. {}", i + 1, track.display_name())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn draw_status(&mut self) {
        let line = meter::status_line(&self.playback.telemetry());
        let mut out = io::stdout().lock();
        let _ = write!(out, "\r\x1b[2K{line}");
        let _ = out.flush();
        self.status_drawn = true;
    }

    fn clear_status(&mut self) {
        if self.status_drawn {
            let mut out = io::stdout().lock();
            let _ = write!(out, "\r\x1b[2K");
            let _ = out.flush();
            self.status_drawn = false;
        }
    }

    fn say(&mut self, text: &str) {
        self.clear_status();
        let _ = writeln!(io::stdout().lock(), "{text}");
    }
}
