//! Shared fixtures for desktop integration tests

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tonearm_audio_desktop::{DesktopPlayback, OutputTap};
use tonearm_playback::{
    Completion, CompletionKind, Generation, OpenedSource, PlaybackError, PlaybackEvent,
    RenderPath, SourceInfo, SourceOpener, TrackHandle,
};

pub const SAMPLE_RATE: u32 = 44_100;

/// Write a 16-bit WAV whose samples come from `sample(frame, channel)`
pub fn write_wav(
    dir: &Path,
    name: &str,
    channels: u16,
    sample_rate: u32,
    frames: usize,
    sample: impl Fn(usize, u16) -> i16,
) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for frame in 0..frames {
        for channel in 0..channels {
            writer.write_sample(sample(frame, channel)).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

/// Stereo sine at `frequency` Hz
pub fn write_sine_wav(dir: &Path, name: &str, seconds: f64, frequency: f64) -> PathBuf {
    let frames = (seconds * f64::from(SAMPLE_RATE)) as usize;
    write_wav(dir, name, 2, SAMPLE_RATE, frames, |frame, _| {
        let t = frame as f64 / f64::from(SAMPLE_RATE);
        ((2.0 * std::f64::consts::PI * frequency * t).sin() * 0.5 * f64::from(i16::MAX)) as i16
    })
}

/// Everything a test can observe about the mock render path
#[derive(Debug, Default)]
pub struct RenderLog {
    pub running: bool,
    pub attached: Option<String>,
    pub scheduled: Vec<(f64, Generation)>,
    pub cancels: usize,
    pub paused: bool,
    pub volume: f32,
    pub eq: Vec<(usize, f32)>,
    pub rendered_seconds: f64,
    pub capture: Vec<f32>,
}

/// Test-side handle to a [`MockRender`]
#[derive(Clone)]
pub struct MockHandle {
    pub log: Arc<Mutex<RenderLog>>,
    completion_tx: Sender<Completion>,
}

impl MockHandle {
    pub fn last_generation(&self) -> Option<Generation> {
        self.log.lock().unwrap().scheduled.last().map(|&(_, g)| g)
    }

    pub fn schedule_count(&self) -> usize {
        self.log.lock().unwrap().scheduled.len()
    }

    /// Report the end of a segment the way the audio callback would
    pub fn complete(&self, generation: Generation, kind: CompletionKind) {
        self.completion_tx
            .send(Completion { generation, kind })
            .unwrap();
    }

    pub fn set_rendered(&self, seconds: f64) {
        self.log.lock().unwrap().rendered_seconds = seconds;
    }

    pub fn feed_capture(&self, samples: &[f32]) {
        self.log.lock().unwrap().capture.extend_from_slice(samples);
    }
}

/// Render path that records calls instead of playing
pub struct MockRender {
    log: Arc<Mutex<RenderLog>>,
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
}

impl MockRender {
    pub fn new() -> (Self, MockHandle) {
        let (completion_tx, completion_rx) = unbounded();
        let log = Arc::new(Mutex::new(RenderLog {
            volume: 1.0,
            ..RenderLog::default()
        }));
        let handle = MockHandle {
            log: Arc::clone(&log),
            completion_tx: completion_tx.clone(),
        };
        (
            Self {
                log,
                completion_tx,
                completion_rx,
            },
            handle,
        )
    }
}

impl RenderPath for MockRender {
    type Source = String;

    fn start(&mut self) -> tonearm_playback::Result<()> {
        self.log.lock().unwrap().running = true;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.log.lock().unwrap().running
    }

    fn attach(&mut self, source: String) -> tonearm_playback::Result<()> {
        self.log.lock().unwrap().attached = Some(source);
        Ok(())
    }

    fn detach(&mut self) {
        self.log.lock().unwrap().attached = None;
    }

    fn schedule(&mut self, from_seconds: f64, generation: Generation) -> tonearm_playback::Result<()> {
        let mut log = self.log.lock().unwrap();
        log.scheduled.push((from_seconds, generation));
        log.rendered_seconds = 0.0;
        log.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().paused = true;
    }

    fn resume(&mut self) {
        self.log.lock().unwrap().paused = false;
    }

    fn cancel(&mut self) {
        self.log.lock().unwrap().cancels += 1;
        // A cancelled segment still reports, stamped with its own generation
        if let Some(generation) = self.log.lock().unwrap().scheduled.last().map(|&(_, g)| g) {
            let _ = self.completion_tx.send(Completion {
                generation,
                kind: CompletionKind::TrackSwitch,
            });
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.lock().unwrap().volume = volume;
    }

    fn set_eq_band(&mut self, band: usize, gain_db: f32) {
        self.log.lock().unwrap().eq.push((band, gain_db));
    }

    fn rendered_seconds(&self) -> f64 {
        self.log.lock().unwrap().rendered_seconds
    }
}

impl OutputTap for MockRender {
    fn output_sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn drain_captured(&mut self, sink: &mut Vec<f32>) {
        sink.append(&mut self.log.lock().unwrap().capture);
    }

    fn completions(&self) -> Receiver<Completion> {
        self.completion_rx.clone()
    }
}

/// Opens any track as a 10 second 44.1 kHz stereo source; ids ending in
/// `.bad` fail
pub struct MockOpener;

impl SourceOpener for MockOpener {
    type Source = String;

    fn open(&self, track: &TrackHandle) -> tonearm_playback::Result<OpenedSource<String>> {
        if track.id.ends_with(".bad") {
            return Err(PlaybackError::AudioSource("corrupt header".into()));
        }
        Ok(OpenedSource {
            info: SourceInfo {
                frame_count: u64::from(SAMPLE_RATE) * 10,
                sample_rate: SAMPLE_RATE,
                channel_count: 2,
                file_size_bytes: 1_764_000,
            },
            source: track.id.clone(),
        })
    }
}

pub fn track(name: &str) -> TrackHandle {
    TrackHandle::from_path(format!("/music/{name}"))
}

/// Collect events until one matches, or panic after five seconds
pub fn wait_for_event(
    playback: &DesktopPlayback,
    mut matches: impl FnMut(&PlaybackEvent) -> bool,
) -> Vec<PlaybackEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match playback.events().recv_timeout(remaining) {
            Ok(event) => {
                let done = matches(&event);
                seen.push(event);
                if done {
                    return seen;
                }
            }
            Err(_) => panic!("timed out waiting for event; saw {seen:?}"),
        }
    }
}

/// Poll a condition for up to five seconds
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}
