//! CPAL render path
//!
//! The output stream is built lazily on `start` and owned by whichever thread
//! owns the render path (the control loop thread). Everything the audio
//! callback touches lives in [`RenderState`], moved into the callback when the
//! stream is built. Control and callback talk over `rtrb` rings only:
//!
//! - commands (start segment, pause, resume, cancel, volume, EQ) flow in
//! - retired segments and captured first-channel samples flow out
//!
//! Completions leave the callback through a bounded crossbeam channel with
//! `try_send`, so the callback never blocks and never allocates.

use crate::error::{AudioError, Result};
use crate::segment::{Segment, SegmentFeeder};
use crossbeam_channel::{bounded, Receiver, Sender};
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tonearm_audio::GraphicEqualizer;
use tonearm_playback::{
    AudioSource, Completion, CompletionKind, Generation, PlaybackError, RenderPath,
    EQ_BAND_COUNT,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};

/// Stereo frames processed per inner block of the callback
const BLOCK_FRAMES: usize = 1024;

const COMMAND_CAPACITY: usize = 64;
const RETIRED_CAPACITY: usize = 16;
const COMPLETION_CAPACITY: usize = 256;

/// Segment ring length in seconds of stereo audio
const SEGMENT_SECONDS: f64 = 0.5;

/// Captured first-channel history kept for the analyzer, in seconds
const CAPTURE_SECONDS: f64 = 0.5;

/// Render paths whose output can be observed by the control loop
pub trait OutputTap {
    /// Device sample rate of the rendered output
    fn output_sample_rate(&self) -> u32;

    /// Move newly captured first-channel samples into `sink`
    fn drain_captured(&mut self, sink: &mut Vec<f32>);

    /// Receiver for end-of-segment notifications
    fn completions(&self) -> Receiver<Completion>;

    /// Completions lost because the channel was full, since the path was built
    fn dropped_completions(&self) -> u64 {
        0
    }
}

enum RenderCommand {
    Start(Segment),
    Pause,
    Resume,
    Cancel,
    SetVolume(f32),
    SetEqBand(usize, f32),
}

/// State owned by the audio callback
struct RenderState {
    commands: Consumer<RenderCommand>,
    retired: Producer<Segment>,
    capture: Producer<f32>,
    completions: Sender<Completion>,
    dropped_completions: Arc<AtomicU64>,
    rendered_frames: Arc<AtomicU64>,

    segment: Option<Segment>,
    paused: bool,
    volume: f32,
    equalizer: GraphicEqualizer,
    block: Vec<f32>,
    output_channels: usize,
}

impl RenderState {
    fn render<T>(&mut self, data: &mut [T])
    where
        T: SizedSample + FromSample<f32>,
    {
        self.apply_commands();

        let channels = self.output_channels.max(1);
        let mut block = std::mem::take(&mut self.block);

        for out in data.chunks_mut(BLOCK_FRAMES * channels) {
            let frames = out.len() / channels;
            let stereo = &mut block[..frames * 2];
            let produced = self.pull(stereo);

            self.equalizer.process_stereo(&mut stereo[..produced * 2]);
            for sample in stereo.iter_mut() {
                *sample *= self.volume;
            }
            for frame in stereo[..produced * 2].chunks_exact(2) {
                if self.capture.push(frame[0]).is_err() {
                    break;
                }
            }

            write_frames(out, stereo, channels);
            self.rendered_frames
                .fetch_add(produced as u64, Ordering::Relaxed);
        }

        self.block = block;

        if self.segment.as_ref().is_some_and(Segment::is_drained) {
            self.finish_segment(CompletionKind::EndOfMedia);
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                RenderCommand::Start(segment) => {
                    self.finish_segment(CompletionKind::TrackSwitch);
                    self.segment = Some(segment);
                    self.paused = false;
                    self.rendered_frames.store(0, Ordering::Relaxed);
                }
                RenderCommand::Pause => self.paused = true,
                RenderCommand::Resume => self.paused = false,
                RenderCommand::Cancel => self.finish_segment(CompletionKind::TrackSwitch),
                RenderCommand::SetVolume(volume) => self.volume = volume,
                RenderCommand::SetEqBand(band, gain_db) => {
                    self.equalizer.set_band_gain(band, gain_db);
                }
            }
        }
    }

    /// Fill `stereo` from the active segment, returning the frames produced
    ///
    /// Anything not produced is silence.
    fn pull(&mut self, stereo: &mut [f32]) -> usize {
        let mut produced = 0;

        if !self.paused {
            if let Some(segment) = self.segment.as_mut() {
                let wanted = segment.samples.slots().min(stereo.len()) & !1;
                if let Ok(chunk) = segment.samples.read_chunk(wanted) {
                    let (first, second) = chunk.as_slices();
                    stereo[..first.len()].copy_from_slice(first);
                    stereo[first.len()..wanted].copy_from_slice(second);
                    chunk.commit_all();
                    produced = wanted / 2;
                }
            }
        }

        stereo[produced * 2..].fill(0.0);
        produced
    }

    fn finish_segment(&mut self, kind: CompletionKind) {
        if let Some(segment) = self.segment.take() {
            let completion = Completion {
                generation: segment.generation,
                kind,
            };
            if self.completions.try_send(completion).is_err() {
                self.dropped_completions.fetch_add(1, Ordering::Relaxed);
            }
            // Freed on the control path; dropped here only if the ring is full
            let _ = self.retired.push(segment);
        }
    }
}

fn write_frames<T>(out: &mut [T], stereo: &[f32], channels: usize)
where
    T: SizedSample + FromSample<f32>,
{
    for (frame, lr) in out.chunks_exact_mut(channels).zip(stereo.chunks_exact(2)) {
        match frame {
            [mono] => *mono = T::from_sample((lr[0] + lr[1]) * 0.5),
            [left, right, rest @ ..] => {
                *left = T::from_sample(lr[0]);
                *right = T::from_sample(lr[1]);
                rest.fill(T::EQUILIBRIUM);
            }
            [] => {}
        }
    }
}

/// Control-side ends of the rings into a running stream
struct StreamLink {
    commands: Producer<RenderCommand>,
    retired: Consumer<Segment>,
    capture: Consumer<f32>,
}

/// Default-device output with one schedulable source
pub struct CpalRenderPath {
    device: cpal::Device,
    config: StreamConfig,
    sample_format: SampleFormat,

    stream: Option<cpal::Stream>,
    link: Option<StreamLink>,
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
    dropped_completions: Arc<AtomicU64>,
    rendered_frames: Arc<AtomicU64>,

    source: Option<Box<dyn AudioSource>>,
    feeder: Option<SegmentFeeder>,

    volume: f32,
    eq_gains: [f32; EQ_BAND_COUNT],
}

impl CpalRenderPath {
    /// Open the default output device of the default host
    ///
    /// The stream itself is not built until [`RenderPath::start`].
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::DeviceNotFound)?;
        Self::with_device(device)
    }

    pub fn with_device(device: cpal::Device) -> Result<Self> {
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let config = supported.config();
        let (completion_tx, completion_rx) = bounded(COMPLETION_CAPACITY);

        tracing::info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            ?sample_format,
            "Opened output device"
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            link: None,
            completion_tx,
            completion_rx,
            dropped_completions: Arc::new(AtomicU64::new(0)),
            rendered_frames: Arc::new(AtomicU64::new(0)),
            source: None,
            feeder: None,
            volume: 1.0,
            eq_gains: [0.0; EQ_BAND_COUNT],
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    fn build_stream(&mut self) -> Result<()> {
        let sample_rate = self.sample_rate();
        let (command_tx, command_rx) = RingBuffer::new(COMMAND_CAPACITY);
        let (retired_tx, retired_rx) = RingBuffer::new(RETIRED_CAPACITY);
        let (capture_tx, capture_rx) =
            RingBuffer::new((f64::from(sample_rate) * CAPTURE_SECONDS) as usize);

        let mut equalizer = GraphicEqualizer::new(sample_rate);
        equalizer.set_gains(self.eq_gains);

        let state = RenderState {
            commands: command_rx,
            retired: retired_tx,
            capture: capture_tx,
            completions: self.completion_tx.clone(),
            dropped_completions: Arc::clone(&self.dropped_completions),
            rendered_frames: Arc::clone(&self.rendered_frames),
            segment: None,
            paused: false,
            volume: self.volume,
            equalizer,
            block: vec![0.0; BLOCK_FRAMES * 2],
            output_channels: usize::from(self.config.channels),
        };

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_typed::<f32>(state)?,
            SampleFormat::I16 => self.build_typed::<i16>(state)?,
            SampleFormat::U16 => self.build_typed::<u16>(state)?,
            SampleFormat::I32 => self.build_typed::<i32>(state)?,
            other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
        };
        stream.play()?;

        self.stream = Some(stream);
        self.link = Some(StreamLink {
            commands: command_tx,
            retired: retired_rx,
            capture: capture_rx,
        });
        Ok(())
    }

    fn build_typed<T>(&self, mut state: RenderState) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let stream = self.device.build_output_stream(
            &self.config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| state.render(data),
            |err| tracing::error!(error = %err, "Audio stream error"),
            None,
        )?;
        Ok(stream)
    }

    fn send(&mut self, command: RenderCommand) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        if link.commands.push(command).is_err() {
            tracing::warn!("Render command ring full, dropping command");
        }
    }

    /// Drop segments the callback has finished with
    fn collect_retired(&mut self) {
        if let Some(link) = self.link.as_mut() {
            while let Ok(segment) = link.retired.pop() {
                drop(segment);
            }
        }
    }

    /// Stop the feeder and take the source back
    fn stop_feeder(&mut self) {
        if let Some(feeder) = self.feeder.take() {
            let generation = feeder.generation();
            match feeder.stop() {
                Some(source) => self.source = Some(source),
                None => tracing::warn!(%generation, "Segment feeder lost its source"),
            }
        }
    }
}

impl RenderPath for CpalRenderPath {
    type Source = Box<dyn AudioSource>;

    fn start(&mut self) -> tonearm_playback::Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        self.build_stream()?;
        tracing::debug!("Output stream started");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    fn attach(&mut self, source: Self::Source) -> tonearm_playback::Result<()> {
        self.cancel();
        self.source = Some(source);
        Ok(())
    }

    fn detach(&mut self) {
        self.cancel();
        self.source = None;
    }

    fn schedule(&mut self, from_seconds: f64, generation: Generation) -> tonearm_playback::Result<()> {
        self.stop_feeder();
        self.collect_retired();

        let mut source = self.source.take().ok_or(PlaybackError::NoTrackLoaded)?;
        if let Err(err) = source.seek(Duration::from_secs_f64(from_seconds.max(0.0))) {
            self.source = Some(source);
            return Err(err);
        }

        let capacity = (f64::from(self.sample_rate()) * SEGMENT_SECONDS) as usize * 2;
        let (feeder, segment) = match SegmentFeeder::spawn(source, capacity, generation) {
            Ok(spawned) => spawned,
            Err((err, source)) => {
                self.source = source;
                return Err(err.into());
            }
        };

        self.feeder = Some(feeder);
        self.rendered_frames.store(0, Ordering::Relaxed);
        self.send(RenderCommand::Start(segment));
        Ok(())
    }

    fn pause(&mut self) {
        self.send(RenderCommand::Pause);
    }

    fn resume(&mut self) {
        self.send(RenderCommand::Resume);
    }

    fn cancel(&mut self) {
        if self.feeder.is_some() {
            self.stop_feeder();
            self.send(RenderCommand::Cancel);
        }
        self.collect_retired();
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.send(RenderCommand::SetVolume(volume));
    }

    fn set_eq_band(&mut self, band: usize, gain_db: f32) {
        if let Some(gain) = self.eq_gains.get_mut(band) {
            *gain = gain_db;
            self.send(RenderCommand::SetEqBand(band, gain_db));
        }
    }

    fn rendered_seconds(&self) -> f64 {
        self.rendered_frames.load(Ordering::Relaxed) as f64 / f64::from(self.sample_rate())
    }
}

impl OutputTap for CpalRenderPath {
    fn output_sample_rate(&self) -> u32 {
        self.sample_rate()
    }

    fn drain_captured(&mut self, sink: &mut Vec<f32>) {
        if let Some(link) = self.link.as_mut() {
            while let Ok(sample) = link.capture.pop() {
                sink.push(sample);
            }
        }
    }

    fn completions(&self) -> Receiver<Completion> {
        self.completion_rx.clone()
    }

    fn dropped_completions(&self) -> u64 {
        self.dropped_completions.load(Ordering::Relaxed)
    }
}

impl Drop for CpalRenderPath {
    fn drop(&mut self) {
        self.stream = None;
        self.stop_feeder();
    }
}
