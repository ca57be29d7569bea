//! Local file audio source using the Symphonia decoder
//!
//! Every container and sample format Symphonia handles is normalized to
//! interleaved stereo f32: mono is duplicated, extra channels beyond the first
//! two are dropped. When the file rate differs from the device rate a sinc
//! resampler converts in fixed input chunks; a partial chunk left at end of
//! file is flushed so the tail of the track is not lost.
//!
//! Packets are decoded on demand, so opening a file only costs the probe (and
//! a packet scan for containers that do not declare their length).

use crate::error::{AudioError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::collections::VecDeque;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use symphonia::core::units::TimeBase;
use tonearm_playback::{AudioSource, OpenedSource, SourceInfo, SourceOpener, TrackHandle};

/// Audio source for local files
pub struct LocalAudioSource {
    path: PathBuf,
    source_sample_rate: u32,
    target_sample_rate: u32,
    source_channels: u16,
    total_frames: u64,

    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    time_base: TimeBase,

    // Interleaved stereo at the target rate, ready for the reader
    buffer: VecDeque<f32>,
    // Interleaved stereo at the source rate, one packet's worth
    scratch: Vec<f32>,
    resampler: Option<StreamResampler>,

    // Source frames still to discard after an accurate seek
    skip_frames: u64,
    // Output frame the current read run started from
    start_frame: u64,
    frames_read: u64,
    is_eof: bool,
}

impl LocalAudioSource {
    /// Open a file for streaming at `target_sample_rate`
    pub fn new(path: impl AsRef<Path>, target_sample_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if target_sample_rate == 0 {
            return Err(AudioError::ResampleError(
                "target sample rate must be positive".into(),
            ));
        }

        let format_reader = probe(&path)?;
        let track = format_reader
            .default_track()
            .ok_or_else(|| AudioError::Decode("No audio tracks found".into()))?;

        let track_id = track.id;
        let source_sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| AudioError::Decode("Stream does not declare a sample rate".into()))?;
        let source_channels = track.codec_params.channels.map_or(2, |c| c.count()) as u16;
        let time_base = track
            .codec_params
            .time_base
            .unwrap_or_else(|| TimeBase::new(1, source_sample_rate));
        let declared_frames = track.codec_params.n_frames;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())?;

        let total_frames = match declared_frames {
            Some(frames) => frames,
            None => count_frames(&path, track_id, time_base, source_sample_rate)?,
        };

        let resampler = if source_sample_rate == target_sample_rate {
            None
        } else {
            Some(StreamResampler::new(source_sample_rate, target_sample_rate)?)
        };

        tracing::debug!(
            path = %path.display(),
            source_sample_rate,
            target_sample_rate,
            channels = source_channels,
            total_frames,
            resampling = resampler.is_some(),
            "Opened local source"
        );

        Ok(Self {
            path,
            source_sample_rate,
            target_sample_rate,
            source_channels,
            total_frames,
            format_reader,
            decoder,
            track_id,
            time_base,
            buffer: VecDeque::new(),
            scratch: Vec::new(),
            resampler,
            skip_frames: 0,
            start_frame: 0,
            frames_read: 0,
            is_eof: false,
        })
    }

    /// Header information for the engine's session metrics
    pub fn info(&self, file_size_bytes: u64) -> SourceInfo {
        SourceInfo {
            frame_count: self.total_frames,
            sample_rate: self.source_sample_rate,
            channel_count: self.source_channels,
            file_size_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Sample rate of the file
    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    /// Channel count of the file (output is always stereo)
    pub fn source_channels(&self) -> u16 {
        self.source_channels
    }

    /// Total length in frames at the file rate
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Decode one packet into the output buffer
    ///
    /// Returns `false` once the stream is exhausted.
    fn decode_next_packet(&mut self) -> Result<bool> {
        if self.is_eof {
            return Ok(false);
        }

        let packet = match self.format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                self.finish()?;
                return Ok(false);
            }
            Err(SymphoniaError::ResetRequired) => {
                self.decoder.reset();
                return Ok(true);
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != self.track_id {
            return Ok(true);
        }

        self.scratch.clear();
        match self.decoder.decode(&packet) {
            Ok(decoded) => append_stereo(decoded, &mut self.scratch),
            Err(SymphoniaError::DecodeError(reason)) => {
                tracing::warn!(path = %self.path.display(), reason, "Skipping corrupt packet");
                return Ok(true);
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                self.finish()?;
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        self.drop_lead_in();
        match self.resampler.as_mut() {
            Some(resampler) => resampler.process(&self.scratch, &mut self.buffer)?,
            None => self.buffer.extend(self.scratch.iter().copied()),
        }
        Ok(true)
    }

    fn drop_lead_in(&mut self) {
        if self.skip_frames == 0 {
            return;
        }
        let frames = (self.scratch.len() / 2) as u64;
        let dropped = self.skip_frames.min(frames);
        self.scratch.drain(..(dropped as usize) * 2);
        self.skip_frames -= dropped;
    }

    fn finish(&mut self) -> Result<()> {
        self.is_eof = true;
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.flush(&mut self.buffer)?;
        }
        Ok(())
    }

    fn timestamp_to_frames(&self, ts: u64) -> u64 {
        let time = self.time_base.calc_time(ts);
        ((time.seconds as f64 + time.frac) * f64::from(self.source_sample_rate)).round() as u64
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        let position = position.min(self.total_duration());
        let seeked = self.format_reader.seek(
            SeekMode::Accurate,
            SeekTo::Time {
                time: position.into(),
                track_id: Some(self.track_id),
            },
        )?;

        self.decoder.reset();
        self.buffer.clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }

        // Accurate seeks may land on the packet before the target
        self.skip_frames =
            self.timestamp_to_frames(seeked.required_ts.saturating_sub(seeked.actual_ts));
        self.start_frame =
            (position.as_secs_f64() * f64::from(self.target_sample_rate)).round() as u64;
        self.frames_read = 0;
        self.is_eof = false;

        tracing::trace!(
            path = %self.path.display(),
            position_seconds = position.as_secs_f64(),
            skip_frames = self.skip_frames,
            "Seeked local source"
        );
        Ok(())
    }

    fn total_duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_frames as f64 / f64::from(self.source_sample_rate))
    }
}

impl AudioSource for LocalAudioSource {
    fn read_samples(&mut self, output: &mut [f32]) -> tonearm_playback::Result<usize> {
        while self.buffer.len() < output.len() && !self.is_eof {
            self.decode_next_packet()?;
        }

        let available = self.buffer.len().min(output.len()) & !1;
        for (slot, sample) in output.iter_mut().zip(self.buffer.drain(..available)) {
            *slot = sample;
        }
        output[available..].fill(0.0);

        self.frames_read += (available / 2) as u64;
        Ok(available)
    }

    fn seek(&mut self, position: Duration) -> tonearm_playback::Result<()> {
        Ok(self.seek_to(position)?)
    }

    fn duration(&self) -> Duration {
        self.total_duration()
    }

    fn position(&self) -> Duration {
        let frames = self.start_frame + self.frames_read;
        Duration::from_secs_f64(frames as f64 / f64::from(self.target_sample_rate))
    }

    fn is_finished(&self) -> bool {
        self.is_eof && self.buffer.is_empty()
    }
}

/// Opens local files at the output device rate
#[derive(Debug, Clone)]
pub struct LocalSourceOpener {
    target_sample_rate: u32,
}

impl LocalSourceOpener {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }
}

impl SourceOpener for LocalSourceOpener {
    type Source = Box<dyn AudioSource>;

    fn open(&self, track: &TrackHandle) -> tonearm_playback::Result<OpenedSource<Self::Source>> {
        let file_size_bytes = std::fs::metadata(&track.path).map(|m| m.len())?;
        let source = LocalAudioSource::new(&track.path, self.target_sample_rate)?;
        let info = source.info(file_size_bytes);

        Ok(OpenedSource {
            info,
            source: Box::new(source),
        })
    }
}

fn probe(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path).map_err(|source| AudioError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    Ok(probed.format)
}

/// Sum packet durations for containers that do not declare a frame count
fn count_frames(path: &Path, track_id: u32, time_base: TimeBase, sample_rate: u32) -> Result<u64> {
    let mut reader = probe(path)?;
    let mut ticks = 0u64;

    loop {
        match reader.next_packet() {
            Ok(packet) if packet.track_id() == track_id => ticks += packet.dur(),
            Ok(_) | Err(SymphoniaError::ResetRequired) => {}
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
    }

    let time = time_base.calc_time(ticks);
    let frames = ((time.seconds as f64 + time.frac) * f64::from(sample_rate)).round() as u64;
    tracing::debug!(path = %path.display(), frames, "Counted frames by packet scan");
    Ok(frames)
}

/// Append a decoded buffer to `out` as interleaved stereo f32
fn append_stereo(decoded: AudioBufferRef<'_>, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => append_planar(&buf, out),
        AudioBufferRef::F64(buf) => append_planar(&buf, out),
        AudioBufferRef::S8(buf) => append_planar(&buf, out),
        AudioBufferRef::S16(buf) => append_planar(&buf, out),
        AudioBufferRef::S24(buf) => append_planar(&buf, out),
        AudioBufferRef::S32(buf) => append_planar(&buf, out),
        AudioBufferRef::U8(buf) => append_planar(&buf, out),
        AudioBufferRef::U16(buf) => append_planar(&buf, out),
        AudioBufferRef::U24(buf) => append_planar(&buf, out),
        AudioBufferRef::U32(buf) => append_planar(&buf, out),
    }
}

fn append_planar<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let channels = buf.spec().channels.count();
    if channels == 0 {
        return;
    }

    let left = buf.chan(0);
    let right = if channels > 1 { buf.chan(1) } else { left };
    out.reserve(left.len() * 2);
    for (&l, &r) in left.iter().zip(right) {
        out.push(f32::from_sample(l));
        out.push(f32::from_sample(r));
    }
}

/// Stereo sinc resampler fed with arbitrary packet sizes
struct StreamResampler {
    inner: SincFixedIn<f32>,
    pending: [Vec<f32>; 2],
    ratio: f64,
    // Output frames still to drop to compensate for filter delay
    delay_frames: usize,
    frames_in: u64,
    frames_out: u64,
}

impl StreamResampler {
    fn new(from_rate: u32, to_rate: u32) -> Result<Self> {
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        // 0.1 s input chunks
        let chunk_frames = (from_rate as usize / 10).max(1);
        let ratio = f64::from(to_rate) / f64::from(from_rate);
        let inner = SincFixedIn::<f32>::new(
            ratio,
            2.0,
            params,
            chunk_frames,
            2,
        )?;
        let delay_frames = inner.output_delay();

        Ok(Self {
            inner,
            pending: [Vec::new(), Vec::new()],
            ratio,
            delay_frames,
            frames_in: 0,
            frames_out: 0,
        })
    }

    fn process(&mut self, interleaved: &[f32], out: &mut VecDeque<f32>) -> Result<()> {
        for frame in interleaved.chunks_exact(2) {
            self.pending[0].push(frame[0]);
            self.pending[1].push(frame[1]);
        }
        self.frames_in += (interleaved.len() / 2) as u64;

        loop {
            let needed = self.inner.input_frames_next();
            if self.pending[0].len() < needed {
                return Ok(());
            }
            let chunk = [
                self.pending[0].drain(..needed).collect::<Vec<_>>(),
                self.pending[1].drain(..needed).collect::<Vec<_>>(),
            ];
            let resampled = self.inner.process(&chunk[..], None)?;
            self.emit(&resampled, out);
        }
    }

    /// Drain the partial chunk and the filter tail
    ///
    /// Zero padding makes rubato produce whole chunks, so the output is cut
    /// back to the length the input implies.
    fn flush(&mut self, out: &mut VecDeque<f32>) -> Result<()> {
        let before = self.frames_out;
        if !self.pending[0].is_empty() {
            let resampled = self.inner.process_partial(Some(&self.pending[..]), None)?;
            self.emit(&resampled, out);
            self.pending[0].clear();
            self.pending[1].clear();
        }

        let tail = self.inner.process_partial::<Vec<f32>>(None, None)?;
        self.emit(&tail, out);

        let expected = (self.frames_in as f64 * self.ratio).round() as u64;
        let excess = self
            .frames_out
            .saturating_sub(expected)
            .min(self.frames_out - before);
        out.truncate(out.len() - (excess as usize) * 2);
        self.frames_out -= excess;
        Ok(())
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.pending[0].clear();
        self.pending[1].clear();
        self.delay_frames = self.inner.output_delay();
        self.frames_in = 0;
        self.frames_out = 0;
    }

    fn emit(&mut self, planar: &[Vec<f32>], out: &mut VecDeque<f32>) {
        let [left, right] = planar else {
            return;
        };
        let skip = self.delay_frames.min(left.len());
        self.delay_frames -= skip;
        for (&l, &r) in left.iter().zip(right).skip(skip) {
            out.push_back(l);
            out.push_back(r);
        }
        self.frames_out += left.len().min(right.len()).saturating_sub(skip) as u64;
    }
}
