//! `tonearm probe`: header info and display bitrate without playing

use crate::error::Result;
use crate::meter::format_time;
use std::fmt;
use std::path::Path;
use tonearm_audio_desktop::LocalSourceOpener;
use tonearm_playback::{bitrate, PlaybackConfig, SourceInfo, SourceOpener, TrackHandle};

/// Rate the decoder is opened at; nothing is rendered, so any valid rate works
const PROBE_SAMPLE_RATE: u32 = 48_000;

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub track: TrackHandle,
    pub info: SourceInfo,
    pub bitrate_kbps: u32,
}

/// Open a file the way the player would and report what it found
pub fn probe(path: &Path, config: &PlaybackConfig) -> Result<ProbeReport> {
    let track = TrackHandle::from_path(path);
    let opened = LocalSourceOpener::new(PROBE_SAMPLE_RATE).open(&track)?;
    let bitrate_kbps = bitrate::estimate_bitrate_kbps(
        opened.info.file_size_bytes,
        opened.info.duration_seconds(),
        &config.bitrate_ladder,
        config.lossless_threshold_kbps,
    );

    Ok(ProbeReport {
        track,
        info: opened.info,
        bitrate_kbps,
    })
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} | {} Hz | {}ch | {} kbps | {} bytes",
            self.track.display_name(),
            format_time(self.info.duration_seconds()),
            self.info.sample_rate,
            self.info.channel_count,
            self.bitrate_kbps,
            self.info.file_size_bytes,
        )
    }
}
