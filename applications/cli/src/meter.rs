//! Text rendering of the status line and spectrum meter

use tonearm_playback::{EngineState, PlaybackEvent, Telemetry};

const BARS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// `m:ss`, or `h:mm:ss` past an hour
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// One block character per band, height from the normalized magnitude
pub fn spectrum_bars(spectrum: &[f32]) -> String {
    spectrum
        .iter()
        .map(|&level| {
            let level = if level.is_finite() { level.clamp(0.0, 1.0) } else { 0.0 };
            BARS[(level * (BARS.len() - 1) as f32).round() as usize]
        })
        .collect()
}

fn state_label(state: EngineState) -> &'static str {
    match state {
        EngineState::Idle => "idle",
        EngineState::Stopped => "stopped",
        EngineState::Playing => "playing",
        EngineState::Paused => "paused",
    }
}

/// Single status line: state, position, format and the spectrum
pub fn status_line(telemetry: &Telemetry) -> String {
    let mut line = format!(
        "[{:>7}] {} / {}",
        state_label(telemetry.state),
        format_time(telemetry.position_seconds),
        format_time(telemetry.duration_seconds),
    );

    if telemetry.sample_rate > 0 {
        line.push_str(&format!(
            "  {} kbps {:.1} kHz {}ch",
            telemetry.bitrate_kbps,
            f64::from(telemetry.sample_rate) / 1000.0,
            telemetry.channel_count,
        ));
    }

    line.push_str(&format!("  vol {:>3}%", (telemetry.volume * 100.0).round() as u32));

    if !telemetry.spectrum.is_empty() {
        line.push_str("  |");
        line.push_str(&spectrum_bars(&telemetry.spectrum));
        line.push('|');
    }
    line
}

/// Human-readable line for events worth announcing; `None` for the chatty ones
pub fn describe_event(event: &PlaybackEvent) -> Option<String> {
    match event {
        PlaybackEvent::TrackLoaded {
            track_id,
            duration_seconds,
            sample_rate,
            channel_count,
            bitrate_kbps,
        } => Some(format!(
            "loaded {track_id} ({}, {bitrate_kbps} kbps, {sample_rate} Hz, {channel_count}ch)",
            format_time(*duration_seconds)
        )),
        PlaybackEvent::LoadFailed { track_id, message } => {
            Some(format!("could not open {track_id}: {message}"))
        }
        PlaybackEvent::EngineStartFailed { message } => {
            Some(format!("audio output failed: {message}"))
        }
        PlaybackEvent::TrackFinished { track_id } => Some(format!("finished {track_id}")),
        PlaybackEvent::EndOfPlaylist => Some("end of playlist".to_string()),
        PlaybackEvent::PlaylistChanged { length } => Some(format!("playlist: {length} tracks")),
        PlaybackEvent::EqChanged { band, gain_db } => {
            Some(format!("eq band {band}: {gain_db:+.1} dB"))
        }
        PlaybackEvent::StateChanged { .. }
        | PlaybackEvent::PositionUpdate { .. }
        | PlaybackEvent::VolumeChanged { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(59.9), "0:59");
        assert_eq!(format_time(61.0), "1:01");
        assert_eq!(format_time(3725.0), "1:02:05");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn bars_follow_levels() {
        assert_eq!(spectrum_bars(&[0.0, 0.5, 1.0]), " ▄█");
        assert_eq!(spectrum_bars(&[2.0, -1.0, f32::NAN]), "█  ");
        assert_eq!(spectrum_bars(&[0.0; 20]).chars().count(), 20);
    }

    #[test]
    fn status_line_shows_format_only_when_loaded() {
        let idle = status_line(&Telemetry::default());
        assert!(idle.contains("idle"));
        assert!(!idle.contains("kbps"));
        assert!(idle.contains("vol 100%"));

        let playing = Telemetry {
            state: EngineState::Playing,
            is_playing: true,
            position_seconds: 65.0,
            duration_seconds: 200.0,
            bitrate_kbps: 320,
            sample_rate: 44_100,
            channel_count: 2,
            spectrum: vec![1.0; 20],
            ..Telemetry::default()
        };
        let line = status_line(&playing);
        assert!(line.contains("1:05 / 3:20"));
        assert!(line.contains("320 kbps 44.1 kHz 2ch"));
        assert!(line.ends_with(&format!("|{}|", "█".repeat(20))));
    }

    #[test]
    fn chatty_events_are_not_announced() {
        assert!(describe_event(&PlaybackEvent::PositionUpdate {
            position_seconds: 1.0,
            duration_seconds: 2.0
        })
        .is_none());
        assert_eq!(
            describe_event(&PlaybackEvent::EndOfPlaylist).as_deref(),
            Some("end of playlist")
        );
    }
}
