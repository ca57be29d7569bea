//! Interactive command parsing
//!
//! One command per stdin line. Anything that maps onto the control loop
//! becomes a [`PlaybackCommand`]; the rest is handled by the session.

use crate::error::{CliError, Result};
use tonearm_audio_desktop::PlaybackCommand;
use tonearm_playback::{TrackHandle, EQ_BAND_COUNT};

/// A parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Forward to the playback thread
    Playback(PlaybackCommand),

    /// Print the status line once
    Status,

    /// Print the playlist as the session knows it
    List,

    /// Print command help
    Help,

    /// Leave the player
    Quit,

    /// Blank line
    Empty,
}

pub const HELP: &str = "\
commands:
  play | pause | resume | stop
  seek <seconds>        jump within the current track
  vol <0-1>             output volume
  eq <band> <dB>        equalizer band 0-9, gain clamped to +/-12 dB
  next | prev           move through the playlist
  goto <n>              play playlist entry n (1-based)
  shuffle on|off        shuffle order
  repeat on|off         wrap around at the ends
  add <path>            append a file
  rm <n>                remove playlist entry n (1-based)
  clear                 empty the playlist
  list | status | help | quit";

/// Parse one line of user input
pub fn parse(line: &str) -> Result<Input> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(Input::Empty);
    };
    let rest: Vec<&str> = words.collect();

    let command = match word.to_ascii_lowercase().as_str() {
        "play" | "p" => PlaybackCommand::Play,
        "pause" => PlaybackCommand::Pause,
        "resume" | "r" => PlaybackCommand::Resume,
        "stop" | "s" => PlaybackCommand::Stop,
        "next" | "n" => PlaybackCommand::Next,
        "prev" | "previous" => PlaybackCommand::Previous,
        "clear" => PlaybackCommand::ClearPlaylist,
        "seek" => {
            let seconds = number::<f64>(&rest, 0, "seek <seconds>")?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid("seek position must be a non-negative number"));
            }
            PlaybackCommand::Seek(seconds)
        }
        "vol" | "volume" => {
            let volume = number::<f32>(&rest, 0, "vol <0-1>")?;
            if !volume.is_finite() {
                return Err(invalid("volume must be a number"));
            }
            PlaybackCommand::SetVolume(volume)
        }
        "eq" => {
            let band = number::<usize>(&rest, 0, "eq <band> <dB>")?;
            let gain_db = number::<f32>(&rest, 1, "eq <band> <dB>")?;
            if band >= EQ_BAND_COUNT {
                return Err(invalid(&format!(
                    "band must be between 0 and {}",
                    EQ_BAND_COUNT - 1
                )));
            }
            PlaybackCommand::SetEqBand { band, gain_db }
        }
        "goto" => PlaybackCommand::PlayIndex(position(&rest, "goto <n>")?),
        "rm" | "remove" => PlaybackCommand::RemoveTrack(position(&rest, "rm <n>")?),
        "shuffle" => PlaybackCommand::SetShuffle(switch(&rest, "shuffle on|off")?),
        "repeat" => PlaybackCommand::SetRepeat(switch(&rest, "repeat on|off")?),
        "add" => {
            if rest.is_empty() {
                return Err(invalid("usage: add <path>"));
            }
            // Paths may contain spaces
            let path = line.trim_start()[word.len()..].trim();
            PlaybackCommand::AddTracks(vec![TrackHandle::from_path(path)])
        }
        "status" => return Ok(Input::Status),
        "list" | "ls" => return Ok(Input::List),
        "help" | "?" => return Ok(Input::Help),
        "quit" | "q" | "exit" => return Ok(Input::Quit),
        other => return Err(invalid(&format!("unknown command '{other}' (try 'help')"))),
    };

    Ok(Input::Playback(command))
}

fn invalid(message: &str) -> CliError {
    CliError::InvalidCommand(message.to_string())
}

fn number<T: std::str::FromStr>(args: &[&str], index: usize, usage: &str) -> Result<T> {
    args.get(index)
        .and_then(|arg| arg.parse().ok())
        .ok_or_else(|| invalid(&format!("usage: {usage}")))
}

/// 1-based playlist position to a 0-based index
fn position(args: &[&str], usage: &str) -> Result<usize> {
    match number::<usize>(args, 0, usage)? {
        0 => Err(invalid("playlist positions start at 1")),
        n => Ok(n - 1),
    }
}

fn switch(args: &[&str], usage: &str) -> Result<bool> {
    match args.first().map(|arg| arg.to_ascii_lowercase()).as_deref() {
        Some("on" | "true" | "1") => Ok(true),
        Some("off" | "false" | "0") => Ok(false),
        _ => Err(invalid(&format!("usage: {usage}"))),
    }
}
