//! Desktop playback for Tonearm using CPAL
//!
//! This crate plugs the platform pieces into `tonearm-playback`:
//!
//! - [`CpalRenderPath`]: default-device output with a lock-free audio callback
//!   (EQ, volume, first-channel capture, completion posting)
//! - [`LocalAudioSource`] / [`LocalSourceOpener`]: Symphonia decoding with
//!   sinc resampling to the device rate
//! - [`TrackLoader`]: single background worker for source opening
//! - [`ControlLoop`] / [`DesktopPlayback`]: the control thread and its facade
//!
//! # Example
//!
//! ```no_run
//! use tonearm_audio_desktop::{DesktopConfig, DesktopPlayback};
//! use tonearm_playback::TrackHandle;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let playback = DesktopPlayback::new(DesktopConfig::default())?;
//!
//! playback.add_tracks(vec![
//!     TrackHandle::from_path("/music/a.flac"),
//!     TrackHandle::from_path("/music/b.mp3"),
//! ])?;
//! playback.play_index(0)?;
//! playback.set_volume(0.5)?;
//!
//! let telemetry = playback.telemetry();
//! println!("{:.1}s / {:.1}s", telemetry.position_seconds, telemetry.duration_seconds);
//!
//! playback.shutdown();
//! # Ok(())
//! # }
//! ```

mod config;
mod controller;
mod error;
mod loader;
pub mod playback;
mod render;
mod segment;
pub mod sources;

pub use config::DesktopConfig;
pub use controller::{ControlLoop, PlaybackCommand};
pub use error::{AudioError, Result};
pub use loader::{LoadResult, TrackLoader};
pub use playback::DesktopPlayback;
pub use render::{CpalRenderPath, OutputTap};
pub use sources::{LocalAudioSource, LocalSourceOpener};
