//! Tonearm terminal player
//!
//! Plays local files through the default output device with an interactive
//! command prompt and a live spectrum meter.

pub mod commands;
pub mod config;
pub mod error;
pub mod meter;
pub mod probe;
pub mod session;

pub use config::CliConfig;
pub use error::{CliError, Result};
