//! Audio source implementations for desktop

pub mod local;

pub use local::{LocalAudioSource, LocalSourceOpener};
