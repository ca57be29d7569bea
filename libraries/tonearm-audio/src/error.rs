//! Error types for DSP components

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DspError {
    #[error("Invalid spectrum configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

pub type Result<T> = std::result::Result<T, DspError>;
