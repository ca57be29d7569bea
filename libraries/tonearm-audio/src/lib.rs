//! Tonearm - Audio DSP
//!
//! Real-time signal processing used by the render path:
//! - [`SpectrumAnalyzer`]: windowed FFT reduced to smoothed log-spaced bands
//! - [`GraphicEqualizer`]: 10 peaking biquads at fixed center frequencies
//!
//! Both allocate only at construction and are safe to call from an audio
//! callback afterwards.

mod equalizer;
mod error;
mod spectrum;

pub use equalizer::{GraphicEqualizer, EQ_CENTER_FREQUENCIES, EQ_Q};
pub use error::{DspError, Result};
pub use spectrum::{SpectrumAnalyzer, SpectrumConfig};
