//! Schedule generation counter
//!
//! Every segment handed to the render path is stamped with the generation
//! current at schedule time. Advancing the counter voids all completions
//! stamped earlier; they are ignored when observed, never suppressed at the
//! source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of the schedule counter at a point in time
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Generation(u64);

impl Generation {
    /// Raw counter value
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Monotonic cancellation token owned by the playback engine
#[derive(Debug, Default)]
pub struct ScheduleGeneration {
    current: Generation,
}

impl ScheduleGeneration {
    /// Create a counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation
    pub fn current(&self) -> Generation {
        self.current
    }

    /// Advance by exactly one and return the new generation
    pub fn advance(&mut self) -> Generation {
        self.current = Generation(self.current.0 + 1);
        self.current
    }

    /// Whether a stamped generation is still current
    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.current
    }
}
