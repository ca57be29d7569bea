//! Playlist sequencing
//!
//! Linear or shuffled play order with optional repeat. The shuffle order is a
//! permutation of every index with the current track pinned at position 0.
//! It is dropped whenever the list changes and rebuilt lazily on next use.

use crate::types::TrackHandle;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Next-track callback used by the engine on natural completion
pub trait TrackSequence {
    /// Advance and return the next track, or `None` at the end of the playlist
    fn next_track(&mut self) -> Option<TrackHandle>;

    /// Step back and return the previous track
    fn previous_track(&mut self) -> Option<TrackHandle>;
}

/// Ordered track list with shuffle and repeat
#[derive(Debug)]
pub struct PlaylistSequencer {
    tracks: Vec<TrackHandle>,
    current_index: Option<usize>,
    /// Stale when its length differs from `tracks`
    shuffle_order: Vec<usize>,
    shuffle_cursor: usize,
    shuffle_enabled: bool,
    repeat_enabled: bool,
    rng: StdRng,
}

impl Default for PlaylistSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaylistSequencer {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Sequencer with a reproducible shuffle
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            tracks: Vec::new(),
            current_index: None,
            shuffle_order: Vec::new(),
            shuffle_cursor: 0,
            shuffle_enabled: false,
            repeat_enabled: false,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[TrackHandle] {
        &self.tracks
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&TrackHandle> {
        self.current_index.and_then(|index| self.tracks.get(index))
    }

    /// Current shuffle permutation (empty when stale or shuffle is off)
    pub fn shuffle_order(&self) -> &[usize] {
        &self.shuffle_order
    }

    pub fn is_shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    pub fn is_repeat_enabled(&self) -> bool {
        self.repeat_enabled
    }

    /// Append a track
    pub fn add(&mut self, track: TrackHandle) {
        self.tracks.push(track);
        self.invalidate_shuffle();
    }

    /// Append several tracks
    pub fn add_many(&mut self, tracks: impl IntoIterator<Item = TrackHandle>) {
        self.tracks.extend(tracks);
        self.invalidate_shuffle();
    }

    /// Remove a track, keeping the current index pointing at a valid entry
    pub fn remove(&mut self, index: usize) -> Option<TrackHandle> {
        if index >= self.tracks.len() {
            return None;
        }

        let removed = self.tracks.remove(index);

        self.current_index = match self.current_index {
            Some(current) if index < current => Some(current - 1),
            Some(_) if self.tracks.is_empty() => None,
            Some(current) if index == current => Some(current.min(self.tracks.len() - 1)),
            other => other,
        };

        self.invalidate_shuffle();
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current_index = None;
        self.invalidate_shuffle();
    }

    /// Make `index` the current entry
    ///
    /// The shuffle order is rebuilt on next access so the selection is pinned
    /// at its head.
    pub fn select(&mut self, index: usize) -> Option<&TrackHandle> {
        if index >= self.tracks.len() {
            return None;
        }
        self.current_index = Some(index);
        self.invalidate_shuffle();
        self.tracks.get(index)
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        if self.shuffle_enabled != enabled {
            self.shuffle_enabled = enabled;
            self.invalidate_shuffle();
        }
    }

    pub fn set_repeat(&mut self, enabled: bool) {
        self.repeat_enabled = enabled;
    }

    /// Advance to the next index, or `None` at the end of the playlist
    ///
    /// At the end of the playlist the current index is left unchanged.
    pub fn next(&mut self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }

        let index = if self.shuffle_enabled {
            self.next_shuffled()?
        } else {
            self.next_sequential()?
        };

        self.current_index = Some(index);
        Some(index)
    }

    /// Step back one entry
    ///
    /// At the start of the playlist this wraps to the end when repeat is on,
    /// otherwise it stays on the first entry.
    pub fn previous(&mut self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }

        let index = if self.shuffle_enabled {
            self.previous_shuffled()
        } else {
            self.previous_sequential()
        };

        self.current_index = Some(index);
        Some(index)
    }

    fn next_sequential(&self) -> Option<usize> {
        let candidate = self.current_index.map_or(0, |current| current + 1);
        if candidate < self.tracks.len() {
            Some(candidate)
        } else if self.repeat_enabled {
            Some(0)
        } else {
            None
        }
    }

    fn previous_sequential(&self) -> usize {
        match self.current_index {
            Some(current) if current > 0 => current - 1,
            _ if self.repeat_enabled => self.tracks.len() - 1,
            _ => 0,
        }
    }

    fn next_shuffled(&mut self) -> Option<usize> {
        if self.shuffle_is_stale() {
            self.regenerate_shuffle();
            if self.current_index.is_none() {
                return Some(self.shuffle_order[0]);
            }
        }

        let advanced = self.shuffle_cursor + 1;
        if advanced < self.shuffle_order.len() {
            self.shuffle_cursor = advanced;
            return Some(self.shuffle_order[advanced]);
        }

        if !self.repeat_enabled {
            return None;
        }

        self.regenerate_shuffle();
        // A single track would otherwise never move off the pinned head
        self.shuffle_cursor = usize::from(self.shuffle_order.len() > 1);
        Some(self.shuffle_order[self.shuffle_cursor])
    }

    fn previous_shuffled(&mut self) -> usize {
        if self.shuffle_is_stale() {
            self.regenerate_shuffle();
        }

        if self.shuffle_cursor > 0 {
            self.shuffle_cursor -= 1;
        } else if self.repeat_enabled {
            self.shuffle_cursor = self.shuffle_order.len() - 1;
        }

        self.shuffle_order[self.shuffle_cursor]
    }

    fn shuffle_is_stale(&self) -> bool {
        self.shuffle_order.len() != self.tracks.len()
    }

    fn invalidate_shuffle(&mut self) {
        self.shuffle_order.clear();
        self.shuffle_cursor = 0;
    }

    /// Fisher-Yates over every index except the current one, current pinned first
    fn regenerate_shuffle(&mut self) {
        let pinned = self.current_index.filter(|&index| index < self.tracks.len());

        let mut rest: Vec<usize> = (0..self.tracks.len())
            .filter(|&index| Some(index) != pinned)
            .collect();
        rest.shuffle(&mut self.rng);

        self.shuffle_order.clear();
        self.shuffle_order.extend(pinned);
        self.shuffle_order.extend(rest);
        self.shuffle_cursor = 0;

        tracing::trace!(order = ?self.shuffle_order, "Regenerated shuffle order");
    }
}

impl TrackSequence for PlaylistSequencer {
    fn next_track(&mut self) -> Option<TrackHandle> {
        let index = self.next()?;
        self.tracks.get(index).cloned()
    }

    fn previous_track(&mut self) -> Option<TrackHandle> {
        let index = self.previous()?;
        self.tracks.get(index).cloned()
    }
}
