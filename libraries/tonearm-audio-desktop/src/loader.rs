//! Background Track Loader
//!
//! Opening a source means disk I/O and format detection, which can take
//! tens of milliseconds, so it never happens on the control path. Loads are
//! serialized through one worker thread. Each result carries the ticket of
//! the request that produced it; the engine drops results for tickets it has
//! since superseded.
//!
//! Requests go through a single latest-wins slot plus a one-token wake
//! channel, and results come back unbounded, so neither side ever waits on
//! the other.
//!
//! ```text
//! Control Loop                    Track Loader Thread
//!      │                                 │
//!      │  request(LoadRequest)           │
//!      │────────────────────────────────>│ settle delay
//!      │                                 │ SourceOpener::open()
//!      │                                 │
//!      │  results() -> LoadResult        │
//!      │<────────────────────────────────│
//! ```

use crate::error::{AudioError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tonearm_playback::{LoadRequest, LoadTicket, OpenedSource, SourceOpener};

/// Newest request not yet picked up by the worker
type PendingSlot = Arc<Mutex<Option<LoadRequest>>>;

fn take_pending(slot: &Mutex<Option<LoadRequest>>) -> Option<LoadRequest> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Outcome of one load request
pub struct LoadResult<S> {
    pub ticket: LoadTicket,
    pub result: tonearm_playback::Result<OpenedSource<S>>,
}

impl<S> std::fmt::Debug for LoadResult<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadResult")
            .field("ticket", &self.ticket)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

/// Background track loader
///
/// Dropping the loader closes the wake channel and joins the worker.
pub struct TrackLoader<S> {
    pending: PendingSlot,
    wake_tx: Option<Sender<()>>,
    result_rx: Receiver<LoadResult<S>>,
    handle: Option<JoinHandle<()>>,
}

impl<S: Send + 'static> TrackLoader<S> {
    /// Spawn the worker around an opener
    ///
    /// `settle` is slept before every open so the previous segment's render
    /// resources are released first.
    pub fn spawn<O>(opener: O, settle: Duration) -> Result<Self>
    where
        O: SourceOpener<Source = S> + 'static,
    {
        let pending: PendingSlot = Arc::new(Mutex::new(None));
        let (wake_tx, wake_rx) = bounded::<()>(1);
        let (result_tx, result_rx) = unbounded::<LoadResult<S>>();

        let slot = Arc::clone(&pending);
        let handle = thread::Builder::new()
            .name("track-loader".to_string())
            .spawn(move || loader_thread(&opener, settle, &slot, &wake_rx, &result_tx))
            .map_err(|e| AudioError::Worker(format!("Failed to spawn track loader: {e}")))?;

        Ok(Self {
            pending,
            wake_tx: Some(wake_tx),
            result_rx,
            handle: Some(handle),
        })
    }

    /// Queue a load, replacing any request the worker has not picked up yet
    ///
    /// Never blocks.
    pub fn request(&self, request: LoadRequest) -> Result<()> {
        let wake = self
            .wake_tx
            .as_ref()
            .ok_or_else(|| AudioError::Worker("Track loader is shut down".into()))?;

        let replaced = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(request);
        if let Some(old) = replaced {
            tracing::trace!(skipped = %old.ticket, "Replacing superseded load");
        }

        match wake.try_send(()) {
            // A full wake channel already has the worker coming for the slot
            Ok(()) | Err(TrySendError::Full(())) => Ok(()),
            Err(TrySendError::Disconnected(())) => {
                take_pending(&self.pending);
                Err(AudioError::Worker("Track loader thread has exited".into()))
            }
        }
    }

    /// Receiver of load results, for `select!`
    pub fn results(&self) -> &Receiver<LoadResult<S>> {
        &self.result_rx
    }

    /// Poll for a finished load (non-blocking)
    pub fn try_result(&self) -> Option<LoadResult<S>> {
        self.result_rx.try_recv().ok()
    }
}

impl<S> Drop for TrackLoader<S> {
    fn drop(&mut self) {
        self.wake_tx = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Track loader thread panicked");
            }
        }
    }
}

fn loader_thread<O: SourceOpener>(
    opener: &O,
    settle: Duration,
    pending: &Mutex<Option<LoadRequest>>,
    wake_rx: &Receiver<()>,
    result_tx: &Sender<LoadResult<O::Source>>,
) {
    tracing::debug!("Track loader started");

    while wake_rx.recv().is_ok() {
        let Some(mut request) = take_pending(pending) else {
            continue;
        };

        if !settle.is_zero() {
            thread::sleep(settle);
            // Only the newest request can still be current
            if let Some(newer) = take_pending(pending) {
                tracing::trace!(skipped = %request.ticket, "Skipping superseded load");
                request = newer;
            }
        }

        let start = Instant::now();
        let result = opener.open(&request.track);
        match &result {
            Ok(opened) => tracing::debug!(
                ticket = %request.ticket,
                track_id = %request.track.id,
                elapsed_ms = start.elapsed().as_millis() as u64,
                frames = opened.info.frame_count,
                "Opened source"
            ),
            Err(err) => tracing::debug!(
                ticket = %request.ticket,
                track_id = %request.track.id,
                error = %err,
                "Source failed to open"
            ),
        }

        let message = LoadResult {
            ticket: request.ticket,
            result,
        };
        if result_tx.send(message).is_err() {
            break;
        }
    }

    tracing::debug!("Track loader stopped");
}
