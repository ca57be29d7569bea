//! Segment feeding
//!
//! A scheduled segment is a lock-free ring of interleaved stereo samples. A
//! feeder thread decodes from the attached source into the ring; the audio
//! callback consumes it. When the feeder runs out of source it raises
//! `finished`, and the callback reports end of media once the ring is empty.

use crate::error::{AudioError, Result};
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tonearm_playback::{AudioSource, Generation};

/// Samples decoded per source read
const FEED_CHUNK_SAMPLES: usize = 4096;

/// How long the feeder waits when the ring is full
const FEED_BACKOFF: Duration = Duration::from_millis(2);

type SourceSlot = Arc<Mutex<Option<Box<dyn AudioSource>>>>;

/// Callback-side end of a scheduled segment
pub(crate) struct Segment {
    pub(crate) generation: Generation,
    pub(crate) samples: Consumer<f32>,
    pub(crate) finished: Arc<AtomicBool>,
}

impl Segment {
    /// The source is exhausted and every sample has been consumed
    pub(crate) fn is_drained(&self) -> bool {
        self.finished.load(Ordering::Acquire) && self.samples.is_empty()
    }
}

/// Control-side handle to a running feeder thread
///
/// The source travels to the feeder through a shared slot and is put back
/// when the feeder exits, so stopping the feeder returns it for the next
/// segment.
pub(crate) struct SegmentFeeder {
    generation: Generation,
    cancel: Arc<AtomicBool>,
    slot: SourceSlot,
    handle: JoinHandle<()>,
}

impl SegmentFeeder {
    /// Start feeding `source` into a new ring of `capacity` samples
    ///
    /// On failure the source is handed back with the error.
    pub(crate) fn spawn(
        source: Box<dyn AudioSource>,
        capacity: usize,
        generation: Generation,
    ) -> std::result::Result<(Self, Segment), (AudioError, Option<Box<dyn AudioSource>>)> {
        let (producer, consumer) = RingBuffer::<f32>::new(capacity.max(FEED_CHUNK_SAMPLES));
        let cancel = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let slot: SourceSlot = Arc::new(Mutex::new(Some(source)));

        let worker = FeedWorker {
            producer,
            cancel: Arc::clone(&cancel),
            finished: Arc::clone(&finished),
            slot: Arc::clone(&slot),
            generation,
        };

        match thread::Builder::new()
            .name("segment-feeder".into())
            .spawn(move || worker.run())
        {
            Ok(handle) => Ok((
                Self {
                    generation,
                    cancel,
                    slot,
                    handle,
                },
                Segment {
                    generation,
                    samples: consumer,
                    finished,
                },
            )),
            Err(err) => Err((
                AudioError::Worker(format!("Failed to spawn segment feeder: {err}")),
                take_source(&slot),
            )),
        }
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    /// Cancel feeding, wait for the thread and recover the source
    pub(crate) fn stop(self) -> Option<Box<dyn AudioSource>> {
        self.cancel.store(true, Ordering::Release);
        if self.handle.join().is_err() {
            tracing::error!(generation = %self.generation, "Segment feeder panicked");
        }
        take_source(&self.slot)
    }
}

fn take_source(slot: &SourceSlot) -> Option<Box<dyn AudioSource>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

struct FeedWorker {
    producer: Producer<f32>,
    cancel: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    slot: SourceSlot,
    generation: Generation,
}

impl FeedWorker {
    fn run(mut self) {
        let Some(mut source) = take_source(&self.slot) else {
            return;
        };

        match self.feed(source.as_mut()) {
            Ok(true) => {
                tracing::trace!(generation = %self.generation, "Segment source exhausted");
                self.finished.store(true, Ordering::Release);
            }
            Ok(false) => {
                tracing::trace!(generation = %self.generation, "Segment feeder cancelled");
            }
            Err(err) => {
                // A source that fails mid-stream ends the track early
                tracing::warn!(generation = %self.generation, error = %err, "Decoding failed");
                self.finished.store(true, Ordering::Release);
            }
        }

        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(source);
    }

    /// Returns `true` at end of source, `false` when cancelled
    fn feed(&mut self, source: &mut dyn AudioSource) -> Result<bool> {
        let mut chunk = vec![0.0_f32; FEED_CHUNK_SAMPLES];

        loop {
            if self.cancel.load(Ordering::Acquire) {
                return Ok(false);
            }

            let read = source.read_samples(&mut chunk)?;
            if read == 0 {
                return Ok(true);
            }

            let mut written = 0;
            while written < read {
                if self.cancel.load(Ordering::Acquire) {
                    return Ok(false);
                }

                let free = self.producer.slots();
                if free == 0 {
                    thread::sleep(FEED_BACKOFF);
                    continue;
                }

                for &sample in &chunk[written..read.min(written + free)] {
                    if self.producer.push(sample).is_err() {
                        break;
                    }
                    written += 1;
                }
            }
        }
    }
}
