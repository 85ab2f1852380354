//! # Scheduler Module
//!
//! Hands out every unordered pair of images exactly once, decoding each
//! image the first time a pair needs it.
//!
//! ## Enumeration
//! Pairs are produced in triangular order with a cursor `(minor, major)`:
//! `(0,0), (0,1), (1,1), (0,2), (1,2), (2,2), ...`. Each image is paired
//! with itself once; callers skip those self-pairs. For `n` images,
//! `next_pair` returns a pair `n(n+1)/2` times and then `None` forever.
//!
//! ## Concurrency
//! One mutex guards the cursor and the slots. Decoding happens outside
//! the lock, so distinct images decode in parallel. A thread that needs an
//! image another thread is still decoding claims the next undecoded image
//! instead. Once every image is claimed it waits on a condition variable
//! that is signalled whenever a slot is filled. A decode that panics fails
//! the scheduler instead of leaving its slot empty.

use crate::core::codec::Codec;
use crate::core::image::ImageRecord;
use crate::error::CompareError;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// A pair of shared image records
pub type RecordPair = (Arc<ImageRecord>, Arc<ImageRecord>);

struct State {
    slots: Vec<Option<Arc<ImageRecord>>>,
    next_to_create: usize,
    minor: usize,
    major: usize,
    failed: Option<CompareError>,
}

/// Thread-safe triangular pair enumeration over lazily decoded images.
pub struct PairScheduler {
    paths: Vec<PathBuf>,
    codec: Arc<dyn Codec>,
    state: Mutex<State>,
    slot_filled: Condvar,
    progress: AtomicU32,
    completed: AtomicBool,
}

impl PairScheduler {
    pub fn new(paths: Vec<PathBuf>, codec: Arc<dyn Codec>) -> Self {
        let n = paths.len();
        Self {
            paths,
            codec,
            state: Mutex::new(State {
                slots: vec![None; n],
                next_to_create: 0,
                minor: 0,
                major: 0,
                failed: None,
            }),
            slot_filled: Condvar::new(),
            progress: AtomicU32::new(if n == 0 { 1f32.to_bits() } else { 0 }),
            completed: AtomicBool::new(n == 0),
        }
    }

    /// Number of images
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Fraction of the pair space handed out, in [0, 1]. Never decreases.
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Relaxed))
    }

    /// Whether every pair has been handed out
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Records decoded so far
    pub fn decoded(&self) -> Vec<Arc<ImageRecord>> {
        match self.state.lock() {
            Ok(state) => state.slots.iter().flatten().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().slots.iter().flatten().cloned().collect(),
        }
    }

    /// Next pair to compare, blocking while a needed image is decoded.
    ///
    /// `Ok(None)` once all pairs have been handed out. An error means the
    /// codec failed as a whole; every later call returns the same error.
    pub fn next_pair(&self) -> Result<Option<RecordPair>, CompareError> {
        let mut state = self.lock()?;

        loop {
            if let Some(err) = &state.failed {
                return Err(err.clone());
            }
            let n = self.paths.len();
            if state.major >= n {
                return Ok(None);
            }

            let major = state.major;
            if let Some(second) = state.slots[major].clone() {
                let first = if state.minor == major {
                    second.clone()
                } else {
                    state.slots[state.minor]
                        .clone()
                        .ok_or_else(|| CompareError::Poisoned(format!("slot {} missing", state.minor)))?
                };
                self.advance(&mut state);
                return Ok(Some((first, second)));
            }

            // decode ahead while the slot we need is in flight elsewhere
            if state.next_to_create < n {
                let index = state.next_to_create;
                state.next_to_create += 1;
                drop(state);

                let path = self.paths[index].clone();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    ImageRecord::open(path, self.codec.as_ref())
                }));

                state = self.lock()?;
                match outcome {
                    Ok(Ok(record)) => {
                        if !record.is_ok() {
                            tracing::debug!("Skipping {}: {}", record.path().display(), record.status());
                        }
                        state.slots[index] = Some(Arc::new(record));
                    }
                    Ok(Err(e)) => {
                        tracing::error!("Codec failed on {}: {}", self.paths[index].display(), e);
                        // the first failure sticks; decodes already in flight may fail too
                        state.failed.get_or_insert(CompareError::CodecUnavailable {
                            path: self.paths[index].clone(),
                            reason: e.to_string(),
                        });
                    }
                    // waiters for this slot would otherwise block forever
                    Err(_) => {
                        tracing::error!("Decoder panicked on {}", self.paths[index].display());
                        state.failed.get_or_insert(CompareError::WorkerPanicked);
                    }
                }
                self.slot_filled.notify_all();
            } else {
                // every image is claimed; wait for the one we need
                state = self
                    .slot_filled
                    .wait(state)
                    .map_err(|e| CompareError::Poisoned(e.to_string()))?;
            }
        }
    }

    fn advance(&self, state: &mut State) {
        if state.minor == state.major {
            state.major += 1;
            state.minor = 0;
        } else {
            state.minor += 1;
        }

        let n = self.paths.len();
        let fraction = if state.major >= n {
            self.completed.store(true, Ordering::Release);
            1.0
        } else {
            state.major as f32 / n as f32
        };
        // non-negative floats order the same as their bit patterns
        self.progress.fetch_max(fraction.to_bits(), Ordering::Relaxed);
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, CompareError> {
        self.state
            .lock()
            .map_err(|e| CompareError::Poisoned(e.to_string()))
    }
}
