//! Progress accounting for segmented downloads.
//!
//! Fetchers add to per-chunk counters as bytes land on disk. Observers read an
//! aggregate [`ProgressSnapshot`], either directly from the session handle or
//! through a [`ProgressReporter`] thread that polls at a fixed interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

/// Per-chunk byte counters for one session.
///
/// Counters only ever grow while fetchers run, so the total is non-decreasing.
#[derive(Debug, Default)]
pub struct ChunkProgress {
    inner: Mutex<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    bytes: Vec<u64>,
    completed: usize,
}

impl ChunkProgress {
    /// Create counters for `chunks` chunks.
    pub fn new(chunks: usize) -> Self {
        let progress = Self::default();
        progress.reset(chunks);
        progress
    }

    /// Zero the counters and size them for `chunks` chunks.
    ///
    /// Only called before any fetcher of the session has started.
    pub fn reset(&self, chunks: usize) {
        let mut inner = self.inner.lock();
        inner.bytes = vec![0; chunks];
        inner.completed = 0;
    }

    /// Record `bytes` more bytes written by chunk `index`.
    pub fn add(&self, index: usize, bytes: u64) {
        let mut inner = self.inner.lock();
        if let Some(counter) = inner.bytes.get_mut(index) {
            *counter += bytes;
        }
    }

    /// Record that chunk `index` finished its stream.
    pub fn mark_completed(&self, index: usize) {
        let mut inner = self.inner.lock();
        if index < inner.bytes.len() {
            inner.completed += 1;
        }
    }

    /// Bytes written across all chunks.
    pub fn total(&self) -> u64 {
        self.inner.lock().bytes.iter().sum()
    }

    /// Bytes written by each chunk, in index order.
    pub fn per_chunk(&self) -> Vec<u64> {
        self.inner.lock().bytes.clone()
    }

    /// Number of chunks that finished their stream.
    pub fn completed_chunks(&self) -> usize {
        self.inner.lock().completed
    }

    /// Number of chunks being tracked.
    pub fn chunk_count(&self) -> usize {
        self.inner.lock().bytes.len()
    }
}

/// Point-in-time view of a session's progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// Bytes written to part artifacts so far.
    pub bytes_downloaded: u64,
    /// Advertised size, when known.
    pub total_size: Option<u64>,
    /// Time since the session started.
    pub elapsed: Duration,
    /// Chunks that have finished streaming.
    pub chunks_completed: usize,
    /// Chunks in the session.
    pub chunk_count: usize,
}

impl ProgressSnapshot {
    /// Completion percentage, or `None` when the size is unknown or zero.
    pub fn percent(&self) -> Option<f64> {
        match self.total_size {
            Some(total) if total > 0 => {
                Some((self.bytes_downloaded as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        }
    }

    /// Average transfer rate since the session started.
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_downloaded as f64 / secs
        } else {
            0.0
        }
    }
}

/// Something a [`ProgressReporter`] can poll.
pub trait ProgressSource: Send + Sync {
    /// Current progress.
    fn snapshot(&self) -> ProgressSnapshot;

    /// Whether the session has reached a terminal state.
    fn is_finished(&self) -> bool;
}

/// Callback invoked with each polled snapshot.
pub type ProgressCallback = Box<dyn Fn(ProgressSnapshot) + Send + Sync>;

/// Real-time progress reporter.
///
/// Spawns a background thread that polls a [`ProgressSource`] and invokes a
/// callback until the source finishes or the reporter is dropped. A final
/// snapshot is always reported.
pub struct ProgressReporter {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl ProgressReporter {
    /// Start polling `source` every `poll_interval`.
    pub fn start(
        source: Arc<dyn ProgressSource>,
        callback: ProgressCallback,
        poll_interval: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            while !stop_clone.load(Ordering::SeqCst) && !source.is_finished() {
                callback(source.snapshot());
                thread::sleep(poll_interval);
            }

            // Final report
            callback(source.snapshot());
        });

        Self {
            handle: Some(handle),
            stop,
        }
    }

    /// Stop the reporter and wait for its final report.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
