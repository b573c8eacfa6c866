//! Caller-side handle for a running download session.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::warn;

use super::merge::{cleanup_parts, find_orphaned_parts};
use super::progress::{ProgressCallback, ProgressReporter, ProgressSnapshot, ProgressSource};
use super::session::{DownloadOutcome, SessionShared, SessionState};
use crate::config::PartNaming;
use crate::resolver::ResourceMetadata;

/// Handle to a download started with [`Downloader::start`](crate::Downloader::start).
///
/// Control methods are idempotent and may be called from any thread through a
/// shared reference. Dropping the handle detaches the session; it keeps running
/// to completion in the background.
#[derive(Debug)]
pub struct DownloadHandle {
    shared: Arc<SessionShared>,
    coordinator: JoinHandle<DownloadOutcome>,
    part_naming: PartNaming,
}

impl DownloadHandle {
    pub(crate) fn new(
        shared: Arc<SessionShared>,
        coordinator: JoinHandle<DownloadOutcome>,
        part_naming: PartNaming,
    ) -> Self {
        Self {
            shared,
            coordinator,
            part_naming,
        }
    }

    /// URL being downloaded.
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// Suspend all fetchers after their current read. Ignored once cancelled.
    pub fn pause(&self) {
        self.shared.control.pause();
    }

    /// Let paused fetchers continue. Never revives a cancelled session.
    pub fn resume(&self) {
        self.shared.control.resume();
    }

    /// Stop the session. Fetchers stop after their current read and parts are removed.
    pub fn cancel(&self) {
        self.shared.control.cancel();
    }

    /// Whether the session is paused.
    pub fn is_paused(&self) -> bool {
        self.shared.control.is_paused()
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.shared.control.is_cancelled()
    }

    /// Bytes downloaded so far. Never decreases while downloading.
    pub fn progress(&self) -> u64 {
        self.shared.progress.total()
    }

    /// Detailed progress view.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.shared.snapshot()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Whether the session has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.shared.is_finished()
    }

    /// Probe result, once the session has connected.
    pub fn metadata(&self) -> Option<ResourceMetadata> {
        self.shared.metadata()
    }

    /// Final output path, once chosen.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.shared.output()
    }

    /// Poll this session on a background thread, calling `callback` every `interval`.
    pub fn reporter(&self, callback: ProgressCallback, interval: Duration) -> ProgressReporter {
        let source: Arc<dyn ProgressSource> = self.shared.clone();
        ProgressReporter::start(source, callback, interval)
    }

    /// Block until the session is Completed, Cancelled or Failed.
    pub fn await_completion(self) -> DownloadOutcome {
        match self.coordinator.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(url = %self.shared.url, "Download coordinator panicked");
                let output = self.shared.output();
                if let Some(output) = &output {
                    match find_orphaned_parts(output, self.part_naming) {
                        Ok(parts) => cleanup_parts(parts.iter().map(PathBuf::as_path)),
                        Err(e) => warn!(error = %e, "Failed to scan for leftover parts"),
                    }
                }
                self.shared.set_state(SessionState::Failed);
                DownloadOutcome::failed(
                    "download coordinator panicked",
                    output,
                    self.shared.progress.total(),
                )
            }
        }
    }
}
