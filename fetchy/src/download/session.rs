//! Session state and outcome types.
//!
//! A session moves through:
//!
//! ```text
//! Idle ─► Connecting ─► Downloading ─┬─► Merging ─┬─► Completed
//!             │                      │            └─► Failed
//!             └─► Failed             ├─► Cancelled
//!                                    └─► Failed
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use parking_lot::Mutex;

use super::control::SessionControl;
use super::progress::{ChunkProgress, ProgressSnapshot, ProgressSource};
use crate::error::{Downgrade, SizeMismatch};
use crate::resolver::ResourceMetadata;

/// Lifecycle state of a download session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Created, not yet running.
    #[default]
    Idle,
    /// Probing the resource.
    Connecting,
    /// Chunk fetchers are running.
    Downloading,
    /// Parts are being concatenated into the output.
    Merging,
    /// The output is in place.
    Completed,
    /// Stopped by the caller.
    Cancelled,
    /// Stopped by an error.
    Failed,
}

impl SessionState {
    /// Whether the session has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Downloading => "downloading",
            Self::Merging => "merging",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Terminal state.
    pub state: SessionState,
    /// `true` only for [`SessionState::Completed`].
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Set when the merged size disagrees with the advertised size.
    pub warning: Option<SizeMismatch>,
    /// Set when the session fell back to a single unranged fetch.
    pub downgrade: Option<Downgrade>,
    /// Bytes in the final output (completed) or downloaded before stopping.
    pub bytes: u64,
    /// Final output path, when one was chosen.
    pub output: Option<PathBuf>,
}

impl DownloadOutcome {
    pub(crate) fn completed(
        output: PathBuf,
        bytes: u64,
        warning: Option<SizeMismatch>,
        downgrade: Option<Downgrade>,
    ) -> Self {
        let message = match warning {
            Some(w) => format!("downloaded {} bytes to {} ({})", bytes, output.display(), w),
            None => format!("downloaded {} bytes to {}", bytes, output.display()),
        };
        Self {
            state: SessionState::Completed,
            success: true,
            message,
            warning,
            downgrade,
            bytes,
            output: Some(output),
        }
    }

    pub(crate) fn cancelled(output: Option<PathBuf>, bytes: u64) -> Self {
        Self {
            state: SessionState::Cancelled,
            success: false,
            message: "download cancelled".to_string(),
            warning: None,
            downgrade: None,
            bytes,
            output,
        }
    }

    pub(crate) fn failed(message: impl Into<String>, output: Option<PathBuf>, bytes: u64) -> Self {
        Self {
            state: SessionState::Failed,
            success: false,
            message: message.into(),
            warning: None,
            downgrade: None,
            bytes,
            output,
        }
    }
}

/// State shared between a session's coordinator, its fetchers and its handle.
#[derive(Debug)]
pub(crate) struct SessionShared {
    pub url: String,
    pub control: SessionControl,
    pub progress: ChunkProgress,
    state: Mutex<SessionState>,
    metadata: Mutex<Option<ResourceMetadata>>,
    output: Mutex<Option<PathBuf>>,
    started: Instant,
}

impl SessionShared {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            control: SessionControl::new(),
            progress: ChunkProgress::default(),
            state: Mutex::new(SessionState::Idle),
            metadata: Mutex::new(None),
            output: Mutex::new(None),
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }

    pub fn metadata(&self) -> Option<ResourceMetadata> {
        self.metadata.lock().clone()
    }

    pub fn set_metadata(&self, metadata: ResourceMetadata) {
        *self.metadata.lock() = Some(metadata);
    }

    pub fn output(&self) -> Option<PathBuf> {
        self.output.lock().clone()
    }

    pub fn set_output(&self, output: PathBuf) {
        *self.output.lock() = Some(output);
    }
}

impl ProgressSource for SessionShared {
    fn snapshot(&self) -> ProgressSnapshot {
        let total_size = self.metadata.lock().as_ref().and_then(|m| m.total_size);
        ProgressSnapshot {
            bytes_downloaded: self.progress.total(),
            total_size,
            elapsed: self.started.elapsed(),
            chunks_completed: self.progress.completed_chunks(),
            chunk_count: self.progress.chunk_count(),
        }
    }

    fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }
}
