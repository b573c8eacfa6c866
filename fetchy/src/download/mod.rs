//! Segmented HTTP downloads.
//!
//! This module provides the download pipeline, including:
//! - Byte range partitioning (`partition`)
//! - Pause and cancel flags shared by a session (`control`)
//! - Per-chunk progress counters and a polling reporter (`progress`)
//! - Single-range streaming into part artifacts (`fetcher`)
//! - Ordered concatenation of parts (`merge`)
//! - Session state and outcomes (`session`)
//! - The coordinator and its caller-side handle (`orchestrator`, `handle`)
//!
//! # Architecture
//!
//! ```text
//! Downloader (orchestrator)
//!         │
//!         ├── Resolver (metadata probe)
//!         │
//!         ├── coordinator thread per session
//!         │       ├── partition() ──► ByteRange × N
//!         │       ├── ChunkFetcher × N (one thread per range)
//!         │       │       └── <output>.partN
//!         │       └── merge_parts() ──► <output>
//!         │
//!         └── DownloadHandle
//!                 ├── SessionControl (pause / resume / cancel)
//!                 ├── ChunkProgress (progress / snapshot)
//!                 └── ProgressReporter (real-time updates)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fetchy::{Downloader, FetchConfig};
//!
//! let downloader = Downloader::new(FetchConfig::default())?;
//! let handle = downloader.start("https://example.com/big.iso", None, Some(8));
//!
//! handle.pause();
//! handle.resume();
//! println!("{} bytes so far", handle.progress());
//!
//! let outcome = handle.await_completion();
//! assert!(outcome.success, "{}", outcome.message);
//! ```

mod control;
mod fetcher;
mod handle;
mod merge;
mod orchestrator;
mod partition;
mod progress;
mod session;

pub use control::SessionControl;
pub use fetcher::{ChunkReport, ChunkSpec};
pub use handle::DownloadHandle;
pub use merge::{cleanup_parts, find_orphaned_parts, merge_parts, PartFile};
pub use orchestrator::Downloader;
pub use partition::{partition, ByteRange};
pub use progress::{
    ChunkProgress, ProgressCallback, ProgressReporter, ProgressSnapshot, ProgressSource,
};
pub use session::{DownloadOutcome, SessionState};
