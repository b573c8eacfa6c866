//! Fetchy - segmented HTTP downloads
//!
//! This library downloads a single remote resource over several parallel
//! byte-range connections, then merges the pieces into one file. Sessions can
//! be paused, resumed and cancelled from any thread while they run, and report
//! live progress.
//!
//! # Example
//!
//! ```ignore
//! let handle = fetchy::start("https://example.com/big.iso", None, None)?;
//! let outcome = handle.await_completion();
//! println!("{}", outcome.message);
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod resolver;

use std::path::PathBuf;

use tracing::warn;

pub use config::{FetchConfig, PartNaming};
pub use download::{
    find_orphaned_parts, partition, ByteRange, DownloadHandle, DownloadOutcome, Downloader,
    ProgressReporter, ProgressSnapshot, SessionState,
};
pub use error::{Downgrade, FetchError, FetchResult, SizeMismatch};
pub use resolver::{Resolver, ResourceMetadata};

/// Probe `url` with the default configuration.
///
/// Returns `None` on any connection failure or non-2xx status.
pub fn resolve(url: &str) -> Option<ResourceMetadata> {
    match Resolver::new(&FetchConfig::default()) {
        Ok(resolver) => resolver.connect(url),
        Err(e) => {
            warn!(error = %e, "Cannot build resolver");
            None
        }
    }
}

/// Start downloading `url` with the default configuration.
///
/// Returns immediately with a handle to the running session. `threads`
/// defaults to 4.
pub fn start(
    url: &str,
    output: Option<PathBuf>,
    threads: Option<usize>,
) -> FetchResult<DownloadHandle> {
    Ok(Downloader::new(FetchConfig::default())?.start(url, output, threads))
}
