//! Segmented download orchestrator.
//!
//! The orchestrator owns one coordinator thread per session. The coordinator
//! probes the resource, partitions it, runs one fetcher thread per range,
//! joins them, and merges the parts. It never performs chunk I/O itself.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use super::fetcher::{discard_part, ChunkContext, ChunkFetcher, ChunkReport, ChunkSpec};
use super::handle::DownloadHandle;
use super::merge::{cleanup_parts, merge_parts, PartFile};
use super::partition::partition;
use super::session::{DownloadOutcome, SessionShared, SessionState};
use crate::config::{output_dir, FetchConfig};
use crate::error::{FetchError, FetchResult, SizeMismatch};
use crate::resolver::{Resolver, ResourceMetadata};

/// Segmented downloader.
///
/// Cheap to clone; each call to [`start`](Self::start) runs an independent session.
#[derive(Debug, Clone)]
pub struct Downloader {
    config: FetchConfig,
    resolver: Resolver,
    fetcher: ChunkFetcher,
}

impl Downloader {
    /// Create a downloader from `config`.
    pub fn new(config: FetchConfig) -> FetchResult<Self> {
        let resolver = Resolver::new(&config)?;
        let fetcher = ChunkFetcher::new(&config)?;
        Ok(Self {
            config,
            resolver,
            fetcher,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Probe `url` for metadata. Failures are logged and yield `None`.
    pub fn resolve(&self, url: &str) -> Option<ResourceMetadata> {
        self.resolver.connect(url)
    }

    /// Begin downloading `url` in the background and return immediately.
    ///
    /// `output` defaults to the resolved filename in the current directory; an
    /// existing directory gets the resolved filename appended. `threads`
    /// defaults to the configured thread count.
    pub fn start(
        &self,
        url: &str,
        output: Option<PathBuf>,
        threads: Option<usize>,
    ) -> DownloadHandle {
        let shared = Arc::new(SessionShared::new(url));
        let threads = threads.unwrap_or(self.config.default_threads).max(1);
        let downloader = self.clone();
        let session = Arc::clone(&shared);

        let coordinator = thread::spawn(move || {
            let outcome = downloader.run(&session, output, threads);
            session.set_state(outcome.state);
            outcome
        });

        DownloadHandle::new(shared, coordinator, self.config.part_naming)
    }

    /// Download `url` and block until the session ends.
    pub fn download(
        &self,
        url: &str,
        output: Option<PathBuf>,
        threads: Option<usize>,
    ) -> DownloadOutcome {
        self.start(url, output, threads).await_completion()
    }

    fn run(
        &self,
        session: &SessionShared,
        requested_output: Option<PathBuf>,
        threads: usize,
    ) -> DownloadOutcome {
        session.set_state(SessionState::Connecting);

        let metadata = match self.resolver.probe(&session.url) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(url = %session.url, error = %e, "Download failed to connect");
                return DownloadOutcome::failed(e.to_string(), None, 0);
            }
        };
        session.set_metadata(metadata.clone());

        let output = resolve_output(requested_output.as_deref(), &metadata.filename);
        session.set_output(output.clone());

        if session.control.is_cancelled() {
            return DownloadOutcome::cancelled(Some(output), 0);
        }

        if let Err(e) = ensure_output_dir(&output) {
            warn!(output = %output.display(), error = %e, "Cannot prepare output directory");
            return DownloadOutcome::failed(e.to_string(), Some(output), 0);
        }

        let downgrade = metadata.downgrade();
        let effective = metadata.effective_threads(threads);
        if let Some(reason) = downgrade {
            if threads > 1 {
                info!(url = %session.url, reason = %reason, "Falling back to a single connection");
            }
        }

        let specs: Vec<ChunkSpec> = match (downgrade, metadata.total_size) {
            (None, Some(total)) => partition(total, effective)
                .into_iter()
                .map(ChunkSpec::Range)
                .collect(),
            _ => vec![ChunkSpec::Full],
        };
        let parts: Vec<PartFile> = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| PartFile {
                index,
                path: self.config.part_naming.part_path(&output, index),
                expected: match spec {
                    ChunkSpec::Full => None,
                    ChunkSpec::Range(range) => Some(range.len()),
                },
            })
            .collect();

        session.progress.reset(specs.len());
        session.set_state(SessionState::Downloading);
        info!(
            url = %session.url,
            output = %output.display(),
            threads = specs.len(),
            total_size = ?metadata.total_size,
            "Starting download"
        );

        let first_failure = self.fetch_all(session, &specs, &parts);

        if session.control.is_cancelled() {
            cleanup_parts(parts.iter().map(|p| p.path.as_path()));
            info!(url = %session.url, "Download cancelled");
            return DownloadOutcome::cancelled(Some(output), session.progress.total());
        }

        session.set_state(SessionState::Merging);
        let bytes = match merge_parts(&output, &parts) {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = match first_failure {
                    Some(reason) => format!("{} ({})", e, reason),
                    None => e.to_string(),
                };
                warn!(url = %session.url, error = %message, "Download failed");
                return DownloadOutcome::failed(message, Some(output), session.progress.total());
            }
        };

        let warning = metadata
            .total_size
            .filter(|&expected| expected != bytes)
            .map(|expected| SizeMismatch {
                expected,
                actual: bytes,
            });
        if let Some(w) = warning {
            warn!(url = %session.url, expected = w.expected, actual = w.actual, "Size mismatch");
        }

        info!(url = %session.url, output = %output.display(), bytes, "Download completed");
        DownloadOutcome::completed(output, bytes, warning, downgrade)
    }

    /// Run one fetcher thread per chunk and wait for all of them.
    ///
    /// Returns the first chunk failure, for the session's failure message.
    fn fetch_all(
        &self,
        session: &SessionShared,
        specs: &[ChunkSpec],
        parts: &[PartFile],
    ) -> Option<String> {
        let ctx = ChunkContext {
            control: &session.control,
            progress: &session.progress,
        };
        let url = session.url.as_str();

        let results: Vec<(usize, thread::Result<ChunkReport>)> = thread::scope(|scope| {
            let handles: Vec<_> = specs
                .iter()
                .zip(parts)
                .map(|(&spec, part)| {
                    let ctx = &ctx;
                    let fetcher = &self.fetcher;
                    let handle =
                        scope.spawn(move || fetcher.fetch(url, part.index, spec, &part.path, ctx));
                    (part.index, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(index, handle)| (index, handle.join()))
                .collect()
        });

        let mut first_failure = None;
        for (index, result) in results {
            match result {
                Ok(report) => match report.result {
                    Ok(()) => {}
                    Err(FetchError::Cancelled) => {}
                    Err(e) => {
                        warn!(index, bytes = report.bytes, error = %e, "Chunk failed");
                        first_failure.get_or_insert_with(|| e.to_string());
                    }
                },
                Err(_) => {
                    warn!(index, "Chunk worker panicked");
                    if let Some(part) = parts.iter().find(|p| p.index == index) {
                        discard_part(&part.path);
                    }
                    first_failure.get_or_insert_with(|| format!("chunk {} worker panicked", index));
                }
            }
        }
        first_failure
    }
}

/// Pick the final output path.
fn resolve_output(requested: Option<&Path>, filename: &str) -> PathBuf {
    match requested {
        Some(path) if path.is_dir() => path.join(filename),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(filename),
    }
}

fn ensure_output_dir(output: &Path) -> FetchResult<()> {
    let dir = output_dir(output);
    fs::create_dir_all(&dir).map_err(|e| FetchError::FileSystem {
        path: dir.clone(),
        source: e,
    })?;
    debug!(dir = %dir.display(), "Output directory ready");
    Ok(())
}
