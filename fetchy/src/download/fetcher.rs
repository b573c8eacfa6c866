//! Single-chunk HTTP fetcher.
//!
//! Each fetcher streams one byte range (or the whole resource) into its own
//! part artifact, checking the session's cancel and pause flags between reads.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::control::SessionControl;
use super::partition::ByteRange;
use super::progress::ChunkProgress;
use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};

/// What a chunk asks the server for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSpec {
    /// The whole resource, without a `Range` header.
    Full,
    /// A bounded byte range.
    Range(ByteRange),
}

impl ChunkSpec {
    /// Maximum bytes this chunk may write, when bounded.
    fn limit(&self) -> Option<u64> {
        match self {
            Self::Full => None,
            Self::Range(range) => Some(range.len()),
        }
    }
}

/// Result of one chunk fetch.
#[derive(Debug)]
pub struct ChunkReport {
    /// Chunk index.
    pub index: usize,
    /// Bytes written to the part artifact.
    pub bytes: u64,
    /// How the fetch ended.
    pub result: FetchResult<()>,
}

/// Shared session state a fetcher reports into.
pub(crate) struct ChunkContext<'a> {
    pub control: &'a SessionControl,
    pub progress: &'a ChunkProgress,
}

/// Streams chunks into part artifacts.
#[derive(Debug, Clone)]
pub(crate) struct ChunkFetcher {
    client: Client,
    read_increment: usize,
    pause_poll_interval: Duration,
}

impl ChunkFetcher {
    /// Build a fetcher with the chunk timeout and user agent from `config`.
    pub fn new(config: &FetchConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.chunk_timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            read_increment: config.read_increment.max(1),
            pause_poll_interval: config.pause_poll_interval,
        })
    }

    /// Fetch chunk `index` of `url` into `part`.
    ///
    /// On transport or status failure the part is removed. A cancelled chunk
    /// leaves its part in place for the orchestrator to clean up.
    pub fn fetch(
        &self,
        url: &str,
        index: usize,
        spec: ChunkSpec,
        part: &Path,
        ctx: &ChunkContext<'_>,
    ) -> ChunkReport {
        let mut bytes = 0;
        let result = self.fetch_inner(url, index, spec, part, ctx, &mut bytes);

        match &result {
            Ok(()) => {
                ctx.progress.mark_completed(index);
                debug!(index, bytes, part = %part.display(), "Chunk finished");
            }
            Err(FetchError::Cancelled) => {
                debug!(index, bytes, "Chunk cancelled");
            }
            Err(_) => discard_part(part),
        }

        ChunkReport {
            index,
            bytes,
            result,
        }
    }

    fn fetch_inner(
        &self,
        url: &str,
        index: usize,
        spec: ChunkSpec,
        part: &Path,
        ctx: &ChunkContext<'_>,
        written: &mut u64,
    ) -> FetchResult<()> {
        if ctx.control.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let file = File::create(part).map_err(|e| FetchError::FileSystem {
            path: part.to_path_buf(),
            source: e,
        })?;

        let mut request = self.client.get(url);
        let mut skip = 0;
        if let ChunkSpec::Range(range) = spec {
            match range.header_value() {
                Some(value) => request = request.header(RANGE, value),
                // Empty range: the empty part is the whole result.
                None => return Ok(()),
            }
            skip = range.start();
        }

        debug!(index, url = %url, spec = ?spec, "Chunk started");
        let mut response = request.send().map_err(|e| FetchError::transport(index, e))?;

        if ctx.control.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let status = response.status();
        match spec {
            ChunkSpec::Full if !status.is_success() => {
                return Err(FetchError::ChunkStatus {
                    index,
                    status: status.as_u16(),
                });
            }
            ChunkSpec::Range(_) if status == StatusCode::PARTIAL_CONTENT => skip = 0,
            ChunkSpec::Range(_) if status == StatusCode::OK => {
                debug!(index, skip, "Server ignored Range, skipping leading bytes");
            }
            ChunkSpec::Range(_) => {
                return Err(FetchError::ChunkStatus {
                    index,
                    status: status.as_u16(),
                });
            }
            ChunkSpec::Full => skip = 0,
        }

        self.discard_leading(&mut response, skip, index, ctx)?;
        self.stream(&mut response, file, index, spec.limit(), part, ctx, written)
    }

    /// Read and drop the first `skip` bytes, honouring pause and cancel per read.
    fn discard_leading(
        &self,
        response: &mut impl Read,
        skip: u64,
        index: usize,
        ctx: &ChunkContext<'_>,
    ) -> FetchResult<()> {
        let mut buffer = vec![0u8; self.read_increment];
        let mut remaining = skip;

        while remaining > 0 {
            let want = remaining.min(buffer.len() as u64) as usize;
            let bytes_read = response
                .read(&mut buffer[..want])
                .map_err(|e| FetchError::transport(index, e))?;
            if bytes_read == 0 {
                break;
            }
            remaining -= bytes_read as u64;

            if !ctx.control.wait_while_paused(self.pause_poll_interval) {
                return Err(FetchError::Cancelled);
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn stream(
        &self,
        response: &mut impl Read,
        file: File,
        index: usize,
        limit: Option<u64>,
        part: &Path,
        ctx: &ChunkContext<'_>,
        written: &mut u64,
    ) -> FetchResult<()> {
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; self.read_increment];

        loop {
            let want = match limit {
                Some(limit) => {
                    let remaining = limit.saturating_sub(*written);
                    if remaining == 0 {
                        break;
                    }
                    remaining.min(buffer.len() as u64) as usize
                }
                None => buffer.len(),
            };

            let bytes_read = response
                .read(&mut buffer[..want])
                .map_err(|e| FetchError::transport(index, e))?;
            if bytes_read == 0 {
                break;
            }

            if !ctx.control.wait_while_paused(self.pause_poll_interval) {
                return Err(FetchError::Cancelled);
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| FetchError::FileSystem {
                    path: part.to_path_buf(),
                    source: e,
                })?;

            *written += bytes_read as u64;
            ctx.progress.add(index, bytes_read as u64);
        }

        writer.flush().map_err(|e| FetchError::FileSystem {
            path: part.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }
}

/// Remove a part artifact, ignoring one that is already gone.
pub(crate) fn discard_part(part: &Path) {
    match fs::remove_file(part) {
        Ok(()) => debug!(part = %part.display(), "Removed part"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(part = %part.display(), error = %e, "Failed to remove part"),
    }
}
