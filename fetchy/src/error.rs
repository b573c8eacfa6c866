//! Error types for the downloader.
//!
//! Chunk-level variants are logged and contained by the orchestrator; they never
//! cross the [`DownloadHandle`](crate::DownloadHandle) boundary. Sessions always
//! resolve to a [`DownloadOutcome`](crate::DownloadOutcome).

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for downloader operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while resolving, fetching or merging a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The metadata probe failed, timed out, or returned a non-2xx status.
    #[error("failed to connect to {url}: {reason}")]
    Connection { url: String, reason: String },

    /// A chunk's transfer failed mid-flight.
    #[error("chunk {index} transfer failed: {reason}")]
    ChunkTransport { index: usize, reason: String },

    /// A ranged chunk request got a status other than 200 or 206.
    #[error("chunk {index} rejected with HTTP status {status}")]
    ChunkStatus { index: usize, status: u16 },

    /// A part artifact was absent when merging.
    #[error("part {index} missing at {}", path.display())]
    MissingPart { index: usize, path: PathBuf },

    /// A part artifact was shorter than its byte range.
    #[error("part {index} incomplete: expected {expected} bytes, found {actual}")]
    IncompletePart {
        index: usize,
        expected: u64,
        actual: u64,
    },

    /// Reading a part or writing the final output failed during merge.
    #[error("merge failed at {}: {source}", path.display())]
    MergeIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Creating the output directory or a part artifact failed.
    #[error("file system error at {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The session was cancelled by the caller.
    #[error("download cancelled")]
    Cancelled,
}

impl FetchError {
    /// Wrap a transport error for the chunk at `index`.
    pub(crate) fn transport(index: usize, err: impl fmt::Display) -> Self {
        Self::ChunkTransport {
            index,
            reason: err.to_string(),
        }
    }
}

/// Non-fatal warning: the merged file does not match the advertised length.
///
/// Some servers misreport `Content-Length`, so this accompanies a successful
/// outcome instead of failing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatch {
    /// Size advertised by the server.
    pub expected: u64,
    /// Size of the merged output.
    pub actual: u64,
}

impl fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size mismatch: expected {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

/// Why a session fell back to a single unranged fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downgrade {
    /// The server did not report a length.
    UnknownSize,
    /// The server reported a length of zero.
    ZeroSize,
    /// The server does not advertise `Accept-Ranges: bytes`.
    RangesUnsupported,
}

impl fmt::Display for Downgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSize => write!(f, "size unknown"),
            Self::ZeroSize => write!(f, "size reported as zero"),
            Self::RangesUnsupported => write!(f, "server does not accept byte ranges"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_display() {
        let err = FetchError::Connection {
            url: "https://example.com/a.bin".to_string(),
            reason: "HTTP 404".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to connect to https://example.com/a.bin: HTTP 404"
        );
    }

    #[test]
    fn test_incomplete_part_display() {
        let err = FetchError::IncompletePart {
            index: 2,
            expected: 100,
            actual: 40,
        };
        assert!(err.to_string().contains("part 2"));
        assert!(err.to_string().contains("expected 100"));
    }

    #[test]
    fn test_merge_io_has_source() {
        use std::error::Error;

        let err = FetchError::MergeIo {
            path: PathBuf::from("/tmp/out.bin"),
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_size_mismatch_display() {
        let warning = SizeMismatch {
            expected: 10,
            actual: 12,
        };
        assert_eq!(
            warning.to_string(),
            "size mismatch: expected 10 bytes, got 12"
        );
    }
}
