//! CLI error type.

use fetchy::FetchError;
use thiserror::Error;

/// Errors reported to the user before exiting with a non-zero status.
#[derive(Debug, Error)]
pub enum CliError {
    /// The metadata probe failed.
    #[error("Failed to connect to {0}")]
    Connect(String),

    /// The library could not be set up.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The session ended in failure.
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// The user interrupted the download.
    #[error("Download cancelled")]
    Cancelled,

    /// The Ctrl-C handler could not be installed.
    #[error("Failed to set signal handler: {0}")]
    Signal(String),
}
