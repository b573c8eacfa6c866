//! Configuration for the downloader.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Browser-like client identity sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Name used when neither the headers nor the URL yield a filename.
pub const DEFAULT_FILENAME: &str = "download_file";

/// Fixed streaming read size (8KB).
pub const DEFAULT_READ_INCREMENT: usize = 8 * 1024;

/// How temporary part artifacts are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartNaming {
    /// `<output>.partN`, next to the output file.
    #[default]
    Suffixed,
    /// `part_N.tmp` inside the output directory.
    Indexed,
}

impl PartNaming {
    /// Path of part `index` for the given output file.
    pub fn part_path(&self, output: &Path, index: usize) -> PathBuf {
        match self {
            Self::Suffixed => {
                let mut name = output.as_os_str().to_os_string();
                name.push(format!(".part{}", index));
                PathBuf::from(name)
            }
            Self::Indexed => output_dir(output).join(format!("part_{}.tmp", index)),
        }
    }

    /// Index encoded in `file_name` if it names a part of `output`.
    pub fn part_index(&self, output: &Path, file_name: &str) -> Option<usize> {
        let digits = match self {
            Self::Suffixed => {
                let base = output.file_name()?.to_str()?;
                file_name.strip_prefix(base)?.strip_prefix(".part")?
            }
            Self::Indexed => file_name.strip_prefix("part_")?.strip_suffix(".tmp")?,
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// Directory that holds `output`; `.` when the path has no parent.
pub fn output_dir(output: &Path) -> PathBuf {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Configuration for probing and downloading.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Timeout for the metadata probe and the GET length fallback.
    pub probe_timeout: Duration,

    /// Timeout for each chunk request.
    ///
    /// This is the only network deadline; there is none spanning the session.
    pub chunk_timeout: Duration,

    /// `User-Agent` header value.
    pub user_agent: String,

    /// Bytes read from the response per increment.
    ///
    /// Pause and cancel take effect at this granularity.
    pub read_increment: usize,

    /// How often a paused fetcher re-checks its flags.
    pub pause_poll_interval: Duration,

    /// Thread count used when the caller does not pick one.
    pub default_threads: usize,

    /// Naming scheme for part artifacts.
    pub part_naming: PartNaming,

    /// Open a streamed GET to read the length when the probe lacks one.
    pub get_fallback: bool,

    /// Filename used when nothing better can be derived.
    pub default_filename: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(10),
            chunk_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            read_increment: DEFAULT_READ_INCREMENT,
            pause_poll_interval: Duration::from_millis(100),
            default_threads: 4,
            part_naming: PartNaming::default(),
            get_fallback: true,
            default_filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

impl FetchConfig {
    /// Set the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the per-chunk timeout.
    pub fn with_chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout = timeout;
        self
    }

    /// Set the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the streaming read increment (minimum 1 byte).
    pub fn with_read_increment(mut self, bytes: usize) -> Self {
        self.read_increment = bytes.max(1);
        self
    }

    /// Set the paused re-check interval.
    pub fn with_pause_poll_interval(mut self, interval: Duration) -> Self {
        self.pause_poll_interval = interval;
        self
    }

    /// Set the default thread count (minimum 1).
    pub fn with_default_threads(mut self, threads: usize) -> Self {
        self.default_threads = threads.max(1);
        self
    }

    /// Set the part naming scheme.
    pub fn with_part_naming(mut self, naming: PartNaming) -> Self {
        self.part_naming = naming;
        self
    }

    /// Enable or disable the GET length fallback.
    pub fn with_get_fallback(mut self, enabled: bool) -> Self {
        self.get_fallback = enabled;
        self
    }

    /// Set the fallback filename.
    pub fn with_default_filename(mut self, name: impl Into<String>) -> Self {
        self.default_filename = name.into();
        self
    }
}
