//! Metadata probing for remote resources.
//!
//! The resolver issues a `HEAD` request (following redirects) and extracts:
//! - the advertised length (`Content-Length`)
//! - the filename (`Content-Disposition`, then the URL path)
//! - the content type
//! - byte range support (`Accept-Ranges: bytes`)
//!
//! When the probe carries no length header, a streamed `GET` is opened just to
//! read its headers and then dropped without consuming the body.

pub mod filename;
mod metadata;

pub use metadata::ResourceMetadata;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};
use filename::resolve_filename;

/// Probes URLs for download metadata.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: Client,
    get_fallback: bool,
    default_filename: String,
}

impl Resolver {
    /// Create a resolver using the probe timeout and user agent from `config`.
    pub fn new(config: &FetchConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.probe_timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            get_fallback: config.get_fallback,
            default_filename: config.default_filename.clone(),
        })
    }

    /// Probe `url` and report why it failed, if it did.
    pub fn probe(&self, url: &str) -> FetchResult<ResourceMetadata> {
        let response = self
            .client
            .head(url)
            .send()
            .map_err(|e| FetchError::Connection {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Connection {
                url: url.to_string(),
                reason: format!("HEAD request failed with status {}", response.status()),
            });
        }

        let headers = response.headers();
        let disposition = disposition_text(headers);
        let filename = resolve_filename(disposition.as_deref(), url, &self.default_filename);
        let content_type = header_str(headers, CONTENT_TYPE.as_str()).map(str::to_string);
        let supports_range = header_str(headers, ACCEPT_RANGES.as_str())
            .map(|v| v.trim().eq_ignore_ascii_case("bytes"))
            .unwrap_or(false);

        let mut total_size = content_length(headers);
        if total_size.is_none() && self.get_fallback {
            total_size = self.length_from_get(url);
        }

        debug!(
            url = %url,
            filename = %filename,
            total_size = ?total_size,
            supports_range,
            "Probed resource"
        );

        Ok(ResourceMetadata {
            total_size,
            filename,
            content_type,
            supports_range,
        })
    }

    /// Probe `url`, logging and discarding any failure.
    pub fn connect(&self, url: &str) -> Option<ResourceMetadata> {
        match self.probe(url) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(url = %url, error = %e, "Metadata probe failed");
                None
            }
        }
    }

    /// Open a streamed GET and read only its length header.
    fn length_from_get(&self, url: &str) -> Option<u64> {
        let response: Response = match self.client.get(url).send() {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %url, error = %e, "GET length fallback failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(url = %url, status = %response.status(), "GET length fallback rejected");
            return None;
        }

        // Dropping the response closes the connection without reading the body.
        content_length(response.headers())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `Content-Disposition` as text. Raw UTF-8 filenames are common, so non-ASCII
/// bytes are decoded lossily instead of rejected.
fn disposition_text(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_DISPOSITION)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

/// Parse `Content-Length` from the header text.
fn content_length(headers: &HeaderMap) -> Option<u64> {
    header_str(headers, CONTENT_LENGTH.as_str()).and_then(|s| s.trim().parse::<u64>().ok())
}
