//! Resource metadata returned by the probe.

use crate::error::Downgrade;

/// What the server told us about a resource before downloading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMetadata {
    /// Advertised length in bytes; `None` when no length header was found.
    pub total_size: Option<u64>,
    /// Best filename derived from the headers or the URL.
    pub filename: String,
    /// Raw `Content-Type` header value.
    pub content_type: Option<String>,
    /// Whether the server advertises `Accept-Ranges: bytes`.
    pub supports_range: bool,
}

impl ResourceMetadata {
    /// Reason the resource must be fetched with a single unranged request, if any.
    pub fn downgrade(&self) -> Option<Downgrade> {
        match self.total_size {
            None => Some(Downgrade::UnknownSize),
            Some(0) => Some(Downgrade::ZeroSize),
            Some(_) if !self.supports_range => Some(Downgrade::RangesUnsupported),
            Some(_) => None,
        }
    }

    /// Number of chunks to use for a requested thread count.
    ///
    /// Always at least 1, and exactly 1 when [`downgrade`](Self::downgrade) applies.
    pub fn effective_threads(&self, requested: usize) -> usize {
        if self.downgrade().is_some() {
            1
        } else {
            requested.max(1)
        }
    }
}
