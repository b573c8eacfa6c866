//! Byte range partitioning.
//!
//! A resource of `total` bytes is split into `n` contiguous, ordered ranges
//! that cover `[0, total)` exactly once. Ranges are `ceil(total / n)` bytes
//! long until the resource runs out, so the last non-empty range may be
//! shorter and trailing ranges are empty when `n > total`.

/// A half-open byte interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// Create a range covering `[start, end)`. An `end` before `start` yields an empty range.
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// First byte offset.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte offset (inclusive), or `None` for an empty range.
    pub fn end(&self) -> Option<u64> {
        if self.is_empty() {
            None
        } else {
            Some(self.end - 1)
        }
    }

    /// Number of bytes in the range.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the range holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `Range` header value, e.g. `bytes=0-249999`. `None` for an empty range.
    pub fn header_value(&self) -> Option<String> {
        self.end().map(|end| format!("bytes={}-{}", self.start, end))
    }
}

/// Split `total` bytes into `n` contiguous ranges.
///
/// `n = 0` is treated as 1. The result always has exactly `max(n, 1)` entries.
pub fn partition(total: u64, n: usize) -> Vec<ByteRange> {
    let n = n.max(1) as u64;
    let chunk = total.div_ceil(n);

    (0..n)
        .map(|i| {
            let start = i.saturating_mul(chunk).min(total);
            let end = (i + 1).saturating_mul(chunk).min(total);
            ByteRange::new(start, end)
        })
        .collect()
}
