//! HTTP `Range` header parsing and serving windows.
//!
//! Only a single `bytes=` range is supported, in the three forms
//! `bytes=<first>-<last>`, `bytes=<first>-` and `bytes=-<suffix>`.

use std::fmt;

const PREAMBLE: &str = "bytes=";

/// A parsed single byte range. Bounds are inclusive, as on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=<first>-<last>`
    Bounded { first: u64, last: u64 },
    /// `bytes=<first>-`
    From { first: u64 },
    /// `bytes=-<len>`: the final `len` bytes.
    Suffix { len: u64 },
}

impl ByteRange {
    /// Parse a `Range` header value.
    pub fn parse(header: &str) -> crate::Result<Self> {
        let spec = header
            .strip_prefix(PREAMBLE)
            .ok_or_else(|| invalid(format!("doesn't start with {PREAMBLE}")))?;

        if spec.contains(',') {
            return Err(invalid(
                "contains multiple ranges which isn't supported".to_string(),
            ));
        }

        let (first, last) = spec
            .split_once('-')
            .ok_or_else(|| invalid("contains no '-'".to_string()))?;
        let (first, last) = (first.trim(), last.trim());

        let first = parse_bound(first, "start")?;
        let last = parse_bound(last, "end")?;

        match (first, last) {
            (Some(first), Some(last)) if last < first => {
                Err(invalid(format!("end {last} is before start {first}")))
            }
            (Some(first), Some(last)) => Ok(Self::Bounded { first, last }),
            (Some(first), None) => Ok(Self::From { first }),
            (None, Some(len)) => Ok(Self::Suffix { len }),
            (None, None) => Err(invalid("no start or end".to_string())),
        }
    }

    /// Compute the serving window for an object of `size` bytes.
    ///
    /// Offset and exclusive end are clamped to `[0, size]`.
    pub fn window(&self, size: u64) -> Window {
        let (offset, end) = match *self {
            Self::Bounded { first, last } => (first, last.saturating_add(1)),
            Self::From { first } => (first, size),
            Self::Suffix { len } => (size.saturating_sub(len), size),
        };
        let offset = offset.min(size);
        let end = end.clamp(offset, size);
        Window { offset, end, total: size }
    }
}

/// The byte window actually served for a ranged read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// First byte served.
    pub offset: u64,
    /// One past the last byte served.
    pub end: u64,
    /// Total object size.
    pub total: u64,
}

impl Window {
    /// Number of bytes in the window.
    pub fn len(&self) -> u64 {
        self.end - self.offset
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.end == self.offset
    }

    /// The `Content-Range` header value: `bytes <offset>-<end-1>/<total>`.
    pub fn content_range(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // An empty window at offset 0 renders its last byte as -1.
        let last = i128::from(self.end) - 1;
        write!(f, "bytes {}-{}/{}", self.offset, last, self.total)
    }
}

fn parse_bound(value: &str, which: &str) -> crate::Result<Option<u64>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|_| invalid(format!("bad {which}")))
}

fn invalid(message: String) -> crate::Error {
    crate::Error::InvalidRange(message)
}
