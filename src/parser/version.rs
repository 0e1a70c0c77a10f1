//! HTTP protocol versions.

use std::fmt;

/// HTTP/1.x protocol versions accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    Http10,
    #[default]
    Http11,
}

impl HttpVersion {
    /// Maps the minor version reported by the grammar parser.
    pub(crate) fn from_minor(minor: u8) -> Self {
        match minor {
            0 => HttpVersion::Http10,
            _ => HttpVersion::Http11,
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpVersion::Http10 => write!(f, "HTTP/1.0"),
            HttpVersion::Http11 => write!(f, "HTTP/1.1"),
        }
    }
}
