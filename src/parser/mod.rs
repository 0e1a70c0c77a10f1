//! HTTP request parsing.
//!
//! This module turns raw connection bytes into [`HttpRequest`] values. The grammar
//! work is delegated to `httparse`; [`WireParser`] adds the incremental
//! buffering and body framing on top and reports what it finds through the
//! [`ParserEvents`] callbacks.

mod request;
mod method;
mod version;
mod error;
mod wire;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;
pub use wire::{ParserEvents, WireParser, MAX_HEADERS, MAX_HEAD_SIZE};
