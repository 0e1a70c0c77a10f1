//! Error types for the wire parser.

use thiserror::Error;

/// Errors that can occur while parsing an HTTP request off the wire.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP method in the request is not supported.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request head violates the HTTP/1.x grammar.
    #[error("Malformed request: {0}")]
    Malformed(#[from] httparse::Error),

    /// The Content-Length header is not a valid length.
    #[error("Invalid Content-Length header")]
    InvalidContentLength,

    /// The chunked body framing is broken.
    #[error("Invalid chunk in chunked body")]
    InvalidChunk,

    /// The request head grew past the allowed size without completing.
    #[error("Request head exceeds {0} bytes")]
    HeadTooLarge(usize),

    /// A required header is missing from the request.
    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    /// Error parsing JSON.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}
