//! Error types for the HTTP server.

use thiserror::Error;

use crate::parser::Error as ParserError;
use crate::server::response::StatusCode;

/// An error that maps directly onto an HTTP response status.
///
/// Any other [`Error`] reaching the dispatcher is answered with
/// `500 Internal Server Error` and its display text as the body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct HttpError {
    /// The response status.
    pub status: StatusCode,
    /// The response body.
    pub message: String,
}

impl HttpError {
    /// Create an error whose message is the status reason phrase.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: status.reason_phrase().to_string(),
        }
    }

    /// Create an error with a custom message.
    pub fn with_message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<StatusCode> for HttpError {
    fn from(status: StatusCode) -> Self {
        HttpError::new(status)
    }
}

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// An error carrying its own response status.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A numeric status code with no registered meaning.
    #[error("Unknown HTTP status code: {0}")]
    InvalidStatus(u16),

    /// A route pattern could not be registered.
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// Internal server error.
    #[error("{0}")]
    InternalError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an application failure with a plain message.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::InternalError(message.into())
    }

    /// Normalize into an [`HttpError`]; anything that is not already one
    /// becomes a 500 carrying this error's display text.
    pub fn into_http(self) -> HttpError {
        match self {
            Error::Http(error) => error,
            other => HttpError::with_message(StatusCode::InternalServerError, other.to_string()),
        }
    }
}

impl From<StatusCode> for Error {
    fn from(status: StatusCode) -> Self {
        Error::Http(HttpError::new(status))
    }
}

impl From<matchit::InsertError> for Error {
    fn from(error: matchit::InsertError) -> Self {
        Error::InvalidRoute(error.to_string())
    }
}
