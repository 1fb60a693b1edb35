//! Error types for conduit messages

use thiserror::Error;

/// Boxed error carried by body streams
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for conduit operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for message construction and consumption
///
/// Construction-time validation failures surface as [`Error::InvalidArgument`]
/// and are raised synchronously by the constructor. Misuse of one-shot
/// resources (reading a body twice, hijacking twice) surfaces as
/// [`Error::InvalidState`]. Failures of the grammar parsers are passed through
/// unchanged in their own variants.
#[derive(Error, Debug)]
pub enum Error {
    /// A constructor argument was rejected
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A one-shot resource was used out of order
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A header carried a value that could not be interpreted
    #[error("Invalid `{name}` header: {message}")]
    InvalidHeader { name: String, message: String },

    /// A body could not be decoded with the chosen encoding
    #[error("Could not decode body as {encoding}: {message}")]
    Decode {
        encoding: &'static str,
        message: String,
    },

    /// HTTP date grammar error
    #[error("Invalid HTTP date: {0}")]
    InvalidDate(#[from] httpdate::Error),

    /// Media type grammar error
    #[error("Invalid media type: {0}")]
    InvalidMediaType(#[from] mime::FromStrError),

    /// URI grammar error
    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// Error from the `http` crate while converting messages
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    /// Error produced by the body stream itself
    #[error("Body stream error: {0}")]
    Body(#[source] BoxError),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create an invalid header error
    pub fn invalid_header(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Returns true for errors raised by reusing a one-shot resource
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// Returns true for errors raised while validating constructor input
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
