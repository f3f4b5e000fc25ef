//! Errors raised while registering routes and decoding request bodies.
//!
//! Unmatched routes and missing files are not errors: the router answers them
//! with a `404` response and never surfaces them to the caller.

use thiserror::Error;

/// A boxed error coming from the transport or a third-party decoder.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A route path is not a valid regular expression.
    #[error("invalid route pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The declared `content-type` does not contain the media type the decoder expects.
    #[error("unexpected content-type `{found}`, expected `{expected}`")]
    ContentTypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// The body does not conform to its declared media type.
    #[error("malformed request body")]
    Decode(#[source] BoxError),

    /// The request stream failed or went idle before the end of the body.
    #[error("request body stream failed")]
    Stream(#[source] BoxError),

    #[error("request body has already been consumed")]
    BodyConsumed,

    /// A response payload could not be serialized.
    #[error("failed to encode response body")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn decode(err: impl Into<BoxError>) -> Self {
        Error::Decode(err.into())
    }

    pub(crate) fn stream(err: impl Into<BoxError>) -> Self {
        Error::Stream(err.into())
    }
}
